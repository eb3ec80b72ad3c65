//! A fake "instance service" exercised through the `AlwaysGet` kernel
//! shape: LIST enumerates ids, then each id is resolved with its own GET,
//! used to exercise the `maxParallel` concurrency bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use resourcegraph_core::kernel::always_get::{AlwaysGet, GetFn, GetInputMapper, InputMapperList, ItemMapper, ListFuncOutputMapper, ListPaginatorBuilder};
use resourcegraph_core::metadata::{QueryMethodSupport, SupportedQueryMethods};
use resourcegraph_core::paginator::FixedPaginator;
use resourcegraph_core::{AdapterMetadata, Item, QueryError, Scope};

/// Tracks how many simulated GETs are in flight at once, and the highest
/// concurrency level ever observed.
pub struct InstanceService {
    pub ids: Vec<String>,
    pub current: AtomicUsize,
    pub high_water: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub delay: Duration,
}

impl InstanceService {
    pub fn new(ids: Vec<String>, delay: Duration) -> Self {
        Self {
            ids,
            current: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            delay,
        }
    }
}

fn metadata() -> AdapterMetadata {
    AdapterMetadata {
        item_type: "instance".to_string(),
        descriptive_name: "Instance".to_string(),
        category: "compute".to_string(),
        supported_query_methods: SupportedQueryMethods {
            get: QueryMethodSupport::supported("by id"),
            list: QueryMethodSupport::supported("every instance"),
            search: QueryMethodSupport::unsupported(),
        },
        potential_links: vec![],
        terraform_mappings: vec![],
    }
}

pub fn build(client: Arc<InstanceService>, account_id: &str, region: &str, max_parallel: usize) -> AlwaysGet<InstanceService, (), Vec<String>, String, String> {
    let input_mapper_list: InputMapperList<()> = Arc::new(|_scope| ());

    let list_paginator_builder: ListPaginatorBuilder<InstanceService, (), Vec<String>> =
        Arc::new(|client, _input| Box::new(FixedPaginator::new(vec![client.ids.clone()])));

    let list_func_output_mapper: ListFuncOutputMapper<Vec<String>, String> = Arc::new(|page| page);

    let get_input_mapper: GetInputMapper<String> = Arc::new(|_scope, query| Ok(query));

    let get_fn: GetFn<InstanceService, String, String> = Arc::new(|_cancellation, client, id| {
        Box::pin(async move {
            client.get_calls.fetch_add(1, Ordering::SeqCst);
            let in_flight = client.current.fetch_add(1, Ordering::SeqCst) + 1;
            client.high_water.fetch_max(in_flight, Ordering::SeqCst);
            tokio::time::sleep(client.delay).await;
            client.current.fetch_sub(1, Ordering::SeqCst);
            Ok(id)
        })
    });

    let item_mapper: ItemMapper<String> = Arc::new(|scope, raw| Ok(Item::new("instance", "id", scope).with_attribute("id", raw)));

    AlwaysGet::new("instance", account_id, region, client, metadata())
        .with_input_mapper_list(input_mapper_list)
        .with_list_paginator_builder(list_paginator_builder)
        .with_list_func_output_mapper(list_func_output_mapper)
        .with_get_input_mapper(get_input_mapper)
        .with_get_fn(get_fn)
        .with_item_mapper(item_mapper)
        .with_max_parallel(max_parallel)
}

/// Every discovered id resolves to a GET failure, modelling ids that were
/// genuinely listed but whose individual describe calls are all broken.
pub fn build_always_failing_get(client: Arc<InstanceService>, account_id: &str, region: &str) -> AlwaysGet<InstanceService, (), Vec<String>, String, String> {
    let input_mapper_list: InputMapperList<()> = Arc::new(|_scope| ());

    let list_paginator_builder: ListPaginatorBuilder<InstanceService, (), Vec<String>> =
        Arc::new(|client, _input| Box::new(FixedPaginator::new(vec![client.ids.clone()])));

    let list_func_output_mapper: ListFuncOutputMapper<Vec<String>, String> = Arc::new(|page| page);

    let get_input_mapper: GetInputMapper<String> = Arc::new(|_scope, query| Ok(query));

    let get_fn: GetFn<InstanceService, String, String> = Arc::new(|_cancellation, client, id| {
        Box::pin(async move {
            client.get_calls.fetch_add(1, Ordering::SeqCst);
            Err(QueryError::other(Scope::global(), format!("describe failed for {id}")))
        })
    });

    let item_mapper: ItemMapper<String> = Arc::new(|scope, raw| Ok(Item::new("instance", "id", scope).with_attribute("id", raw)));

    AlwaysGet::new("instance", account_id, region, client, metadata())
        .with_input_mapper_list(input_mapper_list)
        .with_list_paginator_builder(list_paginator_builder)
        .with_list_func_output_mapper(list_func_output_mapper)
        .with_get_input_mapper(get_input_mapper)
        .with_get_fn(get_fn)
        .with_item_mapper(item_mapper)
}
