//! A fake in-memory "person service" exercised through the `DescribeOnly`
//! kernel shape, standing in for a resource-kind adapter under test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use resourcegraph_core::health::tags_to_map;
use resourcegraph_core::kernel::describe_only::{DescribeFn, DescribeOnly, InputMapperGet, InputMapperList, OutputMapper, PaginatorBuilder};
use resourcegraph_core::metadata::{QueryMethodSupport, SupportedQueryMethods};
use resourcegraph_core::paginator::FixedPaginator;
use resourcegraph_core::{AdapterMetadata, AttributeValue, Item};

#[derive(Clone)]
pub struct PersonRecord {
    pub id: String,
    pub tags: Vec<(String, String)>,
}

impl PersonRecord {
    pub fn new(id: impl Into<String>, tags: Vec<(&str, &str)>) -> Self {
        Self {
            id: id.into(),
            tags: tags.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }
}

#[derive(Clone)]
pub struct StampedRecord {
    record: PersonRecord,
    stamp: usize,
}

/// The fake backend. `describe_calls` counts every invocation of the
/// `DescribeFn`, letting tests assert the cache actually short-circuits it.
pub struct PersonService {
    records: Vec<PersonRecord>,
    pub describe_calls: AtomicUsize,
}

impl PersonService {
    pub fn new(records: Vec<PersonRecord>) -> Self {
        Self {
            records,
            describe_calls: AtomicUsize::new(0),
        }
    }
}

#[derive(Clone)]
pub enum DescribeInput {
    Get(String),
    List,
}

pub type PersonAdapter = DescribeOnly<PersonService, DescribeInput, Vec<StampedRecord>>;

fn metadata() -> AdapterMetadata {
    AdapterMetadata {
        item_type: "person".to_string(),
        descriptive_name: "Person".to_string(),
        category: "identity".to_string(),
        supported_query_methods: SupportedQueryMethods {
            get: QueryMethodSupport::supported("by id"),
            list: QueryMethodSupport::supported("every known person"),
            search: QueryMethodSupport::unsupported(),
        },
        potential_links: vec![],
        terraform_mappings: vec![],
    }
}

fn output_mapper() -> OutputMapper<PersonService, DescribeInput, Vec<StampedRecord>> {
    Arc::new(|_cancellation, _client, scope, _input, output| {
        Box::pin(async move {
            Ok(output
                .into_iter()
                .map(|stamped| {
                    Item::new("person", "id", scope.clone())
                        .with_attribute("id", stamped.record.id.clone())
                        .with_attribute("stamp", AttributeValue::Number(stamped.stamp as f64))
                        .with_tags(tags_to_map(stamped.record.tags.clone()))
                })
                .collect())
        })
    })
}

fn input_mapper_get() -> InputMapperGet<DescribeInput> {
    Arc::new(|_scope, query| Ok(DescribeInput::Get(query)))
}

fn input_mapper_list() -> InputMapperList<DescribeInput> {
    Arc::new(|_scope| DescribeInput::List)
}

/// A single-call (unpaginated) adapter: `describeFn` looks the query up
/// directly in the in-memory record list.
pub fn build(client: Arc<PersonService>, account_id: &str, region: &str) -> PersonAdapter {
    let describe_fn: DescribeFn<PersonService, DescribeInput, Vec<StampedRecord>> = Arc::new(|_cancellation, client, input| {
        Box::pin(async move {
            let stamp = client.describe_calls.fetch_add(1, Ordering::SeqCst) + 1;
            let matched = match input {
                DescribeInput::Get(id) => client.records.iter().filter(|r| r.id == id).cloned().collect::<Vec<_>>(),
                DescribeInput::List => client.records.clone(),
            };
            Ok(matched.into_iter().map(|record| StampedRecord { record, stamp }).collect())
        })
    });

    DescribeOnly::new("person", account_id, region, client, metadata())
        .with_describe_fn(describe_fn)
        .with_input_mapper_get(input_mapper_get())
        .with_input_mapper_list(input_mapper_list())
        .with_output_mapper(output_mapper())
}

/// A paginated-LIST variant: `describeFn` is still wired (required by
/// `validate`) but unused for LIST, since `paginatorBuilder` takes priority.
pub fn build_paginated(client: Arc<PersonService>, account_id: &str, region: &str, page_size: usize) -> PersonAdapter {
    let describe_fn: DescribeFn<PersonService, DescribeInput, Vec<StampedRecord>> =
        Arc::new(|_cancellation, _client, _input| Box::pin(async { Ok(Vec::new()) }));

    let paginator_builder: PaginatorBuilder<PersonService, DescribeInput, Vec<StampedRecord>> = Arc::new(move |client, _input| {
        let pages: Vec<Vec<StampedRecord>> = client
            .records
            .chunks(page_size)
            .enumerate()
            .map(|(page_no, chunk)| chunk.iter().cloned().map(|record| StampedRecord { record, stamp: page_no }).collect())
            .collect();
        Box::new(FixedPaginator::new(pages))
    });

    DescribeOnly::new("person", account_id, region, client, metadata())
        .with_describe_fn(describe_fn)
        .with_input_mapper_get(input_mapper_get())
        .with_input_mapper_list(input_mapper_list())
        .with_paginator_builder(paginator_builder)
        .with_output_mapper(output_mapper())
}

/// `useListForGet` is set without ever configuring `inputMapperList` -- an
/// invalid wiring `validate()` must reject up front, before `get()` ever
/// reserves a cache slot for the query.
pub fn build_use_list_for_get_misconfigured(client: Arc<PersonService>, account_id: &str, region: &str) -> PersonAdapter {
    let describe_fn: DescribeFn<PersonService, DescribeInput, Vec<StampedRecord>> = Arc::new(|_cancellation, client, input| {
        Box::pin(async move {
            let stamp = client.describe_calls.fetch_add(1, Ordering::SeqCst) + 1;
            let matched = match input {
                DescribeInput::Get(id) => client.records.iter().filter(|r| r.id == id).cloned().collect::<Vec<_>>(),
                DescribeInput::List => client.records.clone(),
            };
            Ok(matched.into_iter().map(|record| StampedRecord { record, stamp }).collect())
        })
    });

    DescribeOnly::new("person", account_id, region, client, metadata())
        .with_describe_fn(describe_fn)
        .with_input_mapper_get(input_mapper_get())
        .with_output_mapper(output_mapper())
        .with_use_list_for_get(true)
}
