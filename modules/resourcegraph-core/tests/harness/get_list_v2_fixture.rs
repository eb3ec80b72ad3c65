//! A fake "volume service" exercised through the `GetListV2` kernel shape:
//! a single-call LIST whose page is extracted into raw records, with a
//! per-record tag fetch that can fail without poisoning the item.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::collections::BTreeMap;

use resourcegraph_core::kernel::get_list::{GetFn, ItemMapper};
use resourcegraph_core::kernel::get_list_v2::{GetListV2, InputMapperList, ListExtractor, ListFn, ListTagsFn};
use resourcegraph_core::metadata::{QueryMethodSupport, SupportedQueryMethods};
use resourcegraph_core::{AdapterMetadata, Item, QueryError};

#[derive(Clone)]
pub struct VolumeRecord {
    pub id: String,
}

pub struct VolumeService {
    pub ids: Vec<String>,
    pub list_calls: AtomicUsize,
    /// Ids whose tag fetch should fail, to exercise the "tagless, not an error" path.
    pub tagless_ids: Vec<String>,
}

impl VolumeService {
    pub fn new(ids: Vec<String>, tagless_ids: Vec<String>) -> Self {
        Self {
            ids,
            list_calls: AtomicUsize::new(0),
            tagless_ids,
        }
    }
}

fn metadata() -> AdapterMetadata {
    AdapterMetadata {
        item_type: "volume".to_string(),
        descriptive_name: "Volume".to_string(),
        category: "storage".to_string(),
        supported_query_methods: SupportedQueryMethods {
            get: QueryMethodSupport::supported("by id"),
            list: QueryMethodSupport::supported("every volume"),
            search: QueryMethodSupport::unsupported(),
        },
        potential_links: vec![],
        terraform_mappings: vec![],
    }
}

pub fn build(client: Arc<VolumeService>, account_id: &str, region: &str) -> GetListV2<VolumeService, (), Vec<String>, VolumeRecord> {
    let input_mapper_list: InputMapperList<()> = Arc::new(|_scope| ());

    let list_fn: ListFn<VolumeService, (), Vec<String>> = Arc::new(|_cancellation, client, _input| {
        Box::pin(async move {
            client.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(client.ids.clone())
        })
    });

    let list_extractor: ListExtractor<VolumeService, Vec<String>, VolumeRecord> =
        Arc::new(|_cancellation, page, _client| Box::pin(async move { Ok(page.into_iter().map(|id| VolumeRecord { id }).collect()) }));

    let get_fn: GetFn<VolumeService, VolumeRecord> =
        Arc::new(|_cancellation, _client, _scope, query| Box::pin(async move { Ok(VolumeRecord { id: query }) }));

    let item_mapper: ItemMapper<VolumeRecord> = Arc::new(|_query, scope, raw| Ok(Item::new("volume", "id", scope).with_attribute("id", raw.id)));

    let list_tags_fn: ListTagsFn<VolumeService, VolumeRecord> = Arc::new(|_cancellation, raw, client| {
        Box::pin(async move {
            if client.tagless_ids.contains(&raw.id) {
                Err(QueryError::other(resourcegraph_core::Scope::global(), format!("tag fetch failed for {}", raw.id)))
            } else {
                let mut tags = BTreeMap::new();
                tags.insert("volume-id".to_string(), raw.id);
                Ok(tags)
            }
        })
    });

    GetListV2::new("volume", account_id, region, client, metadata())
        .with_input_mapper_list(input_mapper_list)
        .with_list_fn(list_fn)
        .with_list_extractor(list_extractor)
        .with_get_fn(get_fn)
        .with_item_mapper(item_mapper)
        .with_list_tags_fn(list_tags_fn)
}

/// Its `itemMapper` fails unconditionally, modelling a broken per-item
/// mapper running against a backend that genuinely has raw records.
pub fn build_always_failing_mapper(client: Arc<VolumeService>, account_id: &str, region: &str) -> GetListV2<VolumeService, (), Vec<String>, VolumeRecord> {
    let input_mapper_list: InputMapperList<()> = Arc::new(|_scope| ());

    let list_fn: ListFn<VolumeService, (), Vec<String>> = Arc::new(|_cancellation, client, _input| {
        Box::pin(async move {
            client.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(client.ids.clone())
        })
    });

    let list_extractor: ListExtractor<VolumeService, Vec<String>, VolumeRecord> =
        Arc::new(|_cancellation, page, _client| Box::pin(async move { Ok(page.into_iter().map(|id| VolumeRecord { id }).collect()) }));

    let get_fn: GetFn<VolumeService, VolumeRecord> =
        Arc::new(|_cancellation, _client, _scope, query| Box::pin(async move { Ok(VolumeRecord { id: query }) }));

    let item_mapper: ItemMapper<VolumeRecord> =
        Arc::new(|_query, scope, raw| Err(QueryError::other(scope, format!("cannot map raw volume {}", raw.id))));

    GetListV2::new("volume", account_id, region, client, metadata())
        .with_input_mapper_list(input_mapper_list)
        .with_list_fn(list_fn)
        .with_list_extractor(list_extractor)
        .with_get_fn(get_fn)
        .with_item_mapper(item_mapper)
}
