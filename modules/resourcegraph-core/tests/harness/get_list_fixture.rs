//! A fake "widget service" exercised through the `GetList` kernel shape,
//! used to exercise the negative-cache safety rule around a mapper that
//! fails on every raw item a LIST call returns.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use resourcegraph_core::kernel::get_list::{GetFn, GetList, ItemMapper, ListFn};
use resourcegraph_core::metadata::{QueryMethodSupport, SupportedQueryMethods};
use resourcegraph_core::{AdapterMetadata, Item, QueryError};

pub struct WidgetService {
    pub raw_items: Vec<String>,
    pub list_calls: AtomicUsize,
}

impl WidgetService {
    pub fn new(raw_items: Vec<String>) -> Self {
        Self {
            raw_items,
            list_calls: AtomicUsize::new(0),
        }
    }
}

fn metadata() -> AdapterMetadata {
    AdapterMetadata {
        item_type: "widget".to_string(),
        descriptive_name: "Widget".to_string(),
        category: "misc".to_string(),
        supported_query_methods: SupportedQueryMethods {
            get: QueryMethodSupport::supported("by id"),
            list: QueryMethodSupport::supported("every widget"),
            search: QueryMethodSupport::unsupported(),
        },
        potential_links: vec![],
        terraform_mappings: vec![],
    }
}

/// Its `itemMapper` fails unconditionally, modelling a broken per-item
/// mapper running against a backend that genuinely has items.
pub fn build_always_failing_mapper(client: Arc<WidgetService>, account_id: &str, region: &str) -> GetList<WidgetService, String> {
    let get_fn: GetFn<WidgetService, String> = Arc::new(|_cancellation, _client, _scope, query| Box::pin(async move { Ok(query) }));

    let list_fn: ListFn<WidgetService, String> = Arc::new(|_cancellation, client, _scope| {
        Box::pin(async move {
            client.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(client.raw_items.clone())
        })
    });

    let item_mapper: ItemMapper<String> =
        Arc::new(|_query, scope, raw| Err(QueryError::other(scope, format!("cannot map raw widget {raw:?}"))));

    GetList::new("widget", account_id, region, client, metadata())
        .with_get_fn(get_fn)
        .with_list_fn(list_fn)
        .with_item_mapper(item_mapper)
}

/// A well-behaved variant: `itemMapper` succeeds, used as a control case.
pub fn build_working(client: Arc<WidgetService>, account_id: &str, region: &str) -> GetList<WidgetService, String> {
    let get_fn: GetFn<WidgetService, String> = Arc::new(|_cancellation, _client, _scope, query| Box::pin(async move { Ok(query) }));

    let list_fn: ListFn<WidgetService, String> = Arc::new(|_cancellation, client, _scope| {
        Box::pin(async move {
            client.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(client.raw_items.clone())
        })
    });

    let item_mapper: ItemMapper<String> = Arc::new(|_query, scope, raw| Ok(Item::new("widget", "id", scope).with_attribute("id", raw)));

    GetList::new("widget", account_id, region, client, metadata())
        .with_get_fn(get_fn)
        .with_list_fn(list_fn)
        .with_item_mapper(item_mapper)
}
