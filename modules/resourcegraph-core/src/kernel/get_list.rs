//! Kernel shape B: resource families where GET and LIST have separate SDK
//! calls, and SEARCH is (optionally) a third, often keyed by parent
//! resource id or ARN (spec.md §4.6).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::Adapter;
use crate::cache::{CacheKey, ItemCache, LookupOutcome};
use crate::error::QueryError;
use crate::item::{Item, QueryMethod};
use crate::kernel::common::{self, DEFAULT_CACHE_DURATION};
use crate::metadata::AdapterMetadata;
use crate::scope::Scope;
use crate::stream::QueryResultStream;

pub type GetFn<C, R> =
    Arc<dyn Fn(CancellationToken, Arc<C>, Scope, String) -> BoxFuture<'static, Result<R, QueryError>> + Send + Sync>;
pub type ListFn<C, R> =
    Arc<dyn Fn(CancellationToken, Arc<C>, Scope) -> BoxFuture<'static, Result<Vec<R>, QueryError>> + Send + Sync>;
pub type SearchFn<C, R> =
    Arc<dyn Fn(CancellationToken, Arc<C>, Scope, String) -> BoxFuture<'static, Result<Vec<R>, QueryError>> + Send + Sync>;
/// `(query, scope, rawItem) -> Item`. `query` is `None` for LIST.
pub type ItemMapper<R> = Arc<dyn Fn(Option<String>, Scope, R) -> Result<Item, QueryError> + Send + Sync>;

pub struct GetList<C, R> {
    pub item_type: String,
    pub account_id: String,
    pub region: String,
    pub client: Arc<C>,
    pub metadata: AdapterMetadata,
    pub cache: Arc<ItemCache>,
    pub cache_duration: Duration,
    pub weight: i32,
    /// Forces LIST to fail even when `list_fn` is set (used when listing is
    /// meaningless for a type).
    pub disable_list: bool,

    pub get_fn: Option<GetFn<C, R>>,
    pub list_fn: Option<ListFn<C, R>>,
    pub search_fn: Option<SearchFn<C, R>>,
    pub item_mapper: Option<ItemMapper<R>>,
}

impl<C, R> GetList<C, R>
where
    C: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    pub fn new(item_type: impl Into<String>, account_id: impl Into<String>, region: impl Into<String>, client: Arc<C>, metadata: AdapterMetadata) -> Self {
        Self {
            item_type: item_type.into(),
            account_id: account_id.into(),
            region: region.into(),
            client,
            metadata,
            cache: Arc::new(ItemCache::new()),
            cache_duration: DEFAULT_CACHE_DURATION,
            weight: crate::adapter::DEFAULT_WEIGHT,
            disable_list: false,
            get_fn: None,
            list_fn: None,
            search_fn: None,
            item_mapper: None,
        }
    }

    pub fn with_get_fn(mut self, f: GetFn<C, R>) -> Self {
        self.get_fn = Some(f);
        self
    }

    pub fn with_list_fn(mut self, f: ListFn<C, R>) -> Self {
        self.list_fn = Some(f);
        self
    }

    pub fn with_search_fn(mut self, f: SearchFn<C, R>) -> Self {
        self.search_fn = Some(f);
        self
    }

    pub fn with_item_mapper(mut self, f: ItemMapper<R>) -> Self {
        self.item_mapper = Some(f);
        self
    }

    pub fn with_disable_list(mut self, disabled: bool) -> Self {
        self.disable_list = disabled;
        self
    }

    pub fn with_cache_duration(mut self, ttl: Duration) -> Self {
        self.cache_duration = ttl;
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    fn adapter_scope(&self) -> Scope {
        Scope::format(&self.account_id, &self.region)
    }

    fn key(&self, method: QueryMethod, query: Option<&str>) -> CacheKey {
        CacheKey::new(Adapter::name(self), method, self.adapter_scope(), self.item_type.clone(), query.map(str::to_string))
    }

    /// Maps a batch of raw items, silently dropping ones that fail. Applies
    /// the negative-cache safety rule from spec.md §4.6/§4.2: a batch that
    /// came back non-empty but whose every item failed to map must NOT be
    /// cached as `NOT_FOUND` (the items likely exist, the mapper is broken).
    async fn map_and_store(&self, key: &CacheKey, query: Option<&str>, raws: Vec<R>, stream: &Arc<dyn QueryResultStream>) {
        let scope = self.adapter_scope();
        let item_mapper = self.item_mapper.as_ref().expect("validated");
        let raw_count = raws.len();

        if raw_count == 0 {
            self.cache
                .store_error(key, QueryError::not_found(scope, format!("{} not found", self.item_type)), self.cache_duration)
                .await;
            return;
        }

        let mut mapped_any = false;
        for raw in raws {
            match item_mapper(query.map(str::to_string), scope.clone(), raw) {
                Ok(item) => {
                    mapped_any = true;
                    self.cache.store_item(key, item.clone(), self.cache_duration).await;
                    stream.send_item(item).await;
                }
                Err(_) => {
                    // Per-item mapping failures are dropped silently (spec.md §7) --
                    // they don't mark the whole key NOT_FOUND and aren't surfaced.
                }
            }
        }
        // raw_count > 0 and mapped_any == false: zero mapped but raws existed.
        // Leave the key unpopulated entirely -- no store, to avoid poisoning
        // (spec.md §4.6 "LIST mapping loop policy") -- but the `Pending` slot
        // `lookup` reserved must still be released, or the next lookup hangs.
        if !mapped_any {
            self.cache.release(key).await;
        }
    }
}

#[async_trait]
impl<C, R> Adapter for GetList<C, R>
where
    C: Send + Sync + 'static,
    R: Clone + Send + Sync + 'static,
{
    fn item_type(&self) -> &str {
        &self.item_type
    }

    fn scopes(&self) -> Vec<Scope> {
        vec![self.adapter_scope()]
    }

    fn metadata(&self) -> AdapterMetadata {
        self.metadata.clone()
    }

    fn weight(&self) -> i32 {
        self.weight
    }

    fn validate(&self) -> Result<(), QueryError> {
        let scope = self.adapter_scope();
        if self.get_fn.is_none() {
            return Err(QueryError::other(scope, "getFn is not configured"));
        }
        if self.item_mapper.is_none() {
            return Err(QueryError::other(scope, "itemMapper is not configured"));
        }
        Ok(())
    }

    async fn get(&self, cancellation: &CancellationToken, scope: &Scope, query: &str, ignore_cache: bool) -> Result<Item, QueryError> {
        let adapter_scope = self.adapter_scope();
        common::check_scope(&adapter_scope, scope)?;
        self.validate()?;

        let key = self.key(QueryMethod::Get, Some(query));
        match self.cache.lookup(&key, ignore_cache).await {
            LookupOutcome::Items(mut items) => {
                if let Some(item) = items.pop() {
                    return Ok(item);
                }
            }
            LookupOutcome::Error(err) => return Err(err),
            LookupOutcome::Miss => {}
        }

        let raw = match (self.get_fn.as_ref().unwrap())(cancellation.clone(), Arc::clone(&self.client), scope.clone(), query.to_string()).await {
            Ok(raw) => raw,
            Err(err) => {
                self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                return Err(err);
            }
        };

        match (self.item_mapper.as_ref().unwrap())(Some(query.to_string()), scope.clone(), raw) {
            Ok(item) => {
                self.cache.store_item(&key, item.clone(), self.cache_duration).await;
                Ok(item)
            }
            Err(err) => {
                self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                Err(err)
            }
        }
    }

    async fn list_stream(&self, cancellation: &CancellationToken, scope: &Scope, ignore_cache: bool, stream: Arc<dyn QueryResultStream>) {
        let adapter_scope = self.adapter_scope();
        if let Err(err) = common::check_scope(&adapter_scope, scope) {
            stream.send_error(err).await;
            return;
        }
        if let Err(err) = self.validate() {
            stream.send_error(err).await;
            return;
        }

        if self.disable_list || self.list_fn.is_none() {
            stream
                .send_error(QueryError::not_found(adapter_scope, format!("list not supported for {}", self.item_type)))
                .await;
            return;
        }

        let key = self.key(QueryMethod::List, None);
        match self.cache.lookup(&key, ignore_cache).await {
            LookupOutcome::Items(items) => {
                for item in items {
                    stream.send_item(item).await;
                }
                return;
            }
            LookupOutcome::Error(err) => {
                stream.send_error(err).await;
                return;
            }
            LookupOutcome::Miss => {}
        }

        debug!(item_type = %self.item_type, %scope, "listFn SDK call");
        let list_fn = self.list_fn.as_ref().unwrap();
        match list_fn(cancellation.clone(), Arc::clone(&self.client), scope.clone()).await {
            Ok(raws) => self.map_and_store(&key, None, raws, &stream).await,
            Err(err) => common::cache_and_send_error(&self.cache, &key, err, self.cache_duration, &stream).await,
        }
    }

    async fn search_stream(&self, cancellation: &CancellationToken, scope: &Scope, query: &str, ignore_cache: bool, stream: Arc<dyn QueryResultStream>) {
        let adapter_scope = self.adapter_scope();
        if let Err(err) = common::check_scope(&adapter_scope, scope) {
            stream.send_error(err).await;
            return;
        }
        if let Err(err) = self.validate() {
            stream.send_error(err).await;
            return;
        }

        // A query that parses as an ARN is always resolved via GET, even
        // when a custom search_fn exists (spec.md §4.6).
        if let Some(result) = common::try_parse_arn_search(&Adapter::name(self), &adapter_scope, query) {
            match result {
                Ok(resource_id) => match self.get(cancellation, scope, &resource_id, ignore_cache).await {
                    Ok(item) => stream.send_item(item).await,
                    Err(err) => stream.send_error(err).await,
                },
                Err(err) => stream.send_error(err).await,
            }
            return;
        }

        let Some(search_fn) = &self.search_fn else {
            stream
                .send_error(QueryError::not_found(adapter_scope, format!("search not supported for {} (expected an ARN)", self.item_type)))
                .await;
            return;
        };

        let key = self.key(QueryMethod::Search, Some(query));
        match self.cache.lookup(&key, ignore_cache).await {
            LookupOutcome::Items(items) => {
                for item in items {
                    stream.send_item(item).await;
                }
                return;
            }
            LookupOutcome::Error(err) => {
                stream.send_error(err).await;
                return;
            }
            LookupOutcome::Miss => {}
        }

        match search_fn(cancellation.clone(), Arc::clone(&self.client), scope.clone(), query.to_string()).await {
            Ok(raws) => self.map_and_store(&key, Some(query), raws, &stream).await,
            Err(err) => common::cache_and_send_error(&self.cache, &key, err, self.cache_duration, &stream).await,
        }
    }
}
