//! Kernel shape C: a generalisation of `GetList` for adapters whose LIST
//! surfaces are paginated with a two-stage `(list -> extract)` shape (the
//! AWS "list ids, then describe them" pattern), with an optional tag fetch
//! (spec.md §4.7).

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::cache::{CacheKey, ItemCache, LookupOutcome};
use crate::error::QueryError;
use crate::item::{Item, QueryMethod};
use crate::kernel::common::{self, DEFAULT_CACHE_DURATION};
use crate::kernel::get_list::{GetFn, ItemMapper, SearchFn};
use crate::metadata::AdapterMetadata;
use crate::paginator::Paginator;
use crate::scope::Scope;
use crate::stream::QueryResultStream;

pub type InputMapperList<LI> = Arc<dyn Fn(Scope) -> LI + Send + Sync>;
pub type ListFn<C, LI, LO> =
    Arc<dyn Fn(CancellationToken, Arc<C>, LI) -> BoxFuture<'static, Result<LO, QueryError>> + Send + Sync>;
pub type ListPaginatorBuilder<C, LI, LO> = Arc<dyn Fn(Arc<C>, LI) -> Box<dyn Paginator<Page = LO>> + Send + Sync>;
pub type ListExtractor<C, LO, R> =
    Arc<dyn Fn(CancellationToken, LO, Arc<C>) -> BoxFuture<'static, Result<Vec<R>, QueryError>> + Send + Sync>;
pub type ListTagsFn<C, R> =
    Arc<dyn Fn(CancellationToken, R, Arc<C>) -> BoxFuture<'static, Result<BTreeMap<String, String>, QueryError>> + Send + Sync>;

pub struct GetListV2<C, LI, LO, R> {
    pub item_type: String,
    pub account_id: String,
    pub region: String,
    pub client: Arc<C>,
    pub metadata: AdapterMetadata,
    pub cache: Arc<ItemCache>,
    pub cache_duration: Duration,
    pub weight: i32,
    pub disable_list: bool,

    pub get_fn: Option<GetFn<C, R>>,
    pub search_fn: Option<SearchFn<C, R>>,
    pub item_mapper: Option<ItemMapper<R>>,
    pub list_tags_fn: Option<ListTagsFn<C, R>>,

    pub input_mapper_list: Option<InputMapperList<LI>>,
    pub list_fn: Option<ListFn<C, LI, LO>>,
    pub list_paginator_builder: Option<ListPaginatorBuilder<C, LI, LO>>,
    pub list_extractor: Option<ListExtractor<C, LO, R>>,
}

impl<C, LI, LO, R> GetListV2<C, LI, LO, R>
where
    C: Send + Sync + 'static,
    LI: Clone + Send + Sync + 'static,
    LO: Send + 'static,
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
            search_fn: None,
            item_mapper: None,
            list_tags_fn: None,
            input_mapper_list: None,
            list_fn: None,
            list_paginator_builder: None,
            list_extractor: None,
        }
    }

    pub fn with_get_fn(mut self, f: GetFn<C, R>) -> Self {
        self.get_fn = Some(f);
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

    pub fn with_list_tags_fn(mut self, f: ListTagsFn<C, R>) -> Self {
        self.list_tags_fn = Some(f);
        self
    }

    pub fn with_input_mapper_list(mut self, f: InputMapperList<LI>) -> Self {
        self.input_mapper_list = Some(f);
        self
    }

    pub fn with_list_fn(mut self, f: ListFn<C, LI, LO>) -> Self {
        self.list_fn = Some(f);
        self
    }

    pub fn with_list_paginator_builder(mut self, f: ListPaginatorBuilder<C, LI, LO>) -> Self {
        self.list_paginator_builder = Some(f);
        self
    }

    pub fn with_list_extractor(mut self, f: ListExtractor<C, LO, R>) -> Self {
        self.list_extractor = Some(f);
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

    async fn map_one(&self, cancellation: &CancellationToken, query: Option<&str>, scope: &Scope, raw: R) -> Option<Item> {
        let item_mapper = self.item_mapper.as_ref().expect("validated");
        let mut item = match item_mapper(query.map(str::to_string), scope.clone(), raw.clone()) {
            Ok(item) => item,
            Err(_) => return None,
        };
        if let Some(list_tags_fn) = &self.list_tags_fn {
            match list_tags_fn(cancellation.clone(), raw, Arc::clone(&self.client)).await {
                Ok(tags) => item = item.with_tags(tags),
                Err(err) => {
                    warn!(item_type = %self.item_type, error = %err, "listTagsFn failed, leaving item tagless");
                }
            }
        }
        Some(item)
    }

    /// Runs the list -> extract -> map pipeline for one already-fetched page
    /// (or the single non-paginated call), updating the cache/stream and the
    /// running raw-item/mapped-item counters used by the negative-cache rule.
    /// On `Err`, the pending slot at `key` has NOT been released -- the
    /// caller (which knows whether earlier pages already stored items under
    /// this key) is responsible for releasing it.
    async fn process_page(&self, cancellation: &CancellationToken, scope: &Scope, key: &CacheKey, page: LO, stream: &Arc<dyn QueryResultStream>, raw_seen: &mut usize, mapped_seen: &mut usize) -> Result<(), ()> {
        let extractor = self.list_extractor.as_ref().expect("validated");
        let raws = match extractor(cancellation.clone(), page, Arc::clone(&self.client)).await {
            Ok(raws) => raws,
            Err(err) => {
                // Extraction failure: items presumably exist, don't poison the cache.
                stream.send_error(err).await;
                return Err(());
            }
        };
        *raw_seen += raws.len();
        for raw in raws {
            if let Some(item) = self.map_one(cancellation, None, scope, raw).await {
                *mapped_seen += 1;
                self.cache.store_item(key, item.clone(), self.cache_duration).await;
                stream.send_item(item).await;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<C, LI, LO, R> Adapter for GetListV2<C, LI, LO, R>
where
    C: Send + Sync + 'static,
    LI: Clone + Send + Sync + 'static,
    LO: Send + 'static,
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
        if !self.disable_list {
            if self.input_mapper_list.is_some()
                && self.list_fn.is_some() == self.list_paginator_builder.is_some()
            {
                return Err(QueryError::other(
                    scope,
                    "exactly one of listFn or listFnPaginatorBuilder must be configured",
                ));
            }
            if self.input_mapper_list.is_some() && self.list_extractor.is_none() {
                return Err(QueryError::other(scope, "listExtractor is not configured"));
            }
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

        match self.map_one(cancellation, Some(query), scope, raw).await {
            Some(item) => {
                self.cache.store_item(&key, item.clone(), self.cache_duration).await;
                Ok(item)
            }
            None => {
                let err = QueryError::not_found(scope.clone(), format!("{} {} not found", self.item_type, query));
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

        let Some(input_mapper_list) = &self.input_mapper_list else {
            stream
                .send_error(QueryError::not_found(adapter_scope, format!("list not supported for {}", self.item_type)))
                .await;
            return;
        };
        if self.disable_list {
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

        let list_input = input_mapper_list(scope.clone());
        let mut raw_seen = 0usize;
        let mut mapped_seen = 0usize;

        if let Some(builder) = &self.list_paginator_builder {
            let mut paginator = builder(Arc::clone(&self.client), list_input);
            while paginator.has_more_pages() {
                if cancellation.is_cancelled() {
                    self.cache.release(&key).await;
                    return;
                }
                match paginator.next_page(cancellation).await {
                    Ok(page) => {
                        if self.process_page(cancellation, scope, &key, page, &stream, &mut raw_seen, &mut mapped_seen).await.is_err() {
                            self.cache.release(&key).await;
                            return;
                        }
                    }
                    Err(err) => {
                        self.cache.release(&key).await;
                        stream.send_error(err).await;
                        return;
                    }
                }
            }
        } else {
            let list_fn = self.list_fn.as_ref().unwrap();
            match list_fn(cancellation.clone(), Arc::clone(&self.client), list_input).await {
                Ok(page) => {
                    if self.process_page(cancellation, scope, &key, page, &stream, &mut raw_seen, &mut mapped_seen).await.is_err() {
                        self.cache.release(&key).await;
                        return;
                    }
                }
                Err(err) => {
                    self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                    stream.send_error(err).await;
                    return;
                }
            }
        }

        debug!(item_type = %self.item_type, raw_seen, mapped_seen, "list -> extract pipeline complete");
        if raw_seen == 0 {
            self.cache
                .store_error(&key, QueryError::not_found(adapter_scope, format!("{} not found", self.item_type)), self.cache_duration)
                .await;
        } else if mapped_seen == 0 {
            // Raws existed but every one failed to map: don't poison the cache
            // with NOT_FOUND, but the pending slot still needs releasing.
            self.cache.release(&key).await;
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

        let raws = match search_fn(cancellation.clone(), Arc::clone(&self.client), scope.clone(), query.to_string()).await {
            Ok(raws) => raws,
            Err(err) => {
                common::cache_and_send_error(&self.cache, &key, err, self.cache_duration, &stream).await;
                return;
            }
        };

        if raws.is_empty() {
            self.cache.store_error(&key, QueryError::not_found(scope.clone(), format!("{} not found", self.item_type)), self.cache_duration).await;
            return;
        }
        let mut mapped_any = false;
        for raw in raws {
            if let Some(item) = self.map_one(cancellation, Some(query), scope, raw).await {
                mapped_any = true;
                self.cache.store_item(&key, item.clone(), self.cache_duration).await;
                stream.send_item(item).await;
            }
        }
        if !mapped_any {
            self.cache.release(&key).await;
        }
    }
}
