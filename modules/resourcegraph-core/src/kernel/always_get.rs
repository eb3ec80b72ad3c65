//! Kernel shape D: resource families where LIST is implemented by "list ids
//! then GET each" because no bulk describe exists (spec.md §4.8).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapter::Adapter;
use crate::cache::{CacheKey, ItemCache, LookupOutcome};
use crate::error::QueryError;
use crate::item::{Item, QueryMethod};
use crate::kernel::common::{self, DEFAULT_CACHE_DURATION};
use crate::metadata::AdapterMetadata;
use crate::paginator::Paginator;
use crate::scope::Scope;
use crate::stream::QueryResultStream;

/// Bounds the concurrency of per-id GETs issued while servicing LIST.
pub const DEFAULT_MAX_PARALLEL: usize = 10;

pub type InputMapperList<LI> = Arc<dyn Fn(Scope) -> LI + Send + Sync>;
pub type ListPaginatorBuilder<C, LI, LO> = Arc<dyn Fn(Arc<C>, LI) -> Box<dyn Paginator<Page = LO>> + Send + Sync>;
/// Maps one page of ids to the per-id GET inputs the kernel will fan out over.
pub type ListFuncOutputMapper<LO, GI> = Arc<dyn Fn(LO) -> Vec<GI> + Send + Sync>;
pub type GetInputMapper<GI> = Arc<dyn Fn(Scope, String) -> Result<GI, QueryError> + Send + Sync>;
pub type GetFn<C, GI, R> =
    Arc<dyn Fn(CancellationToken, Arc<C>, GI) -> BoxFuture<'static, Result<R, QueryError>> + Send + Sync>;
pub type ItemMapper<R> = Arc<dyn Fn(Scope, R) -> Result<Item, QueryError> + Send + Sync>;
/// Alternative to ARN-parse-then-GET: builds a GET input directly from a
/// non-ARN search query (e.g. a security-group id for listing interfaces).
pub type SearchGetInputMapper<GI> = Arc<dyn Fn(Scope, String) -> Result<GI, QueryError> + Send + Sync>;

pub struct AlwaysGet<C, LI, LO, GI, R> {
    pub item_type: String,
    pub account_id: String,
    pub region: String,
    pub client: Arc<C>,
    pub metadata: AdapterMetadata,
    pub cache: Arc<ItemCache>,
    pub cache_duration: Duration,
    pub weight: i32,
    pub max_parallel: usize,
    pub always_search_arns: bool,

    pub get_fn: Option<GetFn<C, GI, R>>,
    pub get_input_mapper: Option<GetInputMapper<GI>>,
    pub item_mapper: Option<ItemMapper<R>>,
    pub search_get_input_mapper: Option<SearchGetInputMapper<GI>>,

    pub input_mapper_list: Option<InputMapperList<LI>>,
    pub list_paginator_builder: Option<ListPaginatorBuilder<C, LI, LO>>,
    pub list_func_output_mapper: Option<ListFuncOutputMapper<LO, GI>>,
}

impl<C, LI, LO, GI, R> AlwaysGet<C, LI, LO, GI, R>
where
    C: Send + Sync + 'static,
    LI: Clone + Send + Sync + 'static,
    LO: Send + 'static,
    GI: Clone + Send + Sync + 'static,
    R: Send + 'static,
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
            max_parallel: DEFAULT_MAX_PARALLEL,
            always_search_arns: true,
            get_fn: None,
            get_input_mapper: None,
            item_mapper: None,
            search_get_input_mapper: None,
            input_mapper_list: None,
            list_paginator_builder: None,
            list_func_output_mapper: None,
        }
    }

    pub fn with_get_fn(mut self, f: GetFn<C, GI, R>) -> Self {
        self.get_fn = Some(f);
        self
    }

    pub fn with_get_input_mapper(mut self, f: GetInputMapper<GI>) -> Self {
        self.get_input_mapper = Some(f);
        self
    }

    pub fn with_item_mapper(mut self, f: ItemMapper<R>) -> Self {
        self.item_mapper = Some(f);
        self
    }

    pub fn with_search_get_input_mapper(mut self, f: SearchGetInputMapper<GI>) -> Self {
        self.search_get_input_mapper = Some(f);
        self
    }

    pub fn with_input_mapper_list(mut self, f: InputMapperList<LI>) -> Self {
        self.input_mapper_list = Some(f);
        self
    }

    pub fn with_list_paginator_builder(mut self, f: ListPaginatorBuilder<C, LI, LO>) -> Self {
        self.list_paginator_builder = Some(f);
        self
    }

    pub fn with_list_func_output_mapper(mut self, f: ListFuncOutputMapper<LO, GI>) -> Self {
        self.list_func_output_mapper = Some(f);
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_always_search_arns(mut self, enabled: bool) -> Self {
        self.always_search_arns = enabled;
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

    async fn resolve(&self, cancellation: &CancellationToken, scope: &Scope, input: GI) -> Result<Item, QueryError> {
        let raw = (self.get_fn.as_ref().expect("validated"))(cancellation.clone(), Arc::clone(&self.client), input).await?;
        (self.item_mapper.as_ref().expect("validated"))(scope.clone(), raw)
    }
}

#[async_trait]
impl<C, LI, LO, GI, R> Adapter for AlwaysGet<C, LI, LO, GI, R>
where
    C: Send + Sync + 'static,
    LI: Clone + Send + Sync + 'static,
    LO: Send + 'static,
    GI: Clone + Send + Sync + 'static,
    R: Send + 'static,
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
        if self.get_input_mapper.is_none() {
            return Err(QueryError::other(scope, "getInputMapper is not configured"));
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

        let input = match (self.get_input_mapper.as_ref().unwrap())(scope.clone(), query.to_string()) {
            Ok(input) => input,
            Err(err) => {
                self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                return Err(err);
            }
        };

        match self.resolve(cancellation, scope, input).await {
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

        let (Some(input_mapper_list), Some(paginator_builder), Some(output_mapper)) =
            (&self.input_mapper_list, &self.list_paginator_builder, &self.list_func_output_mapper)
        else {
            stream
                .send_error(QueryError::not_found(adapter_scope.clone(), format!("list not supported for {}", self.item_type)))
                .await;
            return;
        };

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
        let mut paginator = paginator_builder(Arc::clone(&self.client), list_input);
        let mut ids: Vec<GI> = Vec::new();
        loop {
            if cancellation.is_cancelled() {
                self.cache.release(&key).await;
                return;
            }
            if !paginator.has_more_pages() {
                break;
            }
            match paginator.next_page(cancellation).await {
                Ok(page) => ids.extend(output_mapper(page)),
                Err(err) => {
                    self.cache.release(&key).await;
                    stream.send_error(err).await;
                    return;
                }
            }
        }

        if ids.is_empty() {
            self.cache
                .store_error(&key, QueryError::not_found(adapter_scope, format!("{} not found", self.item_type)), self.cache_duration)
                .await;
            return;
        }

        debug!(item_type = %self.item_type, ids = ids.len(), max_parallel = self.max_parallel, "resolving list ids via bounded GET fan-out");
        let semaphore = Semaphore::new(self.max_parallel);
        let mut inflight = FuturesUnordered::new();
        for id in ids {
            inflight.push(async {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                self.resolve(cancellation, scope, id).await
            });
        }

        let mut any_found = false;
        while let Some(outcome) = inflight.next().await {
            match outcome {
                Ok(item) => {
                    any_found = true;
                    self.cache.store_item(&key, item.clone(), self.cache_duration).await;
                    stream.send_item(item).await;
                }
                Err(err) => {
                    // An individual id's NOT_FOUND (or any other failure) must
                    // not poison the LIST cache key -- only the "zero ids
                    // discovered" case above does that.
                    stream.send_error(err).await;
                }
            }
        }
        if !any_found {
            // Every id resolved to an error: don't poison the LIST key with
            // NOT_FOUND (the ids plainly exist), but release the pending
            // slot so the next lookup doesn't hang.
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

        if self.always_search_arns {
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
        }

        let Some(search_get_input_mapper) = &self.search_get_input_mapper else {
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

        let input = match search_get_input_mapper(scope.clone(), query.to_string()) {
            Ok(input) => input,
            Err(err) => {
                common::cache_and_send_error(&self.cache, &key, err, self.cache_duration, &stream).await;
                return;
            }
        };

        match self.resolve(cancellation, scope, input).await {
            Ok(item) => {
                self.cache.store_item(&key, item.clone(), self.cache_duration).await;
                stream.send_item(item).await;
            }
            Err(err) => common::cache_and_send_error(&self.cache, &key, err, self.cache_duration, &stream).await,
        }
    }
}
