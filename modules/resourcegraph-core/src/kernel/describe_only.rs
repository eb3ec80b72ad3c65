//! Kernel shape A: resource families whose SDK uses one `Describe` call for
//! both GET and LIST, optionally paginated, returning zero-or-more items
//! per call (spec.md §4.5).

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
use crate::paginator::Paginator;
use crate::scope::Scope;
use crate::stream::QueryResultStream;

pub type DescribeFn<C, I, O> =
    Arc<dyn Fn(CancellationToken, Arc<C>, I) -> BoxFuture<'static, Result<O, QueryError>> + Send + Sync>;
pub type InputMapperGet<I> = Arc<dyn Fn(Scope, String) -> Result<I, QueryError> + Send + Sync>;
pub type InputMapperList<I> = Arc<dyn Fn(Scope) -> I + Send + Sync>;
pub type InputMapperSearch<C, I> = Arc<
    dyn Fn(CancellationToken, Arc<C>, Scope, String) -> BoxFuture<'static, Result<I, QueryError>>
        + Send
        + Sync,
>;
pub type PaginatorBuilder<C, I, O> =
    Arc<dyn Fn(Arc<C>, I) -> Box<dyn Paginator<Page = O>> + Send + Sync>;
pub type OutputMapper<C, I, O> = Arc<
    dyn Fn(CancellationToken, Arc<C>, Scope, I, O) -> BoxFuture<'static, Result<Vec<Item>, QueryError>>
        + Send
        + Sync,
>;
pub type PostSearchFilter = Arc<dyn Fn(&str, Vec<Item>) -> Vec<Item> + Send + Sync>;

/// Configuration and state for a `DescribeOnly`-shaped adapter. Required
/// callbacks are `Option` so that a missing one surfaces as an `OTHER`
/// config error rather than a panic (spec.md §7).
pub struct DescribeOnly<C, I, O> {
    pub item_type: String,
    pub account_id: String,
    pub region: String,
    pub client: Arc<C>,
    pub metadata: AdapterMetadata,
    pub cache: Arc<ItemCache>,
    pub cache_duration: Duration,
    pub weight: i32,
    pub use_list_for_get: bool,

    pub describe_fn: Option<DescribeFn<C, I, O>>,
    pub input_mapper_get: Option<InputMapperGet<I>>,
    pub input_mapper_list: Option<InputMapperList<I>>,
    pub input_mapper_search: Option<InputMapperSearch<C, I>>,
    pub paginator_builder: Option<PaginatorBuilder<C, I, O>>,
    pub output_mapper: Option<OutputMapper<C, I, O>>,
    pub post_search_filter: Option<PostSearchFilter>,
}

impl<C, I, O> DescribeOnly<C, I, O>
where
    C: Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
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
            use_list_for_get: false,
            describe_fn: None,
            input_mapper_get: None,
            input_mapper_list: None,
            input_mapper_search: None,
            paginator_builder: None,
            output_mapper: None,
            post_search_filter: None,
        }
    }

    pub fn with_describe_fn(mut self, f: DescribeFn<C, I, O>) -> Self {
        self.describe_fn = Some(f);
        self
    }

    pub fn with_input_mapper_get(mut self, f: InputMapperGet<I>) -> Self {
        self.input_mapper_get = Some(f);
        self
    }

    pub fn with_input_mapper_list(mut self, f: InputMapperList<I>) -> Self {
        self.input_mapper_list = Some(f);
        self
    }

    pub fn with_input_mapper_search(mut self, f: InputMapperSearch<C, I>) -> Self {
        self.input_mapper_search = Some(f);
        self
    }

    pub fn with_paginator_builder(mut self, f: PaginatorBuilder<C, I, O>) -> Self {
        self.paginator_builder = Some(f);
        self
    }

    pub fn with_output_mapper(mut self, f: OutputMapper<C, I, O>) -> Self {
        self.output_mapper = Some(f);
        self
    }

    pub fn with_post_search_filter(mut self, f: PostSearchFilter) -> Self {
        self.post_search_filter = Some(f);
        self
    }

    pub fn with_use_list_for_get(mut self, enabled: bool) -> Self {
        self.use_list_for_get = enabled;
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
        CacheKey::new(
            Adapter::name(self),
            method,
            self.adapter_scope(),
            self.item_type.clone(),
            query.map(str::to_string),
        )
    }

    /// The shared LIST/SEARCH engine (spec.md §4.5.1): walks pages (or
    /// makes a single call) through `describeFn`/`outputMapper`, applying
    /// `postSearchFilter` per page only when `query` is a SEARCH.
    async fn describe(
        &self,
        cancellation: &CancellationToken,
        query: Option<&str>,
        input: I,
        key: &CacheKey,
        stream: &Arc<dyn QueryResultStream>,
    ) {
        let scope = self.adapter_scope();
        let output_mapper = self.output_mapper.as_ref().expect("validated");

        let mut emitted_any = false;
        let pages: Vec<Result<O, QueryError>> = if let Some(builder) = &self.paginator_builder {
            let mut paginator = builder(Arc::clone(&self.client), input.clone());
            let mut pages = Vec::new();
            while paginator.has_more_pages() {
                if cancellation.is_cancelled() {
                    self.cache.release(key).await;
                    return;
                }
                let page = paginator.next_page(cancellation).await;
                let is_err = page.is_err();
                pages.push(page);
                if is_err {
                    break;
                }
            }
            pages
        } else {
            let describe_fn = self.describe_fn.as_ref().expect("validated");
            vec![describe_fn(cancellation.clone(), Arc::clone(&self.client), input.clone()).await]
        };
        debug!(item_type = %self.item_type, pages = pages.len(), "describe fetched pages");

        for page in pages {
            if cancellation.is_cancelled() {
                self.cache.release(key).await;
                return;
            }
            let output = match page {
                Ok(output) => output,
                Err(err) => {
                    common::cache_and_send_error(&self.cache, key, err, self.cache_duration, stream).await;
                    return;
                }
            };
            let mapped = output_mapper(cancellation.clone(), Arc::clone(&self.client), scope.clone(), input.clone(), output).await;
            let mut items = match mapped {
                Ok(items) => items,
                Err(err) => {
                    common::cache_and_send_error(&self.cache, key, err, self.cache_duration, stream).await;
                    return;
                }
            };
            if let (Some(q), Some(filter)) = (query, &self.post_search_filter) {
                items = filter(q, items);
            }
            for item in items {
                emitted_any = true;
                self.cache.store_item(key, item.clone(), self.cache_duration).await;
                stream.send_item(item).await;
            }
        }

        if !emitted_any {
            self.cache
                .store_error(
                    key,
                    QueryError::not_found(scope, format!("{} not found", self.item_type)),
                    self.cache_duration,
                )
                .await;
        }
    }
}

#[async_trait]
impl<C, I, O> Adapter for DescribeOnly<C, I, O>
where
    C: Send + Sync + 'static,
    I: Clone + Send + Sync + 'static,
    O: Send + 'static,
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
        if self.describe_fn.is_none() {
            return Err(QueryError::other(scope, "describeFn is not configured"));
        }
        if self.input_mapper_get.is_none() {
            return Err(QueryError::other(scope, "inputMapperGet is not configured"));
        }
        if self.output_mapper.is_none() {
            return Err(QueryError::other(scope, "outputMapper is not configured"));
        }
        if self.use_list_for_get && self.input_mapper_list.is_none() {
            return Err(QueryError::other(scope, "useListForGet requires inputMapperList to be configured"));
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

        let input = if self.use_list_for_get {
            let mapper = self
                .input_mapper_list
                .as_ref()
                .ok_or_else(|| QueryError::other(adapter_scope.clone(), "inputMapperList is not configured"))?;
            mapper(scope.clone())
        } else {
            match (self.input_mapper_get.as_ref().unwrap())(scope.clone(), query.to_string()) {
                Ok(input) => input,
                Err(err) => {
                    self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                    return Err(err);
                }
            }
        };

        let output = match (self.describe_fn.as_ref().unwrap())(cancellation.clone(), Arc::clone(&self.client), input.clone()).await {
            Ok(output) => output,
            Err(err) => {
                self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                return Err(err);
            }
        };

        let mut items = match (self.output_mapper.as_ref().unwrap())(cancellation.clone(), Arc::clone(&self.client), scope.clone(), input, output).await {
            Ok(items) => items,
            Err(err) => {
                self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                return Err(err);
            }
        };

        if self.use_list_for_get {
            items.retain(|item| item.unique_attribute_value() == Some(query));
        }

        match items.len() {
            0 => {
                let err = QueryError::not_found(scope.clone(), format!("{} {} not found", self.item_type, query));
                self.cache.store_error(&key, err.clone(), self.cache_duration).await;
                Err(err)
            }
            1 => {
                let item = items.into_iter().next().unwrap();
                self.cache.store_item(&key, item.clone(), self.cache_duration).await;
                Ok(item)
            }
            n => {
                let matched: Vec<&str> = items.iter().filter_map(|i| i.unique_attribute_value()).collect();
                let err = QueryError::other(
                    scope.clone(),
                    format!("{} query {:?} matched {} items: {:?}", self.item_type, query, n, matched),
                );
                // Belt-and-braces per spec.md §9: StoreError drops this since OTHER is not cacheable.
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

        let input = input_mapper_list(scope.clone());
        self.describe(cancellation, None, input, &key, &stream).await;
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

        let Some(input_mapper_search) = &self.input_mapper_search else {
            match common::resolve_arn_search(&Adapter::name(self), &adapter_scope, query) {
                Ok(resource_id) => match self.get(cancellation, scope, &resource_id, ignore_cache).await {
                    Ok(item) => stream.send_item(item).await,
                    Err(err) => stream.send_error(err).await,
                },
                Err(err) => stream.send_error(err).await,
            }
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

        let input = match input_mapper_search(cancellation.clone(), Arc::clone(&self.client), scope.clone(), query.to_string()).await {
            Ok(input) => input,
            Err(err) => {
                common::cache_and_send_error(&self.cache, &key, err, self.cache_duration, &stream).await;
                return;
            }
        };
        self.describe(cancellation, Some(query), input, &key, &stream).await;
    }
}
