//! Helpers shared by all four kernel shapes: scope checking, the
//! ARN-search-falls-back-to-GET path, and the default cache TTL.

use std::sync::Arc;
use std::time::Duration;

use crate::arn::Arn;
use crate::cache::{CacheKey, ItemCache};
use crate::error::QueryError;
use crate::scope::Scope;
use crate::stream::QueryResultStream;

/// Cache entries live for this long unless an adapter overrides it.
pub const DEFAULT_CACHE_DURATION: Duration = Duration::from_secs(3600);

/// Caches `err` (a no-op unless its kind is cacheable) and pushes it onto
/// the stream -- every query error is surfaced to the caller regardless of
/// whether it ended up persisted.
pub async fn cache_and_send_error(
    cache: &ItemCache,
    key: &CacheKey,
    err: QueryError,
    ttl: Duration,
    stream: &Arc<dyn QueryResultStream>,
) {
    cache.store_error(key, err.clone(), ttl).await;
    stream.send_error(err).await;
}

/// `scope != adapter.scope` -> `NO_SCOPE`, for every public method.
pub fn check_scope(adapter_scope: &Scope, query_scope: &Scope) -> Result<(), QueryError> {
    if query_scope == adapter_scope {
        Ok(())
    } else {
        Err(QueryError::no_scope(query_scope.clone(), adapter_scope))
    }
}

/// The fallback every kernel shape uses for SEARCH when no custom search
/// mapper is configured: parse `query` as an ARN, reject wildcards and a
/// mismatched ARN scope, then hand the resource id back to the caller to
/// delegate to GET (spec.md §4.5/§4.6, §7).
pub fn resolve_arn_search(
    adapter_name: &str,
    adapter_scope: &Scope,
    query: &str,
) -> Result<String, QueryError> {
    let arn = Arn::parse(query)?;
    if arn.contains_wildcard() {
        return Err(QueryError::not_found(
            adapter_scope.clone(),
            format!("wildcards are not supported by adapter {adapter_name}"),
        ));
    }
    let arn_scope = arn.scope();
    check_scope(adapter_scope, &arn_scope)?;
    Ok(arn.resource_id().to_string())
}

/// Like [`resolve_arn_search`], but used where a custom search function may
/// also exist: returns `None` when `query` simply doesn't parse as an ARN at
/// all (the caller should fall back to its custom search path), and
/// `Some(Err(_))` when it parses but is rejected (wildcards, wrong scope) --
/// a query that looks like an ARN is held to ARN rules even with a custom
/// search available.
pub fn try_parse_arn_search(
    adapter_name: &str,
    adapter_scope: &Scope,
    query: &str,
) -> Option<Result<String, QueryError>> {
    let arn = Arn::parse(query).ok()?;
    if arn.contains_wildcard() {
        return Some(Err(QueryError::not_found(
            adapter_scope.clone(),
            format!("wildcards are not supported by adapter {adapter_name}"),
        )));
    }
    Some(check_scope(adapter_scope, &arn.scope()).map(|()| arn.resource_id().to_string()))
}
