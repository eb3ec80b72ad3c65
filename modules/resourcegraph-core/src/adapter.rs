//! The uniform per-adapter surface the discovery runtime calls (spec.md §6).

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::QueryError;
use crate::item::Item;
use crate::metadata::AdapterMetadata;
use crate::scope::Scope;
use crate::stream::QueryResultStream;

/// Default adapter weight: resolves duplicate GETs across adapter
/// instances registered for the same type, higher wins.
pub const DEFAULT_WEIGHT: i32 = 100;

/// The uniform query surface every resource-kind adapter exposes,
/// regardless of which kernel shape (`DescribeOnly`/`GetList`/`GetListV2`/
/// `AlwaysGet`) implements it underneath.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The resource kind this adapter serves, e.g. `"ec2-instance"`.
    fn item_type(&self) -> &str;

    /// Conventionally `"<type>-adapter"`.
    fn name(&self) -> String {
        format!("{}-adapter", self.item_type())
    }

    /// The scope(s) this adapter instance answers for.
    fn scopes(&self) -> Vec<Scope>;

    fn metadata(&self) -> AdapterMetadata;

    /// Used by the runtime to resolve duplicate GETs across adapter
    /// instances of the same type -- higher wins.
    fn weight(&self) -> i32 {
        DEFAULT_WEIGHT
    }

    async fn get(
        &self,
        cancellation: &CancellationToken,
        scope: &Scope,
        query: &str,
        ignore_cache: bool,
    ) -> Result<Item, QueryError>;

    async fn list_stream(
        &self,
        cancellation: &CancellationToken,
        scope: &Scope,
        ignore_cache: bool,
        stream: Arc<dyn QueryResultStream>,
    );

    async fn search_stream(
        &self,
        cancellation: &CancellationToken,
        scope: &Scope,
        query: &str,
        ignore_cache: bool,
        stream: Arc<dyn QueryResultStream>,
    );

    /// Ensures required callbacks are configured; called once at startup by
    /// convention, not on every query.
    fn validate(&self) -> Result<(), QueryError>;
}
