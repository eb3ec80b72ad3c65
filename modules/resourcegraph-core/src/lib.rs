//! Generic adapter scaffolding for cloud resource discovery and
//! blast-radius graph linking.
//!
//! This crate is the **core** described in the platform's resource
//! discovery and graph-linking engine: ARN/scope parsing, a TTL and
//! single-flight item cache, a paginator abstraction, a stream sink, tag
//! and health normalisers, an error taxonomy, a metadata registry, and the
//! four generic adapter kernel shapes (`DescribeOnly`, `GetList`,
//! `GetListV2`, `AlwaysGet`) that every per-resource-kind adapter is built
//! from. Per-resource mapping logic -- which fields become attributes,
//! which links get emitted -- is a client of this crate and lives outside it.

pub mod adapter;
pub mod arn;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod item;
pub mod kernel;
pub mod metadata;
pub mod paginator;
pub mod registry;
pub mod scope;
pub mod stream;

pub use adapter::Adapter;
pub use arn::Arn;
pub use cache::{CacheKey, ItemCache, LookupOutcome};
pub use config::{AdapterConfig, CacheConfig};
pub use error::{QueryError, QueryErrorKind};
pub use item::{AttributeValue, BlastPropagation, Health, Item, LinkedItemQuery, QueryMethod};
pub use kernel::{AlwaysGet, DescribeOnly, GetList, GetListV2};
pub use metadata::AdapterMetadata;
pub use paginator::Paginator;
pub use scope::Scope;
pub use stream::{ChannelStream, QueryResultStream, StreamEvent};
