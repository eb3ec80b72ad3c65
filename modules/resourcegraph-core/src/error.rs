//! The `QueryError` taxonomy surfaced by every public adapter method.

use thiserror::Error;

use crate::scope::Scope;

/// Classification of a `QueryError`. Only `NotFound` and `NoScope` are
/// cacheable (see [`crate::cache`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryErrorKind {
    /// The queried scope does not match the adapter's scope.
    NoScope,
    /// The resource is absent, or the method is unsupported for this type,
    /// or a wildcard/composite query was rejected.
    NotFound,
    /// Mapper failure, malformed ARN, unexpected SDK failure, or a result
    /// count invariant violation.
    Other,
}

impl QueryErrorKind {
    pub fn is_cacheable(self) -> bool {
        matches!(self, QueryErrorKind::NotFound | QueryErrorKind::NoScope)
    }
}

/// A classified query failure, always carrying the scope it was raised
/// against and a human-readable message.
#[derive(Debug, Error, Clone)]
#[error("{kind:?} ({scope}): {message}")]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub scope: Scope,
    pub message: String,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, scope: Scope, message: impl Into<String>) -> Self {
        Self {
            kind,
            scope,
            message: message.into(),
        }
    }

    pub fn no_scope(scope: Scope, adapter_scope: &Scope) -> Self {
        Self::new(
            QueryErrorKind::NoScope,
            scope.clone(),
            format!("query scope {scope} does not match adapter scope {adapter_scope}"),
        )
    }

    pub fn not_found(scope: Scope, message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::NotFound, scope, message)
    }

    pub fn other(scope: Scope, message: impl Into<String>) -> Self {
        Self::new(QueryErrorKind::Other, scope, message)
    }

    pub fn is_cacheable(&self) -> bool {
        self.kind.is_cacheable()
    }
}
