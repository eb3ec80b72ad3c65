//! A uniform view over SDK-specific page iterators.

use async_trait::async_trait;

use crate::error::QueryError;

/// Minimal interface over an SDK pager. The kernel never constructs these
/// directly; adapter definitions supply a `PaginatorBuilder`.
#[async_trait]
pub trait Paginator: Send {
    type Page: Send;

    fn has_more_pages(&self) -> bool;

    async fn next_page(&mut self, cancellation: &tokio_util::sync::CancellationToken) -> Result<Self::Page, QueryError>;
}

/// A paginator over a fixed, pre-fetched set of pages. Used by tests and by
/// adapters whose SDK already materialises every page up front.
pub struct FixedPaginator<P> {
    pages: std::collections::VecDeque<P>,
}

impl<P> FixedPaginator<P> {
    pub fn new(pages: impl IntoIterator<Item = P>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
        }
    }
}

#[async_trait]
impl<P: Send> Paginator for FixedPaginator<P> {
    type Page = P;

    fn has_more_pages(&self) -> bool {
        !self.pages.is_empty()
    }

    async fn next_page(&mut self, _cancellation: &tokio_util::sync::CancellationToken) -> Result<P, QueryError> {
        self.pages.pop_front().ok_or_else(|| {
            QueryError::other(crate::scope::Scope::global(), "next_page called with no pages left")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_paginator_walks_pages_in_order() {
        let mut p = FixedPaginator::new(vec![vec!["a", "b"], vec!["c"]]);
        let token = tokio_util::sync::CancellationToken::new();
        assert!(p.has_more_pages());
        assert_eq!(p.next_page(&token).await.unwrap(), vec!["a", "b"]);
        assert!(p.has_more_pages());
        assert_eq!(p.next_page(&token).await.unwrap(), vec!["c"]);
        assert!(!p.has_more_pages());
    }
}
