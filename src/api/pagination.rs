// src/api/pagination.rs
//! Lazy paginated fetching over offset/cursor endpoints.
//!
//! A [`PagedFetcher`] turns a page-fetch function into a finite stream of
//! item batches. It follows the cursor the server hands back, never a
//! client-side counter, and refuses to guess when the server's answer does
//! not allow a safe continuation.

use crate::error::AppError;
use futures::stream::{self, Stream, TryStreamExt};
use std::fmt;
use std::future::Future;

/// Server-supplied continuation token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One page of results as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub cursor: Option<Cursor>,
}

impl<T> Page<T> {
    /// A page that ends the sequence.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: false,
            cursor: None,
        }
    }

    /// A page followed by more, reachable through `cursor`.
    pub fn more(items: Vec<T>, cursor: Cursor) -> Self {
        Self {
            items,
            has_more: true,
            cursor: Some(cursor),
        }
    }
}

/// What the fetch function is asked for on each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: u32,
    /// `None` on the first call, then the cursor of the previous page.
    pub cursor: Option<Cursor>,
}

/// Whether this client knows how to request the next page of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    Supported,
    /// Only the first page is consumed; `has_more` on it is an error.
    Unsupported,
}

/// Describes one paginated endpoint.
#[derive(Debug, Clone)]
pub struct PagedFetcher {
    endpoint: String,
    page_size: u32,
    continuation: Continuation,
}

enum Next {
    First,
    After(Cursor),
    Exhausted,
}

struct FetchState<F> {
    fetch: F,
    fetcher: PagedFetcher,
    next: Next,
}

impl PagedFetcher {
    /// An endpoint whose cursor this client follows.
    pub fn new(endpoint: impl Into<String>, page_size: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            page_size,
            continuation: Continuation::Supported,
        }
    }

    /// An endpoint consumed as a single page.
    pub fn single_page(endpoint: impl Into<String>, page_size: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            page_size,
            continuation: Continuation::Unsupported,
        }
    }

    /// Streams the endpoint one page per item.
    ///
    /// The stream is lazy: no request is made until it is polled, and each
    /// poll makes at most one request. After the first error it ends.
    pub fn stream<T, F, Fut>(self, fetch: F) -> impl Stream<Item = Result<Vec<T>, AppError>>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, AppError>>,
    {
        let state = FetchState {
            fetch,
            fetcher: self,
            next: Next::First,
        };

        stream::try_unfold(state, |mut state| async move {
            let cursor = match std::mem::replace(&mut state.next, Next::Exhausted) {
                Next::Exhausted => return Ok::<_, AppError>(None),
                Next::First => None,
                Next::After(cursor) => Some(cursor),
            };

            let request = PageRequest {
                page_size: state.fetcher.page_size,
                cursor: cursor.clone(),
            };
            let Page {
                items,
                has_more,
                cursor: next_cursor,
            } = (state.fetch)(request).await?;

            log::debug!(
                "{}: page of {} item(s), has_more={}",
                state.fetcher.endpoint,
                items.len(),
                has_more
            );

            if has_more {
                state.next = Next::After(state.fetcher.continue_from(cursor, next_cursor)?);
            }

            Ok(Some((items, state)))
        })
    }

    /// Fetches every page and concatenates the items in page order.
    pub async fn collect_all<T, F, Fut>(self, fetch: F) -> Result<Vec<T>, AppError>
    where
        F: FnMut(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, AppError>>,
    {
        self.stream(fetch).try_concat().await
    }

    fn continue_from(
        &self,
        used: Option<Cursor>,
        next: Option<Cursor>,
    ) -> Result<Cursor, AppError> {
        if self.continuation == Continuation::Unsupported {
            return Err(AppError::UnsupportedPagination {
                endpoint: self.endpoint.clone(),
            });
        }

        match next {
            None => Err(AppError::MalformedResponse(format!(
                "{} reported more results without a continuation cursor",
                self.endpoint
            ))),
            Some(next) if used.as_ref() == Some(&next) => {
                Err(AppError::MalformedResponse(format!(
                    "{} returned the cursor it was given ({}) with more results pending",
                    self.endpoint, next
                )))
            }
            Some(next) => Ok(next),
        }
    }
}
