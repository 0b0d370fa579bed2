// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Draining of token-paged resources.
//!
//! The gateway signals "more data" with an opaque continuation token. The
//! loop here stops on an absent or empty token, and also when the backend
//! returns the token it was just given — a termination safety net against
//! endpoints that echo the cursor forever.

use std::future::Future;

use crate::error::Error;

/// One page of a paged response.
#[derive(Debug, Clone, Default)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Page { items, next_token }
    }

    /// A page with no continuation, ending the sequence.
    pub fn last(items: Vec<T>) -> Self {
        Page {
            items,
            next_token: None,
        }
    }
}

/// Everything drained from a paged resource. When a page fetch failed, the
/// items accumulated before the failure are kept and the error recorded, so
/// the call site decides between propagating and keeping the partial result.
#[derive(Debug)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub error: Option<Error>,
}

impl<T> Paginated<T> {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Collapses into a `Result`, discarding any partial items on error.
    pub fn into_result(self) -> Result<Vec<T>, Error> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.items),
        }
    }
}

/// Invokes `fetch_page` with the previous continuation token (`None` first)
/// until the sequence ends. Page arrival order and in-page order are
/// preserved untouched.
pub async fn paginate<T, F, Fut>(mut fetch_page: F) -> Paginated<T>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, Error>>,
{
    let mut items = Vec::new();
    let mut token: Option<String> = None;
    loop {
        let page = match fetch_page(token.clone()).await {
            Ok(page) => page,
            Err(error) => {
                return Paginated {
                    items,
                    error: Some(error),
                }
            }
        };
        // A response carrying the token it was requested with is the same
        // page served again; drop it instead of accumulating duplicates.
        if token.is_some() && page.next_token == token {
            break;
        }
        items.extend(page.items);
        match page.next_token {
            Some(next) if !next.is_empty() => token = Some(next),
            _ => break,
        }
    }
    Paginated { items, error: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scripted_pages(pages: Vec<Page<u32>>) -> impl FnMut(Option<String>) -> Page<u32> {
        let mut pages = pages.into_iter();
        move |_token| pages.next().expect("fetched past the last page")
    }

    #[tokio::test]
    async fn test_drains_until_token_absent() {
        let fetches = AtomicUsize::new(0);
        let mut next_page = scripted_pages(vec![
            Page::new(vec![1, 2, 3], Some("t1".to_string())),
            Page::new(vec![4, 5, 6, 7, 8], Some("t2".to_string())),
            Page::last(Vec::new()),
        ]);
        let drained = paginate(|token| {
            fetches.fetch_add(1, Ordering::SeqCst);
            let page = next_page(token);
            async move { Ok(page) }
        })
        .await;
        assert!(drained.is_complete());
        assert_eq!(drained.items, vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminates_when_backend_echoes_token() {
        let fetches = AtomicUsize::new(0);
        let drained = paginate(|_token| {
            fetches.fetch_add(1, Ordering::SeqCst);
            async { Ok(Page::new(vec![1, 2], Some("stuck".to_string()))) }
        })
        .await;
        assert!(drained.is_complete());
        // The second fetch comes back with the token it was sent, so its
        // items are recognized as a re-serve and dropped.
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
        assert_eq!(drained.items, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_empty_token_ends_the_sequence() {
        let drained = paginate(|_token| async {
            Ok(Page::new(vec![9], Some(String::new())))
        })
        .await;
        assert!(drained.is_complete());
        assert_eq!(drained.items, vec![9]);
    }

    #[tokio::test]
    async fn test_error_keeps_partial_items() {
        let fetches = AtomicUsize::new(0);
        let drained: Paginated<u32> = paginate(|token| {
            let call = fetches.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    assert!(token.is_none());
                    Ok(Page::new(vec![1, 2], Some("t1".to_string())))
                } else {
                    Err(Error::RetriesExhausted {
                        label: "fetch".to_string(),
                        attempts: 3,
                        source: BackendError::Service("boom".to_string()),
                    })
                }
            }
        })
        .await;
        assert!(!drained.is_complete());
        assert_eq!(drained.items, vec![1, 2]);
        assert!(drained.into_result().is_err());
    }
}
