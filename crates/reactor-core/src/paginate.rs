//! Paginated fetch executor
//!
//! Exhausts a paged collection one page at a time. Pages of one logical
//! fetch are never in flight together; separate fetches share nothing and
//! may overlap freely.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Constant;

use crate::model::Document;
use crate::remote::{PageRequest, RemoteResult};
use crate::{Error, Result};

/// Tunables for collection fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Requested page size
    pub page_size: u32,
    /// Pause before the single retry of a rate-limited page
    pub retry_delay: Duration,
    /// Upper bound on independent list fetches run together (rule components)
    pub max_parallel_lists: usize,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            retry_delay: Duration::from_secs(1),
            max_parallel_lists: 5,
        }
    }
}

/// Fetch every page of `page_call` and concatenate the data in page order.
///
/// Page 1 is requested first. Without pagination metadata its data is the
/// whole result (a single resource or a flat collection); otherwise pages
/// `current_page + 1 ..= total_pages` follow, strictly one after another.
///
/// A page answered with 429 is retried once after `retry_delay`; a second
/// 429 fails with [`Error::RateLimited`]. Any other failure is returned as is.
pub async fn fetch_all<T, F, Fut>(
    operation: &str,
    options: FetchOptions,
    page_call: F,
) -> Result<Vec<T>>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = RemoteResult<Document<T>>>,
{
    let first = request_page(operation, &options, &page_call, 1).await?;
    let Some(pagination) = first.pagination() else {
        return Ok(first.data.into_vec());
    };

    let mut items = first.data.into_vec();
    for number in pagination.current_page.saturating_add(1)..=pagination.total_pages {
        let page = request_page(operation, &options, &page_call, number).await?;
        items.extend(page.data.into_vec());
    }

    tracing::debug!(
        operation,
        pages = pagination.total_pages,
        items = items.len(),
        "Fetched collection"
    );
    Ok(items)
}

async fn request_page<T, F, Fut>(
    operation: &str,
    options: &FetchOptions,
    page_call: &F,
    number: u32,
) -> Result<Document<T>>
where
    F: Fn(PageRequest) -> Fut,
    Fut: Future<Output = RemoteResult<Document<T>>>,
{
    let request = PageRequest {
        number,
        size: options.page_size,
    };
    let mut attempts = 0u32;

    backoff::future::retry(Constant::new(options.retry_delay), || {
        attempts += 1;
        let attempt = attempts;
        let call = page_call(request);
        async move {
            match call.await {
                Ok(page) => Ok(page),
                Err(e) if e.is_rate_limited() && attempt == 1 => {
                    tracing::warn!(operation, page = number, "Rate limited, retrying page once");
                    Err(backoff::Error::transient(Error::RateLimited {
                        operation: operation.to_string(),
                    }))
                }
                Err(e) if e.is_rate_limited() => Err(backoff::Error::permanent(Error::RateLimited {
                    operation: operation.to_string(),
                })),
                Err(e) => Err(backoff::Error::permanent(Error::remote(operation, e))),
            }
        }
    })
    .await
}
