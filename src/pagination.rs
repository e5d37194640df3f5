//! Page-by-page streams for infinite lists.

use std::future::Future;

use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::Paginated;

/// Stream pages starting at `first_page`, following `next_page()`.
///
/// Ends after the last page, or right after yielding the first error.
///
/// # Example
/// ```no_run
/// use futures::StreamExt;
/// use quill::pagination::paginate;
/// use quill::types::Paginated;
///
/// # async fn example(fetch_page: impl Fn(u32) -> futures::future::BoxFuture<'static, quill::error::Result<Paginated<String>>> + Send + 'static) {
/// let mut pages = paginate(1, fetch_page);
/// while let Some(page) = pages.next().await {
///     let page = page.expect("page");
///     println!("page {} has {} items", page.pagination.current_page, page.data.len());
/// }
/// # }
/// ```
pub fn paginate<'a, T, F, Fut>(first_page: u32, mut fetch: F) -> BoxStream<'a, Result<Paginated<T>>>
where
    T: Send + 'a,
    F: FnMut(u32) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Paginated<T>>> + Send + 'a,
{
    let pages = async_stream::stream! {
        let mut next = Some(first_page);
        while let Some(page) = next {
            match fetch(page).await {
                Ok(result) => {
                    // A server that does not advance would otherwise loop forever.
                    next = result.next_page().filter(|n| *n > page);
                    yield Ok(result);
                }
                Err(err) => {
                    yield Err(err);
                    break;
                }
            }
        }
    };
    Box::pin(pages)
}
