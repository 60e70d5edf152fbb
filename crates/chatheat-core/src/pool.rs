//! Concurrency helpers for retrieval
//!
//! [`run_bounded`] admits at most N futures at a time from a larger work
//! list and hands results back in input order. [`first_success`] walks a
//! list of fallible attempts one by one and stops at the first that works.
//! Both run inside the caller's task; nothing is spawned, so the in-flight
//! bound holds without any shared counters.

use futures::stream::{self, StreamExt};
use std::future::Future;

/// Run `task` over `items` with at most `max_concurrent` futures in flight
///
/// The output has one entry per input, at the input's index, whatever the
/// completion order. `on_progress(completed, total)` is called after every
/// completion with `completed` counting up from 1 to `total`.
///
/// Tasks cannot fail from the pool's point of view: a task that can go
/// wrong must turn its error into a neutral result itself, and the pool
/// never retries.
///
/// # Examples
/// ```
/// use chatheat_core::pool::run_bounded;
///
/// # tokio_test::block_on(async {
/// let doubled = run_bounded(2, vec![1, 2, 3], |n| async move { n * 2 }, |_, _| {}).await;
/// assert_eq!(doubled, vec![2, 4, 6]);
/// # });
/// ```
pub async fn run_bounded<T, R, F, Fut, P>(
    max_concurrent: usize,
    items: impl IntoIterator<Item = T>,
    mut task: F,
    mut on_progress: P,
) -> Vec<R>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = R>,
    P: FnMut(usize, usize),
{
    let items: Vec<T> = items.into_iter().collect();
    let total = items.len();
    let limit = max_concurrent.max(1);

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
    let mut completed = 0;

    let mut in_flight = stream::iter(items.into_iter().enumerate().map(|(index, item)| {
        let pending = task(item);
        async move { (index, pending.await) }
    }))
    .buffer_unordered(limit);

    while let Some((index, result)) = in_flight.next().await {
        slots[index] = Some(result);
        completed += 1;
        on_progress(completed, total);
    }

    slots.into_iter().flatten().collect()
}

/// Try `attempt` on each candidate in order until one succeeds
///
/// Candidates after the first success are never tried. When every attempt
/// fails, the collected errors come back in candidate order.
///
/// # Examples
/// ```
/// use chatheat_core::pool::first_success;
///
/// # tokio_test::block_on(async {
/// let found = first_success(["a", "b", "c"], |name| async move {
///     if name == "b" { Ok(name.to_uppercase()) } else { Err(format!("{name} missing")) }
/// })
/// .await;
/// assert_eq!(found, Ok("B".to_string()));
/// # });
/// ```
pub async fn first_success<C, T, E, F, Fut>(
    candidates: impl IntoIterator<Item = C>,
    mut attempt: F,
) -> Result<T, Vec<E>>
where
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut failures = Vec::new();
    for candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) => failures.push(e),
        }
    }
    Err(failures)
}
