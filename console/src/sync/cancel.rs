//! Cancellation of in-flight requests

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::errors::ConsoleError;

/// Run `fut` unless `token` fires first
///
/// A result that arrives after cancellation is discarded as well, so callers
/// never apply state from a torn-down owner.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T, ConsoleError>
where
    F: Future<Output = Result<T, ConsoleError>>,
{
    if token.is_cancelled() {
        return Err(ConsoleError::Cancelled);
    }

    let result = tokio::select! {
        _ = token.cancelled() => return Err(ConsoleError::Cancelled),
        result = fut => result,
    };

    if token.is_cancelled() {
        return Err(ConsoleError::Cancelled);
    }
    result
}
