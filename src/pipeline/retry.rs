use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

const MAX_ATTEMPTS: u32 = 2;

/// Run `op` under `timeout`; on failure wait `backoff` and try exactly once more.
/// `on_timeout` builds the error reported when an attempt runs out of time.
pub async fn with_retry<T, E, F, Fut, G>(
    label: &str,
    timeout: Duration,
    backoff: Duration,
    on_timeout: G,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    G: Fn() -> E,
    E: Display,
{
    let mut attempt = 1;
    loop {
        let result = match tokio::time::timeout(timeout, op()).await {
            Ok(r) => r,
            Err(_) => Err(on_timeout()),
        };

        match result {
            Ok(value) => return Ok(value),
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    label, attempt, MAX_ATTEMPTS, e, backoff
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => {
                error!("{} failed after {} attempts: {}", label, attempt, e);
                return Err(e);
            }
        }
    }
}
