use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Exponential backoff with jitter: `base * 2^attempt + jitter`, matching the
/// retry policy estuary-flow's alert notifier uses for its own backoff.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let jitter_ms = rand::thread_rng().gen_range(0..1000);
    exp + Duration::from_millis(jitter_ms)
}

/// Runs `op` up to `max_attempts` times, sleeping with jittered exponential
/// backoff between failures. The last error is returned verbatim.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    base: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 >= max_attempts => return Err(err),
            Err(_) => {
                tokio::time::sleep(backoff_delay(base, attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_with_attempt() {
        let a0 = backoff_delay(Duration::from_secs(1), 0);
        let a2 = backoff_delay(Duration::from_secs(1), 2);
        assert!(a2 >= Duration::from_secs(4));
        assert!(a0 < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mut calls = 0;
        let result: Result<u32, &str> =
            retry_with_backoff(3, Duration::from_millis(1), |attempt| {
                calls += 1;
                async move {
                    if attempt < 2 {
                        Err("not yet")
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let result: Result<u32, &str> =
            retry_with_backoff(2, Duration::from_millis(1), |_| async { Err("nope") }).await;
        assert_eq!(result, Err("nope"));
    }
}
