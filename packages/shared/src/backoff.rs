use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

/// Retry schedule for operations against the shared store.
#[derive(Debug, Clone, PartialEq)]
pub enum BackoffPolicy {
    Fixed {
        delay: Duration,
        max_attempts: u32,
    },
    Exponential {
        initial: Duration,
        max: Duration,
        multiplier: f64,
        max_attempts: u32,
        /// Spread each delay uniformly over `[delay / 2, delay]`.
        jitter: bool,
    },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            initial: Duration::from_millis(50),
            max: Duration::from_secs(1),
            multiplier: 2.0,
            max_attempts: 6,
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    pub fn max_attempts(&self) -> u32 {
        match self {
            BackoffPolicy::Fixed { max_attempts, .. } => *max_attempts,
            BackoffPolicy::Exponential { max_attempts, .. } => *max_attempts,
        }
    }

    /// Delay to wait after the given failed attempt (1-based), or `None` once attempts are spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts() {
            return None;
        }
        match self {
            BackoffPolicy::Fixed { delay, .. } => Some(*delay),
            BackoffPolicy::Exponential {
                initial,
                max,
                multiplier,
                jitter,
                ..
            } => {
                let exponent = attempt.saturating_sub(1) as i32;
                let scaled = initial.as_secs_f64() * multiplier.powi(exponent);
                let capped = scaled.min(max.as_secs_f64());
                let secs = if *jitter {
                    rand::thread_rng().gen_range(capped / 2.0..=capped)
                } else {
                    capped
                };
                Some(Duration::from_secs_f64(secs))
            }
        }
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or attempts run out.
    pub async fn retry<T, E, F, Fut>(
        &self,
        mut operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(e) if is_retryable(&e) => match self.delay_for(attempt) {
                    Some(delay) => {
                        debug!("Attempt {} failed, retrying in {:?}", attempt, delay);
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => return Err(e),
                },
                Err(e) => return Err(e),
            }
        }
    }
}
