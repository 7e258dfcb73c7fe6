//! Fixed-cadence polling for long-running backend operations.
//!
//! Both file processing and video rendering are driven through [`poll_until`]:
//! check the current state, sleep a constant interval, refetch, and give up
//! with [`GeminiError::Timeout`] once the wall-clock deadline has passed.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use super::error::GeminiError;

/// Polling interval for video operations (5 seconds).
pub const VIDEO_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Maximum wait for a video operation (10 minutes).
pub const VIDEO_POLL_DEADLINE: Duration = Duration::from_secs(10 * 60);

/// Polling interval for uploaded files that are still processing (1 second).
pub const FILE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum wait for an uploaded file to leave the processing state (10 minutes).
pub const FILE_POLL_DEADLINE: Duration = Duration::from_secs(10 * 60);

/// Interval and deadline for a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub deadline: Duration,
}

impl PollPolicy {
    pub const fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    pub const fn video() -> Self {
        Self::new(VIDEO_POLL_INTERVAL, VIDEO_POLL_DEADLINE)
    }

    pub const fn file_processing() -> Self {
        Self::new(FILE_POLL_INTERVAL, FILE_POLL_DEADLINE)
    }
}

/// Wait until `is_done` holds for the operation state.
///
/// `initial` is the state returned by the call that started the operation.
/// `refresh` fetches the next state; it is never invoked once the deadline,
/// measured from entry into this function, has elapsed. Errors from `refresh`
/// are returned immediately.
pub async fn poll_until<T, D, R, Fut>(
    what: &'static str,
    initial: T,
    policy: PollPolicy,
    mut is_done: D,
    mut refresh: R,
) -> Result<T, GeminiError>
where
    D: FnMut(&T) -> bool,
    R: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GeminiError>>,
{
    let start = Instant::now();
    let mut state = initial;
    let mut attempts = 0u32;

    loop {
        if is_done(&state) {
            log::debug!("{} finished after {} status checks", what, attempts);
            return Ok(state);
        }

        if start.elapsed() >= policy.deadline {
            break;
        }

        tokio::time::sleep(policy.interval).await;

        if start.elapsed() >= policy.deadline {
            break;
        }

        attempts += 1;
        log::debug!("{}: still running, status check {}", what, attempts);
        state = refresh().await?;
    }

    log::error!("{} timed out after {:?}", what, policy.deadline);
    Err(GeminiError::Timeout {
        what,
        after: policy.deadline,
    })
}
