//! Retries for raster opens and reads

use std::thread;
use std::time::Duration;

use log::warn;

use crate::errors::DrillResult;

/// Delay before the first retry; doubled for each further attempt
const BASE_DELAY_MS: u64 = 50;

/// Runs `f`, retrying recoverable errors up to `retries` more times
///
/// # Arguments
/// * `retries` - Extra attempts after the first
/// * `what` - Description used in log messages
/// * `f` - The operation
///
/// # Returns
/// The first success, the first unrecoverable error, or the last error once
/// the retries are used up
pub fn with_retry<T, F>(retries: u32, what: &str, mut f: F) -> DrillResult<T>
where
    F: FnMut() -> DrillResult<T>,
{
    let mut attempt = 0;
    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_recoverable() && attempt < retries => {
                let delay = Duration::from_millis(BASE_DELAY_MS << attempt.min(6));
                attempt += 1;
                warn!("{} failed ({}), retry {} of {} in {:?}", what, e, attempt, retries, delay);
                thread::sleep(delay);
            }
            Err(e) => return Err(e),
        }
    }
}
