//! Re-fetch and retry once on concurrent CIB modification.
//!
//! Pacemaker rejects a write whose base epoch is stale. The whole
//! read, diff and write cycle is repeated one time; a second conflict is
//! returned to the caller so a flapping cluster is not masked.

use crate::error::Result;
use log::warn;

/// Total attempts, including the first.
pub const MAX_ATTEMPTS: u32 = 2;

/// Run `cycle`, running it again once if it fails with a retryable error.
///
/// `cycle` receives the 1-indexed attempt number.
pub fn with_refetch<T, F>(mut cycle: F) -> Result<T>
where
    F: FnMut(u32) -> Result<T>,
{
    let mut attempt = 1;
    loop {
        match cycle(attempt) {
            Err(e) if e.is_retryable() && attempt < MAX_ATTEMPTS => {
                warn!("{e}; re-reading the CIB and retrying ({attempt}/{MAX_ATTEMPTS})");
                attempt += 1;
            }
            result => return result,
        }
    }
}
