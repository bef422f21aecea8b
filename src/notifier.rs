//! The version counter and condition variable backing `wait_for_change`.

use std::sync::{Condvar, MutexGuard};

use crate::error::Error;

/// Sentinel passed to `wait_for_change` to request an unconditional block
/// until the next change or `stop_updates`, regardless of the caller's last
/// known version.
pub const WAITFORCHANGE_ALWAYS_BLOCK: i64 = -1;

/// Wraps the `Condvar` used to wake `wait_for_change` callers. The version
/// counter itself lives inside the manager's locked state so that it is
/// read and written under the very mutex this condition variable pairs
/// with.
#[derive(Default)]
pub struct ChangeNotifier {
    condvar: Condvar,
}

impl ChangeNotifier {
    /// Wakes every thread currently blocked in `wait`.
    pub fn notify_all(&self) {
        self.condvar.notify_all();
    }

    /// Blocks the calling thread until `notify_all` is called, releasing
    /// `guard`'s mutex while waiting and re-acquiring it before returning.
    pub fn wait<'a, T>(&self, guard: MutexGuard<'a, T>) -> MutexGuard<'a, T> {
        self.condvar.wait(guard).unwrap_or_else(|poisoned| {
            log::error!(
                "condition variable wait observed a poisoned mutex, recovering: {}",
                Error::Poisoned
            );
            poisoned.into_inner()
        })
    }
}
