//! Single in-flight guard per logical action
//!
//! A duplicate user action while one request is outstanding must be a
//! no-op rather than a second conflicting request (a double-clicked
//! submit would otherwise sign twice).

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::AppError;

pub struct InFlight {
    action: &'static str,
    busy: AtomicBool,
}

impl InFlight {
    pub const fn new(action: &'static str) -> Self {
        InFlight { action, busy: AtomicBool::new(false) }
    }

    /// Claim the guard; fails with [`AppError::Busy`] while a prior claim
    /// is still alive. Released when the returned token drops.
    pub fn begin(&self) -> Result<InFlightToken<'_>, AppError> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(AppError::Busy(self.action));
        }
        Ok(InFlightToken { busy: &self.busy })
    }
}

pub struct InFlightToken<'a> {
    busy: &'a AtomicBool,
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_claims_are_rejected_until_release() {
        let guard = InFlight::new("register");

        let token = guard.begin().unwrap();
        assert!(matches!(guard.begin(), Err(AppError::Busy("register"))));

        drop(token);
        assert!(guard.begin().is_ok());
    }
}
