use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tracing::info;

/// What the application does when its session is lost.
pub trait UnauthorizedHandler: Send + Sync {
    /// Drop any state that belonged to the signed-in user.
    fn reset_state(&self);
    /// Navigate to the sign-in entry point.
    fn redirect_to_sign_in(&self);
}

/// Latch around an [`UnauthorizedHandler`]: fires once, then stays quiet until re-armed.
pub struct RedirectOnce {
    handler: Arc<dyn UnauthorizedHandler>,
    fired: AtomicBool,
}

impl RedirectOnce {
    pub fn new(handler: Arc<dyn UnauthorizedHandler>) -> Self {
        Self {
            handler,
            fired: AtomicBool::new(false),
        }
    }

    /// Returns `true` only for the caller that actually ran the handler.
    pub fn trigger(&self) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        info!("session lost, redirecting to sign-in");
        self.handler.reset_state();
        self.handler.redirect_to_sign_in();
        true
    }

    pub fn rearm(&self) {
        self.fired.store(false, Ordering::Release);
    }
}
