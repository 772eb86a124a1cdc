//! Integration errors: conditions that only a misbehaving host app can cause.
//!
//! They never reach a delegate. With no listener installed the message is logged and the
//! debug build stops; release builds carry on.

use std::sync::{Arc, RwLock};

type AssertionListener = Arc<dyn Fn(String) + Send + Sync>;

static LISTENER: RwLock<Option<AssertionListener>> = RwLock::new(None);

/// Replaces the listener invoked on integration errors. `None` restores the default.
pub fn set_assertion_listener(listener: Option<AssertionListener>) {
    match LISTENER.write() {
        Ok(mut slot) => *slot = listener,
        Err(poisoned) => *poisoned.into_inner() = listener,
    }
}

/// Reports an integration error.
pub fn assertion_failure(message: impl Into<String>) {
    let message = message.into();
    let listener = match LISTENER.read() {
        Ok(slot) => slot.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    };

    if let Some(listener) = listener {
        listener(message);
    } else {
        log::error!("{message}");
        debug_assert!(false, "{message}");
    }
}
