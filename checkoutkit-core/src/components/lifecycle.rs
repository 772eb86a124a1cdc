//! Run bookkeeping shared by every action handler.
//!
//! A handler run is a future that resolves to the run's single terminal result. The run
//! is raced against its cancel token, so a superseded run stops at its next suspension
//! point and never reaches the delegate.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;

use super::{ActionComponentDelegate, ComponentKind};
use crate::action::ActionComponentData;
use crate::error::ActionError;

/// What a run resolves to. `None` means an integration error was already reported through
/// an assertion and no delegate callback follows.
pub(crate) type RunResult = Option<Result<ActionComponentData, ActionError>>;

/// How a handler run ended.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum Outcome {
    /// `did_provide` was called.
    Delivered,
    /// `did_fail` was called with anything but a cancellation.
    Failed,
    /// `did_fail(Cancelled)` was called.
    Cancelled,
    /// A newer action replaced this run before it finished. No callback.
    Superseded,
    /// An integration error stopped the run. No callback.
    Abandoned,
}

/// Cancellation signal of one run.
#[derive(Debug, Clone)]
pub(crate) struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl CancelToken {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once cancelled.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

/// Reports to the delegate on behalf of one handler kind. Handlers only ever hold the
/// delegate weakly.
#[derive(Clone)]
pub(crate) struct Reporter {
    delegate: Option<Weak<dyn ActionComponentDelegate>>,
    kind: ComponentKind,
}

impl Reporter {
    pub fn new(delegate: Weak<dyn ActionComponentDelegate>, kind: ComponentKind) -> Self {
        Self {
            delegate: Some(delegate),
            kind,
        }
    }

    pub const fn detached(kind: ComponentKind) -> Self {
        Self {
            delegate: None,
            kind,
        }
    }

    fn delegate(&self) -> Option<Arc<dyn ActionComponentDelegate>> {
        self.delegate.as_ref().and_then(Weak::upgrade)
    }

    pub const fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Intermediate notification, not terminal.
    pub fn open_external_application(&self) {
        if let Some(delegate) = self.delegate() {
            delegate.did_open_external_application(self.kind);
        }
    }

    fn deliver(self, result: Result<ActionComponentData, ActionError>) -> Outcome {
        let outcome = match &result {
            Ok(_) => Outcome::Delivered,
            Err(ActionError::Cancelled) => Outcome::Cancelled,
            Err(_) => Outcome::Failed,
        };
        let Some(delegate) = self.delegate() else {
            log::warn!("{} finished but its delegate is gone", self.kind);
            return outcome;
        };
        match result {
            Ok(data) => delegate.did_provide(data, self.kind),
            Err(error) => {
                log::info!("{} failed: {error}", self.kind);
                delegate.did_fail(error, self.kind);
            }
        }
        outcome
    }
}

/// Drives `work` to its terminal result and delivers it exactly once, unless `token`
/// fires first.
pub(crate) async fn run_to_completion<F>(reporter: Reporter, token: CancelToken, work: F) -> Outcome
where
    F: Future<Output = RunResult> + Send,
{
    let result = tokio::select! {
        biased;
        () = token.cancelled() => {
            log::debug!("{} superseded", reporter.kind());
            return Outcome::Superseded;
        }
        result = work => result,
    };

    match result {
        _ if token.is_cancelled() => Outcome::Superseded,
        None => Outcome::Abandoned,
        Some(result) => reporter.deliver(result),
    }
}

/// Mutable bookkeeping of a handler: its current state and the cancel token of the
/// active run.
pub(crate) struct Lifecycle<S> {
    state: Mutex<S>,
    token: Mutex<CancelToken>,
}

impl<S: Clone> Lifecycle<S> {
    pub fn new(initial: S) -> Self {
        Self {
            state: Mutex::new(initial),
            token: Mutex::new(CancelToken::default()),
        }
    }

    /// Starts a new run and returns its token. Any earlier run is cancelled.
    pub fn begin(&self) -> CancelToken {
        let token = CancelToken::default();
        let previous = std::mem::replace(
            &mut *self.token.lock().unwrap_or_else(PoisonError::into_inner),
            token.clone(),
        );
        previous.cancel();
        token
    }

    pub fn cancel(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }

    pub fn set(&self, state: S) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn get(&self) -> S {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
