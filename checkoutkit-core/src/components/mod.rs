//! Action handlers and the callback surfaces they report through.
//!
//! Every handler run ends in exactly one of `did_provide` or `did_fail`, unless it is
//! superseded by a newer action or stopped by an integration error.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::action::{ActionComponentData, DocumentAction, VoucherAction};
use crate::error::ActionError;

mod context;
mod lifecycle;
mod platform;

mod awaiting;
mod polling;
mod qr_code;
mod redirect;
mod three_ds2;
mod twint;
mod voucher;
mod wechat_pay;

pub(crate) use context::ActionContext;
pub use lifecycle::Outcome;
pub(crate) use lifecycle::{run_to_completion, CancelToken, Lifecycle, Reporter, RunResult};
pub use platform::*;

pub use awaiting::{AwaitComponent, AwaitState, RedirectableAwaitComponent};
pub use polling::{PollingComponent, PollingState};
pub use qr_code::{QrCodeComponent, QrCodeState};
pub(crate) use redirect::{complete_return, has_query};
pub use redirect::{RedirectComponent, RedirectState};
pub use three_ds2::{ThreeDS2Component, ThreeDS2State};
pub use twint::{TwintSdkComponent, TwintState};
pub use voucher::{DocumentComponent, VoucherComponent, VoucherState};
pub use wechat_pay::{WeChatPaySdkComponent, WeChatPayState};

/// Which handler produced a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, uniffi::Enum)]
#[strum(serialize_all = "snake_case")]
pub enum ComponentKind {
    /// [`RedirectComponent`].
    Redirect,
    /// [`ThreeDS2Component`], classic and compact.
    ThreeDS2,
    /// [`AwaitComponent`].
    Await,
    /// [`RedirectableAwaitComponent`].
    RedirectableAwait,
    /// [`QrCodeComponent`].
    QrCode,
    /// [`TwintSdkComponent`].
    Twint,
    /// [`WeChatPaySdkComponent`].
    WeChatPay,
    /// [`VoucherComponent`].
    Voucher,
    /// [`DocumentComponent`].
    Document,
}

/// Receives the terminal result of every handled action.
#[uniffi::export(with_foreign)]
pub trait ActionComponentDelegate: Send + Sync {
    /// The action finished and `data` goes to `/payments/details`.
    fn did_provide(&self, data: ActionComponentData, kind: ComponentKind);

    /// The action failed or the shopper cancelled it.
    fn did_fail(&self, error: ActionError, kind: ComponentKind);

    /// The shopper was handed to another app. Not terminal.
    fn did_open_external_application(&self, kind: ComponentKind);
}

/// What the host is asked to show.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum PresentationSurface {
    /// In-app browser for a redirect that no app claimed.
    Browser {
        /// Page to load.
        url: String,
    },
    /// Waiting screen while the shopper approves elsewhere.
    Await {
        /// Payment method being awaited, for the icon and copy.
        payment_method_type: String,
    },
    /// QR code with a countdown.
    QrCode {
        /// Payment method that issued the code.
        payment_method_type: String,
        /// Payload to encode.
        qr_code_data: String,
        /// Time left before the code expires.
        expires_in: Duration,
    },
    /// Picker between several installed apps; report the choice with
    /// [`PresentationHandle::selected`].
    AppPicker {
        /// Apps to choose from, in display order.
        apps: Vec<TwintAppConfiguration>,
    },
    /// Voucher details; report completion with [`PresentationHandle::finished`].
    Voucher {
        /// Voucher to render.
        action: VoucherAction,
    },
    /// Document viewer; report completion with [`PresentationHandle::finished`].
    Document {
        /// Document to render.
        action: DocumentAction,
    },
    /// Informational alert. No events are expected.
    Alert {
        /// Text to show.
        message: String,
    },
}

/// Shows and hides handler UI on the host.
#[uniffi::export(with_foreign)]
pub trait PresentationDelegate: Send + Sync {
    /// Shows `surface`. Shopper interaction is reported through `handle`.
    fn present(&self, surface: PresentationSurface, handle: Arc<PresentationHandle>);

    /// Hides the surface presented with the handle of `presentation_id`.
    fn dismiss(&self, presentation_id: u64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PresentationEvent {
    Dismissed,
    Selected(u32),
    Finished,
}

/// Channel from a presented surface back to the handler that presented it.
#[derive(Debug, uniffi::Object)]
pub struct PresentationHandle {
    id: u64,
    events: mpsc::UnboundedSender<PresentationEvent>,
}

impl PresentationHandle {
    fn send(&self, event: PresentationEvent) {
        if self.events.send(event).is_err() {
            log::debug!("presentation {} already closed, dropping {event:?}", self.id);
        }
    }
}

#[uniffi::export]
impl PresentationHandle {
    /// Identifier passed to [`PresentationDelegate::dismiss`].
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// The shopper closed the surface.
    pub fn dismissed(&self) {
        self.send(PresentationEvent::Dismissed);
    }

    /// The shopper picked entry `index` of an app picker.
    pub fn selected(&self, index: u32) {
        self.send(PresentationEvent::Selected(index));
    }

    /// The shopper confirmed a voucher or document.
    pub fn finished(&self) {
        self.send(PresentationEvent::Finished);
    }
}

/// A surface shown on the host. Dropping it dismisses the surface unless the shopper
/// already did.
pub(crate) struct Presentation {
    id: u64,
    delegate: Weak<dyn PresentationDelegate>,
    events: mpsc::UnboundedReceiver<PresentationEvent>,
    closed_by_shopper: bool,
}

impl Presentation {
    pub fn show(delegate: &Arc<dyn PresentationDelegate>, surface: PresentationSurface) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, events) = mpsc::unbounded_channel();
        delegate.present(surface, Arc::new(PresentationHandle { id, events: sender }));
        Self {
            id,
            delegate: Arc::downgrade(delegate),
            events,
            closed_by_shopper: false,
        }
    }

    /// Next shopper interaction. Never resolves once the host released the handle.
    pub async fn next_event(&mut self) -> PresentationEvent {
        match self.events.recv().await {
            Some(event) => {
                if event == PresentationEvent::Dismissed {
                    self.closed_by_shopper = true;
                }
                event
            }
            None => std::future::pending().await,
        }
    }

    /// Resolves when the shopper closes the surface; other events are ignored.
    pub async fn dismissed(&mut self) {
        while self.next_event().await != PresentationEvent::Dismissed {}
    }
}

impl Drop for Presentation {
    fn drop(&mut self) {
        if self.closed_by_shopper {
            return;
        }
        if let Some(delegate) = self.delegate.upgrade() {
            delegate.dismiss(self.id);
        }
    }
}

/// Resolves when the shopper closes `presentation`. Never resolves without one.
pub(crate) async fn shopper_dismissed(presentation: Option<&mut Presentation>) {
    match presentation {
        Some(presentation) => presentation.dismissed().await,
        None => std::future::pending().await,
    }
}
