use std::sync::{Arc, Mutex, OnceLock};

use url::Url;

type UrlHandler = Box<dyn FnMut(Url) -> bool + Send>;

/// Single-slot registry that hands the URL the app was opened with to the one
/// component waiting for it.
///
/// At most one handler is registered; registering replaces the previous one. A handler
/// is consumed by the first URL it accepts. A handler that declines a URL (returns `false`)
/// stays registered. The dispatcher keeps at most one handler in flight, which keeps a
/// single writer in practice.
#[derive(Default)]
pub struct RedirectListener {
    handler: Mutex<Option<UrlHandler>>,
}

impl RedirectListener {
    /// Creates an empty listener. Components normally use [`RedirectListener::shared`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide listener the host's URL entry point feeds.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<RedirectListener>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Registers `handler` for the next opened URL, replacing any earlier registration.
    pub fn register_for_url(&self, handler: impl FnMut(Url) -> bool + Send + 'static) {
        let previous = self.slot().replace(Box::new(handler));
        if previous.is_some() {
            log::debug!("replacing pending redirect handler");
        }
    }

    /// Delivers `url` to the registered handler.
    ///
    /// Returns `false` when nothing was registered or the handler declined the URL, so the
    /// host can route the URL itself.
    pub fn application_did_open(&self, url: Url) -> bool {
        // Take the handler before calling it so a handler may register its successor.
        let Some(mut handler) = self.slot().take() else {
            return false;
        };
        if handler(url) {
            return true;
        }

        let mut slot = self.slot();
        if slot.is_none() {
            *slot = Some(handler);
        }
        false
    }

    /// Whether a handler is waiting.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.slot().is_some()
    }

    /// Drops the registered handler without invoking it.
    pub fn unregister(&self) {
        self.slot().take();
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<UrlHandler>> {
        self.handler
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Host entry point for "app opened with URL".
///
/// Returns whether a waiting component consumed the URL. Unparseable URLs are not consumed.
#[uniffi::export]
pub fn application_did_open(url: &str) -> bool {
    match Url::parse(url) {
        Ok(url) => RedirectListener::shared().application_did_open(url),
        Err(e) => {
            log::warn!("ignoring unparseable return url: {e}");
            false
        }
    }
}
