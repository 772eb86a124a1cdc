use std::sync::{Arc, Weak};

use super::{
    ActionComponentDelegate, ComponentKind, PlatformServices, Presentation, PresentationDelegate,
    PresentationSurface, Reporter,
};
use crate::assertion::assertion_failure;
use crate::config::{ActionConfiguration, ApiContext};
use crate::network::ApiClient;
use crate::persisted::{pending_redirect, PendingRedirect, Persisted};
use crate::redirect_listener::RedirectListener;

/// Dependencies shared by every handler of one dispatcher.
///
/// Delegates are held weakly: a handler never keeps the host's delegate alive.
#[derive(Clone)]
pub(crate) struct ActionContext {
    pub api_context: Arc<ApiContext>,
    pub api_client: Arc<dyn ApiClient>,
    pub configuration: ActionConfiguration,
    pub platform: Arc<dyn PlatformServices>,
    pub redirect_listener: Arc<RedirectListener>,
    pub delegate: Option<Weak<dyn ActionComponentDelegate>>,
    pub presentation_delegate: Option<Weak<dyn PresentationDelegate>>,
}

impl ActionContext {
    pub fn new(
        api_context: Arc<ApiContext>,
        api_client: Arc<dyn ApiClient>,
        configuration: ActionConfiguration,
        platform: Arc<dyn PlatformServices>,
        redirect_listener: Arc<RedirectListener>,
    ) -> Self {
        Self {
            api_context,
            api_client,
            configuration,
            platform,
            redirect_listener,
            delegate: None,
            presentation_delegate: None,
        }
    }

    pub fn reporter(&self, kind: ComponentKind) -> Reporter {
        match &self.delegate {
            Some(delegate) => Reporter::new(delegate.clone(), kind),
            None => Reporter::detached(kind),
        }
    }

    fn presentation_delegate(&self) -> Option<Arc<dyn PresentationDelegate>> {
        self.presentation_delegate.as_ref().and_then(Weak::upgrade)
    }

    /// Shows `surface`, or returns `None` if no presentation delegate is set.
    pub fn present(&self, surface: PresentationSurface) -> Option<Presentation> {
        self.presentation_delegate()
            .map(|delegate| Presentation::show(&delegate, surface))
    }

    /// Like [`Self::present`], reporting a missing presentation delegate as an integration
    /// error. The caller decides whether to continue without UI.
    pub fn present_or_assert(&self, surface: PresentationSurface) -> Option<Presentation> {
        let presentation = self.present(surface);
        if presentation.is_none() {
            assertion_failure("presentationDelegate is nil. Set a presentation delegate before handling this action.");
        }
        presentation
    }

    pub fn pending_redirect(&self) -> Persisted<Option<PendingRedirect>> {
        pending_redirect(self.platform.key_value_store())
    }
}
