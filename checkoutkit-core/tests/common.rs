//! Host side doubles shared across integration tests.
#![allow(dead_code, missing_docs)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use checkoutkit_core::network::HttpApiClient;
use checkoutkit_core::{
    ActionComponent, ActionComponentData, ActionComponentDelegate, ActionConfiguration,
    ActionError, ApiContext, AppLauncher, ComponentKind, Environment, InMemoryKeyValueStore,
    KeyValueStore, PlatformServices, PresentationDelegate, PresentationHandle,
    PresentationSurface, RedirectListener, ThreeDS2Service, TwintSdk, WeChatPaySdk,
};

pub const CLIENT_KEY: &str = "test_ABCDEFGHIJKLMNOPQRSTUVWXYZ123456";

pub fn api_context(server: &mockito::Server) -> Arc<ApiContext> {
    Arc::new(ApiContext::with_base_url(Environment::Test, CLIENT_KEY, &server.url()).unwrap())
}

pub fn configuration() -> ActionConfiguration {
    ActionConfiguration {
        twint_callback_app_scheme: Some("my-shop".to_string()),
        polling_interval: Duration::from_millis(10),
        ..ActionConfiguration::default()
    }
}

/// Polls `condition` until it holds, failing the test after about five seconds.
pub async fn until(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Provided(ActionComponentData, ComponentKind),
    Failed(ActionError, ComponentKind),
    OpenedExternalApplication(ComponentKind),
}

#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<Event>>,
}

impl RecordingDelegate {
    pub fn events(&self) -> Vec<Event> {
        lock(&self.events).clone()
    }

    pub fn terminal(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| !matches!(event, Event::OpenedExternalApplication(_)))
            .collect()
    }
}

impl ActionComponentDelegate for RecordingDelegate {
    fn did_provide(&self, data: ActionComponentData, kind: ComponentKind) {
        lock(&self.events).push(Event::Provided(data, kind));
    }

    fn did_fail(&self, error: ActionError, kind: ComponentKind) {
        lock(&self.events).push(Event::Failed(error, kind));
    }

    fn did_open_external_application(&self, kind: ComponentKind) {
        lock(&self.events).push(Event::OpenedExternalApplication(kind));
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    presented: Mutex<Vec<(PresentationSurface, Arc<PresentationHandle>)>>,
    dismissed: Mutex<Vec<u64>>,
}

impl RecordingPresenter {
    pub fn surfaces(&self) -> Vec<PresentationSurface> {
        lock(&self.presented)
            .iter()
            .map(|(surface, _)| surface.clone())
            .collect()
    }

    pub fn last_handle(&self) -> Arc<PresentationHandle> {
        lock(&self.presented)
            .last()
            .map(|(_, handle)| handle.clone())
            .expect("nothing presented")
    }

    pub fn dismissed_ids(&self) -> Vec<u64> {
        lock(&self.dismissed).clone()
    }
}

impl PresentationDelegate for RecordingPresenter {
    fn present(&self, surface: PresentationSurface, handle: Arc<PresentationHandle>) {
        lock(&self.presented).push((surface, handle));
    }

    fn dismiss(&self, presentation_id: u64) {
        lock(&self.dismissed).push(presentation_id);
    }
}

/// Opens every URL it is asked to.
pub struct OpeningLauncher;

#[async_trait::async_trait]
impl AppLauncher for OpeningLauncher {
    async fn open_custom_scheme_url(&self, _url: String) -> bool {
        true
    }

    async fn open_universal_app_url(&self, _url: String) -> bool {
        true
    }
}

/// A host without any native payment SDK linked.
pub struct TestPlatform {
    pub store: Arc<InMemoryKeyValueStore>,
}

impl TestPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: Arc::new(InMemoryKeyValueStore::new()),
        })
    }
}

impl PlatformServices for TestPlatform {
    fn app_launcher(&self) -> Arc<dyn AppLauncher> {
        Arc::new(OpeningLauncher)
    }

    fn key_value_store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    fn twint(&self) -> Option<Arc<dyn TwintSdk>> {
        None
    }

    fn wechat_pay(&self) -> Option<Arc<dyn WeChatPaySdk>> {
        None
    }

    fn three_ds2(&self) -> Option<Arc<dyn ThreeDS2Service>> {
        None
    }
}

/// An action component talking to `server` over HTTP, with recording host doubles.
pub struct Checkout {
    pub component: Arc<ActionComponent>,
    pub delegate: Arc<RecordingDelegate>,
    pub presenter: Arc<RecordingPresenter>,
    pub listener: Arc<RedirectListener>,
}

impl Checkout {
    pub fn new(server: &mockito::Server, platform: Arc<TestPlatform>) -> Self {
        let context = api_context(server);
        let listener = Arc::new(RedirectListener::new());
        let component = ActionComponent::with_dependencies(
            context.clone(),
            Arc::new(HttpApiClient::new(&context)),
            configuration(),
            platform,
            listener.clone(),
        );
        let delegate = Arc::new(RecordingDelegate::default());
        let presenter = Arc::new(RecordingPresenter::default());
        component.set_delegate(delegate.clone());
        component.set_presentation_delegate(presenter.clone());
        Self {
            component: Arc::new(component),
            delegate,
            presenter,
            listener,
        }
    }
}
