//! Mocks shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;

use crate::action::{ActionComponentData, WeChatPaySdkData};
use crate::assertion::set_assertion_listener;
use crate::components::{
    ActionComponentDelegate, ActionContext, AppLauncher, ComponentKind, PlatformServices,
    PresentationDelegate, PresentationHandle, PresentationSurface, SdkError, SdkResponder,
    ThreeDS2Responder, ThreeDS2Service, TwintAppConfiguration, TwintSdk, WeChatPaySdk,
    TWINT_SUCCESS_CODE,
};
use crate::config::{ActionConfiguration, ApiContext, Environment};
use crate::error::ActionError;
use crate::network::{ApiClient, ApiError, HttpRequest, HttpResponse};
use crate::persisted::{InMemoryKeyValueStore, KeyValueStore};
use crate::redirect_listener::RedirectListener;

pub const CLIENT_KEY: &str = "test_ABCDEFGHIJKLMNOPQRSTUVWXYZ123456";

pub fn api_context() -> Arc<ApiContext> {
    Arc::new(ApiContext::new(Environment::Test, CLIENT_KEY).unwrap())
}

pub fn server_error() -> ApiError {
    ApiError::Status {
        url: "https://checkoutshopper-test.adyen.com/checkoutshopper/services/PaymentInitiation/v1/status".to_string(),
        status: 500,
        error_code: None,
        message: "internal error".to_string(),
    }
}

/// Polls `condition` until it holds, yielding to spawned tasks in between.
pub async fn until(condition: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Answers requests with scripted JSON bodies or errors, in order.
pub struct ScriptedApiClient {
    responses: Mutex<VecDeque<Result<serde_json::Value, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedApiClient {
    pub fn new(responses: Vec<Result<serde_json::Value, ApiError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }
}

#[async_trait]
impl ApiClient for ScriptedApiClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        lock(&self.requests).push(request.clone());
        let next = lock(&self.responses).pop_front();
        match next {
            Some(Ok(body)) => Ok(HttpResponse {
                status: 200,
                body: body.to_string().into_bytes(),
            }),
            Some(Err(error)) => Err(error),
            None => Err(ApiError::InvalidRequest {
                error: format!("no scripted response for {}", request.url),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegateEvent {
    Provided(ActionComponentData, ComponentKind),
    Failed(ActionError, ComponentKind),
    OpenedExternalApplication(ComponentKind),
}

#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn weak(self: &Arc<Self>) -> Weak<dyn ActionComponentDelegate> {
        let delegate: Arc<dyn ActionComponentDelegate> = self.clone();
        Arc::downgrade(&delegate)
    }

    pub fn events(&self) -> Vec<DelegateEvent> {
        lock(&self.events).clone()
    }

    pub fn provided(&self) -> Vec<(ActionComponentData, ComponentKind)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DelegateEvent::Provided(data, kind) => Some((data, kind)),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<(ActionError, ComponentKind)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DelegateEvent::Failed(error, kind) => Some((error, kind)),
                _ => None,
            })
            .collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.provided().len() + self.failed().len()
    }
}

impl ActionComponentDelegate for RecordingDelegate {
    fn did_provide(&self, data: ActionComponentData, kind: ComponentKind) {
        lock(&self.events).push(DelegateEvent::Provided(data, kind));
    }

    fn did_fail(&self, error: ActionError, kind: ComponentKind) {
        lock(&self.events).push(DelegateEvent::Failed(error, kind));
    }

    fn did_open_external_application(&self, kind: ComponentKind) {
        lock(&self.events).push(DelegateEvent::OpenedExternalApplication(kind));
    }
}

#[derive(Default)]
pub struct RecordingPresenter {
    presented: Mutex<Vec<(PresentationSurface, Arc<PresentationHandle>)>>,
    dismissed: Mutex<Vec<u64>>,
}

impl RecordingPresenter {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn weak(self: &Arc<Self>) -> Weak<dyn PresentationDelegate> {
        let delegate: Arc<dyn PresentationDelegate> = self.clone();
        Arc::downgrade(&delegate)
    }

    pub fn surfaces(&self) -> Vec<PresentationSurface> {
        lock(&self.presented)
            .iter()
            .map(|(surface, _)| surface.clone())
            .collect()
    }

    pub fn presented_count(&self) -> usize {
        lock(&self.presented).len()
    }

    pub fn last_handle(&self) -> Arc<PresentationHandle> {
        lock(&self.presented)
            .last()
            .map(|(_, handle)| handle.clone())
            .expect("nothing was presented")
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

pub struct MockAppLauncher {
    opens: AtomicBool,
    opened: Mutex<Vec<String>>,
}

impl MockAppLauncher {
    pub fn new(opens: bool) -> Self {
        Self {
            opens: AtomicBool::new(opens),
            opened: Mutex::default(),
        }
    }

    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }

    fn open(&self, url: String) -> bool {
        lock(&self.opened).push(url);
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AppLauncher for MockAppLauncher {
    async fn open_custom_scheme_url(&self, url: String) -> bool {
        self.open(url)
    }

    async fn open_universal_app_url(&self, url: String) -> bool {
        self.open(url)
    }
}

pub fn twint_app(name: &str) -> TwintAppConfiguration {
    TwintAppConfiguration {
        app_display_name: name.to_string(),
        app_url_scheme: name.to_lowercase().replace(' ', "-"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TwintCall {
    FetchInstalledApps,
    Pay {
        token: String,
        app: TwintAppConfiguration,
        callback_app_scheme: String,
    },
    RegisterForUof {
        token: String,
        app: TwintAppConfiguration,
        callback_app_scheme: String,
    },
    HandleOpen {
        url: String,
    },
}

pub struct TwintSpy {
    apps: Vec<TwintAppConfiguration>,
    pay_error: Option<SdkError>,
    response_code: i64,
    calls: Mutex<Vec<TwintCall>>,
}

impl TwintSpy {
    pub fn new(apps: Vec<TwintAppConfiguration>) -> Self {
        Self {
            apps,
            pay_error: None,
            response_code: TWINT_SUCCESS_CODE,
            calls: Mutex::default(),
        }
    }

    pub fn with_pay_error(mut self, error: SdkError) -> Self {
        self.pay_error = Some(error);
        self
    }

    pub const fn with_response_code(mut self, code: i64) -> Self {
        self.response_code = code;
        self
    }

    pub fn calls(&self) -> Vec<TwintCall> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl TwintSdk for TwintSpy {
    async fn fetch_installed_app_configurations(&self) -> Vec<TwintAppConfiguration> {
        lock(&self.calls).push(TwintCall::FetchInstalledApps);
        self.apps.clone()
    }

    fn pay(
        &self,
        token: String,
        app: TwintAppConfiguration,
        callback_app_scheme: String,
    ) -> Option<SdkError> {
        lock(&self.calls).push(TwintCall::Pay {
            token,
            app,
            callback_app_scheme,
        });
        self.pay_error.clone()
    }

    fn register_for_uof(
        &self,
        token: String,
        app: TwintAppConfiguration,
        callback_app_scheme: String,
    ) -> Option<SdkError> {
        lock(&self.calls).push(TwintCall::RegisterForUof {
            token,
            app,
            callback_app_scheme,
        });
        self.pay_error.clone()
    }

    fn handle_open(&self, url: String, responder: Arc<SdkResponder>) -> bool {
        lock(&self.calls).push(TwintCall::HandleOpen { url });
        responder.respond(self.response_code, String::new());
        true
    }
}

pub struct WeChatSpy {
    installed: bool,
    result_code: i64,
    pay_requests: Mutex<Vec<WeChatPaySdkData>>,
}

impl WeChatSpy {
    pub fn installed(result_code: i64) -> Self {
        Self {
            installed: true,
            result_code,
            pay_requests: Mutex::default(),
        }
    }

    pub fn not_installed() -> Self {
        Self {
            installed: false,
            ..Self::installed(0)
        }
    }

    pub fn pay_requests(&self) -> Vec<WeChatPaySdkData> {
        lock(&self.pay_requests).clone()
    }
}

impl WeChatPaySdk for WeChatSpy {
    fn is_app_installed(&self) -> bool {
        self.installed
    }

    fn send_pay_request(&self, data: WeChatPaySdkData) -> bool {
        lock(&self.pay_requests).push(data);
        true
    }

    fn handle_open_url(&self, _url: String, responder: Arc<SdkResponder>) -> bool {
        responder.respond(self.result_code, String::new());
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreeDS2Call {
    Fingerprint(String),
    Challenge(String),
}

pub struct MockThreeDS2Service {
    fingerprint: Result<String, String>,
    challenge: Result<String, String>,
    calls: Mutex<Vec<ThreeDS2Call>>,
}

impl MockThreeDS2Service {
    pub fn new(fingerprint: Result<String, String>, challenge: Result<String, String>) -> Self {
        Self {
            fingerprint,
            challenge,
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<ThreeDS2Call> {
        lock(&self.calls).clone()
    }

    fn answer(result: &Result<String, String>, responder: &ThreeDS2Responder) {
        match result.clone() {
            Ok(result) => responder.succeed(result),
            Err(message) => responder.fail(message),
        }
    }
}

impl ThreeDS2Service for MockThreeDS2Service {
    fn perform_fingerprint(&self, token: String, responder: Arc<ThreeDS2Responder>) {
        lock(&self.calls).push(ThreeDS2Call::Fingerprint(token));
        Self::answer(&self.fingerprint, &responder);
    }

    fn perform_challenge(&self, token: String, responder: Arc<ThreeDS2Responder>) {
        lock(&self.calls).push(ThreeDS2Call::Challenge(token));
        Self::answer(&self.challenge, &responder);
    }
}

pub struct MockPlatform {
    pub launcher: Arc<MockAppLauncher>,
    pub store: Arc<InMemoryKeyValueStore>,
    twint: Option<Arc<TwintSpy>>,
    wechat_pay: Option<Arc<WeChatSpy>>,
    three_ds2: Option<Arc<MockThreeDS2Service>>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            launcher: Arc::new(MockAppLauncher::new(true)),
            store: Arc::new(InMemoryKeyValueStore::new()),
            twint: None,
            wechat_pay: None,
            three_ds2: None,
        }
    }
}

impl MockPlatform {
    pub fn launcher_opens(mut self, opens: bool) -> Self {
        self.launcher = Arc::new(MockAppLauncher::new(opens));
        self
    }

    pub fn with_twint(mut self, twint: Arc<TwintSpy>) -> Self {
        self.twint = Some(twint);
        self
    }

    pub fn with_wechat_pay(mut self, wechat_pay: Arc<WeChatSpy>) -> Self {
        self.wechat_pay = Some(wechat_pay);
        self
    }

    pub fn with_three_ds2(mut self, three_ds2: Arc<MockThreeDS2Service>) -> Self {
        self.three_ds2 = Some(three_ds2);
        self
    }
}

impl PlatformServices for MockPlatform {
    fn app_launcher(&self) -> Arc<dyn AppLauncher> {
        self.launcher.clone()
    }

    fn key_value_store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    fn twint(&self) -> Option<Arc<dyn TwintSdk>> {
        self.twint.clone().map(|twint| twint as Arc<dyn TwintSdk>)
    }

    fn wechat_pay(&self) -> Option<Arc<dyn WeChatPaySdk>> {
        self.wechat_pay
            .clone()
            .map(|wechat_pay| wechat_pay as Arc<dyn WeChatPaySdk>)
    }

    fn three_ds2(&self) -> Option<Arc<dyn ThreeDS2Service>> {
        self.three_ds2
            .clone()
            .map(|three_ds2| three_ds2 as Arc<dyn ThreeDS2Service>)
    }
}

pub fn test_configuration() -> ActionConfiguration {
    ActionConfiguration {
        twint_callback_app_scheme: Some("my-shop".to_string()),
        ..ActionConfiguration::default()
    }
}

/// Handler context without delegates.
pub fn context_with(client: Arc<ScriptedApiClient>) -> ActionContext {
    ActionContext::new(
        api_context(),
        client,
        test_configuration(),
        Arc::new(MockPlatform::default()),
        Arc::new(RedirectListener::new()),
    )
}

/// Everything a handler talks to, recorded.
pub struct Harness {
    pub client: Arc<ScriptedApiClient>,
    pub platform: Arc<MockPlatform>,
    pub listener: Arc<RedirectListener>,
    pub delegate: Arc<RecordingDelegate>,
    pub presenter: Arc<RecordingPresenter>,
    pub configuration: ActionConfiguration,
}

impl Harness {
    pub fn new(responses: Vec<Result<serde_json::Value, ApiError>>) -> Self {
        Self::with_platform(responses, MockPlatform::default())
    }

    pub fn with_platform(
        responses: Vec<Result<serde_json::Value, ApiError>>,
        platform: MockPlatform,
    ) -> Self {
        Self {
            client: ScriptedApiClient::new(responses),
            platform: Arc::new(platform),
            listener: Arc::new(RedirectListener::new()),
            delegate: RecordingDelegate::new(),
            presenter: RecordingPresenter::new(),
            configuration: test_configuration(),
        }
    }

    pub fn context(&self) -> ActionContext {
        let mut context = ActionContext::new(
            api_context(),
            self.client.clone(),
            self.configuration.clone(),
            self.platform.clone(),
            self.listener.clone(),
        );
        context.delegate = Some(self.delegate.weak());
        context.presentation_delegate = Some(self.presenter.weak());
        context
    }
}

static ASSERTION_SERIAL: Mutex<()> = Mutex::new(());

/// Captures integration errors instead of panicking. Spies are serialized across tests
/// because the assertion listener is process-wide.
pub struct AssertionSpy {
    messages: Arc<Mutex<Vec<String>>>,
    _serial: MutexGuard<'static, ()>,
}

impl AssertionSpy {
    pub fn install() -> Self {
        let serial = lock(&ASSERTION_SERIAL);
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = messages.clone();
        set_assertion_listener(Some(Arc::new(move |message| lock(&sink).push(message))));
        Self {
            messages,
            _serial: serial,
        }
    }

    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }
}

impl Drop for AssertionSpy {
    fn drop(&mut self) {
        set_assertion_listener(None);
    }
}
