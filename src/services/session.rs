//! Embedded-browser session control.
//!
//! One [`SessionController`] exists per live service, created and
//! destroyed in lock-step with the service's presence in the registry.
//! The embedded browser itself is an external collaborator behind the
//! [`BrowserSession`] and [`SessionHost`] traits; this module owns the
//! session lifecycle state machine, partition naming, and the translation
//! of raw session events into aggregator signals and external-browser
//! handoffs.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::app::events::{AppEvent, EventBus};
use crate::domain::{catalog, Service, ServiceId, ServiceType};

/// Lifecycle states of an embedded session.
///
/// `Unstarted → Loading → Ready → (Reloading → Loading) → Destroyed`.
/// A session whose page never finishes loading stays in `Loading`; that
/// must never crash or stall the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unstarted,
    Loading,
    Ready,
    Reloading,
    Destroyed,
}

/// Raw events emitted by the embedded-browser collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoadingStarted,
    LoadingFinished,
    ContentReady,
    NewWindow(String),
    TitleChanged(String),
}

/// Signal a controller hands back to the orchestration layer after
/// digesting a raw session event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The session finished loading for the first time.
    Ready,
    /// The page title changed; forward to the unread aggregator.
    Title(String),
}

/// One live embedded-browser content surface.
///
/// Implemented by the shell; everything here is fire-and-forget from the
/// core's perspective.
pub trait BrowserSession: Send {
    /// Navigates the session to a URL.
    fn navigate(&mut self, url: &str);
    /// Mutes or unmutes session audio.
    fn set_audio_muted(&mut self, muted: bool);
    /// Injects a script into the page, e.g. an unread probe.
    fn inject_script(&mut self, script: &str);
    /// Tears the content surface down. The storage partition survives.
    fn destroy(&mut self);
}

/// Factory and system-integration surface provided by the shell.
pub trait SessionHost: Send + Sync {
    /// Creates a content surface in the given storage partition.
    fn create_session(
        &self,
        partition: &str,
        url: &str,
        user_agent: Option<&str>,
    ) -> Box<dyn BrowserSession>;

    /// Opens a URL in the system's default browser.
    fn open_external(&self, url: &str);

    /// Opens a provider pop-up (call windows, composers) in an app-owned
    /// window. Defaults to the external browser for shells without pop-up
    /// support.
    fn open_popup(&self, _service_id: &ServiceId, url: &str) {
        self.open_external(url);
    }

    /// Shows or hides the per-session loading spinner.
    fn set_spinner(&self, service_id: &ServiceId, visible: bool);

    /// Shows or hides the per-session status bar. Default is a no-op for
    /// shells without one.
    fn set_status_bar(&self, _service_id: &ServiceId, _visible: bool) {}
}

/// Builds the storage-partition name for a service.
///
/// Keyed by `(type, id)` so two accounts of the same provider stay
/// isolated from each other.
pub fn partition_key(service_type: ServiceType, id: &ServiceId) -> String {
    format!("persist:{}_{}", service_type.as_str(), id)
}

/// Injected into providers that blink their page title to draw attention.
/// Debounces `document.title` writes so the parsed unread count does not
/// flicker with the blink cycle.
const TITLE_BLINK_GUARD: &str = r#"(function () {
    var settled = document.title;
    var pending = null;
    Object.defineProperty(document, 'title', {
        get: function () { return settled; },
        set: function (value) {
            if (pending) { clearTimeout(pending); }
            pending = setTimeout(function () { settled = value; }, 300);
        }
    });
})();"#;

/// Controller for one service's embedded session.
pub struct SessionController {
    service_id: ServiceId,
    service_type: ServiceType,
    partition: String,
    url: String,
    state: SessionState,
    status_bar_visible: bool,
    title_blink: bool,
    allow_popups: bool,
    allow_external_navigation: bool,
    custom_script: Option<String>,
    loading_since: Option<Instant>,
    session: Box<dyn BrowserSession>,
}

impl SessionController {
    /// Instantiates a session for a service.
    pub fn create(service: &Service, host: &dyn SessionHost) -> Self {
        let partition = partition_key(service.service_type, &service.id);
        let profile = catalog::profile(service.service_type);
        let mut session = host.create_session(&partition, &service.url, profile.user_agent);
        session.set_audio_muted(service.muted);
        host.set_status_bar(&service.id, service.status_bar_visible);
        info!(service = %service.id, partition = %partition, "session created");

        Self {
            service_id: service.id.clone(),
            service_type: service.service_type,
            partition,
            url: service.url.clone(),
            state: SessionState::Unstarted,
            status_bar_visible: service.status_bar_visible,
            title_blink: profile.title_blink,
            allow_popups: profile.allow_popups,
            allow_external_navigation: service.allow_external_navigation,
            custom_script: service.custom_script.clone(),
            // The load deadline runs from creation, so a page that never
            // even starts loading still settles the splash gate.
            loading_since: Some(Instant::now()),
            session,
        }
    }

    /// The service this controller belongs to.
    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The storage partition this session lives in.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// Digests one raw session event into at most one signal for the
    /// orchestration layer.
    pub fn handle_event(&mut self, event: SessionEvent, host: &dyn SessionHost) -> Option<SessionSignal> {
        match event {
            SessionEvent::LoadingStarted => {
                self.state = SessionState::Loading;
                self.loading_since = Some(Instant::now());
                host.set_spinner(&self.service_id, true);
                None
            }
            SessionEvent::LoadingFinished => {
                host.set_spinner(&self.service_id, false);
                self.loading_since = None;
                let first_ready = self.state != SessionState::Ready;
                self.state = SessionState::Ready;
                first_ready.then_some(SessionSignal::Ready)
            }
            SessionEvent::ContentReady => {
                if self.title_blink {
                    self.session.inject_script(TITLE_BLINK_GUARD);
                }
                if let Some(script) = &self.custom_script {
                    self.session.inject_script(script);
                }
                None
            }
            SessionEvent::NewWindow(url) => {
                self.open_externally(&url, host);
                None
            }
            SessionEvent::TitleChanged(title) => Some(SessionSignal::Title(title)),
        }
    }

    /// Redirects a pop-up request to the system browser instead of
    /// navigating in place. Non-web schemes are dropped.
    fn open_externally(&self, raw: &str, host: &dyn SessionHost) {
        if !self.allow_external_navigation {
            debug!(service = %self.service_id, url = raw, "external navigation disabled");
            return;
        }
        match url::Url::parse(raw) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                if self.allow_popups {
                    host.open_popup(&self.service_id, raw);
                } else {
                    host.open_external(raw);
                }
            }
            Ok(parsed) if parsed.scheme() == "mailto" => {
                host.open_external(raw);
            }
            Ok(parsed) => {
                debug!(scheme = parsed.scheme(), "refusing to open non-web scheme");
            }
            Err(err) => {
                warn!(url = raw, %err, "new-window request with unparseable url");
            }
        }
    }

    /// Mutes or unmutes the session.
    pub fn set_muted(&mut self, muted: bool) {
        self.session.set_audio_muted(muted);
    }

    /// Tears the content down and recreates it in the same partition,
    /// preserving service identity.
    pub fn reload(&mut self, host: &dyn SessionHost) {
        self.session.destroy();
        self.state = SessionState::Reloading;
        self.loading_since = Some(Instant::now());
        self.session = host.create_session(&self.partition, &self.url, None);
        info!(service = %self.service_id, "session reloading");
    }

    /// Navigates the session to a new URL.
    pub fn navigate(&mut self, url: impl Into<String>) {
        self.url = url.into();
        self.session.navigate(&self.url);
    }

    /// Shows or hides the session's status bar.
    pub fn set_status_bar(&mut self, visible: bool, host: &dyn SessionHost) {
        self.status_bar_visible = visible;
        host.set_status_bar(&self.service_id, visible);
    }

    /// Applies field changes from an updated service record.
    pub fn apply_update(&mut self, service: &Service, host: &dyn SessionHost) {
        self.allow_external_navigation = service.allow_external_navigation;
        self.custom_script = service.custom_script.clone();
        self.set_muted(service.muted);
        if service.status_bar_visible != self.status_bar_visible {
            self.set_status_bar(service.status_bar_visible, host);
        }
        if service.url != self.url {
            self.navigate(service.url.clone());
        }
    }

    /// Whether the session has been stuck short of ready past the
    /// deadline.
    pub fn stalled(&self, timeout: Duration, now: Instant) -> bool {
        matches!(
            self.state,
            SessionState::Unstarted | SessionState::Loading | SessionState::Reloading
        ) && self
                .loading_since
                .is_some_and(|since| now.duration_since(since) >= timeout)
    }

    fn destroy(mut self) {
        self.session.destroy();
        self.state = SessionState::Destroyed;
        info!(service = %self.service_id, "session destroyed");
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("service_id", &self.service_id)
            .field("service_type", &self.service_type)
            .field("state", &self.state)
            .finish()
    }
}

/// Owns one controller per live service and the splash gate.
///
/// The splash screen dismisses once every live session is either ready or
/// past its per-session load deadline, so one dead service can never
/// stall the gate forever.
pub struct SessionManager {
    host: Arc<dyn SessionHost>,
    controllers: HashMap<ServiceId, SessionController>,
    ready: HashSet<ServiceId>,
    load_timeout: Duration,
    /// New sessions start audio-muted regardless of the service record.
    start_muted: bool,
    splash_dismissed: bool,
    events: EventBus,
}

impl SessionManager {
    /// Creates a manager backed by the given shell host.
    pub fn new(host: Arc<dyn SessionHost>, load_timeout: Duration, events: EventBus) -> Self {
        Self {
            host,
            controllers: HashMap::new(),
            ready: HashSet::new(),
            load_timeout,
            start_muted: false,
            splash_dismissed: false,
            events,
        }
    }

    /// Makes every subsequently created session start audio-muted, on top
    /// of per-service mute flags.
    pub fn with_start_muted(mut self, on: bool) -> Self {
        self.start_muted = on;
        self
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Whether a session exists for the service.
    pub fn contains(&self, id: &ServiceId) -> bool {
        self.controllers.contains_key(id)
    }

    /// Lifecycle state of one session.
    pub fn state_of(&self, id: &ServiceId) -> Option<SessionState> {
        self.controllers.get(id).map(|c| c.state())
    }

    /// Number of sessions that have reached ready at least once.
    pub fn ready_count(&self) -> usize {
        self.ready.len()
    }

    /// Creates a session for a service. Idempotent: an existing session
    /// is refreshed instead of duplicated.
    pub fn create_for(&mut self, service: &Service) {
        if self.controllers.contains_key(&service.id) {
            self.update_for(service);
            return;
        }
        let mut controller = SessionController::create(service, self.host.as_ref());
        if self.start_muted && !service.muted {
            controller.set_muted(true);
        }
        self.controllers.insert(service.id.clone(), controller);
    }

    /// Pushes updated service fields into its session, if one is live.
    pub fn update_for(&mut self, service: &Service) {
        if let Some(controller) = self.controllers.get_mut(&service.id) {
            controller.apply_update(service, self.host.as_ref());
        }
    }

    /// Shows or hides one session's status bar.
    pub fn set_status_bar(&mut self, id: &ServiceId, visible: bool) {
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.set_status_bar(visible, self.host.as_ref());
        }
    }

    /// Destroys the session for a service. Absent ids are a no-op.
    pub fn destroy(&mut self, id: &ServiceId) -> bool {
        self.ready.remove(id);
        match self.controllers.remove(id) {
            Some(controller) => {
                controller.destroy();
                true
            }
            None => false,
        }
    }

    /// Reloads one session in place.
    pub fn reload(&mut self, id: &ServiceId) {
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.reload(self.host.as_ref());
        }
    }

    /// Mutes or unmutes one session.
    pub fn set_muted(&mut self, id: &ServiceId, muted: bool) {
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.set_muted(muted);
        }
    }

    /// Navigates one session.
    pub fn navigate(&mut self, id: &ServiceId, url: &str) {
        if let Some(controller) = self.controllers.get_mut(id) {
            controller.navigate(url);
        }
    }

    /// Routes a raw session event to its controller. Returns a changed
    /// title, if any, for the caller to forward to the aggregator.
    pub fn on_session_event(&mut self, id: &ServiceId, event: SessionEvent) -> Option<String> {
        let Some(controller) = self.controllers.get_mut(id) else {
            debug!(service = %id, "event for unknown session dropped");
            return None;
        };
        match controller.handle_event(event, self.host.as_ref()) {
            Some(SessionSignal::Ready) => {
                self.ready.insert(id.clone());
                self.check_splash_gate(Instant::now());
                None
            }
            Some(SessionSignal::Title(title)) => Some(title),
            None => None,
        }
    }

    /// Periodic tick: re-evaluates the splash gate against load
    /// deadlines.
    pub fn poll(&mut self, now: Instant) {
        self.check_splash_gate(now);
    }

    /// Whether the splash gate has opened.
    pub fn splash_dismissed(&self) -> bool {
        self.splash_dismissed
    }

    fn check_splash_gate(&mut self, now: Instant) {
        if self.splash_dismissed {
            return;
        }
        // Vacuously settled with zero sessions: a fresh install has
        // nothing to wait for.
        let all_settled = self.controllers.values().all(|c| {
            c.state() == SessionState::Ready || c.stalled(self.load_timeout, now)
        });
        if all_settled {
            self.splash_dismissed = true;
            info!(
                ready = self.ready.len(),
                total = self.controllers.len(),
                "all sessions settled, splash dismissable"
            );
            self.events.publish(AppEvent::SplashDismissable);
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.controllers.len())
            .field("ready", &self.ready.len())
            .field("splash_dismissed", &self.splash_dismissed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSession {
        navigated: Vec<String>,
        muted: Option<bool>,
        injected: Vec<String>,
        destroyed: bool,
    }

    type SessionLog = Arc<Mutex<RecordingSession>>;

    struct LoggedSession(SessionLog);

    impl BrowserSession for LoggedSession {
        fn navigate(&mut self, url: &str) {
            self.0.lock().unwrap().navigated.push(url.to_owned());
        }
        fn set_audio_muted(&mut self, muted: bool) {
            self.0.lock().unwrap().muted = Some(muted);
        }
        fn inject_script(&mut self, script: &str) {
            self.0.lock().unwrap().injected.push(script.to_owned());
        }
        fn destroy(&mut self) {
            self.0.lock().unwrap().destroyed = true;
        }
    }

    #[derive(Default)]
    struct TestHost {
        sessions: Mutex<Vec<(String, SessionLog)>>,
        external: Mutex<Vec<String>>,
        popups: Mutex<Vec<(ServiceId, String)>>,
        spinner_toggles: AtomicUsize,
        status_bars: Mutex<Vec<(ServiceId, bool)>>,
    }

    impl SessionHost for TestHost {
        fn create_session(
            &self,
            partition: &str,
            _url: &str,
            _user_agent: Option<&str>,
        ) -> Box<dyn BrowserSession> {
            let log: SessionLog = Arc::default();
            self.sessions
                .lock()
                .unwrap()
                .push((partition.to_owned(), Arc::clone(&log)));
            Box::new(LoggedSession(log))
        }

        fn open_external(&self, url: &str) {
            self.external.lock().unwrap().push(url.to_owned());
        }

        fn open_popup(&self, service_id: &ServiceId, url: &str) {
            self.popups
                .lock()
                .unwrap()
                .push((service_id.clone(), url.to_owned()));
        }

        fn set_spinner(&self, _service_id: &ServiceId, _visible: bool) {
            self.spinner_toggles.fetch_add(1, Ordering::SeqCst);
        }

        fn set_status_bar(&self, service_id: &ServiceId, visible: bool) {
            self.status_bars
                .lock()
                .unwrap()
                .push((service_id.clone(), visible));
        }
    }

    fn service(name: &str) -> Service {
        Service::new(name, "https://example.test/", ServiceType::Slack)
    }

    #[test]
    fn partition_isolates_two_accounts_of_same_provider() {
        let a = service("work");
        let b = service("personal");
        assert_ne!(
            partition_key(a.service_type, &a.id),
            partition_key(b.service_type, &b.id)
        );
        assert!(partition_key(a.service_type, &a.id).starts_with("persist:slack_"));
    }

    #[test]
    fn lifecycle_unstarted_to_ready() {
        let host = TestHost::default();
        let svc = service("work");
        let mut controller = SessionController::create(&svc, &host);
        assert_eq!(controller.state(), SessionState::Unstarted);

        controller.handle_event(SessionEvent::LoadingStarted, &host);
        assert_eq!(controller.state(), SessionState::Loading);

        let signal = controller.handle_event(SessionEvent::LoadingFinished, &host);
        assert_eq!(controller.state(), SessionState::Ready);
        assert_eq!(signal, Some(SessionSignal::Ready));
    }

    #[test]
    fn ready_signal_fires_once_per_load_cycle() {
        let host = TestHost::default();
        let mut controller = SessionController::create(&service("work"), &host);

        controller.handle_event(SessionEvent::LoadingStarted, &host);
        assert!(controller.handle_event(SessionEvent::LoadingFinished, &host).is_some());
        // In-page navigations finish loading again without a state change.
        assert!(controller.handle_event(SessionEvent::LoadingFinished, &host).is_none());
    }

    #[test]
    fn new_window_opens_web_urls_externally() {
        let host = TestHost::default();
        // Gmail keeps popups disabled, so web urls leave the app.
        let svc = Service::new("inbox", "https://mail.google.com/", ServiceType::Gmail);
        let mut controller = SessionController::create(&svc, &host);

        controller.handle_event(SessionEvent::NewWindow("https://example.org/x".into()), &host);
        controller.handle_event(SessionEvent::NewWindow("mailto:a@example.org".into()), &host);
        controller.handle_event(SessionEvent::NewWindow("javascript:alert(1)".into()), &host);
        controller.handle_event(SessionEvent::NewWindow("not a url".into()), &host);

        let external = host.external.lock().unwrap().clone();
        assert_eq!(external, ["https://example.org/x", "mailto:a@example.org"]);
        assert!(host.popups.lock().unwrap().is_empty());
    }

    #[test]
    fn new_window_uses_popup_when_provider_allows_it() {
        let host = TestHost::default();
        let svc = service("work");
        let mut controller = SessionController::create(&svc, &host);

        controller.handle_event(SessionEvent::NewWindow("https://files.slack.com/doc".into()), &host);
        // Mail links always leave the app, popups or not.
        controller.handle_event(SessionEvent::NewWindow("mailto:a@example.org".into()), &host);

        let popups = host.popups.lock().unwrap().clone();
        assert_eq!(popups, [(svc.id.clone(), "https://files.slack.com/doc".to_string())]);
        assert_eq!(*host.external.lock().unwrap(), ["mailto:a@example.org"]);
    }

    #[test]
    fn new_window_respects_navigation_flag() {
        let host = TestHost::default();
        let mut svc = service("work");
        svc.allow_external_navigation = false;
        let mut controller = SessionController::create(&svc, &host);

        controller.handle_event(SessionEvent::NewWindow("https://example.org/".into()), &host);
        assert!(host.external.lock().unwrap().is_empty());
    }

    #[test]
    fn content_ready_injects_custom_script() {
        let host = TestHost::default();
        let mut svc = service("work");
        svc.custom_script = Some("countBadges();".to_string());
        let mut controller = SessionController::create(&svc, &host);

        controller.handle_event(SessionEvent::ContentReady, &host);
        let sessions = host.sessions.lock().unwrap();
        assert_eq!(sessions[0].1.lock().unwrap().injected, ["countBadges();"]);
    }

    #[test]
    fn blinking_titles_get_a_debounce_shim() {
        let host = TestHost::default();
        let svc = Service::new("calls", "https://web.skype.com/", ServiceType::Skype);
        let mut controller = SessionController::create(&svc, &host);

        controller.handle_event(SessionEvent::ContentReady, &host);
        let sessions = host.sessions.lock().unwrap();
        let injected = sessions[0].1.lock().unwrap().injected.clone();
        assert_eq!(injected, [TITLE_BLINK_GUARD]);
    }

    #[test]
    fn stable_titles_skip_the_debounce_shim() {
        let host = TestHost::default();
        let mut controller = SessionController::create(&service("work"), &host);

        controller.handle_event(SessionEvent::ContentReady, &host);
        let sessions = host.sessions.lock().unwrap();
        assert!(sessions[0].1.lock().unwrap().injected.is_empty());
    }

    #[test]
    fn status_bar_follows_service_updates() {
        let host = Arc::new(TestHost::default());
        let mut mgr = SessionManager::new(
            Arc::clone(&host) as Arc<dyn SessionHost>,
            Duration::from_secs(30),
            EventBus::new(),
        );
        let mut svc = service("work");
        mgr.create_for(&svc);

        svc.status_bar_visible = false;
        mgr.update_for(&svc);
        // Redundant update does not re-toggle.
        mgr.update_for(&svc);
        mgr.set_status_bar(&svc.id, true);

        let toggles: Vec<bool> = host
            .status_bars
            .lock()
            .unwrap()
            .iter()
            .map(|(_, v)| *v)
            .collect();
        assert_eq!(toggles, [true, false, true]);
    }

    #[test]
    fn reload_recreates_content_in_same_partition() {
        let host = TestHost::default();
        let mut controller = SessionController::create(&service("work"), &host);
        let first_partition = controller.partition().to_owned();

        controller.reload(&host);
        assert_eq!(controller.state(), SessionState::Reloading);

        let sessions = host.sessions.lock().unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].0, first_partition);
        assert_eq!(sessions[1].0, first_partition);
        assert!(sessions[0].1.lock().unwrap().destroyed);
    }

    #[test]
    fn stalled_session_does_not_crash_and_reports_after_deadline() {
        let host = TestHost::default();
        let mut controller = SessionController::create(&service("work"), &host);
        controller.handle_event(SessionEvent::LoadingStarted, &host);

        let now = Instant::now();
        assert!(!controller.stalled(Duration::from_secs(30), now));
        assert!(controller.stalled(Duration::from_secs(0), now));
        assert_eq!(controller.state(), SessionState::Loading);
    }

    #[test]
    fn manager_creates_and_destroys_in_lock_step() {
        let host = Arc::new(TestHost::default());
        let mut mgr = SessionManager::new(
            Arc::clone(&host) as Arc<dyn SessionHost>,
            Duration::from_secs(30),
            EventBus::new(),
        );
        let svc = service("work");

        mgr.create_for(&svc);
        assert!(mgr.contains(&svc.id));
        assert_eq!(mgr.len(), 1);

        // Idempotent.
        mgr.create_for(&svc);
        assert_eq!(mgr.len(), 1);

        assert!(mgr.destroy(&svc.id));
        assert!(!mgr.contains(&svc.id));
        assert!(!mgr.destroy(&svc.id));
    }

    #[test]
    fn start_muted_preference_mutes_new_sessions() {
        let host = Arc::new(TestHost::default());
        let mut mgr = SessionManager::new(
            Arc::clone(&host) as Arc<dyn SessionHost>,
            Duration::from_secs(30),
            EventBus::new(),
        )
        .with_start_muted(true);

        let svc = service("work");
        assert!(!svc.muted);
        mgr.create_for(&svc);

        let sessions = host.sessions.lock().unwrap();
        assert_eq!(sessions[0].1.lock().unwrap().muted, Some(true));
    }

    #[test]
    fn manager_forwards_titles_only() {
        let host = Arc::new(TestHost::default());
        let mut mgr = SessionManager::new(
            Arc::clone(&host) as Arc<dyn SessionHost>,
            Duration::from_secs(30),
            EventBus::new(),
        );
        let svc = service("work");
        mgr.create_for(&svc);

        assert_eq!(mgr.on_session_event(&svc.id, SessionEvent::LoadingStarted), None);
        assert_eq!(
            mgr.on_session_event(&svc.id, SessionEvent::TitleChanged("(2) Slack".into())),
            Some("(2) Slack".to_string())
        );
    }

    #[test]
    fn splash_gate_opens_when_all_sessions_ready() {
        let bus = EventBus::new();
        let dismissed = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&dismissed);
        bus.subscribe(move |event| {
            if matches!(event, AppEvent::SplashDismissable) {
                d.fetch_add(1, Ordering::SeqCst);
            }
        });

        let host = Arc::new(TestHost::default());
        let mut mgr = SessionManager::new(
            Arc::clone(&host) as Arc<dyn SessionHost>,
            Duration::from_secs(30),
            bus,
        );
        let a = service("a");
        let b = service("b");
        mgr.create_for(&a);
        mgr.create_for(&b);

        mgr.on_session_event(&a.id, SessionEvent::LoadingStarted);
        mgr.on_session_event(&b.id, SessionEvent::LoadingStarted);
        mgr.on_session_event(&a.id, SessionEvent::LoadingFinished);
        assert_eq!(dismissed.load(Ordering::SeqCst), 0);

        mgr.on_session_event(&b.id, SessionEvent::LoadingFinished);
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
        assert!(mgr.splash_dismissed());

        // The gate fires once.
        mgr.poll(Instant::now());
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn splash_gate_opens_with_no_sessions() {
        let bus = EventBus::new();
        let dismissed = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&dismissed);
        bus.subscribe(move |event| {
            if matches!(event, AppEvent::SplashDismissable) {
                d.fetch_add(1, Ordering::SeqCst);
            }
        });

        let host = Arc::new(TestHost::default());
        let mut mgr = SessionManager::new(
            Arc::clone(&host) as Arc<dyn SessionHost>,
            Duration::from_secs(30),
            bus,
        );

        // A fresh install with nothing configured has nothing to wait for.
        mgr.poll(Instant::now());
        assert!(mgr.splash_dismissed());
        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn splash_gate_opens_past_deadline_with_stuck_session() {
        let bus = EventBus::new();
        let dismissed = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&dismissed);
        bus.subscribe(move |event| {
            if matches!(event, AppEvent::SplashDismissable) {
                d.fetch_add(1, Ordering::SeqCst);
            }
        });

        let host = Arc::new(TestHost::default());
        let mut mgr = SessionManager::new(
            Arc::clone(&host) as Arc<dyn SessionHost>,
            Duration::from_secs(0),
            bus,
        );
        let a = service("a");
        let b = service("b");
        mgr.create_for(&a);
        mgr.create_for(&b);

        mgr.on_session_event(&a.id, SessionEvent::LoadingStarted);
        mgr.on_session_event(&b.id, SessionEvent::LoadingStarted);
        mgr.on_session_event(&a.id, SessionEvent::LoadingFinished);
        // b never finishes, but the zero deadline lets the gate open.
        mgr.poll(Instant::now());

        assert_eq!(dismissed.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state_of(&b.id), Some(SessionState::Loading));
    }
}
