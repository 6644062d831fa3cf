//! User intents and their handling
//!
//! The [`Dispatcher`] is the whole front end minus the drawing: it owns the
//! current session, talks to a [`ChatBackend`], and reports everything the
//! user should see to a [`MessageSink`]. Each intent makes at most one
//! network call and ends in exactly one [`Outcome`]; cleanup (re-enabling the
//! login form, dropping the pending placeholder, clearing the input) happens
//! on every path.
//!
//! # Examples
//!
//! ```no_run
//! use pacc_chat::api::ApiClient;
//! use pacc_chat::config::Config;
//! use pacc_chat::dispatcher::{Dispatcher, Intent};
//! use pacc_chat::session::{open_store, SessionManager};
//! use pacc_chat::transcript::Transcript;
//!
//! # async fn example() -> pacc_chat::error::Result<()> {
//! let config = Config::default();
//! let backend = ApiClient::new(&config.api, config.messages.clone())?;
//! let sessions = SessionManager::new(open_store(&config.session)?);
//! let mut dispatcher =
//!     Dispatcher::new(backend, sessions, Transcript::new(), &config.api.ecliente_url);
//!
//! if dispatcher.start().is_none() {
//!     dispatcher
//!         .dispatch(Intent::SubmitLogin {
//!             nif: "12345678z".into(),
//!             movil: "600111222".into(),
//!         })
//!         .await;
//! }
//! dispatcher.dispatch(Intent::SubmitChat("hola".into())).await;
//! # Ok(())
//! # }
//! ```

use crate::api::ChatBackend;
use crate::directive::{deep_link, Directive, LinkOpener, SystemOpener};
use crate::error::DispatchError;
use crate::session::{Clock, Session, SessionManager, SystemClock};
use crate::transcript::{ChatMessage, MessageSink};

/// Something the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Login form submitted
    SubmitLogin {
        /// Tax identifier as typed
        nif: String,
        /// Mobile number as typed
        movil: String,
    },
    /// Chat form submitted with free text
    SubmitChat(String),
    /// Preset quick-reply button pressed; its label is sent as chat text
    QuickReply(String),
    /// Element carrying a directive clicked
    InvokeDirective(String),
}

/// How an intent ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Credentials accepted; the gate is open
    LoggedIn(Session),
    /// Credentials rejected or the server was unreachable
    LoginFailed(DispatchError),
    /// The bot answered; the reply was appended to the log
    Replied(String),
    /// The chat request failed; the error text was appended to the log
    ReplyFailed(DispatchError),
    /// A deep link was opened
    LinkOpened(String),
    /// A deep link could not be built or opened
    LinkFailed(String),
    /// Nothing to send
    Ignored,
    /// No session; log in first
    Locked,
}

/// State of the login form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// A login request is in flight and the submit control is disabled
    pub submitting: bool,
    /// Error shown under the form
    pub error: Option<String>,
}

/// Front-end controller
pub struct Dispatcher<B: ChatBackend, S: MessageSink> {
    backend: B,
    sessions: SessionManager,
    sink: S,
    clock: Box<dyn Clock>,
    opener: Box<dyn LinkOpener>,
    ecliente_url: String,
    session: Option<Session>,
    login: LoginForm,
    draft: String,
}

impl<B: ChatBackend, S: MessageSink> Dispatcher<B, S> {
    /// Creates a dispatcher using the system clock and browser
    ///
    /// The gate starts closed; call [`start`](Self::start) to pick up a
    /// stored session.
    pub fn new(backend: B, sessions: SessionManager, sink: S, ecliente_url: &str) -> Self {
        Self {
            backend,
            sessions,
            sink,
            clock: Box::new(SystemClock),
            opener: Box::new(SystemOpener),
            ecliente_url: ecliente_url.to_string(),
            session: None,
            login: LoginForm::default(),
            draft: String::new(),
        }
    }

    /// Replaces the clock
    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the link opener
    pub fn with_opener(mut self, opener: Box<dyn LinkOpener>) -> Self {
        self.opener = opener;
        self
    }

    /// Loads the stored session
    ///
    /// A missing or expired session is cleared from storage and leaves the
    /// gate closed.
    pub fn start(&mut self) -> Option<&Session> {
        self.session = self.sessions.restore(self.clock.now_ms());
        match &self.session {
            Some(session) => tracing::info!(
                "Resumed stored session ({} min left)",
                session.remaining_ms(self.clock.now_ms()) / 60_000
            ),
            None => tracing::info!("No valid session stored, login required"),
        }
        self.session.as_ref()
    }

    /// Current session, if logged in
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// True while no session is held
    pub fn is_locked(&self) -> bool {
        self.session.is_none()
    }

    /// Login form state
    pub fn login_form(&self) -> &LoginForm {
        &self.login
    }

    /// Text left in the chat input
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Rendering sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Rendering sink, mutably
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Current time according to the dispatcher's clock
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Handles one intent
    pub async fn dispatch(&mut self, intent: Intent) -> Outcome {
        match intent {
            Intent::SubmitLogin { nif, movil } => self.authenticate(&nif, &movil).await,
            Intent::SubmitChat(text) | Intent::QuickReply(text) => self.submit_chat(&text).await,
            Intent::InvokeDirective(raw) => self.invoke_directive(&raw).await,
        }
    }

    /// Exchanges credentials for a session
    ///
    /// The NIF is trimmed and upper-cased, the mobile number trimmed. On
    /// success the session is persisted and the gate opens; on failure the
    /// message is shown on the login form. Either way the form ends idle.
    pub async fn authenticate(&mut self, nif: &str, movil: &str) -> Outcome {
        let nif = nif.trim().to_uppercase();
        let movil = movil.trim();

        self.login.error = None;
        self.login.submitting = true;

        let outcome = match self.backend.authenticate(&nif, movil).await {
            Ok(token) => {
                let session = self.persist(&token);
                self.session = Some(session.clone());
                Outcome::LoggedIn(session)
            }
            Err(e) => {
                self.login.error = Some(e.message().to_string());
                Outcome::LoginFailed(e)
            }
        };

        self.login.submitting = false;
        outcome
    }

    fn persist(&self, token: &str) -> Session {
        let now = self.clock.now_ms();
        match self.sessions.store(token, now) {
            Ok(session) => session,
            Err(e) => {
                // Chatting still works for this run; the next start asks again.
                tracing::warn!("Failed to persist session: {}", e);
                Session {
                    token: token.to_string(),
                    expiry: now.saturating_add(self.sessions.duration_ms()),
                }
            }
        }
    }

    /// Puts `text` in the chat input and submits it
    pub async fn submit_chat(&mut self, text: &str) -> Outcome {
        self.draft = text.to_string();
        self.send_draft().await
    }

    /// Sends the chat input
    ///
    /// Appends the user's message and a pending placeholder, makes the
    /// request, then replaces the placeholder with exactly one bot entry: the
    /// reply or an error text. The input is cleared afterwards.
    async fn send_draft(&mut self) -> Outcome {
        let text = self.draft.trim().to_string();
        if text.is_empty() {
            return Outcome::Ignored;
        }
        let Some(token) = self.session.as_ref().map(|s| s.token.clone()) else {
            tracing::warn!("Chat message refused: not logged in");
            return Outcome::Locked;
        };

        self.sink.append(ChatMessage::user(text.clone()));
        self.sink.append(ChatMessage::pending());

        let result = self.backend.query(&text, &token).await;
        self.sink.remove_pending();

        let outcome = match result {
            Ok(reply) => {
                self.sink.append(ChatMessage::bot(reply.clone()));
                Outcome::Replied(reply)
            }
            Err(e) => {
                self.sink.append(ChatMessage::bot(e.message()));
                Outcome::ReplyFailed(e)
            }
        };

        self.draft.clear();
        outcome
    }

    /// Runs a directive
    ///
    /// `ecliente#entity#id` opens the eCliente record with the current token
    /// and sends nothing to the chat; anything else is submitted as chat text.
    pub async fn invoke_directive(&mut self, raw: &str) -> Outcome {
        let token = match &self.session {
            Some(session) => session.token.clone(),
            None => return Outcome::Locked,
        };

        match Directive::parse(raw) {
            Directive::Ecliente { entity, id } => {
                let opened = deep_link(&self.ecliente_url, &entity, &token, &id)
                    .and_then(|url| self.opener.open(&url).map(|()| url));
                match opened {
                    Ok(url) => {
                        tracing::info!("Opened eCliente link for {} {}", entity, id);
                        Outcome::LinkOpened(url)
                    }
                    Err(e) => {
                        tracing::error!("Failed to open eCliente link: {}", e);
                        Outcome::LinkFailed(e.to_string())
                    }
                }
            }
            Directive::Chat(text) => self.submit_chat(&text).await,
        }
    }

    /// Forgets the session and closes the gate
    pub fn logout(&mut self) -> crate::error::Result<()> {
        self.session = None;
        self.sessions.clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::session::{FixedClock, KeyValueStore, MemoryStore, SESSION_DURATION_MS};
    use crate::transcript::{Origin, Transcript};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    const NOW: i64 = 1_700_000_000_000;

    /// Backend answering from canned results and recording calls
    #[derive(Clone, Default)]
    struct FakeBackend {
        auth: Arc<Mutex<Option<std::result::Result<String, DispatchError>>>>,
        reply: Arc<Mutex<Option<std::result::Result<String, DispatchError>>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeBackend {
        fn auth_returns(self, r: std::result::Result<String, DispatchError>) -> Self {
            *self.auth.lock().unwrap() = Some(r);
            self
        }

        fn reply_returns(self, r: std::result::Result<String, DispatchError>) -> Self {
            *self.reply.lock().unwrap() = Some(r);
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for FakeBackend {
        async fn authenticate(
            &self,
            nif: &str,
            movil: &str,
        ) -> std::result::Result<String, DispatchError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("auth:{}:{}", nif, movil));
            self.auth
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(DispatchError::Transport("unset".into())))
        }

        async fn query(
            &self,
            text: &str,
            token: &str,
        ) -> std::result::Result<String, DispatchError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("query:{}:{}", text, token));
            self.reply
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(DispatchError::Transport("unset".into())))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingOpener(Arc<Mutex<Vec<String>>>);

    impl LinkOpener for RecordingOpener {
        fn open(&self, url: &str) -> Result<()> {
            self.0.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    struct Harness {
        dispatcher: Dispatcher<FakeBackend, Transcript>,
        backend: FakeBackend,
        store: MemoryStore,
        opened: RecordingOpener,
    }

    fn harness(backend: FakeBackend) -> Harness {
        let store = MemoryStore::new();
        let opened = RecordingOpener::default();
        let dispatcher = Dispatcher::new(
            backend.clone(),
            SessionManager::new(Box::new(store.clone())),
            Transcript::new(),
            "https://ecliente.example.com",
        )
        .with_clock(Box::new(FixedClock(NOW)))
        .with_opener(Box::new(opened.clone()));
        Harness {
            dispatcher,
            backend,
            store,
            opened,
        }
    }

    fn logged_in(backend: FakeBackend, token: &str) -> Harness {
        let mut h = harness(backend);
        SessionManager::new(Box::new(h.store.clone()))
            .store(token, NOW)
            .unwrap();
        assert!(h.dispatcher.start().is_some());
        h
    }

    #[tokio::test]
    async fn test_start_without_session_is_locked() {
        let mut h = harness(FakeBackend::default());
        assert!(h.dispatcher.start().is_none());
        assert!(h.dispatcher.is_locked());
    }

    #[tokio::test]
    async fn test_start_clears_expired_session() {
        let mut h = harness(FakeBackend::default());
        SessionManager::new(Box::new(h.store.clone()))
            .store("old", NOW - SESSION_DURATION_MS)
            .unwrap();
        assert!(h.dispatcher.start().is_none());
        assert!(h.store.is_empty());
    }

    #[tokio::test]
    async fn test_login_success_stores_session_and_opens_gate() {
        let mut h = harness(FakeBackend::default().auth_returns(Ok("abc".into())));
        h.dispatcher.start();

        let outcome = h
            .dispatcher
            .dispatch(Intent::SubmitLogin {
                nif: " 12345678z ".into(),
                movil: " 600111222 ".into(),
            })
            .await;

        let expected = Session {
            token: "abc".into(),
            expiry: NOW + 7_200_000,
        };
        assert_eq!(outcome, Outcome::LoggedIn(expected.clone()));
        assert!(!h.dispatcher.is_locked());
        assert_eq!(h.dispatcher.session(), Some(&expected));
        assert_eq!(h.backend.calls(), vec!["auth:12345678Z:600111222"]);
        assert_eq!(
            h.store.get_item("userToken").unwrap().as_deref(),
            Some("abc")
        );
        assert_eq!(*h.dispatcher.login_form(), LoginForm::default());
    }

    #[tokio::test]
    async fn test_login_with_overflowing_duration_keeps_memory_session() {
        let backend = FakeBackend::default().auth_returns(Ok("abc".into()));
        let store = MemoryStore::new();
        let mut dispatcher = Dispatcher::new(
            backend,
            SessionManager::with_duration(Box::new(store.clone()), i64::MAX),
            Transcript::new(),
            "https://ecliente.example.com",
        )
        .with_clock(Box::new(FixedClock(NOW)));

        let outcome = dispatcher.authenticate("x", "1").await;

        let expected = Session {
            token: "abc".into(),
            expiry: i64::MAX,
        };
        assert_eq!(outcome, Outcome::LoggedIn(expected));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_login_application_error_shows_server_text() {
        let mut h = harness(
            FakeBackend::default()
                .auth_returns(Err(DispatchError::Application("bad creds".into()))),
        );
        let outcome = h.dispatcher.authenticate("x", "y").await;

        assert_eq!(
            outcome,
            Outcome::LoginFailed(DispatchError::Application("bad creds".into()))
        );
        assert!(h.dispatcher.is_locked());
        assert!(h.store.is_empty());
        assert_eq!(h.dispatcher.login_form().error.as_deref(), Some("bad creds"));
        assert!(!h.dispatcher.login_form().submitting);
    }

    #[tokio::test]
    async fn test_login_transport_error_resets_form() {
        let mut h = harness(
            FakeBackend::default()
                .auth_returns(Err(DispatchError::Transport("Error de conexión".into()))),
        );
        h.dispatcher.authenticate("x", "y").await;
        assert_eq!(
            h.dispatcher.login_form().error.as_deref(),
            Some("Error de conexión")
        );
        assert!(!h.dispatcher.login_form().submitting);
    }

    #[tokio::test]
    async fn test_login_clears_previous_error_on_success() {
        let backend =
            FakeBackend::default().auth_returns(Err(DispatchError::Application("no".into())));
        let mut h = harness(backend.clone());
        h.dispatcher.authenticate("x", "y").await;
        assert!(h.dispatcher.login_form().error.is_some());

        *backend.auth.lock().unwrap() = Some(Ok("tok".into()));
        h.dispatcher.authenticate("x", "y").await;
        assert!(h.dispatcher.login_form().error.is_none());
    }

    #[tokio::test]
    async fn test_chat_reply_replaces_pending() {
        let mut h = logged_in(FakeBackend::default().reply_returns(Ok("hi there".into())), "T");

        let outcome = h.dispatcher.dispatch(Intent::SubmitChat("hello".into())).await;
        assert_eq!(outcome, Outcome::Replied("hi there".into()));

        let log = h.dispatcher.sink();
        assert_eq!(log.messages().len(), 2);
        assert_eq!(log.completed(Origin::User)[0].body, "hello");
        assert_eq!(log.completed(Origin::Bot)[0].body, "hi there");
        assert_eq!(log.pending_count(), 0);
        assert_eq!(h.backend.calls(), vec!["query:hello:T"]);
        assert_eq!(h.dispatcher.draft(), "");
    }

    #[tokio::test]
    async fn test_chat_app_error_rendered_as_bot_message() {
        let mut h = logged_in(
            FakeBackend::default().reply_returns(Err(DispatchError::Application(
                "Error en la respuesta del servidor".into(),
            ))),
            "T",
        );
        let outcome = h.dispatcher.submit_chat("hello").await;
        assert!(matches!(outcome, Outcome::ReplyFailed(DispatchError::Application(_))));

        let log = h.dispatcher.sink();
        assert_eq!(log.pending_count(), 0);
        assert_eq!(log.last_body(), Some("Error en la respuesta del servidor"));
        assert_eq!(log.completed(Origin::Bot).len(), 1);
        assert_eq!(h.dispatcher.draft(), "");
    }

    #[tokio::test]
    async fn test_chat_transport_error_rendered_as_bot_message() {
        let mut h = logged_in(
            FakeBackend::default().reply_returns(Err(DispatchError::Transport(
                "Error de conexión con el servidor".into(),
            ))),
            "T",
        );
        h.dispatcher.submit_chat("hello").await;
        let log = h.dispatcher.sink();
        assert_eq!(log.pending_count(), 0);
        assert_eq!(log.last_body(), Some("Error de conexión con el servidor"));
    }

    #[tokio::test]
    async fn test_blank_chat_is_ignored() {
        let mut h = logged_in(FakeBackend::default(), "T");
        assert_eq!(h.dispatcher.submit_chat("   ").await, Outcome::Ignored);
        assert!(h.dispatcher.sink().messages().is_empty());
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_chat_trims_text() {
        let mut h = logged_in(FakeBackend::default().reply_returns(Ok("ok".into())), "T");
        h.dispatcher.submit_chat("  hola  ").await;
        assert_eq!(h.backend.calls(), vec!["query:hola:T"]);
    }

    #[tokio::test]
    async fn test_chat_refused_while_locked() {
        let mut h = harness(FakeBackend::default());
        h.dispatcher.start();
        let outcome = h.dispatcher.dispatch(Intent::SubmitChat("hello".into())).await;
        assert_eq!(outcome, Outcome::Locked);
        assert!(h.backend.calls().is_empty());
        assert!(h.dispatcher.sink().messages().is_empty());
    }

    #[tokio::test]
    async fn test_quick_reply_is_sent_as_chat() {
        let mut h = logged_in(FakeBackend::default().reply_returns(Ok("ok".into())), "T");
        h.dispatcher
            .dispatch(Intent::QuickReply("Mis pólizas".into()))
            .await;
        assert_eq!(h.backend.calls(), vec!["query:Mis pólizas:T"]);
    }

    #[tokio::test]
    async fn test_ecliente_directive_opens_link_without_chat() {
        let mut h = logged_in(FakeBackend::default(), "T");
        let outcome = h
            .dispatcher
            .dispatch(Intent::InvokeDirective("ecliente#clients#42".into()))
            .await;

        let url = "https://ecliente.example.com/access/clients/T/42".to_string();
        assert_eq!(outcome, Outcome::LinkOpened(url.clone()));
        assert_eq!(*h.opened.0.lock().unwrap(), vec![url]);
        assert!(h.backend.calls().is_empty());
        assert!(h.dispatcher.sink().messages().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_directive_is_sent_as_chat() {
        let mut h = logged_in(FakeBackend::default().reply_returns(Ok("ok".into())), "T");
        h.dispatcher.invoke_directive("ecliente#bad").await;
        assert_eq!(h.backend.calls(), vec!["query:ecliente#bad:T"]);
        assert!(h.opened.0.lock().unwrap().is_empty());
        assert_eq!(
            h.dispatcher.sink().completed(Origin::User)[0].body,
            "ecliente#bad"
        );
    }

    #[tokio::test]
    async fn test_directive_refused_while_locked() {
        let mut h = harness(FakeBackend::default());
        let outcome = h.dispatcher.invoke_directive("ecliente#clients#42").await;
        assert_eq!(outcome, Outcome::Locked);
        assert!(h.opened.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_ecliente_url_reports_link_failure() {
        let store = MemoryStore::new();
        SessionManager::new(Box::new(store.clone()))
            .store("T", NOW)
            .unwrap();
        let mut dispatcher = Dispatcher::new(
            FakeBackend::default(),
            SessionManager::new(Box::new(store)),
            Transcript::new(),
            "not a url",
        )
        .with_clock(Box::new(FixedClock(NOW)))
        .with_opener(Box::new(RecordingOpener::default()));
        dispatcher.start();

        let outcome = dispatcher.invoke_directive("ecliente#clients#42").await;
        assert!(matches!(outcome, Outcome::LinkFailed(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_storage_and_locks() {
        let mut h = logged_in(FakeBackend::default(), "T");
        h.dispatcher.logout().unwrap();
        assert!(h.dispatcher.is_locked());
        assert!(h.store.is_empty());
    }
}
