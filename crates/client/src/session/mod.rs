//! Session store: who is signed in, and the token lifecycle.
//!
//! # State
//!
//! - `is_loading` - the stored token has not been checked yet. Starts `true`
//!   so a consumer never mistakes startup for "signed out".
//! - `user` - present iff a token was accepted by the identity endpoint since
//!   the last startup or sign-in.
//! - `is_pending` - a sign-in is in flight. A second one is refused with
//!   [`SessionError::Busy`].
//!
//! Every transition is published under a single lock acquisition and
//! listeners are called after the lock is released.
//!
//! # Token adoption
//!
//! A freshly issued token is checked against `/auth/me` before it is stored.
//! If the check fails the sign-in fails and nothing about the previous
//! session changes.

mod error;
mod federated;
mod token;

pub use error::{LOGIN_FAILED_MESSAGE, REGISTRATION_FAILED_MESSAGE, SessionError};
pub use federated::{FederatedError, FederatedProvider, PresentedCredential};
pub use token::TokenStore;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use secrecy::{ExposeSecret, SecretString};
use shopfront_core::{Email, User};
use tracing::instrument;

use crate::api::{AuthApi, LoginRequest, RegisterRequest, Unauthorized};
use crate::error::{ErrorKind, NETWORK_ERROR_MESSAGE, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::events::{Listeners, SubscriptionId};

/// Message when a federated sign-in is refused without a server explanation.
pub const FEDERATED_LOGIN_FAILED_MESSAGE: &str = "Google login failed";

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// The user signed out.
    Logout,
    /// An API call was rejected with `401`.
    Unauthorized,
}

/// Session change notification.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The startup token check finished.
    Resolved { user: Option<User> },
    /// A sign-in succeeded.
    SignedIn(User),
    /// The session was cleared.
    SignedOut { reason: SignOutReason },
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_loading: bool,
    pub is_pending: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Session store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: Mutex<SessionState>,
    tokens: TokenStore,
    auth: Arc<dyn AuthApi>,
    listeners: Listeners<SessionEvent>,
    pending: AtomicBool,
}

struct SessionState {
    resolving: bool,
    user: Option<User>,
}

/// Clears the in-flight flag when a sign-in ends, however it ends.
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionStore {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthApi>, tokens: TokenStore) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState {
                    resolving: true,
                    user: None,
                }),
                tokens,
                auth,
                listeners: Listeners::new(),
                pending: AtomicBool::new(false),
            }),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    /// `true` until [`initialize`](Self::initialize) has finished.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state().resolving
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().user.is_some()
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            user: state.user.clone(),
            is_loading: state.resolving,
            is_pending: self.is_pending(),
        }
    }

    pub fn subscribe(
        &self,
        callback: impl Fn(&SessionEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.listeners.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.listeners.unsubscribe(id)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Check the stored token, if any, and resolve the session.
    ///
    /// Without a token this makes no network call. Any failure discards the
    /// token and resolves to signed out without reporting an error.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Option<User> {
        let Some(token) = self.inner.tokens.load() else {
            tracing::debug!("No stored token");
            return self.resolve(None);
        };

        match self.inner.auth.me(&token).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Restored session");
                set_sentry_user(&user.id, Some(&user.email));
                self.resolve(Some(user))
            }
            Err(e) => {
                tracing::info!(error = %e, "Stored token rejected, discarding it");
                self.discard_token_if_current(&token);
                self.resolve(None)
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidCredentials` with the server's message
    /// - `SessionError::Validation` for malformed input
    /// - `SessionError::Network` if the server is unreachable
    /// - `SessionError::Busy` if another sign-in is in flight
    ///
    /// The existing session is left untouched on error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<User, SessionError> {
        let _pending = self.begin()?;
        let request = login_request(email, password)?;
        add_breadcrumb("auth", "Login", None);

        let token = self
            .inner
            .auth
            .login(&request)
            .await
            .map_err(|e| SessionError::from_api(e, LOGIN_FAILED_MESSAGE))?;

        self.adopt(token.access_token).await
    }

    /// Create an account and sign in with it.
    ///
    /// The username is the local part of the email address.
    ///
    /// # Errors
    ///
    /// - `SessionError::RegisteredButLoginFailed` if the account was created
    ///   but the follow-up sign-in failed
    /// - otherwise as [`login`](Self::login)
    #[instrument(skip(self, name, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<User, SessionError> {
        let _pending = self.begin()?;
        let login = login_request(email, password)?;
        let request = RegisterRequest {
            username: username_for(&login.email),
            email: login.email.clone(),
            password: password.clone(),
            full_name: name.trim().to_string(),
        };
        add_breadcrumb("auth", "Register", None);

        let created = self
            .inner
            .auth
            .register(&request)
            .await
            .map_err(|e| SessionError::from_api(e, REGISTRATION_FAILED_MESSAGE))?;
        tracing::info!(user_id = %created.id, "Account created");

        let token = match self.inner.auth.login(&login).await {
            Ok(token) => token,
            Err(e) => {
                let cause = SessionError::from_api(e, LOGIN_FAILED_MESSAGE);
                return Err(SessionError::RegisteredButLoginFailed(cause.to_string()));
            }
        };

        self.adopt(token.access_token).await.map_err(|e| match e {
            SessionError::Storage(_) => e,
            other => SessionError::RegisteredButLoginFailed(other.to_string()),
        })
    }

    /// Sign in through a federated identity provider.
    ///
    /// # Errors
    ///
    /// - `SessionError::Federated` if the provider flow fails
    /// - otherwise as [`login`](Self::login)
    #[instrument(skip_all)]
    pub async fn login_with_federated(
        &self,
        provider: &dyn FederatedProvider,
    ) -> Result<User, SessionError> {
        let _pending = self.begin()?;
        add_breadcrumb("auth", "Federated login", None);

        let credential = provider
            .credential()
            .await
            .map_err(|e| SessionError::Federated(e.to_string()))?;

        let token = self
            .inner
            .auth
            .google(&credential)
            .await
            .map_err(|e| SessionError::from_api(e, FEDERATED_LOGIN_FAILED_MESSAGE))?;

        self.adopt(token.access_token).await
    }

    /// Sign out. Never fails; a token that cannot be removed is logged.
    pub fn logout(&self) {
        if let Err(e) = self.inner.tokens.clear() {
            tracing::warn!(error = %e, "Failed to remove stored token");
        }
        self.sign_out(SignOutReason::Logout);
        add_breadcrumb("auth", "Logout", None);
    }

    /// Drop the session after the API client saw a `401`. The API client has
    /// already removed the token.
    pub fn handle_unauthorized(&self) {
        self.sign_out(SignOutReason::Unauthorized);
    }

    /// Callback for [`ApiClient::on_unauthorized`](crate::api::ApiClient::on_unauthorized).
    ///
    /// Holds the store weakly so the API client does not keep it alive.
    #[must_use]
    pub fn unauthorized_handler(&self) -> impl Fn(&Unauthorized) + Send + Sync + 'static {
        let inner: Weak<SessionInner> = Arc::downgrade(&self.inner);
        move |_: &Unauthorized| {
            if let Some(inner) = inner.upgrade() {
                Self { inner }.handle_unauthorized();
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> Result<PendingGuard<'_>, SessionError> {
        self.inner
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(PendingGuard(&self.inner.pending))
    }

    /// Validate a newly issued token, then store it and publish the user.
    async fn adopt(&self, token: SecretString) -> Result<User, SessionError> {
        let user = self.inner.auth.me(&token).await.map_err(|e| match e.kind() {
            ErrorKind::Network => SessionError::Network(NETWORK_ERROR_MESSAGE.to_string()),
            _ => SessionError::TokenInvalid,
        })?;

        self.inner.tokens.save(&token)?;

        {
            let mut state = self.state();
            state.user = Some(user.clone());
            state.resolving = false;
        }

        tracing::info!(user_id = %user.id, "Signed in");
        set_sentry_user(&user.id, Some(&user.email));
        self.inner
            .listeners
            .notify(&SessionEvent::SignedIn(user.clone()));
        Ok(user)
    }

    /// Finish startup. A sign-in that completed while the check was in
    /// flight wins.
    fn resolve(&self, user: Option<User>) -> Option<User> {
        let resolved = {
            let mut state = self.state();
            if state.user.is_none() {
                state.user = user;
            }
            state.resolving = false;
            state.user.clone()
        };
        self.inner.listeners.notify(&SessionEvent::Resolved {
            user: resolved.clone(),
        });
        resolved
    }

    /// Remove the stored token unless a sign-in replaced it meanwhile.
    fn discard_token_if_current(&self, rejected: &SecretString) {
        let current = self.inner.tokens.load();
        if current.is_some_and(|t| t.expose_secret() == rejected.expose_secret())
            && let Err(e) = self.inner.tokens.clear()
        {
            tracing::warn!(error = %e, "Failed to remove rejected token");
        }
    }

    fn sign_out(&self, reason: SignOutReason) {
        let previous = {
            let mut state = self.state();
            state.resolving = false;
            state.user.take()
        };
        if let Some(user) = previous {
            tracing::info!(user_id = %user.id, ?reason, "Signed out");
        }
        clear_sentry_user();
        self.inner
            .listeners
            .notify(&SessionEvent::SignedOut { reason });
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

/// Normalize and check the credentials of a sign-in.
fn login_request(email: &str, password: &SecretString) -> Result<LoginRequest, SessionError> {
    let email = Email::parse(email).map_err(|e| SessionError::Validation(e.to_string()))?;
    if password.expose_secret().is_empty() {
        return Err(SessionError::Validation("Password is required".to_string()));
    }
    Ok(LoginRequest {
        email: email.into_inner(),
        password: password.clone(),
    })
}

fn username_for(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::api::TokenResponse;
    use crate::api::auth::MockAuthApi;
    use crate::persistence::MemoryStore;

    fn user(email: &str) -> User {
        serde_json::from_value(serde_json::json!({
            "id": "u1",
            "email": email,
            "username": email.split('@').next().unwrap(),
            "full_name": "Jane Doe",
            "is_active": true,
            "is_verified": false,
            "is_google_user": false,
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    fn token(value: &str) -> TokenResponse {
        TokenResponse {
            access_token: SecretString::from(value.to_string()),
            token_type: "bearer".to_string(),
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn api_error(status: u16, detail: &str) -> crate::api::ApiError {
        crate::api::ApiError::Api {
            status,
            detail: detail.to_string(),
        }
    }

    fn store_with(auth: MockAuthApi, entries: &[(&str, &str)]) -> (SessionStore, TokenStore) {
        let tokens = TokenStore::new(Arc::new(MemoryStore::with_entries(
            entries.iter().copied(),
        )));
        (SessionStore::new(Arc::new(auth), tokens.clone()), tokens)
    }

    #[tokio::test]
    async fn test_initialize_without_token_makes_no_call() {
        let mut auth = MockAuthApi::new();
        auth.expect_me().never();
        let (session, _) = store_with(auth, &[]);
        assert!(session.is_loading());

        assert_eq!(session.initialize().await, None);
        assert!(!session.is_loading());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_initialize_restores_valid_token() {
        let mut auth = MockAuthApi::new();
        auth.expect_me()
            .withf(|t| t.expose_secret() == "good")
            .times(1)
            .returning(|_| Ok(user("jane@example.com")));
        let (session, tokens) = store_with(auth, &[("token", "good")]);

        let restored = session.initialize().await.unwrap();
        assert_eq!(restored.email, "jane@example.com");
        assert!(session.is_authenticated());
        assert!(tokens.is_present());
    }

    #[tokio::test]
    async fn test_initialize_discards_rejected_token() {
        let mut auth = MockAuthApi::new();
        auth.expect_me()
            .returning(|_| Err(api_error(401, "Could not validate credentials")));
        let (session, tokens) = store_with(auth, &[("token", "stale")]);

        assert_eq!(session.initialize().await, None);
        assert!(!tokens.is_present());
        assert!(!session.is_loading());
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user() {
        let mut auth = MockAuthApi::new();
        auth.expect_login()
            .withf(|r| r.email == "jane@example.com" && r.password.expose_secret() == "pw")
            .returning(|_| Ok(token("fresh")));
        auth.expect_me()
            .withf(|t| t.expose_secret() == "fresh")
            .returning(|_| Ok(user("jane@example.com")));
        let (session, tokens) = store_with(auth, &[]);

        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        session.subscribe(move |event| {
            if matches!(event, SessionEvent::SignedIn(_)) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        let user = session.login(" jane@example.com ", &secret("pw")).await.unwrap();
        assert_eq!(user.username, "jane");
        assert_eq!(tokens.load().unwrap().expose_secret(), "fresh");
        assert!(session.is_authenticated());
        assert!(!session.is_pending());
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_login_rejected_keeps_state() {
        let mut auth = MockAuthApi::new();
        auth.expect_login()
            .returning(|_| Err(api_error(401, "Invalid credentials")));
        auth.expect_me().never();
        let (session, tokens) = store_with(auth, &[]);
        session.initialize().await;

        let err = session
            .login("jane@example.com", &secret("wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(err.kind(), ErrorKind::Auth);
        assert!(session.user().is_none());
        assert!(!tokens.is_present());
    }

    #[tokio::test]
    async fn test_login_with_unusable_token_fails() {
        let mut auth = MockAuthApi::new();
        auth.expect_login().returning(|_| Ok(token("broken")));
        auth.expect_me().returning(|_| Err(api_error(401, "")));
        let (session, tokens) = store_with(auth, &[]);

        let err = session
            .login("jane@example.com", &secret("pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::TokenInvalid));
        assert!(!tokens.is_present());
    }

    #[tokio::test]
    async fn test_login_network_failure() {
        let mut auth = MockAuthApi::new();
        auth.expect_login()
            .returning(|_| Err(api_error(502, "Bad Gateway")));
        let (session, _) = store_with(auth, &[]);

        let err = session
            .login("jane@example.com", &secret("pw"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.to_string(), NETWORK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_login_validates_input_locally() {
        let mut auth = MockAuthApi::new();
        auth.expect_login().never();
        let (session, _) = store_with(auth, &[]);

        let err = session.login("not-an-email", &secret("pw")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = session.login("jane@example.com", &secret("")).await.unwrap_err();
        assert_eq!(err.to_string(), "Password is required");
    }

    #[tokio::test]
    async fn test_register_derives_username_and_signs_in() {
        let mut auth = MockAuthApi::new();
        auth.expect_register()
            .withf(|r| {
                r.username == "jane.doe" && r.email == "jane.doe@example.com" && r.full_name == "Jane Doe"
            })
            .times(1)
            .returning(|_| Ok(user("jane.doe@example.com")));
        auth.expect_login().times(1).returning(|_| Ok(token("t1")));
        auth.expect_me().returning(|_| Ok(user("jane.doe@example.com")));
        let (session, tokens) = store_with(auth, &[]);

        session
            .register(" Jane Doe ", "jane.doe@example.com", &secret("pw"))
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert!(tokens.is_present());
    }

    #[tokio::test]
    async fn test_register_then_login_failure_is_distinct() {
        let mut auth = MockAuthApi::new();
        auth.expect_register()
            .returning(|_| Ok(user("jane@example.com")));
        auth.expect_login()
            .returning(|_| Err(api_error(401, "Inactive user")));
        let (session, tokens) = store_with(auth, &[]);

        let err = session
            .register("Jane", "jane@example.com", &secret("pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::RegisteredButLoginFailed(ref cause) if cause == "Inactive user"));
        assert!(session.user().is_none());
        assert!(!tokens.is_present());
    }

    #[tokio::test]
    async fn test_register_rejected() {
        let mut auth = MockAuthApi::new();
        auth.expect_register()
            .returning(|_| Err(api_error(400, "Email already registered")));
        auth.expect_login().never();
        let (session, _) = store_with(auth, &[]);

        let err = session
            .register("Jane", "jane@example.com", &secret("pw"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_federated_login() {
        let mut provider = crate::session::federated::MockFederatedProvider::new();
        provider
            .expect_credential()
            .returning(|| Ok(SecretString::from("id-token".to_string())));
        let mut auth = MockAuthApi::new();
        auth.expect_google()
            .withf(|c| c.expose_secret() == "id-token")
            .returning(|_| Ok(token("g1")));
        auth.expect_me().returning(|_| Ok(user("jane@gmail.com")));
        let (session, tokens) = store_with(auth, &[]);

        session.login_with_federated(&provider).await.unwrap();
        assert_eq!(tokens.load().unwrap().expose_secret(), "g1");
    }

    #[tokio::test]
    async fn test_federated_provider_failure() {
        let mut provider = crate::session::federated::MockFederatedProvider::new();
        provider
            .expect_credential()
            .returning(|| Err(FederatedError::Cancelled));
        let mut auth = MockAuthApi::new();
        auth.expect_google().never();
        let (session, _) = store_with(auth, &[]);

        let err = session.login_with_federated(&provider).await.unwrap_err();
        assert!(matches!(err, SessionError::Federated(_)));
    }

    struct GatedProvider(Arc<Notify>);

    #[async_trait]
    impl FederatedProvider for GatedProvider {
        async fn credential(&self) -> Result<SecretString, FederatedError> {
            self.0.notified().await;
            Ok(SecretString::from("id-token".to_string()))
        }
    }

    #[tokio::test]
    async fn test_concurrent_sign_in_is_busy() {
        let mut auth = MockAuthApi::new();
        auth.expect_google().returning(|_| Ok(token("g1")));
        auth.expect_me().returning(|_| Ok(user("jane@gmail.com")));
        auth.expect_login().never();
        let (session, _) = store_with(auth, &[]);

        let gate = Arc::new(Notify::new());
        let provider = GatedProvider(Arc::clone(&gate));
        let background = session.clone();
        let first = tokio::spawn(async move { background.login_with_federated(&provider).await });

        while !session.is_pending() {
            tokio::task::yield_now().await;
        }
        let err = session
            .login("jane@example.com", &secret("pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Busy));

        gate.notify_one();
        first.await.unwrap().unwrap();
        assert!(!session.is_pending());
        assert!(session.is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let mut auth = MockAuthApi::new();
        auth.expect_me().returning(|_| Ok(user("jane@example.com")));
        let (session, tokens) = store_with(auth, &[("token", "good")]);
        session.initialize().await;

        let reasons = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&reasons);
        session.subscribe(move |event| {
            if let SessionEvent::SignedOut { reason } = event {
                seen.lock().unwrap().push(*reason);
            }
        });

        session.logout();
        session.logout();
        assert!(session.user().is_none());
        assert!(!tokens.is_present());
        assert_eq!(
            *reasons.lock().unwrap(),
            vec![SignOutReason::Logout, SignOutReason::Logout]
        );
    }

    #[tokio::test]
    async fn test_unauthorized_handler_signs_out() {
        let mut auth = MockAuthApi::new();
        auth.expect_me().returning(|_| Ok(user("jane@example.com")));
        let (session, _) = store_with(auth, &[("token", "good")]);
        session.initialize().await;

        let handler = session.unauthorized_handler();
        handler(&Unauthorized);
        assert!(session.user().is_none());

        drop(session);
        handler(&Unauthorized);
    }

    #[test]
    fn test_username_for() {
        assert_eq!(username_for("jane.doe@example.com"), "jane.doe");
    }
}
