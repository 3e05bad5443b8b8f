//! Session store - signup, OTP verification, login, logout, auth probe

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use crate::domain::result::{Error, Result};
use crate::domain::{Session, UserProfile};
use crate::ports::{ApiRequest, ApiResponse, Notifier};
use crate::services::api_client::ApiClient;
use crate::services::otp::OtpCode;

/// Shared, observable session state
///
/// Cheap to clone; every clone publishes to the same `watch` channel. The
/// API client holds one so a failed refresh can force a logout.
#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<Session>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Session::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.tx.subscribe()
    }

    /// Apply a change atomically and notify observers
    pub fn update(&self, f: impl FnOnce(&mut Session)) {
        self.tx.send_modify(f);
    }

    /// Clear the local user; observers are only woken if there was one
    pub fn force_logout(&self) {
        self.tx.send_if_modified(|session| session.user.take().is_some());
    }
}

/// Outcome of the startup auth probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProbe {
    Authenticated,
    Anonymous,
}

impl AuthProbe {
    fn of(session: &Session) -> Self {
        if session.is_authenticated() {
            AuthProbe::Authenticated
        } else {
            AuthProbe::Anonymous
        }
    }
}

/// Signup form as entered by the user
#[derive(Clone)]
pub struct SignupForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct VerifyOtpBody<'a> {
    otp: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

#[derive(Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Clone, Copy)]
enum BusyFlag {
    Loading,
    Resend,
    CheckingAuth,
}

impl BusyFlag {
    fn set(self, session: &mut Session, value: bool) {
        match self {
            BusyFlag::Loading => session.is_loading = value,
            BusyFlag::Resend => session.is_resend_loading = value,
            BusyFlag::CheckingAuth => session.is_checking_auth = value,
        }
    }
}

/// Raises a busy flag and lowers it again when dropped, on every exit path
struct BusyGuard<'a> {
    state: &'a SessionState,
    flag: BusyFlag,
}

impl<'a> BusyGuard<'a> {
    fn raise(state: &'a SessionState, flag: BusyFlag) -> Self {
        state.update(|s| flag.set(s, true));
        Self { state, flag }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        let flag = self.flag;
        self.state.update(|s| flag.set(s, false));
    }
}

/// Session store
pub struct SessionStore {
    api: Arc<ApiClient>,
    state: SessionState,
    notifier: Arc<dyn Notifier>,
    probed: AtomicBool,
}

impl SessionStore {
    pub fn new(api: Arc<ApiClient>, state: SessionState, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            state,
            notifier,
            probed: AtomicBool::new(false),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Register a new account and move into pending verification
    pub async fn signup(&self, form: &SignupForm) -> Result<()> {
        let _busy = BusyGuard::raise(&self.state, BusyFlag::Loading);

        if form.password != form.confirm_password {
            return Err(self.fail(Error::validation("Passwords do not match"), "Signup failed"));
        }

        let body = RegisterBody {
            name: &form.name,
            email: &form.email,
            password: &form.password,
        };
        match self.credential_call("/auth/register", &body).await {
            Ok(response) => {
                let email = form.email.clone();
                self.state.update(|s| {
                    s.pending_email = Some(email);
                    s.is_signing_up = true;
                    s.is_verified = false;
                });
                tracing::info!(email = %form.email, "signed up, awaiting verification");
                self.succeed(&response, "Account created, check your email for the code");
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Signup failed")),
        }
    }

    /// Submit the emailed OTP for the pending signup
    pub async fn verify_otp(&self, code: &str) -> Result<()> {
        let _busy = BusyGuard::raise(&self.state, BusyFlag::Loading);

        let code = match OtpCode::parse(code) {
            Ok(code) => code,
            Err(e) => return Err(self.fail(e, "Verification failed")),
        };

        let pending_email = self.state.snapshot().pending_email;
        let body = VerifyOtpBody {
            otp: code.as_str(),
            email: pending_email.as_deref(),
        };

        let outcome = match self.credential_call("/auth/verifyOtp", &body).await {
            Ok(response) => UserProfile::from_response(&response.body).map(|user| (response, user)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok((response, user)) => {
                self.state.update(|s| {
                    s.pending_email = None;
                    s.is_signing_up = false;
                    s.is_verified = true;
                    if user.is_some() {
                        s.user = user;
                    }
                });
                tracing::info!("email verified");
                self.succeed(&response, "Email verified");
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Verification failed")),
        }
    }

    /// Ask the backend to send a fresh OTP to the pending email
    pub async fn resend_otp(&self) -> Result<()> {
        let _busy = BusyGuard::raise(&self.state, BusyFlag::Resend);

        let Some(email) = self.state.snapshot().pending_email else {
            return Err(self.fail(
                Error::validation("No pending signup to resend a code for"),
                "Failed to resend code",
            ));
        };

        match self.credential_call("/auth/resendOtp", &EmailBody { email: &email }).await {
            Ok(response) => {
                tracing::debug!(email = %email, "verification code resent");
                self.succeed(&response, "A new code has been sent");
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to resend code")),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let _busy = BusyGuard::raise(&self.state, BusyFlag::Loading);

        let outcome = match self
            .credential_call("/auth/login", &LoginBody { email, password })
            .await
        {
            Ok(response) => match UserProfile::from_response(&response.body) {
                Ok(Some(user)) => Ok((response, user)),
                Ok(None) => Err(Error::Decode("Login response did not include a profile".to_string())),
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        };

        match outcome {
            Ok((response, user)) => {
                tracing::info!(user_id = %user.id, "logged in");
                self.state.update(|s| s.user = Some(user));
                self.succeed(&response, "Logged in successfully");
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Login failed")),
        }
    }

    /// Log out; the local user is cleared even when the backend call fails
    pub async fn logout(&self) -> Result<()> {
        let _busy = BusyGuard::raise(&self.state, BusyFlag::Loading);

        let result = self
            .api
            .send(ApiRequest::post("/auth/logout").without_refresh())
            .await;
        self.state.update(|s| s.user = None);
        tracing::info!("logged out");

        match result {
            Ok(response) => {
                self.succeed(&response, "Logged out successfully");
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Logout failed")),
        }
    }

    /// Probe the backend for an existing session
    ///
    /// Only the first call hits the network; later calls wait for that probe
    /// to settle and then report the current state. Never notifies.
    pub async fn check_auth(&self) -> AuthProbe {
        if self.probed.swap(true, Ordering::SeqCst) {
            let mut rx = self.state.subscribe();
            // The sender lives in `self.state`, so the channel cannot close here
            let _ = rx.wait_for(|s| !s.is_checking_auth).await;
            return AuthProbe::of(&self.state.snapshot());
        }

        let _busy = BusyGuard::raise(&self.state, BusyFlag::CheckingAuth);

        let profile = match self.api.send(ApiRequest::get("/auth/getProfile")).await {
            Ok(response) => UserProfile::from_response(&response.body),
            Err(e) => Err(e),
        };

        match profile {
            Ok(Some(user)) => {
                tracing::info!(user_id = %user.id, "restored existing session");
                self.state.update(|s| s.user = Some(user));
                AuthProbe::Authenticated
            }
            Ok(None) => {
                self.state.update(|s| s.user = None);
                AuthProbe::Anonymous
            }
            Err(e) => {
                tracing::debug!(error = %e, "no existing session");
                self.state.update(|s| s.user = None);
                AuthProbe::Anonymous
            }
        }
    }

    async fn credential_call<B: Serialize>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let request = ApiRequest::post(path).json(body)?.without_refresh();
        self.api.send(request).await
    }

    fn succeed(&self, response: &ApiResponse, fallback: &str) {
        let message = response
            .server_message()
            .unwrap_or_else(|| fallback.to_string());
        self.notifier.success(&message);
    }

    fn fail(&self, err: Error, fallback: &str) -> Error {
        tracing::debug!(error = %err, "session action failed");
        self.notifier.error(&err.user_message(fallback));
        err
    }
}
