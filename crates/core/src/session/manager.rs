//! Session manager
//!
//! Owns the single logical session of a process: acquires it through one of
//! the login flows, keeps it fresh, and tears it down on logout.
//!
//! ## State machine
//!
//! ```text
//! Unauthenticated -> Authenticating -> Authenticated -> Refreshing -> Authenticated
//!        |                  |                |               \-> Unauthenticated
//!        \-> Refreshing     \-> Unauthenticated \-> LoggingOut -> Unauthenticated
//! ```
//!
//! All mutable state sits behind one `parking_lot::Mutex` that is never held
//! across an `.await`. Flows capture a generation number when they start; a
//! logout bumps it so results arriving afterwards are dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use elixir_common::{Clock, SystemClock};
use elixir_domain::constants::{
    DEV_REIKEY_PATH, OTP_LOGIN_PATH, OTP_VERIFY_PATH, QR_VERIFY_PATH, SESSION_CLOSEREI_PATH,
    SESSION_REFRESH_PATH, SESSION_REIKEY_PATH, SESSION_SIGNOUT_PATH,
};
use elixir_domain::{
    CloseSessionOutcome, CloseSessionRequest, DevReiKey, DeviceInfo, ElixirError, OtpLoginRequest,
    OtpVerifyRequest, OverlayEvent, PendingLoginTransaction, QrVerifyRequest, RefreshDriver,
    RefreshRequest, Result, SdkConfig, Session, SessionState, SignoutResponse, TokenGrant,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::handoff::QrHandoff;
use crate::classifier::ExchangeKind;
use crate::gateway::ApiGateway;
use crate::ports::{EventPublisher, HttpTransport, NoopPublisher, TokenStore};

struct SessionSettings {
    refresh_key: String,
    device: DeviceInfo,
    allow_dev_device_key: bool,
    refresh_driver: RefreshDriver,
    refresh_margin: Duration,
    new_account_grace: Duration,
}

struct SessionInner {
    session: Session,
    state: SessionState,
    /// Tick driver: time left before the proactive refresh.
    countdown: Option<Duration>,
    pending: Option<PendingLoginTransaction>,
    /// Timer driver: cancels the scheduled refresh task.
    refresh_task: Option<CancellationToken>,
    device_key: Option<String>,
    generation: u64,
}

/// Builder for [`SessionManager`]
pub struct SessionManagerBuilder {
    config: SdkConfig,
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
}

impl SessionManagerBuilder {
    /// Replace the system clock (tests).
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Attach an overlay event channel.
    #[must_use]
    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Build the manager.
    ///
    /// # Errors
    /// `MissingConfiguration` when the configuration does not validate.
    pub fn build(self) -> Result<Arc<SessionManager>> {
        self.config.validate()?;

        let gateway = ApiGateway::from_config(&self.config, self.transport, Arc::clone(&self.clock));
        let settings = SessionSettings {
            refresh_key: self.config.refresh_token_key(),
            device: self.config.device.clone(),
            allow_dev_device_key: self.config.allow_dev_device_key,
            refresh_driver: self.config.refresh_driver,
            refresh_margin: self.config.refresh_margin,
            new_account_grace: self.config.new_account_grace,
        };
        let inner = SessionInner {
            session: Session::default(),
            state: SessionState::Unauthenticated,
            countdown: None,
            pending: None,
            refresh_task: None,
            device_key: self.config.device_key.clone().filter(|key| !key.is_empty()),
            generation: 0,
        };
        let (state_tx, _) = watch::channel(SessionState::Unauthenticated);

        Ok(Arc::new_cyclic(|weak_self| SessionManager {
            gateway,
            store: self.store,
            publisher: self.publisher,
            clock: self.clock,
            settings,
            inner: Mutex::new(inner),
            state_tx,
            weak_self: weak_self.clone(),
        }))
    }
}

/// Session lifecycle manager
pub struct SessionManager {
    gateway: ApiGateway,
    store: Arc<dyn TokenStore>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
    inner: Mutex<SessionInner>,
    state_tx: watch::Sender<SessionState>,
    weak_self: Weak<SessionManager>,
}

impl SessionManager {
    pub fn builder(
        config: SdkConfig,
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
    ) -> SessionManagerBuilder {
        SessionManagerBuilder {
            config,
            transport,
            store,
            clock: Arc::new(SystemClock),
            publisher: Arc::new(NoopPublisher),
        }
    }

    // ------------------------------------------------------------------
    // Login flows
    // ------------------------------------------------------------------

    /// Log in with a device key ("rei").
    ///
    /// The key comes from the argument, else the configured key, else (when
    /// development keys are allowed) the provisioning endpoint.
    ///
    /// # Errors
    /// `MissingConfiguration` without any key, `Busy` while another flow
    /// runs, or the classified failure of the exchange. Any failure deletes
    /// the persisted refresh token.
    pub async fn login_with_device_key(&self, device_key: Option<String>) -> Result<Session> {
        let flow = self.begin(SessionState::Authenticating)?;
        match self.exchange_device_key(device_key).await {
            Ok(grant) => self.accept_grant(flow.finish(), &grant),
            Err(err) => Err(self.abort(flow.finish(), err)),
        }
    }

    async fn exchange_device_key(&self, device_key: Option<String>) -> Result<TokenGrant> {
        let key = match device_key.filter(|key| !key.is_empty()).or_else(|| self.device_key()) {
            Some(key) => key,
            None if self.settings.allow_dev_device_key => {
                let issued: DevReiKey = self.gateway.get(DEV_REIKEY_PATH, None).await?;
                if issued.reikey.is_empty() {
                    return Err(ElixirError::Decode("development device key missing".to_string()));
                }
                info!("Using development device key");
                issued.reikey
            }
            None => return Err(ElixirError::MissingConfiguration("device key".to_string())),
        };

        self.inner.lock().device_key = Some(key.clone());
        self.gateway.get(&keyed_path(SESSION_REIKEY_PATH, &key), None).await
    }

    /// Exchange the persisted refresh token for a new token pair.
    ///
    /// # Errors
    /// `NotAuthenticated` without a persisted token (no request is made),
    /// `InvalidRefreshToken` on a 4xx, or any other classified failure. Every
    /// failure clears the session and the persisted token.
    pub async fn refresh(&self) -> Result<Session> {
        let refresh_token = self
            .store
            .load(&self.settings.refresh_key)?
            .filter(|token| !token.is_empty())
            .ok_or(ElixirError::NotAuthenticated)?;

        let flow = self.begin(SessionState::Refreshing)?;
        let bearer = self.access_token();
        let result = self
            .gateway
            .post_as::<_, TokenGrant>(
                ExchangeKind::RefreshTokenExchange,
                SESSION_REFRESH_PATH,
                &RefreshRequest { refresh_token },
                bearer.as_deref(),
            )
            .await;

        match result {
            Ok(grant) => self.accept_grant(flow.finish(), &grant),
            Err(err) => Err(self.abort(flow.finish(), err)),
        }
    }

    /// Send a one-time code to `email`.
    ///
    /// # Errors
    /// `InvalidInput` for an empty address (no request is made), otherwise the
    /// classified failure.
    pub async fn start_email_login(&self, email: &str) -> Result<PendingLoginTransaction> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ElixirError::InvalidInput("email must not be empty".to_string()));
        }

        let bearer = self.access_token();
        let pending: PendingLoginTransaction = self
            .gateway
            .post(OTP_LOGIN_PATH, &OtpLoginRequest { email: email.to_string() }, bearer.as_deref())
            .await?;
        if pending.transaction_id.is_empty() {
            return Err(ElixirError::Decode("login transaction id missing".to_string()));
        }

        debug!("Email login started");
        self.inner.lock().pending = Some(pending.clone());
        Ok(pending)
    }

    /// Confirm an email login with the code the user received.
    ///
    /// Resolves only after the new-account grace period when the backend
    /// reports a freshly created account.
    ///
    /// # Errors
    /// `InvalidInput` for empty arguments, `Busy`, or the classified failure.
    pub async fn confirm_email_login(&self, transaction_id: &str, code: &str) -> Result<Session> {
        if transaction_id.trim().is_empty() || code.trim().is_empty() {
            return Err(ElixirError::InvalidInput(
                "transaction id and code are required".to_string(),
            ));
        }

        let body = OtpVerifyRequest {
            transaction_id: transaction_id.to_string(),
            code: code.to_string(),
            device_model: self.settings.device.model.clone(),
            device_unique_identifier: self.settings.device.unique_identifier.clone(),
        };
        let session = self.token_flow(OTP_VERIFY_PATH, &body).await?;

        {
            let mut inner = self.inner.lock();
            if inner.pending.as_ref().is_some_and(|p| p.transaction_id == transaction_id) {
                inner.pending = None;
            }
        }

        self.settle_new_account(&session).await;
        Ok(session)
    }

    /// Confirm a login from a scanned QR payload.
    ///
    /// # Errors
    /// `InvalidInput` when the payload lacks the `REIKEY:` marker (no request
    /// is made), `Busy`, or the classified failure.
    pub async fn confirm_qr_login(&self, qr_payload: &str) -> Result<Session> {
        if !QrHandoff::is_login_payload(qr_payload) {
            return Err(ElixirError::InvalidInput(
                "QR payload is not an Elixir login code".to_string(),
            ));
        }

        let body = QrVerifyRequest {
            qr_value: qr_payload.to_string(),
            device_model: self.settings.device.model.clone(),
            device_unique_identifier: self.settings.device.unique_identifier.clone(),
        };
        let session = self.token_flow(QR_VERIFY_PATH, &body).await?;
        self.settle_new_account(&session).await;
        Ok(session)
    }

    /// Verify the code waiting in `handoff`, if any.
    ///
    /// The slot stays busy for the duration of the call; a failed or
    /// cancelled code may be scanned again.
    ///
    /// # Errors
    /// Whatever [`Self::confirm_qr_login`] returns.
    pub async fn verify_scanned_code(&self, handoff: &QrHandoff) -> Result<Option<Session>> {
        let Some(claim) = handoff.claim() else {
            return Ok(None);
        };
        let result = self.confirm_qr_login(claim.code()).await;
        claim.finish(result.is_ok());
        result.map(Some)
    }

    /// Forget the pending email login.
    pub fn cancel_email_login(&self) -> Option<PendingLoginTransaction> {
        self.inner.lock().pending.take()
    }

    async fn token_flow<B>(&self, path: &str, body: &B) -> Result<Session>
    where
        B: Serialize + ?Sized,
    {
        let flow = self.begin(SessionState::Authenticating)?;
        let bearer = self.access_token();
        match self.gateway.post::<_, TokenGrant>(path, body, bearer.as_deref()).await {
            Ok(grant) => self.accept_grant(flow.finish(), &grant),
            Err(err) => Err(self.abort(flow.finish(), err)),
        }
    }

    async fn settle_new_account(&self, session: &Session) {
        if session.new_account {
            debug!(grace = ?self.settings.new_account_grace, "Waiting for new account");
            tokio::time::sleep(self.settings.new_account_grace).await;
        }
    }

    // ------------------------------------------------------------------
    // Teardown
    // ------------------------------------------------------------------

    /// Drop the session locally and ask the backend to sign out.
    ///
    /// Local state is cleared before returning; the signout request runs
    /// detached and its failure is only logged.
    pub fn logout(&self) {
        let token = {
            let mut inner = self.inner.lock();
            inner.generation = inner.generation.wrapping_add(1);
            let token = inner.session.access_token.take();
            if inner.state == SessionState::Authenticated {
                self.set_state(&mut inner, SessionState::LoggingOut);
            }
            inner.pending = None;
            self.clear_locked(&mut inner);
            if let Err(err) = self.store.delete(&self.settings.refresh_key) {
                warn!(error = %err, "Failed to delete persisted refresh token");
            }
            token
        };

        info!("Logged out");
        if let Some(token) = token {
            self.dispatch_signout(token);
        }
    }

    fn dispatch_signout(&self, token: String) {
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime available, skipping remote signout");
            return;
        };
        let gateway = self.gateway.clone();
        handle.spawn(async move {
            match gateway.post_empty::<SignoutResponse>(SESSION_SIGNOUT_PATH, Some(&token)).await {
                Ok(_) => debug!("Remote signout acknowledged"),
                Err(err) => warn!(error = %err, "Remote signout failed"),
            }
        });
    }

    /// Close the device-key session on the backend.
    ///
    /// # Errors
    /// `MissingConfiguration` without a device key, or the classified failure.
    pub async fn close_session(&self) -> Result<CloseSessionOutcome> {
        let key = self
            .device_key()
            .ok_or_else(|| ElixirError::MissingConfiguration("device key".to_string()))?;
        let refresh_token = self.store.load(&self.settings.refresh_key)?.unwrap_or_default();
        let bearer = self.access_token();

        let outcome: Result<CloseSessionOutcome> = self
            .gateway
            .post(
                &keyed_path(SESSION_CLOSEREI_PATH, &key),
                &CloseSessionRequest { refresh_token },
                bearer.as_deref(),
            )
            .await;

        match &outcome {
            Ok(result) => info!(closed = result.closed, "Ending session"),
            Err(err) => warn!(error = %err, "Closing session failed"),
        }
        outcome
    }

    /// [`Self::close_session`] bounded by `timeout`.
    ///
    /// # Errors
    /// `Timeout` when the backend does not answer in time.
    pub async fn close_session_within(&self, timeout: Duration) -> Result<CloseSessionOutcome> {
        tokio::time::timeout(timeout, self.close_session()).await.unwrap_or_else(|_| {
            warn!(?timeout, "Closing session abandoned");
            Err(ElixirError::Timeout(timeout))
        })
    }

    // ------------------------------------------------------------------
    // Proactive refresh
    // ------------------------------------------------------------------

    /// Advance the refresh countdown by `elapsed`.
    ///
    /// When the countdown runs out it is disarmed and exactly one refresh is
    /// spawned; the countdown is armed again by the next token grant. Zero
    /// elapsed time is a no-op.
    pub fn check_token(&self, elapsed: Duration) -> Option<JoinHandle<Result<Session>>> {
        if elapsed.is_zero() {
            return None;
        }

        {
            let mut inner = self.inner.lock();
            let remaining = inner.countdown?.saturating_sub(elapsed);
            if remaining.is_zero() {
                inner.countdown = None;
            } else {
                inner.countdown = Some(remaining);
                return None;
            }
        }

        debug!("Refresh countdown elapsed");
        let manager = self.weak_self.upgrade()?;
        match Handle::try_current() {
            Ok(handle) => Some(handle.spawn(async move { manager.refresh().await })),
            Err(_) => {
                warn!("No async runtime available, skipping token refresh");
                None
            }
        }
    }

    fn arm_refresh(&self, inner: &mut SessionInner, lifetime: Duration) {
        if let Some(task) = inner.refresh_task.take() {
            task.cancel();
        }
        inner.countdown = None;

        let Some(delay) =
            lifetime.checked_sub(self.settings.refresh_margin).filter(|delay| !delay.is_zero())
        else {
            return;
        };

        match self.settings.refresh_driver {
            RefreshDriver::Tick => inner.countdown = Some(delay),
            RefreshDriver::Timer => inner.refresh_task = self.schedule_refresh(delay),
        }
    }

    fn schedule_refresh(&self, delay: Duration) -> Option<CancellationToken> {
        let Ok(handle) = Handle::try_current() else {
            warn!("No async runtime available, scheduled refresh disabled");
            return None;
        };

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let weak = self.weak_self.clone();
        handle.spawn(async move {
            tokio::select! {
                () = cancelled.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    if let Some(manager) = weak.upgrade() {
                        if let Err(err) = manager.refresh().await {
                            warn!(error = %err, "Scheduled token refresh failed");
                        }
                    }
                }
            }
        });
        Some(token)
    }

    // ------------------------------------------------------------------
    // Authenticated requests
    // ------------------------------------------------------------------

    /// `GET path` with the current bearer.
    ///
    /// # Errors
    /// `NotAuthenticated` without a session (no request is made), otherwise
    /// the classified failure.
    pub async fn authorized_get<T>(&self, path: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let token = self.access_token().ok_or(ElixirError::NotAuthenticated)?;
        self.gateway.get(path, Some(&token)).await
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.lock().session.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner.lock().session.access_token.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().session.is_authenticated()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    #[must_use]
    pub fn device_key(&self) -> Option<String> {
        self.inner.lock().device_key.clone()
    }

    pub fn set_device_key(&self, device_key: Option<String>) {
        self.inner.lock().device_key = device_key.filter(|key| !key.is_empty());
    }

    #[must_use]
    pub fn pending_login(&self) -> Option<PendingLoginTransaction> {
        self.inner.lock().pending.clone()
    }

    /// Time left on the tick-driven refresh countdown.
    #[must_use]
    pub fn refresh_countdown(&self) -> Option<Duration> {
        self.inner.lock().countdown
    }

    #[must_use]
    pub const fn gateway(&self) -> &ApiGateway {
        &self.gateway
    }

    // ------------------------------------------------------------------
    // State bookkeeping
    // ------------------------------------------------------------------

    fn begin(&self, next: SessionState) -> Result<FlowGuard<'_>> {
        let mut inner = self.inner.lock();
        if inner.state.is_busy() || !inner.state.can_transition_to(next) {
            return Err(ElixirError::Busy(format!(
                "cannot enter {next:?} while {:?}",
                inner.state
            )));
        }
        self.set_state(&mut inner, next);
        Ok(FlowGuard { manager: self, generation: inner.generation, armed: true })
    }

    /// Cleanup for a flow whose future was dropped before it settled.
    fn cancel_flow(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation || !inner.state.is_busy() {
            return;
        }
        self.clear_locked(&mut inner);
        if let Err(err) = self.store.delete(&self.settings.refresh_key) {
            warn!(error = %err, "Failed to delete persisted refresh token");
        }
        warn!("Session flow cancelled");
    }

    fn accept_grant(&self, generation: u64, grant: &TokenGrant) -> Result<Session> {
        if grant.token.is_empty() {
            return Err(self.abort(
                generation,
                ElixirError::Decode("token grant without access token".to_string()),
            ));
        }

        let session = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!("Discarding token grant from a superseded flow");
                return Err(ElixirError::NotAuthenticated);
            }

            let session = Session::from_grant(grant, self.clock.now(), inner.device_key.clone());
            if let Some(refresh_token) = &session.refresh_token {
                if let Err(err) = self.store.save(&self.settings.refresh_key, refresh_token) {
                    warn!(error = %err, "Failed to persist refresh token");
                }
            }
            inner.session = session.clone();
            self.arm_refresh(&mut inner, grant.lifetime());
            self.set_state(&mut inner, SessionState::Authenticated);
            session
        };

        info!(
            new_account = session.new_account,
            lifetime_ms = grant.token_life_ms,
            "Session established"
        );
        if let Err(err) = self.publisher.publish(OverlayEvent::Token { token: grant.token.clone() }) {
            warn!(error = %err, "Failed to publish token event");
        }
        Ok(session)
    }

    fn abort(&self, generation: u64, err: ElixirError) -> ElixirError {
        {
            let mut inner = self.inner.lock();
            if inner.generation == generation {
                self.clear_locked(&mut inner);
                if let Err(store_err) = self.store.delete(&self.settings.refresh_key) {
                    warn!(error = %store_err, "Failed to delete persisted refresh token");
                }
            }
        }
        warn!(error = %err, label = err.label(), "Session flow failed");
        err
    }

    fn clear_locked(&self, inner: &mut SessionInner) {
        inner.session = Session::default();
        inner.countdown = None;
        if let Some(task) = inner.refresh_task.take() {
            task.cancel();
        }
        self.set_state(inner, SessionState::Unauthenticated);
    }

    fn set_state(&self, inner: &mut SessionInner, next: SessionState) {
        if inner.state != next {
            debug!(from = ?inner.state, to = ?next, "Session state change");
            inner.state = next;
            self.state_tx.send_replace(next);
        }
    }
}

/// Returns the manager to `Unauthenticated` unless the flow settled.
struct FlowGuard<'a> {
    manager: &'a SessionManager,
    generation: u64,
    armed: bool,
}

impl FlowGuard<'_> {
    fn finish(mut self) -> u64 {
        self.armed = false;
        self.generation
    }
}

impl Drop for FlowGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.manager.cancel_flow(self.generation);
        }
    }
}

/// `prefix/segment` with the segment percent-encoded.
fn keyed_path(prefix: &str, segment: &str) -> String {
    format!("{prefix}/{}", urlencoding::encode(segment))
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        if let Some(task) = self.inner.get_mut().refresh_task.take() {
            task.cancel();
        }
    }
}
