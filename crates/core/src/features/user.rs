//! User profile client

use std::sync::Arc;

use elixir_domain::constants::USER_INFO_PATH;
use elixir_domain::{Result, UserData};

use crate::session::SessionManager;

pub struct UserClient {
    session: Arc<SessionManager>,
}

impl UserClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Profile of the logged-in user.
    ///
    /// # Errors
    /// `NotAuthenticated` without a session, otherwise the classified failure.
    pub async fn user_info(&self) -> Result<UserData> {
        self.session.authorized_get(USER_INFO_PATH).await
    }
}
