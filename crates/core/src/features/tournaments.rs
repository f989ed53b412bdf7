//! Tournament listing client

use std::sync::Arc;

use elixir_domain::constants::TOURNAMENTS_PATH;
use elixir_domain::{Result, Tournament};

use crate::session::SessionManager;

pub struct TournamentClient {
    session: Arc<SessionManager>,
}

impl TournamentClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// # Errors
    /// `NotAuthenticated` without a session, otherwise the classified failure.
    pub async fn tournaments(&self) -> Result<Vec<Tournament>> {
        self.session.authorized_get(TOURNAMENTS_PATH).await
    }
}
