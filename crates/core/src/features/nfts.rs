//! NFT inventory client

use std::sync::Arc;

use elixir_domain::constants::USER_NFTS_PATH;
use elixir_domain::{ElixirError, NftCollection, Result, UserData};

use crate::session::SessionManager;

pub struct NftClient {
    session: Arc<SessionManager>,
}

impl NftClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// Collections owned by the logged-in user.
    ///
    /// # Errors
    /// `NotAuthenticated` without a session, otherwise the classified failure.
    pub async fn collections(&self) -> Result<Vec<NftCollection>> {
        self.session.authorized_get(USER_NFTS_PATH).await
    }

    /// Collections of `user`, skipping the request when the profile has no
    /// wallet attached.
    ///
    /// # Errors
    /// `NoWallet` (code -2000) for a user without wallet.
    pub async fn collections_for(&self, user: &UserData) -> Result<Vec<NftCollection>> {
        if !user.has_wallet() {
            return Err(ElixirError::NoWallet);
        }
        self.collections().await
    }
}
