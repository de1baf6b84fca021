//! Power source trait — the external account system holding room balances.

use async_trait::async_trait;

use crate::config::Credential;
use crate::error::Result;
use crate::types::Room;

/// An authenticated portal session.
#[derive(Clone)]
pub struct Session {
    pub token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("token", &"***").finish()
    }
}

#[async_trait]
pub trait PowerSource: Send + Sync {
    fn name(&self) -> &str;

    /// Log in. A rejected credential must surface as [`crate::Error::Auth`].
    async fn login(&self, credential: &Credential) -> Result<Session>;

    /// Remaining balance (kWh) of one room.
    async fn remaining_power(&self, session: &Session, room: &Room) -> Result<f64>;
}
