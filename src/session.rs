//! Per-user session state. Owned by exactly one virtual user.
use rand::Rng;

use crate::catalog::{REALTIME_USER_ID_MAX, STAKING_USER_ID_MAX, UserKind};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub login_email: String,
    pub auth_token: Option<String>,
    pub last_transaction_id: Option<String>,
    pub subscribed_entity_id: Option<String>,
}

impl Session {
    /// Fresh, unauthenticated session with a random identity for `kind`.
    pub fn new<R: Rng + ?Sized>(kind: UserKind, rng: &mut R) -> Self {
        let (user_id, login_email) = match kind {
            UserKind::Staking => {
                let user_id = format!("user-{}", rng.gen_range(1..=STAKING_USER_ID_MAX));
                let email = format!("{}@test.com", user_id);
                (user_id, email)
            }
            UserKind::Realtime => {
                let user_id = format!("wsuser-{}", rng.gen_range(1..=REALTIME_USER_ID_MAX));
                let email = format!("{}@test.com", user_id);
                (user_id, email)
            }
        };
        Self {
            user_id,
            login_email,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn bearer(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }
}
