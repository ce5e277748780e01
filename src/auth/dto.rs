use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::{Account, AccountProvider, AccountStatus};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub provider: Option<AccountProvider>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// The projection of an account that may leave the server. No hash, ever.
#[derive(Debug, Serialize, Deserialize)]
pub struct PublicAccount {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub provider: AccountProvider,
    pub status: AccountStatus,
}

impl From<Account> for PublicAccount {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            email: a.email,
            provider: a.provider,
            status: a.status,
        }
    }
}

/// Envelope for endpoints returning a bare account.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountEnvelope {
    pub account: PublicAccount,
}

/// Envelope returned by register, login and refresh.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub account: PublicAccount,
    pub access_token: String,
    pub refresh_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn public_account_uses_underscore_id() {
        let public: PublicAccount = Account {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "hash".into(),
            provider: AccountProvider::Email,
            status: AccountStatus::Active,
            created_at: OffsetDateTime::now_utc(),
        }
        .into();
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["provider"], "email");
        assert_eq!(json["status"], "active");
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
