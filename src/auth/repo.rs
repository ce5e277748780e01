use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// How the account was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_provider", rename_all = "lowercase")]
pub enum AccountProvider {
    Email,
    Google,
    Facebook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
pub enum AccountStatus {
    Pending,
    Active,
    Blocked,
}

/// Credential record. Accounts are never physically deleted; blocking is a
/// status transition.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub provider: AccountProvider,
    pub status: AccountStatus,
    pub created_at: OffsetDateTime,
}

impl Account {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, provider, status, created_at
            FROM accounts
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, provider, status, created_at
            FROM accounts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(account)
    }

    /// Inserts a new account in `pending` status. The unique index on email
    /// is the last line of defense against duplicate registrations.
    pub async fn create(
        db: &PgPool,
        email: &str,
        password_hash: &str,
        provider: AccountProvider,
    ) -> anyhow::Result<Account> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (email, password_hash, provider, status)
            VALUES ($1, $2, $3, 'pending')
            RETURNING id, email, password_hash, provider, status, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(provider)
        .fetch_one(db)
        .await?;
        Ok(account)
    }
}

/// True when an error from a write is the email unique index firing, i.e. a
/// concurrent registration slipped past the pre-check.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|dbe| dbe.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_json_never_exposes_password_hash() {
        let account = Account {
            id: Uuid::new_v4(),
            email: "a@b.com".into(),
            password_hash: "$argon2id$secret".into(),
            provider: AccountProvider::Email,
            status: AccountStatus::Pending,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("a@b.com"));
    }

    #[test]
    fn enums_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&AccountStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&AccountProvider::Email).unwrap(),
            "\"email\""
        );
    }

    #[test]
    fn plain_errors_are_not_unique_violations() {
        assert!(!is_unique_violation(&anyhow::anyhow!("boom")));
    }

    // Needs DATABASE_URL pointing at a migrated Postgres; run with --ignored.
    #[tokio::test]
    #[ignore]
    async fn duplicate_insert_is_a_unique_violation() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect(&url)
            .await
            .expect("connect");
        sqlx::migrate!("./migrations").run(&db).await.expect("migrate");

        let email = format!("race-{}@example.com", Uuid::new_v4());
        Account::create(&db, &email, "hash", AccountProvider::Email)
            .await
            .expect("first insert succeeds");

        let err = Account::create(&db, &email, "hash", AccountProvider::Email)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }
}
