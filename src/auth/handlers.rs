use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{
            AccountEnvelope, AuthResponse, LoginRequest, PublicAccount, RefreshRequest,
            RegisterRequest,
        },
        jwt::{AuthAccount, JwtKeys},
        password::{hash_password, verify_password},
        repo::{is_unique_violation, Account, AccountProvider},
    },
    error::ApiError,
    state::AppState,
    validation::is_valid_email,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::Validation("Password too short".into()));
    }

    if Account::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::Conflict(
            "Account with that email already exists!".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let provider = payload.provider.unwrap_or(AccountProvider::Email);

    let account = match Account::create(&state.db, &payload.email, &hash, provider).await {
        Ok(a) => a,
        // A concurrent registration can beat the pre-check to the insert.
        Err(e) if is_unique_violation(&e) => {
            warn!(email = %payload.email, "email registered concurrently");
            return Err(ApiError::Conflict(
                "Account with that email already exists!".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(account.id)?;
    let refresh_token = keys.sign_refresh(account.id)?;

    info!(account_id = %account.id, email = %account.email, "account registered");
    Ok(Json(AuthResponse {
        account: account.into(),
        access_token,
        refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password take the same exit to keep account
    // enumeration off the table.
    let Some(account) = Account::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !verify_password(&payload.password, &account.password_hash)? {
        warn!(account_id = %account.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign_access(account.id)?;
    let refresh_token = keys.sign_refresh(account.id)?;

    info!(account_id = %account.id, email = %account.email, "account logged in");
    Ok(Json(AuthResponse {
        account: account.into(),
        access_token,
        refresh_token,
    }))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|_| ApiError::InvalidCredentials)?;

    let account = Account::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(ApiError::NotFound("Account"))?;

    let access_token = keys.sign_access(account.id)?;
    let refresh_token = keys.sign_refresh(account.id)?;

    Ok(Json(AuthResponse {
        account: account.into(),
        access_token,
        refresh_token,
    }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthAccount(account_id): AuthAccount,
) -> Result<Json<AccountEnvelope>, ApiError> {
    let account = Account::find_by_id(&state.db, account_id)
        .await?
        .ok_or(ApiError::NotFound("Account"))?;

    Ok(Json(AccountEnvelope {
        account: PublicAccount::from(account),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    // Needs DATABASE_URL pointing at a migrated Postgres; run with --ignored.
    #[tokio::test]
    #[ignore]
    async fn registering_the_same_email_twice_conflicts() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let db = PgPoolOptions::new().connect(&url).await.expect("connect");
        sqlx::migrate!("./migrations").run(&db).await.expect("migrate");
        let state = AppState::fake_with_db(db);

        let email = format!("dup-{}@example.com", Uuid::new_v4());
        let payload = || RegisterRequest {
            email: email.clone(),
            password: "pw123456".into(),
            provider: None,
        };

        register(State(state.clone()), Json(payload()))
            .await
            .expect("first registration succeeds");

        let err = register(State(state), Json(payload())).await.unwrap_err();
        match err {
            ApiError::Conflict(msg) => {
                assert_eq!(msg, "Account with that email already exists!")
            }
            other => panic!("expected conflict, got {other}"),
        }
    }
}
