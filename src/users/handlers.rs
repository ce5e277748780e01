use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    avatars::{discard_avatar, store_avatar, AvatarUpload},
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            BasicUserDto, BasicUserEnvelope, SuccessEnvelope, UserEnvelope, UserPayload,
            UsersEnvelope,
        },
        repo::{NewUser, User},
    },
    validation,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users", post(create_user))
        .route("/users/:id", get(get_user))
        .route("/users/:id", put(update_user))
        .route("/users/:id", delete(delete_user))
        .route("/users/:id/basic", get(get_basic_user))
        .route(
            "/users/:id/avatar",
            put(update_avatar).layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        )
}

/// Runs the shared profile rules; first failing rule wins.
fn validate_profile(payload: &UserPayload) -> Result<(), ApiError> {
    let checks = [
        validation::validate_name(&payload.name),
        validation::validate_age(payload.age),
        validation::validate_height(payload.height.value),
        validation::validate_weight(payload.weight.value),
    ];
    for msg in checks.into_iter().flatten() {
        warn!(%msg, "profile validation failed");
        return Err(ApiError::Validation(msg));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<UsersEnvelope>, ApiError> {
    let users = User::list(&state.db)
        .await?
        .into_iter()
        .map(BasicUserDto::from)
        .collect();
    Ok(Json(UsersEnvelope { users }))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserEnvelope>, ApiError> {
    let user = User::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(UserEnvelope { user: user.into() }))
}

#[instrument(skip(state))]
pub async fn get_basic_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BasicUserEnvelope>, ApiError> {
    let user = User::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(BasicUserEnvelope { user: user.into() }))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserEnvelope>, ApiError> {
    validate_profile(&payload)?;

    let user = User::create(
        &state.db,
        NewUser {
            name: &payload.name,
            age: payload.age,
            sex: payload.sex,
            height_value: payload.height.value,
            height_unit: &payload.height.unit,
            weight_value: payload.weight.value,
            weight_unit: &payload.weight.unit,
        },
    )
    .await?;

    info!(user_id = %user.id, "profile created");
    Ok(Json(UserEnvelope { user: user.into() }))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserPayload>,
) -> Result<Json<UserEnvelope>, ApiError> {
    validate_profile(&payload)?;

    let user = User::update(
        &state.db,
        id,
        NewUser {
            name: &payload.name,
            age: payload.age,
            sex: payload.sex,
            height_value: payload.height.value,
            height_unit: &payload.height.unit,
            weight_value: payload.weight.value,
            weight_unit: &payload.weight.unit,
        },
    )
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(UserEnvelope { user: user.into() }))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessEnvelope>, ApiError> {
    let avatar_url = User::delete(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if let Some(url) = avatar_url {
        if let Err(e) = discard_avatar(&state, &url).await {
            warn!(error = %e, user_id = %id, "avatar cleanup failed");
        }
    }

    info!(user_id = %id, "profile deleted");
    Ok(Json(SuccessEnvelope { success: true }))
}

/// PUT /users/:id/avatar — multipart with a single `file` field.
#[instrument(skip(state, mp))]
pub async fn update_avatar(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<UserEnvelope>, ApiError> {
    // Look the profile up first so a bad id fails before we touch storage.
    let existing = User::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    let mut upload: Option<AvatarUpload> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field
                .bytes()
                .await
                .map_err(|e| ApiError::Validation(e.to_string()))?;
            upload = Some(AvatarUpload { body, content_type });
        }
    }
    let upload = upload.ok_or_else(|| ApiError::Validation("file is required".into()))?;

    let url = store_avatar(&state, "users", id, upload).await?;
    let user = User::set_avatar(&state.db, id, &url)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    if let Some(old) = existing.avatar_url {
        if let Err(e) = discard_avatar(&state, &old).await {
            warn!(error = %e, user_id = %id, "old avatar cleanup failed");
        }
    }

    info!(user_id = %id, %url, "avatar updated");
    Ok(Json(UserEnvelope { user: user.into() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::dto::Measurement;
    use crate::users::repo::Sex;

    fn payload(name: &str, age: i32, height: Option<f64>, weight: Option<f64>) -> UserPayload {
        UserPayload {
            name: name.into(),
            age,
            sex: Sex::Man,
            height: Measurement {
                value: height,
                unit: "cm".into(),
            },
            weight: Measurement {
                value: weight,
                unit: "kg".into(),
            },
        }
    }

    #[test]
    fn valid_profile_passes() {
        assert!(validate_profile(&payload("Ada", 35, Some(170.0), Some(60.0))).is_ok());
        assert!(validate_profile(&payload("Bo", 18, None, None)).is_ok());
    }

    #[test]
    fn short_name_is_rejected() {
        let err = validate_profile(&payload("A", 35, None, None)).unwrap_err();
        assert!(err.to_string().contains("at least 2 characters"));
    }

    #[test]
    fn out_of_range_age_is_rejected() {
        assert!(validate_profile(&payload("Ada", 17, None, None)).is_err());
        assert!(validate_profile(&payload("Ada", 100, None, None)).is_err());
    }

    #[test]
    fn out_of_range_measurements_are_rejected() {
        assert!(validate_profile(&payload("Ada", 35, Some(99.0), None)).is_err());
        assert!(validate_profile(&payload("Ada", 35, None, Some(301.0))).is_err());
    }
}
