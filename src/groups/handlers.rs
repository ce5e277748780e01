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
    groups::{
        dto::{
            GroupDto, GroupEnvelope, GroupsEnvelope, InviteMembersRequest, MemberRequest,
            MembersEnvelope,
        },
        repo::{Group, Visibility},
    },
    state::AppState,
    users::{dto::BasicUserDto, dto::SuccessEnvelope, repo::User},
    validation,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/groups", get(list_public_groups))
        .route("/groups", post(create_group))
        .route("/groups/:id", get(get_group))
        .route("/groups/:id", put(update_group))
        .route("/groups/:id", delete(delete_group))
        .route("/groups/:id/joined", get(get_joined_groups))
        .route("/groups/:id/members", get(get_group_members))
        .route("/groups/:id/inviteMembers", post(invite_members))
        .route("/groups/:id/addMember", put(add_member))
        .route("/groups/:id/removeMember", put(remove_member))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

/// Fields accepted by the multipart create/update endpoints.
#[derive(Default)]
struct GroupForm {
    name: Option<String>,
    visibility: Option<Visibility>,
    owner_id: Option<Uuid>,
    photo: Option<AvatarUpload>,
}

async fn read_group_form(mp: &mut Multipart) -> Result<GroupForm, ApiError> {
    let mut form = GroupForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("name") => {
                form.name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::Validation(e.to_string()))?,
                );
            }
            Some("visibility") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                form.visibility = Some(match raw.as_str() {
                    "private" => Visibility::Private,
                    "public" => Visibility::Public,
                    other => {
                        return Err(ApiError::Validation(format!(
                            "Invalid visibility: {}",
                            other
                        )))
                    }
                });
            }
            Some("ownerId") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                form.owner_id = Some(
                    raw.parse::<Uuid>()
                        .map_err(|_| ApiError::Validation("Invalid ownerId".into()))?,
                );
            }
            Some("photo") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                form.photo = Some(AvatarUpload { body, content_type });
            }
            _ => {}
        }
    }
    Ok(form)
}

#[instrument(skip(state))]
pub async fn list_public_groups(
    State(state): State<AppState>,
) -> Result<Json<GroupsEnvelope>, ApiError> {
    let groups = Group::list_public(&state.db)
        .await?
        .into_iter()
        .map(GroupDto::from)
        .collect();
    Ok(Json(GroupsEnvelope { groups }))
}

/// GET /groups/:id/joined — the path id is a user id here.
#[instrument(skip(state))]
pub async fn get_joined_groups(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<GroupsEnvelope>, ApiError> {
    let groups = Group::list_joined(&state.db, user_id)
        .await?
        .into_iter()
        .map(GroupDto::from)
        .collect();
    Ok(Json(GroupsEnvelope { groups }))
}

#[instrument(skip(state))]
pub async fn get_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GroupEnvelope>, ApiError> {
    let group = Group::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Group"))?;
    Ok(Json(GroupEnvelope {
        group: group.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_group_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MembersEnvelope>, ApiError> {
    let group = Group::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Group"))?;
    let users = User::find_many(&state.db, &group.member_ids)
        .await?
        .into_iter()
        .map(BasicUserDto::from)
        .collect();
    Ok(Json(MembersEnvelope { users }))
}

/// POST /groups — multipart: name, visibility, optional ownerId and photo.
#[instrument(skip(state, mp))]
pub async fn create_group(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<GroupEnvelope>, ApiError> {
    let form = read_group_form(&mut mp).await?;

    let name = form
        .name
        .ok_or_else(|| ApiError::Validation("name is required".into()))?;
    if let Some(msg) = validation::validate_name(&name) {
        warn!(%msg, "group validation failed");
        return Err(ApiError::Validation(msg));
    }
    let visibility = form.visibility.unwrap_or(Visibility::Private);

    let group = Group::create(&state.db, &name, visibility, form.owner_id, None).await?;

    // The photo lands after the insert so the object key can carry the id.
    let group = match form.photo {
        Some(photo) => {
            let url = store_avatar(&state, "groups", group.id, photo).await?;
            Group::update(&state.db, group.id, None, None, Some(&url))
                .await?
                .ok_or(ApiError::NotFound("Group"))?
        }
        None => group,
    };

    info!(group_id = %group.id, "group created");
    Ok(Json(GroupEnvelope {
        group: group.into(),
    }))
}

/// PUT /groups/:id — multipart, partial update.
#[instrument(skip(state, mp))]
pub async fn update_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut mp: Multipart,
) -> Result<Json<GroupEnvelope>, ApiError> {
    let existing = Group::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Group"))?;

    let form = read_group_form(&mut mp).await?;
    if let Some(name) = form.name.as_deref() {
        if let Some(msg) = validation::validate_name(name) {
            warn!(%msg, "group validation failed");
            return Err(ApiError::Validation(msg));
        }
    }

    let avatar_url = match form.photo {
        Some(photo) => Some(store_avatar(&state, "groups", id, photo).await?),
        None => None,
    };

    let group = Group::update(
        &state.db,
        id,
        form.name.as_deref(),
        form.visibility,
        avatar_url.as_deref(),
    )
    .await?
    .ok_or(ApiError::NotFound("Group"))?;

    if avatar_url.is_some() {
        if let Some(old) = existing.avatar_url {
            if let Err(e) = discard_avatar(&state, &old).await {
                warn!(error = %e, group_id = %id, "old avatar cleanup failed");
            }
        }
    }

    Ok(Json(GroupEnvelope {
        group: group.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn invite_members(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<InviteMembersRequest>,
) -> Result<Json<GroupEnvelope>, ApiError> {
    if payload.user_ids.is_empty() {
        return Err(ApiError::Validation("userIds must not be empty".into()));
    }
    let group = Group::add_members(&state.db, id, &payload.user_ids)
        .await?
        .ok_or(ApiError::NotFound("Group"))?;
    info!(group_id = %id, invited = payload.user_ids.len(), "members invited");
    Ok(Json(GroupEnvelope {
        group: group.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn add_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberRequest>,
) -> Result<Json<GroupEnvelope>, ApiError> {
    let group = Group::add_member(&state.db, id, payload.user_id)
        .await?
        .ok_or(ApiError::NotFound("Group"))?;
    info!(group_id = %id, user_id = %payload.user_id, "member added");
    Ok(Json(GroupEnvelope {
        group: group.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn remove_member(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberRequest>,
) -> Result<Json<GroupEnvelope>, ApiError> {
    let group = Group::remove_member(&state.db, id, payload.user_id)
        .await?
        .ok_or(ApiError::NotFound("Group"))?;
    info!(group_id = %id, user_id = %payload.user_id, "member removed");
    Ok(Json(GroupEnvelope {
        group: group.into(),
    }))
}

#[instrument(skip(state))]
pub async fn delete_group(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessEnvelope>, ApiError> {
    let avatar_url = Group::delete(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Group"))?;

    if let Some(url) = avatar_url {
        if let Err(e) = discard_avatar(&state, &url).await {
            warn!(error = %e, group_id = %id, "avatar cleanup failed");
        }
    }

    info!(group_id = %id, "group deleted");
    Ok(Json(SuccessEnvelope { success: true }))
}
