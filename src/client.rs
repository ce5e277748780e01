//! Typed client for the HTTP surface. Every call is a single best-effort
//! request: no retries, no caching. A response missing its expected envelope
//! key is an error carrying the server-provided message.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::dto::AuthResponse;
use crate::groups::dto::GroupDto;
use crate::users::dto::{BasicUserDto, UserDto, UserPayload};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Server-side failure; carries the `error` message from the envelope.
    #[error("{0}")]
    Api(String),

    #[error("User does not exist")]
    MissingId,

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Decode(#[from] serde_json::Error),
}

/// Pulls `key` out of a response envelope. Absence of the key is the sole
/// error signal; the `error` field supplies the message.
fn expect_key<T: DeserializeOwned>(mut body: Value, key: &str) -> Result<T, ClientError> {
    match body.get_mut(key) {
        Some(v) if !v.is_null() => Ok(serde_json::from_value(v.take())?),
        _ => {
            let msg = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("Unexpected response")
                .to_string();
            Err(ClientError::Api(msg))
        }
    }
}

/// Resource ids must be present before any request goes out.
fn ensure_id(id: Uuid) -> Result<Uuid, ClientError> {
    if id.is_nil() {
        Err(ClientError::MissingId)
    } else {
        Ok(id)
    }
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // --- auth ---

    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body: Value = self
            .http
            .post(self.url("/api/auth/register"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?
            .json()
            .await?;
        if body.get("account").map_or(true, Value::is_null) {
            return Err(expect_key::<Value>(body, "account").unwrap_err());
        }
        Ok(serde_json::from_value(body)?)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let body: Value = self
            .http
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?
            .json()
            .await?;
        if body.get("account").map_or(true, Value::is_null) {
            return Err(expect_key::<Value>(body, "account").unwrap_err());
        }
        Ok(serde_json::from_value(body)?)
    }

    // --- users ---

    pub async fn get_users(&self) -> Result<Vec<BasicUserDto>, ClientError> {
        let body: Value = self
            .http
            .get(self.url("/api/users"))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "users")
    }

    pub async fn get_user(&self, id: Uuid) -> Result<UserDto, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .get(self.url(&format!("/api/users/{}", id)))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "user")
    }

    pub async fn get_basic_user(&self, id: Uuid) -> Result<BasicUserDto, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .get(self.url(&format!("/api/users/{}/basic", id)))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "user")
    }

    pub async fn add_user(&self, user: &UserPayload) -> Result<UserDto, ClientError> {
        let body: Value = self
            .http
            .post(self.url("/api/users"))
            .json(user)
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "user")
    }

    pub async fn update_user(&self, id: Uuid, user: &UserPayload) -> Result<UserDto, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .put(self.url(&format!("/api/users/{}", id)))
            .json(user)
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "user")
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<bool, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .delete(self.url(&format!("/api/users/{}", id)))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "success")
    }

    pub async fn update_avatar(
        &self,
        id: Uuid,
        file: Bytes,
        content_type: &str,
    ) -> Result<UserDto, ClientError> {
        let id = ensure_id(id)?;
        let part = Part::stream(reqwest::Body::from(file))
            .file_name("avatar")
            .mime_str(content_type)?;
        let body: Value = self
            .http
            .put(self.url(&format!("/api/users/{}/avatar", id)))
            .multipart(Form::new().part("file", part))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "user")
    }

    // --- groups ---

    pub async fn get_public_groups(&self) -> Result<Vec<GroupDto>, ClientError> {
        let body: Value = self
            .http
            .get(self.url("/api/groups"))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "groups")
    }

    pub async fn get_joined_groups(&self, user_id: Uuid) -> Result<Vec<GroupDto>, ClientError> {
        let user_id = ensure_id(user_id)?;
        let body: Value = self
            .http
            .get(self.url(&format!("/api/groups/{}/joined", user_id)))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "groups")
    }

    pub async fn get_group(&self, id: Uuid) -> Result<GroupDto, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .get(self.url(&format!("/api/groups/{}", id)))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "group")
    }

    pub async fn get_group_members(&self, id: Uuid) -> Result<Vec<BasicUserDto>, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .get(self.url(&format!("/api/groups/{}/members", id)))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "users")
    }

    pub async fn add_group(
        &self,
        name: &str,
        visibility: &str,
        owner_id: Option<Uuid>,
        photo: Option<(Bytes, String)>,
    ) -> Result<GroupDto, ClientError> {
        let mut form = Form::new()
            .text("name", name.to_string())
            .text("visibility", visibility.to_string());
        if let Some(owner) = owner_id {
            form = form.text("ownerId", owner.to_string());
        }
        if let Some((bytes, content_type)) = photo {
            let part = Part::stream(reqwest::Body::from(bytes))
                .file_name("photo")
                .mime_str(&content_type)?;
            form = form.part("photo", part);
        }
        let body: Value = self
            .http
            .post(self.url("/api/groups"))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "group")
    }

    pub async fn update_group(
        &self,
        id: Uuid,
        name: Option<&str>,
        visibility: Option<&str>,
        photo: Option<(Bytes, String)>,
    ) -> Result<GroupDto, ClientError> {
        let id = ensure_id(id)?;
        let mut form = Form::new();
        if let Some(name) = name {
            form = form.text("name", name.to_string());
        }
        if let Some(visibility) = visibility {
            form = form.text("visibility", visibility.to_string());
        }
        if let Some((bytes, content_type)) = photo {
            let part = Part::stream(reqwest::Body::from(bytes))
                .file_name("photo")
                .mime_str(&content_type)?;
            form = form.part("photo", part);
        }
        let body: Value = self
            .http
            .put(self.url(&format!("/api/groups/{}", id)))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "group")
    }

    pub async fn invite_members(
        &self,
        id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<GroupDto, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .post(self.url(&format!("/api/groups/{}/inviteMembers", id)))
            .json(&json!({ "userIds": user_ids }))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "group")
    }

    pub async fn add_group_member(&self, id: Uuid, user_id: Uuid) -> Result<GroupDto, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .put(self.url(&format!("/api/groups/{}/addMember", id)))
            .json(&json!({ "userId": user_id }))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "group")
    }

    pub async fn remove_group_member(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<GroupDto, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .put(self.url(&format!("/api/groups/{}/removeMember", id)))
            .json(&json!({ "userId": user_id }))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "group")
    }

    pub async fn delete_group(&self, id: Uuid) -> Result<bool, ClientError> {
        let id = ensure_id(id)?;
        let body: Value = self
            .http
            .delete(self.url(&format!("/api/groups/{}", id)))
            .send()
            .await?
            .json()
            .await?;
        expect_key(body, "success")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expect_key_returns_payload() {
        let body = json!({ "success": true });
        let ok: bool = expect_key(body, "success").unwrap();
        assert!(ok);
    }

    #[test]
    fn expect_key_surfaces_server_error() {
        let body = json!({ "error": "Group not found" });
        let err = expect_key::<Value>(body, "group").unwrap_err();
        assert!(matches!(err, ClientError::Api(ref m) if m == "Group not found"));
    }

    #[test]
    fn expect_key_without_error_field_is_generic() {
        let body = json!({});
        let err = expect_key::<Value>(body, "user").unwrap_err();
        assert!(matches!(err, ClientError::Api(ref m) if m == "Unexpected response"));
    }

    #[test]
    fn null_payload_counts_as_missing() {
        let body = json!({ "user": null, "error": "User not found" });
        let err = expect_key::<Value>(body, "user").unwrap_err();
        assert!(matches!(err, ClientError::Api(ref m) if m == "User not found"));
    }

    #[tokio::test]
    async fn nil_id_is_rejected_before_any_request() {
        // Port 9 is discard; if the guard failed this would still error, but
        // with a transport error instead of MissingId.
        let client = ApiClient::new("http://127.0.0.1:9");
        let err = client.delete_user(Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingId));

        let err = client.get_user(Uuid::nil()).await.unwrap_err();
        assert!(matches!(err, ClientError::MissingId));
    }
}
