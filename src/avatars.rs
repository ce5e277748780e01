use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::state::AppState;

pub struct AvatarUpload {
    pub body: Bytes,
    pub content_type: String,
}

/// Uploads an avatar for a resource and returns the public URL to persist on
/// the record. `scope` is the owning collection, e.g. "users" or "groups".
pub async fn store_avatar(
    st: &AppState,
    scope: &str,
    owner_id: Uuid,
    upload: AvatarUpload,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(&upload.content_type).unwrap_or("bin");
    let key = format!("{}/{}/{}.{}", scope, owner_id, Uuid::new_v4(), ext);
    st.storage
        .put_object(&key, upload.body, &upload.content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    Ok(st.storage.object_url(&key))
}

/// Deletes a previously stored avatar given its persisted URL. URLs that do
/// not point into our bucket are left alone.
pub async fn discard_avatar(st: &AppState, url: &str) -> anyhow::Result<()> {
    let base = st.storage.object_url("");
    let Some(key) = url.strip_prefix(&base) else {
        return Ok(());
    };
    st.storage
        .delete_object(key)
        .await
        .with_context(|| format!("delete_object {}", key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn store_avatar_returns_scoped_url() {
        let state = AppState::fake();
        let owner = Uuid::new_v4();
        let url = store_avatar(
            &state,
            "users",
            owner,
            AvatarUpload {
                body: Bytes::from_static(b"img"),
                content_type: "image/png".into(),
            },
        )
        .await
        .unwrap();
        assert!(url.starts_with("https://fake.local/fitcircle/users/"));
        assert!(url.contains(&owner.to_string()));
        assert!(url.ends_with(".png"));
    }

    #[tokio::test]
    async fn discard_ignores_foreign_urls() {
        let state = AppState::fake();
        discard_avatar(&state, "https://elsewhere.example/x.png")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn discard_deletes_own_urls() {
        let state = AppState::fake();
        let url = state.storage.object_url("groups/abc/def.jpg");
        discard_avatar(&state, &url).await.unwrap();
    }
}
