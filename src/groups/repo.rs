use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "group_visibility", rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

/// Group record. `member_ids` has set semantics: mutations go through
/// [`with_member`]/[`without_member`] under a row lock, so duplicates cannot
/// be introduced even by concurrent requests.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub visibility: Visibility,
    pub owner_id: Option<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Adds a member, keeping the set free of duplicates. Idempotent.
pub(crate) fn with_member(mut members: Vec<Uuid>, user_id: Uuid) -> Vec<Uuid> {
    if !members.contains(&user_id) {
        members.push(user_id);
    }
    members
}

/// Removes a member. Removing an absent member is a no-op.
pub(crate) fn without_member(mut members: Vec<Uuid>, user_id: Uuid) -> Vec<Uuid> {
    members.retain(|m| *m != user_id);
    members
}

const COLUMNS: &str = "id, name, visibility, owner_id, member_ids, avatar_url, created_at";

impl Group {
    pub async fn list_public(db: &PgPool) -> anyhow::Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, Group>(&format!(
            "SELECT {COLUMNS} FROM groups WHERE visibility = 'public' ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Groups a user belongs to, either as owner or member.
    pub async fn list_joined(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, Group>(&format!(
            r#"
            SELECT {COLUMNS} FROM groups
            WHERE owner_id = $1 OR $1 = ANY(member_ids)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Group>> {
        let row = sqlx::query_as::<_, Group>(&format!("SELECT {COLUMNS} FROM groups WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    /// Creates a group; the owner, when given, starts out as a member.
    pub async fn create(
        db: &PgPool,
        name: &str,
        visibility: Visibility,
        owner_id: Option<Uuid>,
        avatar_url: Option<&str>,
    ) -> anyhow::Result<Group> {
        let members: Vec<Uuid> = owner_id.into_iter().collect();
        let row = sqlx::query_as::<_, Group>(&format!(
            r#"
            INSERT INTO groups (name, visibility, owner_id, member_ids, avatar_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(name)
        .bind(visibility)
        .bind(owner_id)
        .bind(&members)
        .bind(avatar_url)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Partial update; absent fields keep their stored value.
    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        visibility: Option<Visibility>,
        avatar_url: Option<&str>,
    ) -> anyhow::Result<Option<Group>> {
        let row = sqlx::query_as::<_, Group>(&format!(
            r#"
            UPDATE groups
            SET name = COALESCE($2, name),
                visibility = COALESCE($3, visibility),
                avatar_url = COALESCE($4, avatar_url)
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(name)
        .bind(visibility)
        .bind(avatar_url)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Applies a member-set edit atomically: the row is locked, the new set
    /// computed in process, and written back in the same transaction.
    async fn mutate_members<F>(db: &PgPool, id: Uuid, edit: F) -> anyhow::Result<Option<Group>>
    where
        F: FnOnce(Vec<Uuid>) -> Vec<Uuid>,
    {
        let mut tx = db.begin().await?;

        let members = sqlx::query_scalar::<_, Vec<Uuid>>(
            "SELECT member_ids FROM groups WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(members) = members else {
            return Ok(None);
        };

        let updated = edit(members);
        let group = sqlx::query_as::<_, Group>(&format!(
            "UPDATE groups SET member_ids = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&updated)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(group))
    }

    pub async fn add_member(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Group>> {
        Self::mutate_members(db, id, |m| with_member(m, user_id)).await
    }

    pub async fn remove_member(
        db: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Group>> {
        Self::mutate_members(db, id, |m| without_member(m, user_id)).await
    }

    pub async fn add_members(
        db: &PgPool,
        id: Uuid,
        user_ids: &[Uuid],
    ) -> anyhow::Result<Option<Group>> {
        let ids = user_ids.to_vec();
        Self::mutate_members(db, id, move |m| {
            ids.into_iter().fold(m, with_member)
        })
        .await
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Option<String>>> {
        let deleted = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM groups WHERE id = $1 RETURNING avatar_url",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adding_a_member_twice_keeps_one_entry() {
        let user = Uuid::new_v4();
        let members = with_member(vec![], user);
        let members = with_member(members, user);
        assert_eq!(members, vec![user]);
    }

    #[test]
    fn adding_preserves_existing_members() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let members = with_member(vec![a], b);
        assert_eq!(members, vec![a, b]);
    }

    #[test]
    fn removing_a_non_member_is_a_noop() {
        let a = Uuid::new_v4();
        let members = without_member(vec![a], Uuid::new_v4());
        assert_eq!(members, vec![a]);
    }

    #[test]
    fn removing_a_member_drops_it() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let members = without_member(vec![a, b], a);
        assert_eq!(members, vec![b]);
    }

    #[test]
    fn batch_add_is_idempotent_per_id() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let members = [a, b, a].into_iter().fold(vec![b], with_member);
        assert_eq!(members, vec![b, a]);
    }
}
