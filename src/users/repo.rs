use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "sex_kind", rename_all = "lowercase")]
pub enum Sex {
    Woman,
    Man,
}

/// Profile record. Measurements are stored flat (value + unit columns) and
/// folded into `{value, unit}` pairs at the DTO boundary.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub sex: Sex,
    pub height_value: Option<f64>,
    pub height_unit: String,
    pub weight_value: Option<f64>,
    pub weight_unit: String,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}

pub struct NewUser<'a> {
    pub name: &'a str,
    pub age: i32,
    pub sex: Sex,
    pub height_value: Option<f64>,
    pub height_unit: &'a str,
    pub weight_value: Option<f64>,
    pub weight_unit: &'a str,
}

const COLUMNS: &str = "id, name, age, sex, height_value, height_unit, \
                       weight_value, weight_unit, avatar_url, created_at";

impl User {
    pub async fn list(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!("SELECT {COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(row)
    }

    pub async fn create(db: &PgPool, new: NewUser<'_>) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, age, sex, height_value, height_unit, weight_value, weight_unit)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(new.name)
        .bind(new.age)
        .bind(new.sex)
        .bind(new.height_value)
        .bind(new.height_unit)
        .bind(new.weight_value)
        .bind(new.weight_unit)
        .fetch_one(db)
        .await?;
        Ok(row)
    }

    /// Full-record update; the id itself is immutable. Returns None when the
    /// profile does not exist.
    pub async fn update(db: &PgPool, id: Uuid, new: NewUser<'_>) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, age = $3, sex = $4, height_value = $5, height_unit = $6,
                weight_value = $7, weight_unit = $8
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(id)
        .bind(new.name)
        .bind(new.age)
        .bind(new.sex)
        .bind(new.height_value)
        .bind(new.height_unit)
        .bind(new.weight_value)
        .bind(new.weight_unit)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    pub async fn set_avatar(db: &PgPool, id: Uuid, url: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(db)
        .await?;
        Ok(row)
    }

    /// Deletes a profile. `Some(avatar_url)` when a row was removed, so the
    /// caller can clean up the stored object.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Option<String>>> {
        let deleted = sqlx::query_scalar::<_, Option<String>>(
            "DELETE FROM users WHERE id = $1 RETURNING avatar_url",
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(deleted)
    }

    pub async fn find_many(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {COLUMNS} FROM users WHERE id = ANY($1) ORDER BY name ASC"
        ))
        .bind(ids)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}
