use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo::{Sex, User};

/// Value plus unit, e.g. `{ "value": 182, "unit": "cm" }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub value: Option<f64>,
    pub unit: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub age: i32,
    pub sex: Sex,
    pub height: Measurement,
    pub weight: Measurement,
    pub avatar_url: Option<String>,
}

/// Slim projection for lists and mentions.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicUserDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            age: u.age,
            sex: u.sex,
            height: Measurement {
                value: u.height_value,
                unit: u.height_unit,
            },
            weight: Measurement {
                value: u.weight_value,
                unit: u.weight_unit,
            },
            avatar_url: u.avatar_url,
        }
    }
}

impl From<User> for BasicUserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            avatar_url: u.avatar_url,
        }
    }
}

fn default_height_unit() -> String {
    "cm".into()
}
fn default_weight_unit() -> String {
    "kg".into()
}

fn default_height() -> Measurement {
    Measurement {
        value: None,
        unit: default_height_unit(),
    }
}
fn default_weight() -> Measurement {
    Measurement {
        value: None,
        unit: default_weight_unit(),
    }
}

/// Create/update payload for a profile.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserPayload {
    pub name: String,
    pub age: i32,
    pub sex: Sex,
    #[serde(default = "default_height")]
    pub height: Measurement,
    #[serde(default = "default_weight")]
    pub weight: Measurement,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserEnvelope {
    pub user: UserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BasicUserEnvelope {
    pub user: BasicUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersEnvelope {
    pub users: Vec<BasicUserDto>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessEnvelope {
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            age: 35,
            sex: Sex::Woman,
            height_value: Some(170.0),
            height_unit: "cm".into(),
            weight_value: None,
            weight_unit: "kg".into(),
            avatar_url: Some("https://cdn.example/u.png".into()),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn user_dto_wire_shape() {
        let dto: UserDto = sample_user().into();
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["sex"], "woman");
        assert_eq!(json["height"]["value"], 170.0);
        assert_eq!(json["height"]["unit"], "cm");
        assert!(json["weight"]["value"].is_null());
        assert_eq!(json["avatarUrl"], "https://cdn.example/u.png");
    }

    #[test]
    fn payload_defaults_measurements() {
        let payload: UserPayload =
            serde_json::from_str(r#"{"name":"Bo","age":30,"sex":"man"}"#).unwrap();
        assert_eq!(payload.height.unit, "cm");
        assert_eq!(payload.weight.unit, "kg");
        assert!(payload.height.value.is_none());
    }
}
