use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::groups::repo::{Group, Visibility};
use crate::users::dto::BasicUserDto;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDto {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub visibility: Visibility,
    pub owner_id: Option<Uuid>,
    pub member_ids: Vec<Uuid>,
    pub avatar_url: Option<String>,
}

impl From<Group> for GroupDto {
    fn from(g: Group) -> Self {
        Self {
            id: g.id,
            name: g.name,
            visibility: g.visibility,
            owner_id: g.owner_id,
            member_ids: g.member_ids,
            avatar_url: g.avatar_url,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupEnvelope {
    pub group: GroupDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupsEnvelope {
    pub groups: Vec<GroupDto>,
}

/// Member listings reuse the basic user projection.
#[derive(Debug, Serialize, Deserialize)]
pub struct MembersEnvelope {
    pub users: Vec<BasicUserDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteMembersRequest {
    pub user_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn group_dto_wire_shape() {
        let owner = Uuid::new_v4();
        let dto: GroupDto = Group {
            id: Uuid::new_v4(),
            name: "Morning runners".into(),
            visibility: Visibility::Public,
            owner_id: Some(owner),
            member_ids: vec![owner],
            avatar_url: None,
            created_at: OffsetDateTime::now_utc(),
        }
        .into();
        let json = serde_json::to_value(&dto).unwrap();
        assert!(json.get("_id").is_some());
        assert_eq!(json["visibility"], "public");
        assert_eq!(json["ownerId"], owner.to_string());
        assert_eq!(json["memberIds"][0], owner.to_string());
    }

    #[test]
    fn member_request_accepts_camel_case() {
        let req: MemberRequest =
            serde_json::from_str(&format!(r#"{{"userId":"{}"}}"#, Uuid::new_v4())).unwrap();
        assert!(!req.user_id.is_nil());
    }
}
