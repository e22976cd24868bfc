use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::contacts::repo_types::Contact;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Full contact representation supplied on create and update. Updates
/// overwrite every field; there is no partial form.
#[derive(Debug, Deserialize)]
pub struct ContactBody {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub birthday: Option<Date>,
}

#[derive(Debug, Serialize)]
pub struct ContactResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    #[serde(with = "iso_date::option")]
    pub birthday: Option<Date>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<Contact> for ContactResponse {
    fn from(c: Contact) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            phone_number: c.phone_number,
            birthday: c.birthday,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Deserialize)]
pub struct BirthdayQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;
    use uuid::Uuid;

    #[test]
    fn contact_response_omits_the_owner_id() {
        let contact = Contact {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            first_name: "John".into(),
            last_name: "Doe".into(),
            email: "john@x.com".into(),
            phone_number: "123".into(),
            birthday: Some(date!(1990 - 01 - 01)),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&ContactResponse::from(contact)).unwrap();
        assert!(json.contains("John"));
        assert!(json.contains("1990-01-01"));
        assert!(!json.contains("user_id"));
    }

    #[test]
    fn pagination_defaults() {
        let p: Pagination = serde_json::from_str("{}").unwrap();
        assert_eq!(p.limit, 10);
        assert_eq!(p.offset, 0);

        let q: BirthdayQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.days, 7);
    }

    #[test]
    fn search_query_filters_are_optional() {
        let q: SearchQuery = serde_json::from_str(r#"{"first_name":"Jo"}"#).unwrap();
        assert_eq!(q.first_name.as_deref(), Some("Jo"));
        assert!(q.last_name.is_none());
        assert!(q.email.is_none());
        assert_eq!(q.skip, 0);
        assert_eq!(q.limit, 10);
    }
}
