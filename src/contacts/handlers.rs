use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, services::is_valid_email},
    contacts::{
        dto::{BirthdayQuery, ContactBody, ContactResponse, Pagination, SearchQuery},
        repo,
    },
    error::ApiError,
    state::AppState,
};

pub fn contact_routes() -> Router<AppState> {
    Router::new()
        .route("/contacts", get(list_contacts).post(create_contact))
        .route("/contacts/birthday", get(upcoming_birthdays))
        .route("/contacts/search", get(search_contacts))
        .route(
            "/contacts/:id",
            get(get_contact).put(update_contact).delete(delete_contact),
        )
}

const LIST_LIMIT_MAX: i64 = 500;
const SEARCH_LIMIT_MAX: i64 = 100;
const BIRTHDAY_MIN_DAYS: i64 = 7;

fn clamp_page(limit: i64, offset: i64, max: i64) -> (i64, i64) {
    (limit.clamp(10, max), offset.max(0))
}

fn validate_body(body: &ContactBody) -> Result<(), ApiError> {
    if body.first_name.trim().is_empty() || body.last_name.trim().is_empty() {
        return Err(ApiError::Validation(
            "First and last name must not be empty".into(),
        ));
    }
    if !is_valid_email(&body.email) {
        return Err(ApiError::Validation("Invalid email".into()));
    }
    if body.phone_number.trim().is_empty() {
        return Err(ApiError::Validation("Phone number must not be empty".into()));
    }
    Ok(())
}

#[instrument(skip(state))]
pub async fn list_contacts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let (limit, offset) = clamp_page(p.limit, p.offset, LIST_LIMIT_MAX);
    let contacts = repo::list(&state.db, user_id, limit, offset).await?;
    Ok(Json(
        contacts.into_iter().map(ContactResponse::from).collect(),
    ))
}

#[instrument(skip(state, body))]
pub async fn create_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<ContactBody>,
) -> Result<(StatusCode, Json<ContactResponse>), ApiError> {
    validate_body(&body)?;
    let contact = repo::create(&state.db, user_id, &body)
        .await
        .map_err(ApiError::from_db)?;
    Ok((StatusCode::CREATED, Json(ContactResponse::from(contact))))
}

#[instrument(skip(state))]
pub async fn get_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ContactResponse>, ApiError> {
    let contact = repo::get_by_id(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Contact not found".into()))?;
    Ok(Json(ContactResponse::from(contact)))
}

#[instrument(skip(state, body))]
pub async fn update_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ContactBody>,
) -> Result<Json<ContactResponse>, ApiError> {
    validate_body(&body)?;
    let contact = repo::update(&state.db, user_id, id, &body)
        .await?
        .ok_or_else(|| ApiError::NotFound("Contact not found".into()))?;
    Ok(Json(ContactResponse::from(contact)))
}

#[instrument(skip(state))]
pub async fn delete_contact(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    repo::delete(&state.db, user_id, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Contact not found".into()))?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn upcoming_birthdays(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<BirthdayQuery>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let days = q.days.max(BIRTHDAY_MIN_DAYS);
    let contacts = repo::birthdays_within(&state.db, user_id, days).await?;
    Ok(Json(
        contacts.into_iter().map(ContactResponse::from).collect(),
    ))
}

#[instrument(skip(state))]
pub async fn search_contacts(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<SearchQuery>,
) -> Result<Json<Vec<ContactResponse>>, ApiError> {
    let (limit, skip) = clamp_page(q.limit, q.skip, SEARCH_LIMIT_MAX);
    let contacts = repo::search(
        &state.db,
        user_id,
        q.first_name.as_deref(),
        q.last_name.as_deref(),
        q.email.as_deref(),
        skip,
        limit,
    )
    .await;
    Ok(Json(
        contacts.into_iter().map(ContactResponse::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_page_enforces_the_bounds() {
        assert_eq!(clamp_page(10, 0, LIST_LIMIT_MAX), (10, 0));
        assert_eq!(clamp_page(3, 0, LIST_LIMIT_MAX), (10, 0));
        assert_eq!(clamp_page(9000, 20, LIST_LIMIT_MAX), (500, 20));
        assert_eq!(clamp_page(9000, 0, SEARCH_LIMIT_MAX), (100, 0));
        assert_eq!(clamp_page(50, -5, LIST_LIMIT_MAX), (50, 0));
    }

    fn body(first: &str, last: &str, email: &str, phone: &str) -> ContactBody {
        ContactBody {
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            phone_number: phone.into(),
            birthday: None,
        }
    }

    #[test]
    fn validate_body_accepts_a_complete_contact() {
        assert!(validate_body(&body("John", "Doe", "john@x.com", "123")).is_ok());
    }

    #[test]
    fn validate_body_rejects_blank_names() {
        assert!(validate_body(&body("  ", "Doe", "john@x.com", "123")).is_err());
        assert!(validate_body(&body("John", "", "john@x.com", "123")).is_err());
    }

    #[test]
    fn validate_body_rejects_malformed_email() {
        assert!(validate_body(&body("John", "Doe", "not-an-email", "123")).is_err());
    }

    #[test]
    fn validate_body_rejects_blank_phone() {
        assert!(validate_body(&body("John", "Doe", "john@x.com", " ")).is_err());
    }
}
