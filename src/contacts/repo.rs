use sqlx::{PgPool, Postgres, QueryBuilder};
use time::{Date, OffsetDateTime};
use tracing::warn;
use uuid::Uuid;

use crate::contacts::dto::ContactBody;
use crate::contacts::repo_types::Contact;

/// Insert a new contact owned by `owner`.
pub async fn create(db: &PgPool, owner: Uuid, body: &ContactBody) -> anyhow::Result<Contact> {
    let contact = sqlx::query_as::<_, Contact>(
        r#"
        INSERT INTO contacts (user_id, first_name, last_name, email, phone_number, birthday)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, user_id, first_name, last_name, email, phone_number, birthday,
                  created_at, updated_at
        "#,
    )
    .bind(owner)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.email)
    .bind(&body.phone_number)
    .bind(body.birthday)
    .fetch_one(db)
    .await?;
    Ok(contact)
}

/// Page through the owner's contacts.
pub async fn list(
    db: &PgPool,
    owner: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Contact>> {
    let rows = sqlx::query_as::<_, Contact>(
        r#"
        SELECT id, user_id, first_name, last_name, email, phone_number, birthday,
               created_at, updated_at
        FROM contacts
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(owner)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Fetch a single contact; `None` when no row matches both id and owner.
pub async fn get_by_id(
    db: &PgPool,
    owner: Uuid,
    contact_id: Uuid,
) -> anyhow::Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>(
        r#"
        SELECT id, user_id, first_name, last_name, email, phone_number, birthday,
               created_at, updated_at
        FROM contacts
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(contact_id)
    .bind(owner)
    .fetch_optional(db)
    .await?;
    Ok(contact)
}

/// Overwrite every field of an owned contact. `None` when the row does not
/// belong to the owner.
pub async fn update(
    db: &PgPool,
    owner: Uuid,
    contact_id: Uuid,
    body: &ContactBody,
) -> anyhow::Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>(
        r#"
        UPDATE contacts
        SET first_name = $1, last_name = $2, email = $3, phone_number = $4, birthday = $5,
            updated_at = now()
        WHERE id = $6 AND user_id = $7
        RETURNING id, user_id, first_name, last_name, email, phone_number, birthday,
                  created_at, updated_at
        "#,
    )
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.email)
    .bind(&body.phone_number)
    .bind(body.birthday)
    .bind(contact_id)
    .bind(owner)
    .fetch_optional(db)
    .await?;
    Ok(contact)
}

/// Delete an owned contact, returning its prior state. `None` when the row
/// does not belong to the owner.
pub async fn delete(
    db: &PgPool,
    owner: Uuid,
    contact_id: Uuid,
) -> anyhow::Result<Option<Contact>> {
    let contact = sqlx::query_as::<_, Contact>(
        r#"
        DELETE FROM contacts
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, first_name, last_name, email, phone_number, birthday,
                  created_at, updated_at
        "#,
    )
    .bind(contact_id)
    .bind(owner)
    .fetch_optional(db)
    .await?;
    Ok(contact)
}

/// Contacts whose birthday falls within the next `days` days of the
/// current month.
///
/// The window is computed on day-of-month only: it never rolls over into
/// the next month and the birth year is ignored, so a birthday early next
/// month is missed even when it is inside `days`. Dependents rely on this
/// window as-is.
pub async fn birthdays_within(
    db: &PgPool,
    owner: Uuid,
    days: i64,
) -> anyhow::Result<Vec<Contact>> {
    let (month, day_cutoff) = birthday_window(OffsetDateTime::now_utc().date(), days);
    let rows = sqlx::query_as::<_, Contact>(
        r#"
        SELECT id, user_id, first_name, last_name, email, phone_number, birthday,
               created_at, updated_at
        FROM contacts
        WHERE user_id = $1
          AND EXTRACT(MONTH FROM birthday) = $2
          AND EXTRACT(DAY FROM birthday) <= $3
        "#,
    )
    .bind(owner)
    .bind(month)
    .bind(day_cutoff)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

fn birthday_window(today: Date, days: i64) -> (i32, i64) {
    (u8::from(today.month()) as i32, i64::from(today.day()) + days + 1)
}

/// Case-insensitive substring search over the owner's contacts; supplied
/// filters are AND-combined. A failing query degrades to an empty result
/// set instead of an error.
pub async fn search(
    db: &PgPool,
    owner: Uuid,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
    skip: i64,
    limit: i64,
) -> Vec<Contact> {
    let mut query = QueryBuilder::<Postgres>::new(
        "SELECT id, user_id, first_name, last_name, email, phone_number, birthday, \
         created_at, updated_at FROM contacts WHERE user_id = ",
    );
    query.push_bind(owner);
    if let Some(first_name) = first_name {
        query.push(" AND first_name ILIKE ");
        query.push_bind(format!("%{first_name}%"));
    }
    if let Some(last_name) = last_name {
        query.push(" AND last_name ILIKE ");
        query.push_bind(format!("%{last_name}%"));
    }
    if let Some(email) = email {
        query.push(" AND email ILIKE ");
        query.push_bind(format!("%{email}%"));
    }
    // Same ordering as `list`, so a filterless search pages identically.
    query.push(" ORDER BY created_at DESC LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(skip);

    match query.build_query_as::<Contact>().fetch_all(db).await {
        Ok(rows) => rows,
        Err(e) => {
            warn!(error = %e, "contact search failed, returning empty result");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn birthday_window_extends_one_past_requested_days() {
        let (month, cutoff) = birthday_window(date!(2024 - 03 - 10), 7);
        assert_eq!(month, 3);
        assert_eq!(cutoff, 18); // 10 + 7 + 1
    }

    #[test]
    fn birthday_window_never_crosses_the_month_boundary() {
        let (month, cutoff) = birthday_window(date!(2024 - 01 - 30), 7);
        // The cutoff runs past the end of January, but the month filter
        // stays on January: a birthday on February 2nd is not reported.
        assert_eq!(month, 1);
        assert!(cutoff > 31);
    }

    #[test]
    fn birthday_window_ignores_the_year() {
        let (month_a, cutoff_a) = birthday_window(date!(2023 - 06 - 05), 7);
        let (month_b, cutoff_b) = birthday_window(date!(2031 - 06 - 05), 7);
        assert_eq!((month_a, cutoff_a), (month_b, cutoff_b));
    }
}
