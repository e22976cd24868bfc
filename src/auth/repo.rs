use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;
use crate::gravatar;

/// Find a user by email.
pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, refresh_token, avatar, confirmed,
               created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Find a user by id.
pub async fn find_by_id(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, email, password_hash, refresh_token, avatar, confirmed,
               created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Create a new user with a hashed password. The avatar URL is derived from
/// the email up front; it is a best-effort nicety and never a reason for
/// signup to fail.
pub async fn create(
    db: &PgPool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> anyhow::Result<User> {
    let avatar = gravatar::gravatar_url(email);
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, email, password_hash, avatar)
        VALUES ($1, $2, $3, $4)
        RETURNING id, username, email, password_hash, refresh_token, avatar, confirmed,
                  created_at, updated_at
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(avatar)
    .fetch_one(db)
    .await?;
    Ok(user)
}

/// Persist a new refresh token, or clear it with `None` on logout or
/// session revocation.
pub async fn set_refresh_token(
    db: &PgPool,
    user_id: Uuid,
    token: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET refresh_token = $1, updated_at = now() WHERE id = $2")
        .bind(token)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Mark the user with this email as confirmed. A missing user is a no-op;
/// callers validate existence first.
pub async fn confirm_email(db: &PgPool, email: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET confirmed = TRUE, updated_at = now() WHERE email = $1")
        .bind(email)
        .execute(db)
        .await?;
    Ok(())
}

/// Replace the avatar URL and return the refreshed record.
pub async fn set_avatar_url(
    db: &PgPool,
    email: &str,
    url: Option<&str>,
) -> anyhow::Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET avatar = $1, updated_at = now()
        WHERE email = $2
        RETURNING id, username, email, password_hash, refresh_token, avatar, confirmed,
                  created_at, updated_at
        "#,
    )
    .bind(url)
    .bind(email)
    .fetch_one(db)
    .await?;
    Ok(user)
}
