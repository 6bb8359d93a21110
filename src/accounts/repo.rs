use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::accounts::repo_types::{Role, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, is_verified, \
     verification_code, verification_code_expires_at, \
     reset_code, reset_code_expires_at, created_at, updated_at";

impl User {
    /// Find a user by email, case-insensitively.
    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    /// Lookup by live verification code. Reset codes live in their own
    /// column and are never consulted here.
    pub async fn find_by_verification_code(
        db: &PgPool,
        code: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE verification_code = $1"
        ))
        .bind(code)
        .fetch_optional(db)
        .await
    }

    /// Insert a new unverified user. Email uniqueness is enforced by the
    /// LOWER(email) unique index; a 23505 here surfaces as a conflict.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        verification_code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash, verification_code, verification_code_expires_at) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(verification_code)
        .bind(expires_at)
        .fetch_one(db)
        .await
    }

    pub async fn list(db: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(db)
        .await
    }

    /// Flip the verified flag and consume the verification code in the same
    /// row write (single-use semantics).
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET is_verified = TRUE, verification_code = NULL, \
             verification_code_expires_at = NULL, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(())
    }

    pub async fn set_reset_code(
        db: &PgPool,
        id: Uuid,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET reset_code = $2, reset_code_expires_at = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(code)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Store the new hash and consume the reset code in the same row write.
    pub async fn apply_password_reset(
        db: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET password_hash = $2, reset_code = NULL, \
             reset_code_expires_at = NULL, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Partial profile update; absent fields keep their current value.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        role: Option<Role>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             role = COALESCE($4, role), updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role)
        .fetch_optional(db)
        .await
    }

    /// Returns whether a row was actually deleted.
    pub async fn delete(db: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
