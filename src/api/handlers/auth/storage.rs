//! Database access for users and API keys.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::utils::is_unique_violation;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(crate) enum RegisterOutcome {
    Created(Uuid),
    EmailTaken,
}

pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) password_hash: String,
    pub(crate) first_name: Option<String>,
    pub(crate) last_name: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

pub(crate) struct ApiKeyRecord {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) rate_limit: Option<i32>,
    pub(crate) usage_count: i64,
    pub(crate) last_used_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    pub(crate) fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Active and not expired.
    pub(crate) fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(now)
    }
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        created_at: row.get("created_at"),
    }
}

fn api_key_from_row(row: &sqlx::postgres::PgRow) -> ApiKeyRecord {
    ApiKeyRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        description: row.get("description"),
        is_active: row.get("is_active"),
        rate_limit: row.get("rate_limit"),
        usage_count: row.get("usage_count"),
        last_used_at: row.get("last_used_at"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, created_at";

const API_KEY_COLUMNS: &str = "id, user_id, name, description, is_active, rate_limit, \
     usage_count, last_used_at, created_at, expires_at";

pub(crate) async fn insert_user(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<RegisterOutcome> {
    let query = r"
        INSERT INTO users (email, password_hash, first_name, last_name)
        VALUES ($1, $2, $3, $4)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .bind(first_name)
        .bind(last_name)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(RegisterOutcome::Created(row.get("id"))),
        Err(err) if is_unique_violation(&err) => Ok(RegisterOutcome::EmailTaken),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(crate) async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    Ok(row.as_ref().map(user_from_row))
}

pub(crate) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    Ok(row.as_ref().map(user_from_row))
}

pub(crate) async fn list_users(pool: &PgPool) -> Result<Vec<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    Ok(rows.iter().map(user_from_row).collect())
}

pub(crate) async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<()> {
    let query = "UPDATE users SET password_hash = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(())
}

/// Delete a user; owned API keys go with it via `ON DELETE CASCADE`.
pub(crate) async fn delete_user(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let query = "DELETE FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete user")?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn insert_api_key(
    pool: &PgPool,
    user_id: Uuid,
    key_hash: &[u8],
    name: &str,
    description: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<ApiKeyRecord> {
    let query = format!(
        r"
        INSERT INTO api_keys (user_id, key_hash, name, description, expires_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {API_KEY_COLUMNS}
    "
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .bind(key_hash)
        .bind(name)
        .bind(description)
        .bind(expires_at)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to insert api key")?;

    Ok(api_key_from_row(&row))
}

/// Validate a presented key digest and meter its usage in one transaction.
///
/// Lookup is by digest equality; raw secrets are never compared. Inactive and
/// expired keys return `None` without touching the usage counters, and a
/// failed commit leaves the counters unchanged.
pub(crate) async fn validate_api_key(
    pool: &PgPool,
    key_hash: &[u8],
) -> Result<Option<ApiKeyRecord>> {
    let mut tx = pool.begin().await.context("begin api key validation")?;

    let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(key_hash)
        .fetch_optional(&mut *tx)
        .instrument(span)
        .await
        .context("failed to lookup api key")?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut record = api_key_from_row(&row);
    let now = Utc::now();
    if !record.is_valid_at(now) {
        return Ok(None);
    }

    let query = r"
        UPDATE api_keys
        SET usage_count = usage_count + 1,
            last_used_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(record.id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to update api key usage")?;

    tx.commit().await.context("commit api key validation")?;

    record.usage_count += 1;
    record.last_used_at = Some(now);
    Ok(Some(record))
}

pub(crate) async fn get_api_key(pool: &PgPool, key_id: Uuid) -> Result<Option<ApiKeyRecord>> {
    let query = format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(key_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to get api key")?;

    Ok(row.as_ref().map(api_key_from_row))
}

pub(crate) async fn list_api_keys(pool: &PgPool, user_id: Uuid) -> Result<Vec<ApiKeyRecord>> {
    let query = format!(
        "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC"
    );
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let rows = sqlx::query(&query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list api keys")?;

    Ok(rows.iter().map(api_key_from_row).collect())
}

/// Soft-revoke: the row stays for audit, the key stops validating.
/// Revoking an already-inactive key is a no-op that still reports success.
pub(crate) async fn revoke_api_key(pool: &PgPool, key_id: Uuid) -> Result<bool> {
    let query = "UPDATE api_keys SET is_active = FALSE WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(key_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to revoke api key")?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn delete_api_key(pool: &PgPool, key_id: Uuid) -> Result<bool> {
    let query = "DELETE FROM api_keys WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(key_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to delete api key")?;
    Ok(result.rows_affected() > 0)
}
