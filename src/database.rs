use bcrypt::{hash, DEFAULT_COST};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::Config;
use crate::error::AppError;
use crate::models::user::Role;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Creates the first ADMIN account when the users table is empty and
/// bootstrap credentials are configured.
pub async fn ensure_admin(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    let has_users: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users)")
        .fetch_one(pool)
        .await?;
    if has_users {
        return Ok(());
    }

    let password_hash = hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal(format!("Hash error: {e}")))?;

    sqlx::query("INSERT INTO users (username, password_hash, full_name, role) VALUES ($1, $2, $3, $4)")
        .bind(username)
        .bind(password_hash)
        .bind("Administrator")
        .bind(Role::Admin)
        .execute(pool)
        .await?;

    tracing::info!(%username, "Bootstrap admin account created");
    Ok(())
}
