//! One-shot bootstrap: creates the initial Admin account if it is missing.
//!
//! Reads ADMIN_EMAIL, ADMIN_NAME and ADMIN_PASSWORD from the environment.

use sqlx::postgres::PgPoolOptions;
use tracing::info;

use freightlink::accounts::password::hash_password;
use freightlink::accounts::repo_types::User;
use freightlink::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "freightlink=info".to_string()),
        )
        .init();

    let config = AppConfig::from_env()?;
    let db = PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await?;

    let email = std::env::var("ADMIN_EMAIL")?.trim().to_lowercase();
    let name = std::env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".into());
    let password = std::env::var("ADMIN_PASSWORD")?;

    if User::find_by_email(&db, &email).await?.is_some() {
        info!(email = %email, "admin user already exists");
        return Ok(());
    }

    let hash = hash_password(&password)?;
    sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, is_verified) \
         VALUES ($1, $2, $3, 'Admin', TRUE)",
    )
    .bind(&name)
    .bind(&email)
    .bind(&hash)
    .execute(&db)
    .await?;

    info!(email = %email, "admin user created");
    Ok(())
}
