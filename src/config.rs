use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// SMTP relay credentials. Absent entirely when mail is not configured.
#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "freightlink".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "freightlink-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        let smtp = match (std::env::var("SMTP_HOST"), std::env::var("SMTP_USER")) {
            (Ok(host), Ok(user)) => Some(SmtpConfig {
                host,
                from: std::env::var("SMTP_FROM").unwrap_or_else(|_| user.clone()),
                password: std::env::var("SMTP_PASSWORD").unwrap_or_default(),
                user,
            }),
            _ => None,
        };
        Ok(Self {
            database_url,
            jwt,
            smtp,
        })
    }
}
