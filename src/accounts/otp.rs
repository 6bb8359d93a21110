use rand::Rng;
use time::{Duration, OffsetDateTime};

/// One-time codes live for an hour.
pub const CODE_TTL: Duration = Duration::seconds(3600);

/// Uniformly random 6-digit code: [100000, 999999].
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999u32).to_string()
}

/// A fresh code and its expiry timestamp.
pub fn issue_code() -> (String, OffsetDateTime) {
    (generate_code(), OffsetDateTime::now_utc() + CODE_TTL)
}

/// A code is live strictly before its expiry. A missing expiry means the
/// code was already consumed.
pub fn is_expired(expires_at: Option<OffsetDateTime>) -> bool {
    match expires_at {
        Some(t) => OffsetDateTime::now_utc() >= t,
        None => true,
    }
}
