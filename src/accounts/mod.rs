use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod otp;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod validate;

pub fn router() -> Router<AppState> {
    handlers::account_routes()
}
