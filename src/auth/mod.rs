use crate::state::AppState;
use axum::Router;

pub mod bootstrap;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use error::{AuthError, AuthResult, StoreError};
pub use repo::UserStore;
pub use repo_types::{NewUser, UserId, UserRecord};
pub use services::AuthService;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
