mod auth_service;
mod context;
mod guards;
mod user_service;

pub use auth_service::*;
pub use context::*;
pub use guards::*;
pub use user_service::*;
