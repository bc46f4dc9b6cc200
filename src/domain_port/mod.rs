// store

mod session_cache;
mod session_keys;

pub use session_cache::*;
pub use session_keys::*;

// repo

mod user_repo;

pub use user_repo::*;
