//! In-process backends. Same contracts as the Redis and MySQL adapters,
//! without the external services; used by the `memory` settings backend
//! and by tests.

mod session_cache_memory;
mod user_repo_memory;

pub use session_cache_memory::*;
pub use user_repo_memory::*;
