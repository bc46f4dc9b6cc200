mod context;
mod error;
mod handler;
mod router;

pub use context::with_context;
pub use error::recover_error;
pub use router::routes;
