//! Process-wide `tracing` setup. Boots with a default filter, then reloads
//! the filter from the `[log]` settings section.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
