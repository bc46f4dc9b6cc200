//! Settings come from a TOML file layered with `SENTINEL_*` environment
//! variables (`__` separates nested keys).

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
