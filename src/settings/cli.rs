use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Authentication and user service")]
pub struct Cli {
    /// Settings file to load; the extension may be omitted.
    #[arg(long)]
    pub settings: Option<String>,
}
