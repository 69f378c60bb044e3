use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chefchat")]
#[command(about = "Chat assistant for deciding what to eat", long_about = None)]
pub struct Args {
    #[arg(short = 'm', long = "model", help = "Override the chat model")]
    pub model: Option<String>,

    #[arg(
        long = "api-endpoint",
        help = "Custom API base URL (e.g. https://api.deepseek.com/v1)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(long = "recipes", help = "Path to the recipe dataset (JSON array)")]
    pub recipes: Option<PathBuf>,

    #[arg(long = "no-suggestions", help = "Disable follow-up question suggestions")]
    pub no_suggestions: bool,

    #[arg(short = 'v', long = "verbose", help = "Print request and stream diagnostics")]
    pub verbose: bool,

    #[arg(help = "Message to send; leave empty for interactive mode")]
    pub message: Vec<String>,
}
