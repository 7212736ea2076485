//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use wastelink::listings::Unit;

pub(crate) mod commands;
pub(crate) mod logging;

/// Log output format.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Waste-trading marketplace from the terminal
#[derive(Debug, Parser)]
#[command(name = "wastelink", about = "WasteLink waste-trading marketplace", long_about = None)]
pub(crate) struct Cli {
    /// Settings file (YAML)
    #[arg(short, long, env = "WASTELINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the cart and user data
    #[arg(short, long, env = "WASTELINK_STORE", default_value = ".wastelink", global = true)]
    pub store: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Sign in for commands that behave differently for members.
#[derive(Debug, Args)]
pub(crate) struct MemberArgs {
    /// Sign in as this member; guests otherwise
    #[arg(short, long)]
    pub member: Option<String>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Browse and filter listings
    Market(MarketArgs),

    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: CartCommand,
    },

    /// Ask the chat assistant
    Chat(ChatArgs),

    /// Analyse a waste photo and optionally list it
    Scan(ScanArgs),

    /// Check out the cart
    Pay(PayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct MarketArgs {
    /// Marketplace query string, e.g. `search=glass&location=Kenya`
    #[arg(short, long)]
    pub query: Option<String>,

    /// Search title and category
    #[arg(long)]
    pub search: Option<String>,

    /// Country, or `all`
    #[arg(long)]
    pub location: Option<String>,

    /// Show one listing in detail
    #[arg(long, conflicts_with_all = ["query", "search", "location"])]
    pub view: Option<String>,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CartCommand {
    /// Print the order summary
    Show {
        /// Promo code to apply
        #[arg(short, long)]
        promo: Option<String>,
    },

    /// Add a listing
    Add {
        /// Listing id
        id: String,
    },

    /// Remove the first line with this listing id
    Remove {
        /// Listing id
        id: String,

        /// Undo straight away instead of letting the window close
        #[arg(long)]
        undo: bool,
    },

    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
pub(crate) struct ChatArgs {
    #[command(flatten)]
    pub member: MemberArgs,

    /// Print the preset questions and exit
    #[arg(long)]
    pub presets: bool,

    /// Messages to send, in order
    #[arg(required_unless_present = "presets")]
    pub messages: Vec<String>,
}

#[derive(Debug, Args)]
pub(crate) struct ScanArgs {
    #[command(flatten)]
    pub member: MemberArgs,

    /// Photo of the waste
    #[arg(short, long)]
    pub image: Option<String>,

    /// Quantity
    #[arg(short, long, default_value = "")]
    pub quantity: String,

    /// Unit (kg, tonnes, pieces, cubic_meters)
    #[arg(short, long, default_value = "kg")]
    pub unit: Unit,

    /// Description, used as the listing title
    #[arg(short, long)]
    pub description: Option<String>,

    /// Create a listing from the result
    #[arg(long)]
    pub publish: bool,
}

#[derive(Debug, Args)]
pub(crate) struct PayArgs {
    /// Payment method (mpesa, visa, paypal, mastercard)
    #[arg(long)]
    pub method: Option<String>,

    /// M-Pesa phone number
    #[arg(long)]
    pub phone: Option<String>,

    /// Promo code to apply before paying
    #[arg(long)]
    pub promo: Option<String>,
}
