use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "fabl", about = "fabl: save and share blueprints", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Encode raw blueprint bytes as an import string
    Encode(EncodeArgs),
    /// Decode an import string to raw blueprint bytes
    Decode(DecodeArgs),
    /// Manage accounts in a SQLite database
    Account(AccountArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file; flags below override it
    #[arg(long, env = "FABL_CONFIG")]
    pub config: Option<PathBuf>,
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
    /// SQLite database file; in-memory when neither this nor the config sets one
    #[arg(long, env = "FABL_DB")]
    pub db: Option<PathBuf>,
    #[arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub cors_allowed_origins: Option<Vec<String>>,
    /// Session signing keys, newest first
    #[arg(long, env = "FABL_SESSION_KEYS", value_delimiter = ',')]
    pub session_keys: Option<Vec<String>>,
    #[arg(long, env = "FABL_COOKIE_NAME")]
    pub cookie_name: Option<String>,
    #[arg(long, env = "FABL_COOKIE_DOMAIN")]
    pub cookie_domain: Option<String>,
    #[arg(long, env = "FABL_COOKIE_MAX_AGE")]
    pub cookie_max_age: Option<u64>,
    /// bcrypt work factor for new password hashes
    #[arg(long, env = "FABL_PASSWORD_COST")]
    pub password_cost: Option<u32>,
    /// Drop the Secure attribute from the session cookie (plain-HTTP development)
    #[arg(long)]
    pub insecure_cookies: bool,
}

#[derive(Args)]
pub struct EncodeArgs {
    /// Input file; stdin when omitted
    pub input: Option<PathBuf>,
}

#[derive(Args)]
pub struct DecodeArgs {
    /// Import string; read from stdin when omitted
    pub import_string: Option<String>,
    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Refuse outputs larger than this many bytes
    #[arg(long, default_value_t = fabl_store::DEFAULT_MAX_BLOB_BYTES)]
    pub limit: usize,
}

#[derive(Args)]
pub struct AccountArgs {
    #[arg(long, env = "FABL_DB")]
    pub db: PathBuf,
    /// bcrypt work factor for new password hashes
    #[arg(long, env = "FABL_PASSWORD_COST", default_value_t = fabl_store::DEFAULT_PASSWORD_COST)]
    pub password_cost: u32,
    #[command(subcommand)]
    pub action: AccountAction,
}

#[derive(Subcommand)]
pub enum AccountAction {
    /// Create an account
    Create {
        #[arg(long)]
        nickname: String,
        /// Accounts without a password can only use bearer tokens
        #[arg(long, env = "FABL_PASSWORD")]
        password: Option<String>,
    },
    /// Issue a bearer token for an account
    Token {
        #[arg(long)]
        account: String,
    },
}
