use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use fabl_server::{DatabaseConfig, FablServer, ServerConfig};
use fabl_store::{AccountDirectory, BcryptHasher, SqliteRepository};
use fabl_types::AccountId;
use rand::RngCore;
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args),
        Command::Encode(args) => cmd_encode(args),
        Command::Decode(args) => cmd_decode(args),
        Command::Account(args) => cmd_account(args, &cli.format),
    }
}

/// Layer CLI flags over the config file (or defaults).
pub fn server_config(args: &ServeArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = args.port {
        config.bind_addr.set_port(port);
    }
    if let Some(path) = &args.db {
        config.database = DatabaseConfig::Sqlite { path: path.clone() };
    }
    if let Some(origins) = &args.cors_allowed_origins {
        config.cors.allowed_origins = origins.clone();
    }
    if let Some(keys) = &args.session_keys {
        config.session.keys = keys.clone();
    }
    if let Some(name) = &args.cookie_name {
        config.session.cookie_name = name.clone();
    }
    if let Some(domain) = &args.cookie_domain {
        config.session.domain = Some(domain.clone());
    }
    if let Some(max_age) = args.cookie_max_age {
        config.session.max_age_secs = Some(max_age);
    }
    if let Some(cost) = args.password_cost {
        config.password_cost = cost;
    }
    if args.insecure_cookies {
        config.session.secure = false;
    }
    Ok(config)
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = server_config(&args)?;
    tracing::debug!(database = ?config.database, bind = %config.bind_addr, "resolved server configuration");
    let server = FablServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    runtime.block_on(server.serve())?;
    Ok(())
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let data = match &args.input {
        Some(path) => std::fs::read(path).with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    println!("{}", fabl_codec::encode(&data)?);
    Ok(())
}

fn cmd_decode(args: DecodeArgs) -> anyhow::Result<()> {
    let import_string = match args.import_string {
        Some(s) => s,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let data = fabl_codec::decode_limited(import_string.trim(), args.limit)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &data).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("{} wrote {} bytes to {}", "✓".green(), data.len(), path.display());
        }
        None => std::io::stdout().write_all(&data)?,
    }
    Ok(())
}

fn open_directory(db: &std::path::Path, password_cost: u32) -> anyhow::Result<AccountDirectory> {
    let repo = SqliteRepository::open(db).with_context(|| format!("opening {}", db.display()))?;
    Ok(AccountDirectory::new(Arc::new(repo), Arc::new(BcryptHasher::new(password_cost)))?)
}

/// Random bearer token, hex encoded.
fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn cmd_account(args: AccountArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let directory = open_directory(&args.db, args.password_cost)?;
    match args.action {
        AccountAction::Create { nickname, password } => {
            let account = directory.create_account(&nickname, password.as_deref())?;
            match format {
                OutputFormat::Json => println!(
                    "{}",
                    json!({ "id": account.id, "nickname": account.nickname })
                ),
                OutputFormat::Text => {
                    println!("{} Created account {}", "✓".green().bold(), account.nickname.bold());
                    println!("  Id: {}", account.id.to_string().cyan());
                    if account.hashed_password.is_none() {
                        println!("  {}", "No password set; use a bearer token".yellow());
                    }
                }
            }
        }
        AccountAction::Token { account } => {
            let id: AccountId = account.parse()?;
            let token = generate_token();
            directory.issue_token(&token, &id)?;
            match format {
                OutputFormat::Json => println!("{}", json!({ "account": id, "token": token })),
                OutputFormat::Text => {
                    println!("{} Issued token for {}", "✓".green().bold(), id.to_string().cyan());
                    println!("  {}", token.bold());
                }
            }
        }
    }
    Ok(())
}
