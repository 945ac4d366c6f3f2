//! Cart CLI - a terminal shopping cart kept in sync with the remote cart API.
//!
//! # Usage
//!
//! ```bash
//! # Browse as a guest: the cart lives only in CART_STORAGE_DIR
//! cart-cli add 64f1c2a9e4b0 --quantity 2
//! cart-cli show
//!
//! # Log in by configuring a token; the first command merges the guest cart
//! CART_SESSION_TOKEN=... cart-cli sync
//!
//! # Edit quantities
//! cart-cli increase 64f1c2a9e4b0
//! cart-cli set 64f1c2a9e4b0 4
//!
//! # Shipping address
//! cart-cli shipping --address "12 Harbour Rd" --city Leith --postal-code "EH6 6QQ" --country GB
//! ```
//!
//! # Environment Variables
//!
//! - `CART_API_BASE_URL` - base URL of the remote cart API (required)
//! - `CART_SESSION_TOKEN` - bearer token; when set the session is authenticated
//! - `CART_STORAGE_DIR` - local snapshot directory (default `.cart`)
//! - `CART_LOG_FORMAT` - `json` for JSON logs on stderr
//! - `RUST_LOG` - log filter (default `cart_sync=info,cart_sync_cli=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{CartContext, CliError, ShippingArgs};

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Shopping cart with guest mode and account sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the cart
    Show,
    /// Add units of a product
    Add {
        /// Product ID
        product: String,

        /// Units to add
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// Increase a line by one
    Increase {
        /// Product ID
        product: String,
    },
    /// Decrease a line by one (never below 1)
    Decrease {
        /// Product ID
        product: String,
    },
    /// Set a line to an exact quantity (clamped to stock)
    Set {
        /// Product ID
        product: String,

        /// New quantity
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        quantity: u32,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product: String,
    },
    /// Empty the cart
    Clear,
    /// Sync with the account cart and report the result
    Sync,
    /// Set the shipping address
    Shipping(ShippingArgs),
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::debug!(error = ?e, "Command failed");
        report_failure(&e);
        std::process::exit(1);
    }
}

/// Logs go to stderr so they never interleave with the cart table.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cart_sync=info,cart_sync_cli=info".into());

    let json = std::env::var("CART_LOG_FORMAT").is_ok_and(|format| format == "json");
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[allow(clippy::print_stderr)]
fn report_failure(error: &CliError) {
    eprintln!("error: {error}");
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = CartContext::from_env()?;

    let login = ctx.prepare().await;

    match cli.command {
        Commands::Show => {}
        Commands::Sync => ctx.sync(login.as_ref()),
        Commands::Add { product, quantity } => ctx.add(product, quantity).await?,
        Commands::Increase { product } => ctx.increase(product).await?,
        Commands::Decrease { product } => ctx.decrease(product).await?,
        Commands::Set { product, quantity } => ctx.set(product, quantity).await?,
        Commands::Remove { product } => ctx.remove(product).await?,
        Commands::Clear => ctx.clear().await?,
        Commands::Shipping(args) => ctx.shipping(args).await?,
    }
    ctx.show();
    Ok(())
}
