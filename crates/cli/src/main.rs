//! Shopfront CLI - a command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from the prompt flag or SHOPFRONT_PASSWORD)
//! shopfront login -e jane@example.com -p secret
//!
//! # Browse the catalog
//! shopfront products list --search mug
//! shopfront products show 3f2c...
//!
//! # Manage the local cart
//! shopfront cart add 3f2c...
//! shopfront cart set 3f2c... 3
//!
//! # Place an order
//! shopfront checkout --first-name Jane --last-name Doe --email jane@example.com \
//!     --address "1 Market St" --city "San Francisco" --zip-code 94105 \
//!     --country "United States" --payment card
//!
//! # Ask the shopping assistant
//! shopfront chat send "Do you have blue mugs?"
//! ```
//!
//! Configuration comes from the environment, see `shopfront_client::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use shopfront_client::{ClientConfig, Storefront};
use shopfront_core::{CategoryId, OrderId, PaymentMethod, ProductId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::CliError;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront command-line storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in with a Google ID token
    LoginGoogle {
        /// ID token issued by Google Sign-In
        #[arg(long, env = "SHOPFRONT_GOOGLE_CREDENTIAL", hide_env_values = true)]
        credential: String,
    },
    /// Create an account and sign in
    Register {
        /// Full name
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SHOPFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart
    Checkout(Box<CheckoutArgs>),
    /// View and cancel orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
    /// Talk to the shopping assistant
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Upload or delete image files
    Upload {
        #[command(subcommand)]
        action: UploadAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products
    List {
        #[arg(long)]
        category: Option<String>,

        #[arg(short, long)]
        search: Option<String>,

        #[arg(long)]
        featured: bool,

        #[arg(long)]
        skip: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one product
    Show { id: String },
    /// List categories
    Categories,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { product_id: String },
    /// Remove a product
    Remove { product_id: String },
    /// Set a product's quantity; 0 removes it
    Set { product_id: String, quantity: i64 },
    /// Empty the cart
    Clear,
}

#[derive(clap::Args)]
struct CheckoutArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    email: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long, default_value = "")]
    state: String,
    #[arg(long)]
    zip_code: String,
    #[arg(long)]
    country: String,

    /// `card` or `cash_on_delivery` (alias `cod`)
    #[arg(long, default_value = "card")]
    payment: PaymentMethod,
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: String },
    /// Cancel a pending order
    Cancel { id: String },
}

#[derive(Subcommand)]
enum ChatAction {
    /// Send a message
    Send {
        message: String,

        /// Continue an existing conversation
        #[arg(long)]
        session: Option<String>,
    },
    /// List your conversations
    Sessions,
    /// Show a conversation
    History { session: String },
    /// Delete a conversation
    Delete { session: String },
}

#[derive(Subcommand)]
enum UploadAction {
    /// Upload one or more image files
    Add {
        #[arg(required = true)]
        paths: Vec<std::path::PathBuf>,
    },
    /// Delete an uploaded file by URL
    Delete { url: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_client=warn,shopfront_cli=warn".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    if let Err(e) = run(cli, config).await {
        if !matches!(e, CliError::Reported) {
            output::error(&e.to_string());
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ClientConfig) -> Result<(), CliError> {
    let storefront = Storefront::new(config)?;
    storefront.session().initialize().await;

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&storefront, &email, password).await?;
        }
        Commands::LoginGoogle { credential } => {
            commands::account::login_google(&storefront, credential).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::account::register(&storefront, &name, &email, password).await?,
        Commands::Logout => commands::account::logout(&storefront),
        Commands::Whoami => commands::account::whoami(&storefront)?,
        Commands::Products { action } => match action {
            ProductsAction::List {
                category,
                search,
                featured,
                skip,
                limit,
            } => {
                let query = shopfront_client::api::products::ProductQuery {
                    skip,
                    limit,
                    category_id: category.map(CategoryId::new),
                    search,
                    featured_only: featured,
                };
                commands::catalog::list(&storefront, &query).await?;
            }
            ProductsAction::Show { id } => {
                commands::catalog::show(&storefront, &ProductId::new(id)).await?;
            }
            ProductsAction::Categories => commands::catalog::categories(&storefront).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&storefront),
            CartAction::Add { product_id } => {
                commands::cart::add(&storefront, &ProductId::new(product_id)).await?;
            }
            CartAction::Remove { product_id } => {
                commands::cart::remove(&storefront, &ProductId::new(product_id));
            }
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&storefront, &ProductId::new(product_id), quantity)?,
            CartAction::Clear => commands::cart::clear(&storefront),
        },
        Commands::Checkout(args) => {
            let args = *args;
            let address = shopfront_core::Address {
                first_name: args.first_name,
                last_name: args.last_name,
                email: args.email,
                phone: args.phone,
                address: args.address,
                city: args.city,
                state: args.state,
                zip_code: args.zip_code,
                country: args.country,
            };
            commands::orders::checkout(&storefront, address, args.payment).await?;
        }
        Commands::Orders { action } => match action {
            OrdersAction::List => commands::orders::list(&storefront).await?,
            OrdersAction::Show { id } => {
                commands::orders::show(&storefront, &OrderId::new(id)).await?;
            }
            OrdersAction::Cancel { id } => {
                commands::orders::cancel(&storefront, &OrderId::new(id)).await?;
            }
        },
        Commands::Chat { action } => match action {
            ChatAction::Send { message, session } => {
                commands::assistant::send(&storefront, &message, session).await?;
            }
            ChatAction::Sessions => commands::assistant::sessions(&storefront).await?,
            ChatAction::History { session } => {
                commands::assistant::history(&storefront, session).await?;
            }
            ChatAction::Delete { session } => {
                commands::assistant::delete(&storefront, session).await?;
            }
        },
        Commands::Upload { action } => match action {
            UploadAction::Add { paths } => commands::upload::add(&storefront, &paths).await?,
            UploadAction::Delete { url } => commands::upload::delete(&storefront, &url).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_checkout_accepts_cod_alias() {
        let cli = Cli::try_parse_from([
            "shopfront",
            "checkout",
            "--first-name",
            "Jane",
            "--last-name",
            "Doe",
            "--email",
            "jane@example.com",
            "--address",
            "1 Market St",
            "--city",
            "San Francisco",
            "--zip-code",
            "94105",
            "--country",
            "United States",
            "--payment",
            "cod",
        ])
        .unwrap();
        match cli.command {
            Commands::Checkout(args) => assert_eq!(args.payment, PaymentMethod::CashOnDelivery),
            _ => panic!("expected checkout"),
        }
    }
}
