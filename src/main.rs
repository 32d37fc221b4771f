use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use promokit::auth::TokenGenerator;
use promokit::config::{FileConfig, ServerConfig};
use promokit::ingest::{
    ProductImportReport, SalesImportReport, import_products, import_sales, read_csv,
};
use promokit::scope::ScopedBusiness;
use promokit::server::validation::validate_email;
use promokit::server::{AppState, create_router};
use promokit::store::{SqliteStore, Store};
use promokit::types::User;

const TOKEN_FILE_NAME: &str = ".admin_token";
const NOT_INITIALIZED: &str =
    "Server not initialized. Run 'promokit admin init' first to create the database and admin token.";

#[cfg(unix)]
fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "promokit")]
#[command(about = "Clean product and sales CSVs and plan campaigns from them", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database and promokit.toml
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Public base URL for external access (e.g., "https://promo.example.com")
        #[arg(long)]
        public_base_url: Option<String>,

        /// Largest accepted CSV upload, in bytes
        #[arg(long)]
        max_upload_bytes: Option<usize>,

        /// Currency label used in campaign plans
        #[arg(long)]
        currency: Option<String>,
    },

    /// Run a CSV import against a business without going through the server
    Import {
        /// Which kind of CSV the file holds
        #[arg(value_enum)]
        kind: ImportKind,

        /// Slug of the target business
        #[arg(long)]
        business: String,

        /// Path to the CSV file
        #[arg(long)]
        file: PathBuf,

        /// Data directory holding the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user and print a token for them
    Create {
        /// Email address of the new user
        #[arg(long)]
        email: String,

        /// Name shown in the UI; defaults to the email
        #[arg(long)]
        display_name: Option<String>,

        /// Data directory holding the database
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportKind {
    Products,
    Sales,
}

fn open_store(data_dir: &Path) -> anyhow::Result<SqliteStore> {
    let db_path = data_dir.join("promokit.db");
    if !db_path.exists() {
        bail!(NOT_INITIALIZED);
    }
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    Ok(store)
}

fn run_init(data_dir: &Path, non_interactive: bool) -> anyhow::Result<()> {
    fs::create_dir_all(data_dir)?;

    let store = SqliteStore::new(&data_dir.join("promokit.db"))?;
    store.initialize()?;

    let token_file = data_dir.join(TOKEN_FILE_NAME);

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new()?;
    let (token, raw_token) = generator.issue(true, None, None)?;

    store.create_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_default_user_prompt(&store, &generator)?;
    }

    Ok(())
}

fn create_default_user_prompt(store: &SqliteStore, generator: &TokenGenerator) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a default user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let email = inquire::Text::new("Email:")
        .with_validator(|input: &str| match validate_email(input.trim()) {
            Ok(()) => Ok(inquire::validator::Validation::Valid),
            Err(msg) => Ok(inquire::validator::Validation::Invalid(msg.into())),
        })
        .prompt()?;

    create_user_with_token(store, generator, &email, None)
}

fn create_user_with_token(
    store: &SqliteStore,
    generator: &TokenGenerator,
    email: &str,
    display_name: Option<String>,
) -> anyhow::Result<()> {
    let email = email.trim().to_lowercase();
    if let Err(msg) = validate_email(&email) {
        bail!(msg);
    }
    if store.get_user_by_email(&email)?.is_some() {
        bail!("User with email '{email}' already exists");
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        display_name: display_name.unwrap_or_else(|| email.clone()),
        email,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    let (token, raw_token) = generator.issue(false, Some(user.id.clone()), None)?;
    store.create_token(&token)?;

    println!();
    println!("========================================");
    println!("Created user '{}' with token:", user.email);
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

fn run_import(kind: ImportKind, business: &str, file: &Path, data_dir: &Path) -> anyhow::Result<()> {
    let store = open_store(data_dir)?;
    let scope = ScopedBusiness::trusted(&store, business)
        .with_context(|| format!("Business '{business}' not found"))?;

    let bytes = fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let rows = read_csv(&bytes)?;

    let report = match kind {
        ImportKind::Products => {
            serde_json::to_string_pretty(&ProductImportReport::from(import_products(&store, &scope, rows)?))?
        }
        ImportKind::Sales => {
            serde_json::to_string_pretty(&SalesImportReport::from(import_sales(&store, &scope, rows)?))?
        }
    };

    println!("{report}");
    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    config.validate()?;

    let token_file = config.data_dir.join(TOKEN_FILE_NAME);
    if !token_file.exists() {
        bail!(NOT_INITIALIZED);
    }

    let store = SqliteStore::new(&config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(NOT_INITIALIZED);
    }

    info!("Admin token available at {}", token_file.display());

    let state = Arc::new(AppState::new(Arc::new(store), &config));
    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("promokit=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(&data_dir, non_interactive)?,
            AdminCommands::User {
                command:
                    UserCommands::Create {
                        email,
                        display_name,
                        data_dir,
                    },
            } => {
                let store = open_store(&data_dir)?;
                create_user_with_token(&store, &TokenGenerator::new()?, &email, display_name)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            public_base_url,
            max_upload_bytes,
            currency,
        } => {
            let mut config = ServerConfig {
                data_dir,
                ..ServerConfig::default()
            };
            if let Some(file) = FileConfig::load(&config.data_dir)? {
                config = config.merge_file(file);
            }
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if public_base_url.is_some() {
                config.public_base_url = public_base_url;
            }
            if let Some(max) = max_upload_bytes {
                config.max_upload_bytes = max;
            }
            if let Some(currency) = currency {
                config.currency = currency;
            }

            run_serve(config).await?;
        }
        Commands::Import {
            kind,
            business,
            file,
            data_dir,
        } => run_import(kind, &business, &file, &data_dir)?,
    }

    Ok(())
}
