use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use email_scanner::config::Config;
use email_scanner::csv_import;
use email_scanner::gmail::GmailSource;
use email_scanner::sheets::{self, SheetContactStore};
use email_scanner::store::ContactStore;
use shared_types::{ScanReport, TokenGenerator};

#[derive(Parser)]
#[command(name = "email-scanner")]
#[command(about = "Scan Gmail for new business contacts and keep the contact sheet up to date")]
struct Cli {
    /// Path to the scanner TOML config file.
    ///
    /// Defaults to ./scanner.toml when present; built-in defaults otherwise.
    /// Secrets always come from the environment (or .env.local / .env).
    #[arg(short, long, value_name = "FILE", env = "SCANNER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scan pass: fetch new mail, classify senders, update the sheet
    Scan {
        /// Make every decision but write nothing anywhere
        #[arg(long)]
        dry_run: bool,
    },

    /// Import contacts from a CSV file
    ///
    /// The email column is located by name (email, e-mail, email_address,
    /// emailaddress or mail); the name column likewise. Rows with invalid
    /// addresses are counted and skipped.
    Import {
        /// Path to the CSV file to import
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the unsubscribe link for a single email address
    Link {
        /// The address to generate a link for
        email: String,
    },

    /// Create a new contact spreadsheet with the expected headers
    InitSheet,

    /// Run the OAuth consent flow and cache tokens for Gmail and Sheets
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan { dry_run } => {
            if dry_run {
                println!("DRY RUN - no contacts will be added\n");
            }
            let report = email_scanner::run_configured_scan(&config, dry_run).await?;
            print_report(&report);
        }
        Commands::Import { file } => {
            let store = contact_store(&config).await?;
            let report = csv_import::import_csv(&store, &file).await?;
            println!("Import complete:");
            println!("  Added:   {}", report.added);
            println!("  Skipped: {} (already in sheet)", report.skipped);
            println!("  Invalid: {} (bad/missing email)", report.invalid);
        }
        Commands::Link { email } => {
            let tokens = TokenGenerator::new(config.secrets.unsubscribe_secret()?);
            let token = tokens.token(&email);
            let site_url = config.site_url.trim_end_matches('/');
            println!("Unsubscribe link for {email}:");
            println!("  {site_url}/api/unsubscribe?token={token}");
        }
        Commands::InitSheet => {
            let title = format!("{} - Email List", config.business.name);
            let sheet_id = sheets::create_sheet(
                &config.credentials_path,
                &config.token_cache_path,
                &title,
            )
            .await?;
            println!("Created sheet \"{title}\"");
            println!("  ID: {sheet_id}");
            println!("Set GOOGLE_SHEETS_ID={sheet_id} to use it.");
        }
        Commands::Auth => {
            let mail =
                GmailSource::new(&config.credentials_path, &config.token_cache_path).await?;
            let mailbox = mail.profile_email().await?;
            println!("Gmail authenticated as {mailbox}");

            if config.secrets.sheet_id().is_ok() {
                let store = contact_store(&config).await?;
                let contacts = store.list_all().await?;
                println!("Sheets authenticated; {} contacts in the sheet", contacts.len());
            } else {
                println!("GOOGLE_SHEETS_ID not set; skipping Sheets check.");
            }
        }
    }

    Ok(())
}

async fn contact_store(config: &Config) -> Result<SheetContactStore> {
    let tokens = TokenGenerator::new(config.secrets.unsubscribe_secret()?);
    SheetContactStore::with_installed_flow(
        &config.credentials_path,
        &config.token_cache_path,
        config.secrets.sheet_id()?,
        tokens,
    )
    .await
}

fn print_report(report: &ScanReport) {
    let action = if report.dry_run { "Would add" } else { "Added" };
    println!();
    println!("{}", "=".repeat(40));
    println!("Scan complete");
    println!("{}", "=".repeat(40));
    println!("  {action}:              {}", report.added);
    println!("  Skipped (existing):    {}", report.skipped_existing);
    println!("  Skipped (irrelevant):  {}", report.skipped_irrelevant);
    println!("  Flagged for review:    {}", report.flagged_review);
    println!("  Unsubscribed:          {}", report.unsubscribed);
    if report.errors > 0 {
        println!("  Errors:                {}", report.errors);
    }
}
