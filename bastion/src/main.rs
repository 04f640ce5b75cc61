use bastion::{Bastion, BastionBuilder, Clock, GuardConfig, NotificationConfig, SystemClock};
use bastion::sqlite::SqliteRepositoryProvider;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Operator commands for the bastion login guard
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database connection string
    #[arg(long, env = "BASTION_DATABASE_URL")]
    database_url: String,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct Pair {
    /// Username or other account identifier
    #[arg(long)]
    identity: String,

    /// Client address the attempts came from
    #[arg(long)]
    origin: String,
}

/// Available CLI commands
#[derive(clap::Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Show how many attempts have been blocked
    Stats,
    /// Show the lockout state of an identity/origin pair
    Status(Pair),
    /// Clear the failures recorded for an identity/origin pair
    Unlock(Pair),
    /// Delete expired attempt records
    Purge,
    /// Show and clear the last notification delivery failure
    Notice,
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("bastion v{}", env!("CARGO_PKG_VERSION"));
        }
        command => {
            let bastion = connect(&cli.database_url).await?;
            let result = run(command, &bastion, cli.json).await;
            bastion.shutdown().await;
            result?;
        }
    }

    Ok(())
}

async fn connect(
    database_url: &str,
) -> Result<Bastion<SqliteRepositoryProvider>, Box<dyn std::error::Error>> {
    let bastion = BastionBuilder::new()
        .with_sqlite(database_url)
        .await?
        .with_guard_config(GuardConfig::from_env()?)
        .with_notifications(NotificationConfig::disabled())
        .with_cleanup(false)
        .apply_migrations(true)
        .build()
        .await?;
    Ok(bastion)
}

async fn run(
    command: Commands,
    bastion: &Bastion<SqliteRepositoryProvider>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Migrate => {
            println!("Migrations applied");
        }
        Commands::Stats => {
            let stats = bastion.stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Blocked attempts: {}", stats.blocked_attempts_total);
                match stats.last_blocked_at {
                    Some(at) => println!("Last blocked:     {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                    None => println!("Last blocked:     never"),
                }
            }
        }
        Commands::Status(pair) => {
            let status = bastion.lockout_status(&pair.identity, &pair.origin).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                println!("Failed attempts: {}", status.failed_attempts);
                match status.retry_after_seconds(SystemClock.now()) {
                    Some(seconds) => println!("Locked:          yes, for another {seconds}s"),
                    None => println!("Locked:          no"),
                }
            }
        }
        Commands::Unlock(pair) => {
            if bastion.unlock(&pair.identity, &pair.origin).await? {
                println!("Lockout cleared");
            } else {
                println!("Pair was not locked; any failures have been cleared");
            }
        }
        Commands::Purge => {
            let purged = bastion.purge_expired().await?;
            println!("Purged {purged} expired records");
        }
        Commands::Notice => match bastion.take_notice().await? {
            Some(notice) if json => println!("{}", serde_json::to_string_pretty(&notice)?),
            Some(notice) => println!(
                "[{}] {}",
                notice.recorded_at.format("%Y-%m-%d %H:%M:%S UTC"),
                notice.message
            ),
            None => println!("No pending notices"),
        },
        Commands::Version => {}
    }

    Ok(())
}
