mod commands;
mod output;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sharetrack_lib::{resolve_session, Config, Db, Role, Session};

use crate::commands::AppState;
use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "sharetrack")]
#[command(about = "Track gospel-share outreach, dashboards, and CSV import/export")]
struct Cli {
    /// Output format: table, json, csv, markdown
    #[arg(long, default_value = "table", global = true)]
    output: String,

    /// SQLite database path
    #[arg(long, env = "SHARETRACK_DB", default_value = "sharetrack.db", global = true)]
    db: PathBuf,

    /// Settings file (missing file means defaults)
    #[arg(
        long,
        env = "SHARETRACK_CONFIG",
        default_value = "sharetrack.toml",
        global = true
    )]
    config: PathBuf,

    /// Authenticated user ID from the identity provider
    #[arg(long, env = "SHARETRACK_USER_ID", global = true)]
    user_id: Option<String>,

    /// Authenticated user's email
    #[arg(long, env = "SHARETRACK_USER_EMAIL", global = true)]
    user_email: Option<String>,

    /// Full name from the identity provider's metadata
    #[arg(long, env = "SHARETRACK_USER_NAME", global = true)]
    user_name: Option<String>,

    /// Role claim from the identity provider: admin or user
    #[arg(long, env = "SHARETRACK_USER_ROLE", global = true)]
    user_role: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show who the session resolves to
    Whoami,
    /// Personal dashboard: totals, daily chart, recent entries
    Dashboard(commands::dashboard::DashboardArgs),
    /// Organization totals and the per-person leaderboard
    Leaderboard(commands::leaderboard::LeaderboardArgs),
    /// List people
    People(commands::people::PeopleArgs),
    /// Show one person and their entries
    Person(commands::people::PersonArgs),
    /// Switch a person between admin and user
    ToggleRole(commands::people::ToggleRoleArgs),
    /// Change a person's name or email
    EditPerson(commands::people::EditPersonArgs),
    /// Record a share entry
    Add(commands::entries::AddArgs),
    /// Replace the fields of a share entry
    Edit(commands::entries::EditArgs),
    /// Delete a share entry
    Delete(commands::entries::DeleteArgs),
    /// Import people or entries from a CSV file
    Import(commands::import::ImportArgs),
    /// Export a table to a CSV file
    Export(commands::export::ExportArgs),
}

impl Cli {
    fn session(&self) -> Result<Session> {
        let (Some(user_id), Some(email)) = (self.user_id.clone(), self.user_email.clone()) else {
            bail!(
                "not signed in: set --user-id and --user-email \
                 (or SHARETRACK_USER_ID and SHARETRACK_USER_EMAIL)"
            );
        };
        let role_claim = self
            .user_role
            .as_deref()
            .map(str::parse::<Role>)
            .transpose()?;
        Ok(Session {
            user_id,
            email,
            full_name: self.user_name.clone(),
            role_claim,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sharetrack=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        "csv" => OutputFormat::Csv,
        "markdown" | "md" => OutputFormat::Markdown,
        "table" => OutputFormat::Table,
        other => bail!(
            "unknown output format '{}'. Valid values: table, json, csv, markdown",
            other
        ),
    };

    let config = Config::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let db = Db::open(&cli.db)?;
    db.init()?;
    let auth = resolve_session(&db, cli.session()?)?;
    tracing::debug!("Signed in as {} (admin: {})", auth.person.email, auth.is_admin);

    let state = AppState {
        store: Arc::new(Mutex::new(db)),
        auth,
        config,
        today: chrono::Local::now().date_naive(),
    };

    match &cli.command {
        Commands::Whoami => commands::whoami::run(&state, &format)?,
        Commands::Dashboard(args) => commands::dashboard::run(args, &state, &format)?,
        Commands::Leaderboard(args) => commands::leaderboard::run(args, &state, &format)?,
        Commands::People(args) => commands::people::run_list(args, &state, &format)?,
        Commands::Person(args) => commands::people::run_detail(args, &state, &format)?,
        Commands::ToggleRole(args) => commands::people::run_toggle_role(args, &state)?,
        Commands::EditPerson(args) => commands::people::run_edit(args, &state, &format)?,
        Commands::Add(args) => commands::entries::run_add(args, &state, &format)?,
        Commands::Edit(args) => commands::entries::run_edit(args, &state, &format)?,
        Commands::Delete(args) => commands::entries::run_delete(args, &state)?,
        Commands::Import(args) => commands::import::run(args, &state, &format).await?,
        Commands::Export(args) => commands::export::run(args, &state)?,
    }

    Ok(())
}
