//! CLI subcommand implementations.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use sharetrack_lib::{AuthContext, Config, Db};

pub mod dashboard;
pub mod entries;
pub mod export;
pub mod import;
pub mod leaderboard;
pub mod people;
pub mod whoami;

/// Everything a subcommand needs once the session has been resolved.
pub struct AppState {
    pub store: Arc<Mutex<Db>>,
    pub auth: AuthContext,
    pub config: Config,
    /// Reference date for ranges, default entry dates and file names.
    pub today: NaiveDate,
}
