pub mod config;
pub mod database;

pub use config::Config;
pub use database::{
    AttendanceDay, BreakSession, Database, Employee, EmployeeId, SystemStats,
};

use std::path::PathBuf;

/// Returns `~/.config/presensi[-dev]/` based on PRESENSI_ENV.
///
/// Set PRESENSI_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if the home directory cannot be determined or if
/// creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("PRESENSI_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("presensi-dev")
    } else {
        base_dir.join("presensi")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
