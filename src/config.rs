use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Database file used when no other is given on the command line.
pub const DEFAULT_DB_PATH: &str = "data/tasks.db";

/// Environment variable holding the admin user id.
pub const ADMIN_ID_VAR: &str = "ADMIN_ID";

/// Where the tasks live and who the placeholder tasks belong to.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub admin_id: Option<i64>,
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>, admin_id: Option<i64>) -> Self {
        Config {
            db_path: db_path.into(),
            admin_id,
        }
    }

    /// Build the configuration from the command line override and the
    /// environment. A blank or malformed `ADMIN_ID` counts as unset, so
    /// commands given an explicit user keep working.
    pub fn from_env(db_file: Option<PathBuf>) -> Self {
        let db_path = db_file.unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let admin_id =
            env::var_os(ADMIN_ID_VAR).and_then(|raw| parse_admin_id(&raw.to_string_lossy()));
        Config::new(db_path, admin_id)
    }
}

fn parse_admin_id(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<i64>() {
        Ok(id) => Some(id),
        Err(err) => {
            warn!("Ignoring {}={:?}, it is not a user id: {}", ADMIN_ID_VAR, raw, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_admin_id() {
        assert_eq!(parse_admin_id("42"), Some(42));
        assert_eq!(parse_admin_id(" 7\n"), Some(7));
    }

    #[test]
    fn blank_or_malformed_admin_id_is_unset() {
        assert_eq!(parse_admin_id(""), None);
        assert_eq!(parse_admin_id("   "), None);
        assert_eq!(parse_admin_id("root"), None);
    }

    #[test]
    fn new_keeps_given_values() {
        let config = Config::new("/tmp/x.db", Some(3));
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert_eq!(config.admin_id, Some(3));
    }
}
