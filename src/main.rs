#[macro_use] extern crate prettytable;

use structopt::StructOpt;
use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod model;
mod interface;
use crate::config::{Config, ADMIN_ID_VAR};
use crate::model::Store;

use cli::{Command::*, CommandLineArgs};

/// Log to stderr, so tables on stdout stay clean. RUST_LOG overrides the
/// default level.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// The user a command acts on: the one given on the command line, or
/// the admin.
fn resolve_user(user: Option<i64>, config: &Config) -> anyhow::Result<i64> {
    user.or(config.admin_id)
        .ok_or_else(|| anyhow!("No user given. Use --user or set {}.", ADMIN_ID_VAR))
}

fn main() -> anyhow::Result<()> {
    init_logging();

    // Get the command-line arguments.
    let CommandLineArgs { action, db_file } = CommandLineArgs::from_args();

    let config = Config::from_env(db_file);
    let store = Store::new(&config);

    // Perform the action.
    match action {
        None => {
            interface::init(&store)?;
            interface::list_all(&store)
        }
        Some(Init) => interface::init(&store),
        Some(Add { name, user }) => interface::add_task(&store, name, resolve_user(user, &config)?),
        Some(Rm { name, user }) => interface::remove_task(&store, name, resolve_user(user, &config)?),
        Some(All) => interface::list_all(&store),
        Some(List { user }) => interface::list_unfinished(&store, resolve_user(user, &config)?),
        Some(Start { name, user }) => interface::start(&store, name, resolve_user(user, &config)?),
        Some(Current { user }) => interface::current(&store, resolve_user(user, &config)?),
        Some(Elapsed { user }) => interface::elapsed(&store, resolve_user(user, &config)?),
        Some(Pause { user }) => interface::pause(&store, resolve_user(user, &config)?),
        Some(Done { user }) => interface::done(&store, resolve_user(user, &config)?),
    }?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_user_wins_over_admin() {
        let config = Config::new("tasks.db", Some(9));
        assert_eq!(resolve_user(Some(3), &config).unwrap(), 3);
        assert_eq!(resolve_user(None, &config).unwrap(), 9);
    }

    #[test]
    fn explicit_user_works_without_admin() {
        let config = Config::new("tasks.db", None);
        assert_eq!(resolve_user(Some(5), &config).unwrap(), 5);
    }

    #[test]
    fn missing_user_is_an_error() {
        let config = Config::new("tasks.db", None);
        assert!(resolve_user(None, &config).is_err());
    }
}
