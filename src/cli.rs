use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Create the task database, seeding it for the admin user.
    Init,
    /// Add a new task.
    Add {
        /// The task name.
        #[structopt()]
        name: String,

        /// The owning user (defaults to ADMIN_ID).
        #[structopt(short, long)]
        user: Option<i64>,
    },
    /// Remove every task with this name.
    Rm {
        #[structopt()]
        name: String,

        #[structopt(short, long)]
        user: Option<i64>,
    },
    /// List the tasks of all users.
    All,
    /// List the unfinished tasks.
    List {
        #[structopt(short, long)]
        user: Option<i64>,
    },
    /// Start working on a task. Stops whatever was running.
    Start {
        #[structopt()]
        name: String,

        #[structopt(short, long)]
        user: Option<i64>,
    },
    /// Show the running task.
    Current {
        #[structopt(short, long)]
        user: Option<i64>,
    },
    /// Show the time spent so far on the running task, without stopping it.
    Elapsed {
        #[structopt(short, long)]
        user: Option<i64>,
    },
    /// Save the time spent on the running task and stop it.
    Pause {
        #[structopt(short, long)]
        user: Option<i64>,
    },
    /// Complete the running task.
    Done {
        #[structopt(short, long)]
        user: Option<i64>,
    },
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "tasktally",
    about = "A minimal task tracker that keeps count of your time."
)]
pub struct CommandLineArgs {
    /// Without a command, initialize the database and print every task.
    #[structopt(subcommand)]
    pub action: Option<Command>,

    /// Use a different task database file.
    #[structopt(parse(from_os_str), short, long)]
    pub db_file: Option<PathBuf>,
}
