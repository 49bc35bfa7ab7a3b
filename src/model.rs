use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{Config, ADMIN_ID_VAR};

/// Number of placeholder tasks given to the admin user in a new database.
pub const SEED_TASK_COUNT: usize = 3;

const TASK_COLUMNS: &str =
    "user, task_name, date_completed, hours_spent, task_group, deadline, started_time";

/// A single task, saved as an entry in the all_tasks table.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub user: Option<i64>, // NULL in rows seeded without an admin id
    pub task_name: String,
    pub date_completed: f64, // wall clock seconds, 0 while unfinished
    pub hours_spent: f64,    // in minutes
    pub task_group: String,
    pub deadline: String,
    pub started_time: f64, // clock seconds, 0 while not running
}

impl Task {
    pub fn is_running(&self) -> bool {
        self.started_time != 0.0
    }

    pub fn is_done(&self) -> bool {
        self.date_completed != 0.0
    }
}

/// What `Store::init` found on disk.
#[derive(Debug, PartialEq, Eq)]
pub enum InitOutcome {
    Created { seeded: usize },
    AlreadyExists,
}

/// The time spent on the running task of a user, measured at a checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Elapsed {
    pub task_name: String,
    pub hours_spent: f64, // in minutes
}

/// Source of the timestamps written to the database.
pub trait Clock {
    /// Seconds stored in `started_time` and measured against it later.
    fn now(&self) -> f64;

    /// Seconds since the Unix epoch, stored in `date_completed`.
    fn wall(&self) -> f64;
}

/// Start and stop usually happen in different runs of the program, so the
/// start time has to survive the process: `now` is the system clock, not a
/// monotonic one.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.wall()
    }

    fn wall(&self) -> f64 {
        Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// The task database. Every operation opens its own connection.
pub struct Store<C: Clock = SystemClock> {
    path: PathBuf,
    admin_id: Option<i64>,
    clock: C,
}

impl Store {
    pub fn new(config: &Config) -> Self {
        Store::with_clock(config, SystemClock)
    }
}

impl<C: Clock> Store<C> {
    pub fn with_clock(config: &Config, clock: C) -> Self {
        Store {
            path: config.db_path.clone(),
            admin_id: config.admin_id,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open task database {}.", self.path.display()))
    }

    /// Create the database if its file does not exist yet, and give the
    /// admin user a few placeholder tasks. An existing database is left
    /// untouched.
    pub fn init(&self) -> Result<InitOutcome> {
        if self.path.exists() {
            info!(path = %self.path.display(), "Task database already exists.");
            return Ok(InitOutcome::AlreadyExists);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory {}.", parent.display())
                })?;
            }
        }

        let db = self.connect()?;
        create_tasks_table(&db)?;

        let seeded = match self.admin_id {
            Some(admin_id) => {
                for i in 0..SEED_TASK_COUNT {
                    insert_task(&db, &format!("TEST TASK {}", i), admin_id)?;
                }
                SEED_TASK_COUNT
            }
            None => {
                warn!(
                    "{} is not set to a user id, so no placeholder tasks were added.",
                    ADMIN_ID_VAR
                );
                0
            }
        };

        info!(path = %self.path.display(), seeded, "Created task database.");
        Ok(InitOutcome::Created { seeded })
    }

    /// Add a task for a user. Names are not checked for duplicates.
    pub fn add_task(&self, task_name: &str, user: i64) -> Result<()> {
        let db = self.connect()?;
        insert_task(&db, task_name, user)
    }

    /// Delete every task of the user with exactly this name. Returns how
    /// many rows went away.
    pub fn delete_task(&self, task_name: &str, user: i64) -> Result<usize> {
        let db = self.connect()?;
        let deleted = db
            .execute(
                "DELETE FROM all_tasks WHERE user = ?1 AND task_name = ?2",
                params![user, task_name],
            )
            .context("Failed to delete task from database.")?;
        debug!(user, task_name, deleted, "Deleted tasks.");
        Ok(deleted)
    }

    /// Every task of every user.
    pub fn all_tasks(&self) -> Result<Vec<Task>> {
        let db = self.connect()?;
        let mut stmt = db
            .prepare(&format!("SELECT {} FROM all_tasks ORDER BY rowid", TASK_COLUMNS))
            .context("Failed to fetch tasks from database.")?;
        let mapped_rows = stmt.query_map([], |row| task_from_row(row))?;

        let mut tasks = Vec::new();
        for task in mapped_rows {
            tasks.push(task?);
        }
        Ok(tasks)
    }

    /// The tasks of a user that have not been completed.
    pub fn unfinished_tasks(&self, user: i64) -> Result<Vec<Task>> {
        let db = self.connect()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {} FROM all_tasks WHERE user = ?1 AND date_completed = 0 ORDER BY rowid",
                TASK_COLUMNS
            ))
            .context("Failed to fetch unfinished tasks from database.")?;
        let mapped_rows = stmt.query_map(params![user], |row| task_from_row(row))?;

        let mut tasks = Vec::new();
        for task in mapped_rows {
            tasks.push(task?);
        }
        Ok(tasks)
    }

    /// The running task of a user, if any.
    pub fn active_task(&self, user: i64) -> Result<Option<Task>> {
        let db = self.connect()?;
        Ok(find_active(&db, user)?.map(|(_, task)| task))
    }

    /// Stop whatever the user was running and start the named task. If
    /// several tasks share the name, only one of them is started, preferring
    /// an unfinished one. Returns false when no task has that name, in which
    /// case the user is left with nothing running.
    pub fn begin_task(&self, task_name: &str, user: i64) -> Result<bool> {
        let mut db = self.connect()?;
        let tx = db.transaction()?;

        tx.execute(
            "UPDATE all_tasks SET started_time = 0 WHERE user = ?1",
            params![user],
        )
        .context("Failed to stop running tasks in database.")?;

        let started = tx
            .execute(
                "UPDATE all_tasks SET started_time = ?1 WHERE rowid = (
                     SELECT rowid FROM all_tasks WHERE user = ?2 AND task_name = ?3
                     ORDER BY date_completed != 0, rowid LIMIT 1)",
                params![self.clock.now(), user, task_name],
            )
            .context("Failed to start task in database.")?;

        tx.commit().context("Failed to start task in database.")?;

        if started == 0 {
            warn!(user, task_name, "No such task, nothing is running now.");
        } else {
            info!(user, task_name, "Started task.");
        }
        Ok(started > 0)
    }

    /// Time spent on the running task, including the current session. The
    /// database is not modified.
    pub fn elapsed(&self, user: i64) -> Result<Elapsed> {
        let db = self.connect()?;
        let (_, task) = require_active(&db, user)?;
        Ok(self.measure(&task))
    }

    /// Save the time spent on the running task, mark it completed and stop it.
    pub fn complete_task(&self, user: i64) -> Result<Elapsed> {
        let mut db = self.connect()?;
        let tx = db.transaction()?;

        let (rowid, task) = require_active(&tx, user)?;
        let elapsed = self.measure(&task);
        tx.execute(
            "UPDATE all_tasks SET date_completed = ?1, hours_spent = ?2, started_time = 0
             WHERE rowid = ?3",
            params![self.clock.wall(), elapsed.hours_spent, rowid],
        )
        .context("Failed to complete task in database.")?;

        tx.commit().context("Failed to complete task in database.")?;
        info!(user, task_name = %elapsed.task_name, minutes = elapsed.hours_spent, "Completed task.");
        Ok(elapsed)
    }

    /// Save the time spent on the running task and stop it, without
    /// completing it.
    pub fn add_time(&self, user: i64) -> Result<Elapsed> {
        let mut db = self.connect()?;
        let tx = db.transaction()?;

        let (rowid, task) = require_active(&tx, user)?;
        let elapsed = self.measure(&task);
        tx.execute(
            "UPDATE all_tasks SET hours_spent = ?1, started_time = 0 WHERE rowid = ?2",
            params![elapsed.hours_spent, rowid],
        )
        .context("Failed to save time spent in database.")?;

        tx.commit().context("Failed to save time spent in database.")?;
        info!(user, task_name = %elapsed.task_name, minutes = elapsed.hours_spent, "Stopped task.");
        Ok(elapsed)
    }

    fn measure(&self, task: &Task) -> Elapsed {
        Elapsed {
            task_name: task.task_name.clone(),
            hours_spent: accumulate(task.hours_spent, task.started_time, self.clock.now()),
        }
    }
}

/// Add the minutes between `started` and `now`, rounded to two decimals, to
/// `minutes_spent`. A clock that went backwards adds nothing.
pub fn accumulate(minutes_spent: f64, started: f64, now: f64) -> f64 {
    let session = ((now - started).max(0.0) / 60.0 * 100.0).round() / 100.0;
    minutes_spent + session
}

/// Initialize the all_tasks table.
pub fn create_tasks_table(db: &Connection) -> Result<()> {
    db.execute(
        "CREATE TABLE all_tasks (
                  user            integer,
                  task_name       text,
                  date_completed  real,
                  hours_spent     real,
                  task_group      text,
                  deadline        text,
                  started_time    real
                  )",
        [],
    )
    .context("Failed to create all_tasks table.")?;
    Ok(())
}

fn insert_task(db: &Connection, task_name: &str, user: i64) -> Result<()> {
    db.execute(
        &format!(
            "INSERT INTO all_tasks ({}) VALUES (?1, ?2, 0, 0, '', '', 0)",
            TASK_COLUMNS
        ),
        params![user, task_name],
    )
    .context("Failed to insert task to database.")?;
    debug!(user, task_name, "Added task.");
    Ok(())
}

fn find_active(db: &Connection, user: i64) -> Result<Option<(i64, Task)>> {
    let found = db
        .query_row(
            &format!(
                "SELECT {}, rowid FROM all_tasks WHERE user = ?1 AND started_time != 0
                 ORDER BY rowid LIMIT 1",
                TASK_COLUMNS
            ),
            params![user],
            |row| Ok((row.get::<_, i64>(7)?, task_from_row(row)?)),
        )
        .optional()
        .context("Failed to obtain active task from database.")?;
    Ok(found)
}

fn require_active(db: &Connection, user: i64) -> Result<(i64, Task)> {
    find_active(db, user)?.ok_or_else(|| anyhow!("User {} has no task running.", user))
}

/// Return a task from a row in this order: [user, task_name,
/// date_completed, hours_spent, task_group, deadline, started_time]
pub fn task_from_row(row: &Row) -> rusqlite::Result<Task> {
    let task = Task {
        user: row.get(0)?,
        task_name: row.get(1)?,
        date_completed: row.get(2)?,
        hours_spent: row.get(3)?,
        task_group: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        deadline: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        started_time: row.get(6)?,
    };
    Ok(task)
}
