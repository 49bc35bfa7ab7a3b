use anyhow::Result;
use chrono::{Local, TimeZone};
use humantime::format_duration;
use prettytable::Table;
use std::time::Duration;

use crate::model::{Clock, Elapsed, InitOutcome, Store, Task};

const NAME_WIDTH: usize = 40;

pub fn init<C: Clock>(store: &Store<C>) -> Result<()> {
    match store.init()? {
        InitOutcome::Created { seeded } => println!(
            "Created {} with {} placeholder tasks.",
            store.path().display(),
            seeded
        ),
        InitOutcome::AlreadyExists => println!("Task db already exists!"),
    }
    Ok(())
}

pub fn add_task<C: Clock>(store: &Store<C>, name: String, user: i64) -> Result<()> {
    store.add_task(&name, user)?;
    println!("Added '{}'.", name);
    Ok(())
}

pub fn remove_task<C: Clock>(store: &Store<C>, name: String, user: i64) -> Result<()> {
    match store.delete_task(&name, user)? {
        0 => println!("No task named '{}'.", name),
        1 => println!("Removed '{}'.", name),
        n => println!("Removed {} tasks named '{}'.", n, name),
    }
    Ok(())
}

pub fn list_all<C: Clock>(store: &Store<C>) -> Result<()> {
    let tasks = store.all_tasks()?;
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["user", "task", "time spent", "completed", "state"]);
    for task in tasks {
        table.add_row(row![
            fmt_user(task.user),
            fmt_name(&task),
            fmt_minutes(task.hours_spent),
            fmt_completed(task.date_completed),
            fmt_state(&task)
        ]);
    }
    table.printstd();
    Ok(())
}

pub fn list_unfinished<C: Clock>(store: &Store<C>, user: i64) -> Result<()> {
    let tasks = store.unfinished_tasks(user)?;
    if tasks.is_empty() {
        println!("No pending tasks! use 'tasktally add' to add new tasks to your list.");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row!["task", "time spent", ""]);
    for task in tasks {
        table.add_row(row![
            fmt_name(&task),
            fmt_minutes(task.hours_spent),
            if task.is_running() { "running" } else { "" }
        ]);
    }
    table.printstd();
    Ok(())
}

pub fn start<C: Clock>(store: &Store<C>, name: String, user: i64) -> Result<()> {
    if store.begin_task(&name, user)? {
        println!("Working on '{}'.", name);
    } else {
        println!("No task named '{}'. Nothing is running.", name);
    }
    Ok(())
}

pub fn current<C: Clock>(store: &Store<C>, user: i64) -> Result<()> {
    match store.active_task(user)? {
        Some(task) => println!("Working on '{}'.", task.task_name),
        None => println!("Not running."),
    }
    Ok(())
}

pub fn elapsed<C: Clock>(store: &Store<C>, user: i64) -> Result<()> {
    let elapsed = store.elapsed(user)?;
    println!("{}", fmt_elapsed(&elapsed));
    Ok(())
}

pub fn pause<C: Clock>(store: &Store<C>, user: i64) -> Result<()> {
    let elapsed = store.add_time(user)?;
    println!("Stopped. {}", fmt_elapsed(&elapsed));
    Ok(())
}

pub fn done<C: Clock>(store: &Store<C>, user: i64) -> Result<()> {
    let elapsed = store.complete_task(user)?;
    println!("Done! {}", fmt_elapsed(&elapsed));
    Ok(())
}

fn fmt_name(task: &Task) -> String {
    textwrap::fill(&task.task_name, NAME_WIDTH)
}

fn fmt_user(user: Option<i64>) -> String {
    user.map(|id| id.to_string()).unwrap_or_else(|| String::from("-"))
}

fn fmt_state(task: &Task) -> &'static str {
    if task.is_running() {
        "running"
    } else if task.is_done() {
        "done"
    } else {
        ""
    }
}

fn fmt_elapsed(elapsed: &Elapsed) -> String {
    format!(
        "'{}': {}",
        elapsed.task_name,
        fmt_minutes(elapsed.hours_spent)
    )
}

/// Format a number of minutes, with seconds precision.
pub fn fmt_minutes(minutes: f64) -> String {
    // negative values saturate to zero
    let secs = (minutes * 60.0).round() as u64;
    format_duration(Duration::from_secs(secs)).to_string()
}

/// Format a completion timestamp in local time, or "-" when not completed.
pub fn fmt_completed(date_completed: f64) -> String {
    if date_completed == 0.0 {
        return String::from("-");
    }
    let secs = date_completed.trunc() as i64;
    let nanos = (date_completed.fract() * 1e9) as u32;
    match Local.timestamp_opt(secs, nanos).single() {
        Some(date) => date.format("%F %T").to_string(),
        None => date_completed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes() {
        assert_eq!(fmt_minutes(0.0), "0s");
        assert_eq!(fmt_minutes(1.5), "1m 30s");
        assert_eq!(fmt_minutes(90.0), "1h 30m");
        assert_eq!(fmt_minutes(-3.0), "0s");
    }

    #[test]
    fn formats_completion_date() {
        assert_eq!(fmt_completed(0.0), "-");

        let formatted = fmt_completed(1_700_000_000.25);
        assert_ne!(formatted, "-");
        assert!(formatted.starts_with("2023-11-1"));
    }

    #[test]
    fn formats_missing_user() {
        assert_eq!(fmt_user(Some(12)), "12");
        assert_eq!(fmt_user(None), "-");
    }

    #[test]
    fn formats_elapsed() {
        let elapsed = Elapsed {
            task_name: String::from("write report"),
            hours_spent: 2.0,
        };
        assert_eq!(fmt_elapsed(&elapsed), "'write report': 2m");
    }
}
