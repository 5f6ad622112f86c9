//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire logging and a file-backed task store from positional arguments.
//! - Replay a fixed add/duplicate/list scenario and print the outcomes.
//!
//! Usage: `taskbook_cli [store_path] [absolute_log_dir]`

use std::process::ExitCode;
use taskbook_core::{NewTask, StoreConfig, StoreError, TaskStore};

const DEFAULT_STORE_PATH: &str = "tasks_database.json";

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let store_path = args.next().unwrap_or_else(|| DEFAULT_STORE_PATH.to_string());

    if let Some(log_dir) = args.next() {
        if let Err(err) = taskbook_core::init_logging(taskbook_core::default_log_level(), &log_dir)
        {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("taskbook_core version={}", taskbook_core::core_version());

    let mut store = match TaskStore::open(StoreConfig::new(&store_path)) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("cannot open `{store_path}`: {err}");
            return ExitCode::FAILURE;
        }
    };
    for skipped in store.skipped_records() {
        eprintln!("skipped record #{}: {}", skipped.index, skipped.error);
    }

    let scenario = [
        ("Add a valid task", NewTask::new("Buy milk", "2% fat", "2025-07-20", "High")),
        ("Add a duplicate", NewTask::new("buy milk", "different desc", "2025-07-20", "High")),
        ("Add another task", NewTask::new("Exercise", "", "2025-07-21", "Medium")),
        ("Add an untitled task", NewTask::new("", "no title", "2025-07-22", "Low")),
    ];

    for (label, request) in scenario {
        print!("{label}: ");
        match store.add_task(request) {
            Ok(task) => println!("added (id={})", task.id()),
            Err(StoreError::Persistence(err)) => {
                println!("not saved: {err}");
                return ExitCode::FAILURE;
            }
            Err(err) => println!("rejected: {err}"),
        }
    }

    println!("Tasks:");
    for task in store.list_all() {
        println!(
            "- [{}] {} ({}, {}, {:?})",
            task.id(),
            task.title(),
            task.due_date(),
            task.priority().as_str(),
            task.status()
        );
    }

    log::info!(
        "event=cli_done module=cli status=ok tasks={}",
        store.list_all().len()
    );
    ExitCode::SUCCESS
}
