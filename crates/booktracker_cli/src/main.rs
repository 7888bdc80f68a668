//! Command-line front end for the book catalog.
//!
//! # Responsibility
//! - Map `booktracker <command> [args]` onto `BookApi` calls.
//! - Print one JSON envelope per call so output is scriptable.
//!
//! Settings come from `BOOKTRACKER_*` environment variables.

use booktracker_api::{ApiResponse, BookApi};
use booktracker_core::BookId;
use serde::Serialize;
use std::process::ExitCode;

const USAGE: &str = "usage: booktracker <command>
  ping | version
  list
  get <id>
  add <json>
  update <id> <json>
  delete <id>
  status <id> <read|not_read>
  stats";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    match args.as_slice() {
        ["ping"] => {
            println!("booktracker_core ping={}", booktracker_core::ping());
            return ExitCode::SUCCESS;
        }
        ["version"] => {
            println!("booktracker_core version={}", booktracker_core::core_version());
            return ExitCode::SUCCESS;
        }
        _ => {}
    }

    let api = BookApi::from_env();
    if let Err(err) = api.init_logging() {
        eprintln!("logging disabled: {err}");
    }

    let ok = match args.as_slice() {
        ["list"] => print(&api.list_books()),
        ["get", id] => with_id(id, |id| print(&api.get_book(id))),
        ["add", body] => print(&api.create_book_json(body)),
        ["update", id, body] => with_id(id, |id| print(&api.update_book_json(id, body))),
        ["delete", id] => with_id(id, |id| print(&api.delete_book(id))),
        ["status", id, value] => with_id(id, |id| print(&api.set_status(id, value))),
        ["stats"] => print(&api.stats()),
        _ => {
            eprintln!("{USAGE}");
            false
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print<T: Serialize>(response: &ApiResponse<T>) -> bool {
    println!("{}", response.to_json());
    response.ok
}

fn with_id(raw: &str, run: impl FnOnce(BookId) -> bool) -> bool {
    match raw.parse::<BookId>() {
        Ok(id) => run(id),
        Err(_) => {
            eprintln!("invalid book id `{raw}`");
            false
        }
    }
}
