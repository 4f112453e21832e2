//! A line-oriented REPL over the execution engine.
//!
//! Usage:
//!   relsh <db_path>                 interactive REPL on stdin
//!   relsh <db_path> -c "<sql>"      run one statement and exit
//!
//! `.quit` or EOF flushes every page and exits.

use std::env;
use std::io::{self, BufRead, Write};
use std::process::exit;

use relational_storage_core::engine::{Db, ExecutionResult};
use relational_storage_core::Config;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: relsh <db_path> [-c <sql>]");
        exit(1);
    }

    let db_path = &args[1];
    let config = Config::new(db_path);
    let db = match Db::open(config) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("ERROR: failed to open database: {e}");
            exit(1);
        }
    };

    if args.len() >= 4 && args[2] == "-c" {
        run_statement(&db, &args[3]);
        flush_or_warn(&db);
        return;
    }

    let stdin = io::stdin();
    print!("> ");
    let _ = io::stdout().flush();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            print!("> ");
            let _ = io::stdout().flush();
            continue;
        }
        if trimmed == ".quit" {
            break;
        }
        run_statement(&db, trimmed);
        print!("> ");
        let _ = io::stdout().flush();
    }

    flush_or_warn(&db);
}

fn run_statement(db: &Db, sql: &str) {
    match db.execute(sql) {
        Ok(ExecutionResult::Ok) => println!("OK"),
        Ok(ExecutionResult::Rows(rows)) => {
            println!("COUNT: {}", rows.len());
            for row in rows {
                let rendered: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                println!("{}", rendered.join(" | "));
            }
        }
        Err(e) => eprintln!("ERROR: {e}"),
    }
}

fn flush_or_warn(db: &Db) {
    if let Err(e) = db.flush() {
        eprintln!("Warning: failed to flush: {e}");
    }
}
