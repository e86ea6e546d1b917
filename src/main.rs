use std::io::{self, Read};
use std::process::ExitCode;

use klisp::logging::init_tracing;
use klisp::evaluate_in_new_scope;

/// Runs a program file, or stdin when no path is given, and prints the value
/// of its last form.
fn main() -> ExitCode {
    init_tracing();

    let path = std::env::args().nth(1);
    let (id, source) = match read_source(path.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("klisp: {e}");
            return ExitCode::FAILURE;
        }
    };

    match evaluate_in_new_scope(&source) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            if e.pretty_print(&id, &source).is_err() {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn read_source(path: Option<&str>) -> io::Result<(String, String)> {
    match path {
        Some(path) if path != "-" => Ok((path.to_string(), std::fs::read_to_string(path)?)),
        _ => {
            let mut source = String::new();
            io::stdin().read_to_string(&mut source)?;
            Ok(("<stdin>".to_string(), source))
        }
    }
}
