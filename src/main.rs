//! athanor CLI binary
//!
//! Minimal entrypoint; all logic is in the library. `cli::run()` handles
//! output including errors, and main only maps to the process exit code.

fn main() {
    if let Err(code) = athanor::cli::run() {
        std::process::exit(code.as_i32());
    }
}
