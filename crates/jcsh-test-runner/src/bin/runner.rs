//! Optional CLI for manual trace runs
//!
//! Usage: cargo run -p jcsh-test-runner --bin runner -- <jcsh binary> <trace file> [shell args...]

use jcsh_test_runner::{markers, run_trace};
use std::{env, fs};

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <jcsh binary> <trace file> [shell args...]", args[0]);
        std::process::exit(1);
    }

    let trace = match fs::read_to_string(&args[2]) {
        Ok(trace) => trace,
        Err(e) => {
            eprintln!("cannot read {}: {}", args[2], e);
            std::process::exit(1);
        }
    };
    let extra: Vec<&str> = args[3..].iter().map(String::as_str).collect();

    match run_trace(&args[1], &trace, &extra) {
        Ok(run) => {
            print!("{}", run.stdout_str());
            println!("--- shell exited with {}", run.status());
            for marker in [markers::SIGINT_KILL, markers::SIGTSTP_STOP, markers::TABLE_FULL] {
                let count = run.count_pattern(marker);
                if count > 0 {
                    println!("--- '{}' x{}", marker, count);
                }
            }
        }
        Err(e) => {
            eprintln!("trace failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
