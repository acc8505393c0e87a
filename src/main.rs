//! overrun-harness entry point.
//!
//! ## CLI Subcommands
//!
//! - `overrun-harness` or `overrun-harness run [NAME...] [--json]` - run scenarios
//! - `overrun-harness list [--json]` - list the catalog
//! - `overrun-harness demo NAME` - perform one unverified out-of-bounds write
//! - `overrun-harness probe WIDTH SIZE OFFSET [--aligned]` - one isolated attempt (internal)

use std::process::ExitCode;

use serde::Serialize;

use overrun_harness::config::HarnessConfig;
use overrun_harness::isolate::ProcessIsolator;
use overrun_harness::{probe, scenario, telemetry};

const JSON_FLAG: &str = "--json";

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(|s| s.as_str()).unwrap_or("run");
    let rest = args.get(2..).unwrap_or_default();

    match command {
        // Probe runs first and without logging: its stderr is the checker's.
        probe::SUBCOMMAND => run_probe(rest),
        "run" => run_scenarios(rest),
        "list" => list_scenarios(rest),
        "demo" => run_demo(rest),
        "help" | "--help" | "-h" => {
            print_usage();
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("overrun-harness {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        _ => {
            eprintln!("Unknown command: {command}");
            print_usage();
            ExitCode::FAILURE
        }
    }
}

fn run_probe(args: &[String]) -> ExitCode {
    let result = probe::parse_args(args).and_then(|attempt| probe::execute(&attempt));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run_scenarios(args: &[String]) -> ExitCode {
    let json = args.iter().any(|a| a == JSON_FLAG);
    let names: Vec<&str> = args
        .iter()
        .map(String::as_str)
        .filter(|a| *a != JSON_FLAG)
        .collect();

    let config = load_config();
    let isolator = match ProcessIsolator::from_config(&config) {
        Ok(isolator) => isolator,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let reports = match scenario::run_selected(&names, &isolator, &config) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if json {
        if !print_json(&reports) {
            return ExitCode::FAILURE;
        }
    } else {
        for report in &reports {
            println!("{report}");
        }
    }

    let failed = reports.iter().filter(|r| r.is_failure()).count();
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        if !json {
            eprintln!("{failed} scenario(s) failed");
        }
        ExitCode::FAILURE
    }
}

#[derive(Serialize)]
struct Listing {
    name: &'static str,
    summary: &'static str,
    disabled: bool,
}

fn list_scenarios(args: &[String]) -> ExitCode {
    let listing: Vec<Listing> = scenario::catalog()
        .iter()
        .map(|s| Listing {
            name: s.name,
            summary: s.summary,
            disabled: s.is_disabled(),
        })
        .collect();

    if args.iter().any(|a| a == JSON_FLAG) {
        return if print_json(&listing) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }
    for entry in &listing {
        let tag = if entry.disabled { " (disabled)" } else { "" };
        println!("{:<22} {}{tag}", entry.name, entry.summary);
    }
    ExitCode::SUCCESS
}

fn run_demo(args: &[String]) -> ExitCode {
    let Some(name) = args.first() else {
        eprintln!("Usage: overrun-harness demo NAME");
        return ExitCode::FAILURE;
    };
    let config = load_config();
    let Some(attempt) = scenario::find(name).and_then(|s| s.demo_attempt(&config)) else {
        eprintln!("Not a demo scenario: {name}");
        return ExitCode::FAILURE;
    };

    eprintln!("demo {name}: writing {} at {attempt}", attempt.width);
    match probe::execute(&attempt) {
        Ok(()) => {
            eprintln!("demo {name}: write completed, nothing was reported");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn load_config() -> HarnessConfig {
    let config = HarnessConfig::from_env();
    if let Err(e) = telemetry::init_logging(&config.log) {
        eprintln!("Logging disabled: {e}");
    }
    config
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> bool {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{text}");
            true
        }
        Err(e) => {
            eprintln!("Failed to serialize output: {e}");
            false
        }
    }
}

fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "overrun-harness v{version}

USAGE:
    overrun-harness [COMMAND] [OPTIONS]

COMMANDS:
    run [NAME...] [--json]     Run scenarios (all when no NAME is given)
    list [--json]              List scenarios
    demo NAME                  Perform one unverified out-of-bounds write
    probe W SIZE OFF [--aligned]
                               Run a single attempt (used by `run`)
    help                       Show this message
    version                    Show version

ENVIRONMENT:
    OVERRUN_HARNESS_PROBE_BIN      Binary re-executed per attempt
    OVERRUN_HARNESS_LARGE_MALLOC   Large allocation size in bytes
    OVERRUN_HARNESS_MAX_WIDTH      Widest optional sweep (2 or 8 bytes)
    OVERRUN_HARNESS_HWASAN         Probe built with HWAddressSanitizer
    OVERRUN_HARNESS_LOG            Log filter (default: warn)
    OVERRUN_HARNESS_LOG_FORMAT     pretty | json
    OVERRUN_HARNESS_LOG_FILE       Log file for json output"
    );
}
