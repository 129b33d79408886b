#![forbid(unsafe_code)]

use lc3diff_conformance::scenarios::{builtin_scenarios, load_scenarios};
use lc3diff_conformance::{
    HarnessConfig, ScenarioOutcome, run_register_suite, write_suite_report,
};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    if let Err(err) = run() {
        eprintln!("run_register_suite failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let mut catalogue_path: Option<PathBuf> = None;
    let mut report_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scenarios" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--scenarios requires a value".to_string())?;
                catalogue_path = Some(PathBuf::from(value));
            }
            "--report-path" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--report-path requires a value".to_string())?;
                report_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                println!(
                    "Usage: cargo run -p lc3diff-conformance --bin run_register_suite -- [--scenarios <path>] [--report-path <path>]"
                );
                return Ok(());
            }
            unknown => return Err(format!("unknown argument: {unknown}")),
        }
    }

    let config = HarnessConfig::default_paths();
    let catalogue = match catalogue_path {
        Some(path) => load_scenarios(&path)?,
        None => builtin_scenarios(),
    };

    let report = run_register_suite(&config, &catalogue);
    for outcome in &report.outcomes {
        print_outcome(outcome);
    }

    let ts_millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    let report_path = report_path.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("register_suite_report_{ts_millis}.json"))
    });
    write_suite_report(&report_path, &report)?;

    println!(
        "register suite: total={} passed={} failed={}",
        report.total_scenarios, report.passed_scenarios, report.failed_scenarios
    );
    println!("wrote {}", report_path.display());

    if !report.all_passed() {
        std::process::exit(2);
    }
    Ok(())
}

fn print_outcome(outcome: &ScenarioOutcome) {
    if outcome.passed {
        println!("PASS {}", outcome.name);
        return;
    }
    let reason = outcome.failure_reason.as_deref().unwrap_or("unknown");
    println!("FAIL {} ({reason})", outcome.name);
    if let Some(detail) = &outcome.detail {
        println!("     {detail}");
    }
    for diff in &outcome.diffs {
        println!(
            "     {} [{}]: expected x{} got x{}",
            diff.register, diff.backend, diff.expected, diff.actual
        );
    }
}
