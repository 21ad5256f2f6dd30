//! Pre-contest preflight: verify the operator setup before teams arrive.

use print_station::config::AppConfig;
use print_station::error::AppError;
use print_station::pipeline::{select_backend, PrintBackend, QuotaLedger};
use print_station::roster::SeatPlan;

pub(crate) fn run_check() -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let mut failures = 0;

    println!("Contest print station preflight");
    println!();

    match SeatPlan::from_path(&config.print.seat_plan_path) {
        Ok(plan) if plan.is_empty() => {
            failures += 1;
            println!(
                "[fail] seat plan {}: parsed but contains no teams",
                config.print.seat_plan_path.display()
            );
        }
        Ok(plan) => {
            let names = plan.team_names();
            let sample = names
                .iter()
                .take(3)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "[ok]   seat plan {}: {} teams ({sample}, ...)",
                config.print.seat_plan_path.display(),
                plan.len()
            );
        }
        Err(err) => {
            failures += 1;
            println!(
                "[fail] seat plan {}: {err}",
                config.print.seat_plan_path.display()
            );
        }
    }

    match probe_upload_root(&config) {
        Ok(()) => println!(
            "[ok]   upload root {} is writable",
            config.print.upload_root.display()
        ),
        Err(err) => {
            failures += 1;
            println!(
                "[fail] upload root {}: {err}",
                config.print.upload_root.display()
            );
        }
    }

    let ledger = QuotaLedger::new(config.print.quota_path.clone());
    match ledger.snapshot() {
        Ok(entries) => println!(
            "[ok]   quota ledger {}: {} team(s) recorded",
            config.print.quota_path.display(),
            entries.len()
        ),
        Err(err) => {
            failures += 1;
            println!(
                "[fail] quota ledger {}: {err}",
                config.print.quota_path.display()
            );
        }
    }

    let backend = select_backend(config.print.mode);
    println!("[ok]   print backend: {}", backend.kind());
    match backend.default_device() {
        Some(device) => println!("[ok]   default device: {device}"),
        None => println!("[warn] no default device configured"),
    }
    let devices = backend.available_devices();
    if devices.is_empty() {
        if backend.kind() == "simulated" {
            println!("[warn] printing is simulated; documents will not reach paper");
        } else {
            failures += 1;
            println!("[fail] no devices available on the {} backend", backend.kind());
        }
    } else {
        println!("[ok]   available devices: {}", devices.join(", "));
    }

    println!(
        "[ok]   text rendering: {}",
        if config.print.text_rendering {
            "enabled"
        } else {
            "disabled"
        }
    );
    println!(
        "[ok]   limits: {} pages per team, {} MB per upload, {} print attempts",
        config.print.max_pages,
        config.print.max_file_bytes / (1024 * 1024),
        config.print.attempts
    );

    println!();
    if failures > 0 {
        println!("{failures} check(s) failed; fix them before the contest starts.");
        Err(AppError::Preflight { failures })
    } else {
        println!("All checks passed.");
        Ok(())
    }
}

fn probe_upload_root(config: &AppConfig) -> std::io::Result<()> {
    std::fs::create_dir_all(&config.print.upload_root)?;
    let probe = config.print.upload_root.join(".write-probe");
    std::fs::write(&probe, b"probe")?;
    std::fs::remove_file(&probe)?;
    Ok(())
}
