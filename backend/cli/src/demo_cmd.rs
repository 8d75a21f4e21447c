//! Rotation demo: several threads hammer one logger, then the resulting
//! file set is printed.

use std::fs;
use std::thread;

use anyhow::{Context, Result};
use logforge::{log_debug, log_warn, LogOptions, Logger};

pub fn run(logger: &Logger, threads: usize, lines: usize) -> Result<()> {
    let total = logger.measure("Demo run", LogOptions::new().tag("Demo"), || {
        thread::scope(|scope| {
            for worker in 0..threads {
                let log = logger.child(format!("worker-{worker}"));
                scope.spawn(move || {
                    for i in 0..lines {
                        log_debug!(log, "message {i} of {lines}");
                        if i % 250 == 0 {
                            log_warn!(log, tag: "Checkpoint", "worker {worker} reached {i}");
                        }
                    }
                });
            }
        });
        threads * lines
    });

    println!("Logged {total} line(s) from {threads} thread(s)");
    print_file_set(logger)
}

fn print_file_set(logger: &Logger) -> Result<()> {
    let Some(settings) = logger.settings() else {
        println!("File sink not configured; nothing written to disk");
        return Ok(());
    };

    let mut files: Vec<_> = fs::read_dir(&settings.logs_dir)
        .with_context(|| format!("Failed to list {}", settings.logs_dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let size = entry.metadata().ok()?.len();
            Some((entry.file_name().to_string_lossy().into_owned(), size))
        })
        .collect();
    files.sort();

    println!("{}:", settings.logs_dir.display());
    for (name, size) in files {
        println!("  {name:<24} {size:>10} bytes");
    }
    Ok(())
}
