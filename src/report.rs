// src/report.rs

//! Console reporting: pending-jobs snapshots each poll cycle, and the final
//! completed / cancelled / submission-failure listings.
//!
//! Tables go to stdout; logs go to stderr (see [`crate::logging`]).

use crate::builder::Builder;

const HEADER: [&str; 5] = ["builder", "executor", "jobid", "state", "runtime"];

fn print_table(title: &str, builders: &[&Builder]) {
    println!("\n{title}");
    println!("{}", "-".repeat(title.len()));
    println!(
        "{:<20} {:<12} {:<12} {:<14} {:>10}",
        HEADER[0], HEADER[1], HEADER[2], HEADER[3], HEADER[4]
    );

    for builder in builders {
        let (jobid, state) = match &builder.job {
            Some(job) => (job.id().to_string(), job.label().to_string()),
            None => ("-".to_string(), "-".to_string()),
        };
        let runtime = format!("{:.1}s", builder.timer.elapsed().as_secs_f64());

        println!(
            "{:<20} {:<12} {:<12} {:<14} {:>10}",
            builder.name, builder.executor, jobid, state, runtime
        );
    }
}

/// Snapshot of builders still awaiting a terminal state, printed once per
/// poll cycle.
pub fn print_pending_jobs(builders: Vec<&Builder>) {
    if builders.is_empty() {
        return;
    }
    print_table("Pending Jobs", &builders);
}

/// Builders whose job finished successfully, printed at the end of a run.
pub fn print_completed_jobs(builders: Vec<&Builder>) {
    if builders.is_empty() {
        return;
    }
    print_table("Completed Jobs", &builders);
}

/// Builders whose job was cancelled or failed while pending.
pub fn print_cancelled_jobs(builders: Vec<&Builder>) {
    if builders.is_empty() {
        return;
    }
    print_table("Cancelled Jobs", &builders);
}

/// Builders whose dispatch produced no job at all. These appear in no
/// tracking set; listing them here keeps them from vanishing silently.
pub fn print_submission_failures(names: &[String]) {
    if names.is_empty() {
        return;
    }
    println!("\nSubmission Failures");
    println!("-------------------");
    for name in names {
        println!("{name}");
    }
}
