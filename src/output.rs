//! Terminal output: the progress bar and the final report.

use console::style;
use dsfind_scanner::{ItemError, MatchRecord, ProgressSink, ScanReport};
use humansize::{BINARY, format_size};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::time::Duration;

/// Bar positions are hundredths of a percent.
const BAR_LENGTH: u64 = 10_000;

/// Progress sink drawing an `indicatif` bar on stderr.
pub struct ProgressBarSink {
    bar: ProgressBar,
}

impl ProgressBarSink {
    pub fn new() -> Self {
        let bar = ProgressBar::new(BAR_LENGTH);
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressBarSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressBarSink {
    fn on_progress(&self, percent: f64) {
        self.bar.set_position((percent * 100.0).round() as u64);
        self.bar.set_message(format!("{percent:.2}%"));
    }
}

pub fn match_line(record: &MatchRecord, with_size: bool) -> String {
    match with_size {
        true => format!("{}\t{}", record.path, record.size),
        false => record.path.to_string(),
    }
}

pub fn summary_line(report: &ScanReport) -> String {
    let volumes: BTreeSet<_> = report.matches.iter().map(|m| m.volume.as_str()).collect();
    format!(
        "{} files ({}) on {} of {} volumes in {:.2?}; {} skipped, {} failed",
        report.matches.len(),
        format_size(report.total_bytes(), BINARY),
        volumes.len(),
        report.total,
        report.elapsed,
        report.skipped.len(),
        report.errors.len(),
    )
}

pub fn print_matches(matches: &[MatchRecord], with_size: bool) {
    for record in matches {
        println!("{}", match_line(record, with_size));
    }
}

pub fn print_summary(report: &ScanReport) {
    let label = match (report.cancelled, report.is_clean()) {
        (true, _) => style("Interrupted:").yellow().bold(),
        (false, true) => style("Found").green().bold(),
        (false, false) => style("Found").yellow().bold(),
    };
    eprintln!("{label} {}", summary_line(report));
    for skipped in &report.skipped {
        eprintln!("  {} [{}] {}", style("skipped").dim(), skipped.volume, skipped.reason);
    }
}

pub fn print_errors(errors: &[ItemError]) {
    for err in errors {
        eprintln!("{} {err:?}", style("error:").red().bold());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsfind_catalog::DatastorePath;
    use rstest::rstest;

    fn record(volume: &str, path: &str, size: u64) -> MatchRecord {
        let path = DatastorePath::new(volume, path).unwrap();
        MatchRecord {
            volume: volume.to_string(),
            folder: DatastorePath::root(volume),
            path,
            size,
            modified: None,
            owner: None,
            kind: None,
        }
    }

    #[rstest]
    #[case(true, "[ds1] vms/web.vmdk\t2048")]
    #[case(false, "[ds1] vms/web.vmdk")]
    fn test_match_line(#[case] with_size: bool, #[case] expected: &str) {
        assert_eq!(match_line(&record("ds1", "vms/web.vmdk", 2048), with_size), expected);
    }

    #[test]
    fn test_summary_line() {
        let report = ScanReport {
            matches: vec![record("a", "x.vmdk", 1024), record("a", "y.vmdk", 1024), record("b", "z.vmdk", 0)],
            errors: vec![],
            skipped: vec![],
            total: 4,
            completed: 4,
            cancelled: false,
            elapsed: Duration::from_millis(1500),
        };
        let line = summary_line(&report);
        assert!(line.starts_with("3 files (2 KiB) on 2 of 4 volumes in 1.50s"), "{line}");
        assert!(line.ends_with("0 skipped, 0 failed"), "{line}");
    }
}
