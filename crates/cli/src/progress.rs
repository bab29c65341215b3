//! Cargo-style progress output for sitesync
//!
//! Displays progress in the familiar cargo format:
//! ```text
//!     Scanning 214 local files...
//!      Syncing [===========>             ] 120/214 assets/site.css
//!       Synced 214 changes in 3.2s
//! ```

use std::io::Write as _;
use std::time::Instant;

/// Status verbs for cargo-style output (right-aligned to 12 chars)
struct Status;

impl Status {
    const SCANNING: &'static str = "Scanning";
    const SYNCING: &'static str = "Syncing";
    const SYNCED: &'static str = "Synced";
    const UNCHANGED: &'static str = "Unchanged";
}

/// Print a cargo-style status line
fn print_status(status: &str, message: &str) {
    let mut term = console::Term::stderr();
    let style = console::Style::new().green().bold();
    let _ = writeln!(term, "{:>12} {}", style.apply_to(status), message);
}

/// Progress tracker for one sync run
pub struct SyncProgress {
    start: Instant,
}

impl SyncProgress {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Show the initial "Scanning N local files" message
    pub fn scanned(&self, files: usize) {
        print_status(Status::SCANNING, &format!("{files} local files..."));
    }

    /// Show "nothing to do" when the diff is empty
    pub fn unchanged(&self) {
        print_status(Status::UNCHANGED, "remote store already matches");
    }

    /// Create a progress bar over the ordered operation list
    pub fn sync_bar(&self, total_changes: u64) -> indicatif::ProgressBar {
        let pb = indicatif::ProgressBar::new(total_changes);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} {msg:>12} [{bar:25.cyan/dim}] {pos}/{len} {prefix:.dim}",
                )
                .expect("valid template")
                .progress_chars("=> "),
        );
        pb.set_message(Status::SYNCING);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }

    /// Show final summary
    pub fn finish(&self, changes: usize) {
        let elapsed = self.start.elapsed();
        let elapsed_str = if elapsed.as_secs() >= 1 {
            format!("{:.2}s", elapsed.as_secs_f64())
        } else {
            format!("{}ms", elapsed.as_millis())
        };
        print_status(
            Status::SYNCED,
            &format!("{changes} changes in {elapsed_str}"),
        );
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::new()
    }
}
