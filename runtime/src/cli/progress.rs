//! Spinner shown while regions are being extracted.

use crate::cli::output::{self, Styled};
use crate::pipeline::RegionProgress;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Create a spinner, or a hidden bar in quiet/JSON mode.
pub fn create_spinner(message: &str) -> ProgressBar {
    if output::is_quiet() || output::is_json() {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("  {spinner:.cyan} {msg}") {
        bar.set_style(style.tick_chars("\u{25b8}\u{25b9}\u{25b8}\u{25b9}\u{25b8}"));
    }
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// Progress hook that drives `bar` from pipeline events.
pub fn region_hook(bar: ProgressBar) -> impl Fn(RegionProgress<'_>) + Send + Sync + 'static {
    let s = Styled::new();
    move |event: RegionProgress<'_>| match event {
        RegionProgress::Started(key) => {
            bar.set_message(format!("Extracting {key}..."));
        }
        RegionProgress::Finished(key, 0) => {
            bar.println(format!("  {} {:<24} {}", s.warn_sym(), key.to_string(), s.yellow("no data")));
        }
        RegionProgress::Finished(key, n) => {
            bar.println(format!("  {} {:<24} {n} facilities", s.ok_sym(), key.to_string()));
        }
    }
}
