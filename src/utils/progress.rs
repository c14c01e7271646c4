use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for one per-item stage. Hidden when stderr is not a terminal.
pub fn stage_bar(len: usize, stage: &'static str) -> Result<ProgressBar> {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(ProgressStyle::with_template("{msg:>10} [{bar:40}] {pos}/{len}")?.progress_chars("=> "));
    bar.set_message(stage);
    Ok(bar)
}
