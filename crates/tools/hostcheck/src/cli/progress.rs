//! Progress bar for batches.

use indicatif::{ProgressBar, ProgressStyle};

use hostcheck_core::{BatchState, ProgressSink};

/// Progress sink rendering a progress bar on stderr.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new(total: usize) -> Self {
        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar());
        Self {
            bar: ProgressBar::new(total as u64).with_style(style),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressSink for BarProgress {
    fn progress(&mut self, completed: usize, _: usize) {
        self.bar.set_position(completed as u64);
    }

    fn state(&mut self, state: BatchState, test_case_id: Option<&str>) {
        match test_case_id {
            Some(id) => self.bar.set_message(format!("{id}: {state}")),
            None => self.bar.set_message(state.to_string()),
        }
    }
}
