use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_yellow};

/// Spinner on stderr tracking the load and resolve phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_loading(source: &str) -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(
            bright_yellow(format!("Phase 1/2: Loading host snapshot from {source}")).to_string(),
        );
        Self { pb }
    }

    pub fn finish_loading_start_resolving(self, jobs: usize) -> Self {
        self.pb.finish_with_message(
            bright_green(format!("Phase 1/2: Loaded {jobs} jobs ✓")).to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 2/2: Resolving stages").to_string());
        Self { pb }
    }

    pub fn finish_resolving(self) {
        self.pb
            .finish_with_message(bright_green("Phase 2/2: Stages resolved ✓").to_string());
        eprintln!();
    }

    pub fn abandon(self) {
        self.pb.abandon();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
