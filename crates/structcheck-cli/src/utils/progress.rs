use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use structcheck::engine::progress::{Progress, ProgressCallback};
use tracing::warn;

const SPINNER_TICK_MS: u64 = 80;

struct BarState {
    pb: ProgressBar,
    /// Display name of the running phase, e.g. `clash relief`.
    phase: String,
}

/// Renders workflow phases and stage progress as one line on stderr.
///
/// Phases show as a spinner; a phase that announces a task count (the per-check fan-out)
/// switches to a bar. Cycle messages from the repair workflow are printed above the line.
#[derive(Clone)]
pub struct CliProgressHandler {
    state: Arc<Mutex<BarState>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    #[cfg(test)]
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(0), target).with_style(spinner_style());
        pb.finish_and_clear();
        Self {
            state: Arc::new(Mutex::new(BarState {
                pb,
                phase: String::new(),
            })),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let state = Arc::clone(&self.state);

        Box::new(move |progress: Progress| {
            let Ok(mut state) = state.lock() else {
                warn!("Progress state mutex was poisoned; dropping progress event.");
                return;
            };
            match progress {
                Progress::PhaseStart { name } => {
                    state.phase = name.replace('_', " ");
                    let pb = &state.pb;
                    pb.reset();
                    pb.set_length(0);
                    pb.set_style(spinner_style());
                    pb.set_message(state.phase.clone());
                    pb.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                }
                Progress::PhaseFinish => {
                    state.pb.disable_steady_tick();
                    state.pb.finish_with_message(format!("✓ {}", state.phase));
                }
                Progress::TaskStart { total_steps } => {
                    let pb = &state.pb;
                    pb.disable_steady_tick();
                    pb.set_length(total_steps);
                    pb.set_position(0);
                    pb.set_style(bar_style());
                }
                Progress::TaskIncrement => state.pb.inc(1),
                Progress::TaskFinish => {
                    let pb = &state.pb;
                    pb.set_position(pb.length().unwrap_or(0));
                }
                Progress::Message(msg) => {
                    if state.pb.is_finished() {
                        state.pb.set_message(msg);
                    } else {
                        state.pb.println(format!("  {msg}"));
                    }
                }
            }
        })
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    match ProgressStyle::with_template("{msg:<18} [{bar:30.cyan/blue}] {pos}/{len} checks ({eta})") {
        Ok(style) => style
            .with_key("eta", |state: &ProgressState, w: &mut dyn std::fmt::Write| {
                let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
            })
            .progress_chars("=> "),
        Err(_) => ProgressStyle::default_bar(),
    }
}
