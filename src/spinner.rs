//! Progress line on stderr while a prompt is being answered.

use std::io::Write;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const TICKS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

const TICK_EVERY: Duration = Duration::from_millis(80);

/// Erase the current line and return the cursor to column 0.
const CLEAR_LINE: &str = "\x1b[2K\r";

/// Redraws `<tick> <label> (<seconds>s)` until stopped. Generated text goes
/// to stdout, so this only ever touches stderr.
pub struct Spinner {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Spinner {
    pub fn start(label: &str) -> Self {
        let (stop, mut stopped) = oneshot::channel::<()>();
        let label = label.to_owned();

        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(TICK_EVERY);
            let mut stderr = std::io::stderr();
            let mut tick = 0usize;
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let line = frame_line(tick, &label, started.elapsed());
                        let _ = write!(stderr, "{CLEAR_LINE}{line}");
                        let _ = stderr.flush();
                        tick = tick.wrapping_add(1);
                    }
                }
            }
            let _ = write!(stderr, "{CLEAR_LINE}");
            let _ = stderr.flush();
        });

        Self { stop, task }
    }

    /// Erase the line and wait for the drawing task to exit.
    pub async fn stop(self) {
        let _ = self.stop.send(());
        let _ = self.task.await;
    }
}

fn frame_line(tick: usize, label: &str, elapsed: Duration) -> String {
    let glyph = TICKS[tick % TICKS.len()];
    format!("{glyph} {label} ({:.1}s)", elapsed.as_secs_f32())
}
