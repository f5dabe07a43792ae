//! File watching with a coalescing quiet window.
//!
//! Editors save in bursts (write, truncate, rename); re-parsing on every
//! event wastes work and can catch a half-written file. Events are instead
//! folded into a single flush once the file has been quiet for the
//! configured window. The engine itself stays synchronous and stateless —
//! this module only decides *when* to hand it fresh text.

use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};

/// Default quiet window between the last file event and the flush.
pub const DEFAULT_QUIET_MS: u64 = 300;

/// Pure coalescing timer: every event pushes the deadline out by the quiet
/// window; the flush fires once the deadline passes with no new events.
pub struct QuietWindow {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl QuietWindow {
    pub fn new(quiet: Duration) -> Self {
        QuietWindow {
            quiet,
            deadline: None,
        }
    }

    pub fn note_event(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    /// How long to wait before the pending flush, if one is pending.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(now))
    }

    /// True exactly once per settled burst of events.
    pub fn due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Watch `path`, invoking `on_change` with the file's content after each
/// settled burst of filesystem events. Identical content is dropped, so a
/// touch without a change is a no-op. Blocks until the watcher dies.
pub fn watch_file(
    path: &Path,
    quiet_ms: u64,
    mut on_change: impl FnMut(&str),
) -> Result<(), String> {
    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |event| {
        let _ = tx.send(event);
    })
    .map_err(|e| format!("cannot create watcher: {}", e))?;
    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|e| format!("cannot watch '{}': {}", path.display(), e))?;

    let mut window = QuietWindow::new(Duration::from_millis(quiet_ms));
    let mut last_content = std::fs::read_to_string(path).unwrap_or_default();
    on_change(&last_content);

    // Idle timeout when no flush is pending; recv just needs to wake up
    // eventually in case the channel died.
    const IDLE: Duration = Duration::from_secs(60);

    loop {
        let timeout = window.remaining(Instant::now()).unwrap_or(IDLE);
        match rx.recv_timeout(timeout) {
            Ok(Ok(_event)) => window.note_event(Instant::now()),
            Ok(Err(e)) => log::warn!("watch error: {}", e),
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if window.due(Instant::now()) {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    if content != last_content {
                        log::debug!("content changed, re-rendering");
                        last_content = content;
                        on_change(&last_content);
                    } else {
                        log::debug!("event burst settled with identical content");
                    }
                }
                Err(e) => log::warn!("cannot re-read '{}': {}", path.display(), e),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_window_coalesces_bursts() {
        let start = Instant::now();
        let mut window = QuietWindow::new(Duration::from_millis(300));

        // Nothing pending yet.
        assert!(!window.due(start));
        assert_eq!(window.remaining(start), None);

        // A burst of rapid events keeps pushing the deadline out.
        window.note_event(start);
        window.note_event(start + Duration::from_millis(100));
        window.note_event(start + Duration::from_millis(200));
        assert!(!window.due(start + Duration::from_millis(400)));

        // 300ms after the last event the flush fires, exactly once.
        let settled = start + Duration::from_millis(501);
        assert!(window.due(settled));
        assert!(!window.due(settled));
    }

    #[test]
    fn remaining_counts_down_to_the_deadline() {
        let start = Instant::now();
        let mut window = QuietWindow::new(Duration::from_millis(300));
        window.note_event(start);
        assert_eq!(
            window.remaining(start + Duration::from_millis(100)),
            Some(Duration::from_millis(200))
        );
        assert_eq!(
            window.remaining(start + Duration::from_millis(500)),
            Some(Duration::ZERO)
        );
    }
}
