//! Typewriter reveal: a cancelable timed sequence of growing text prefixes.
//!
//! The prefix sequence itself is pure; the async driver emits one prefix per
//! tick into a sink and stops promptly on cancel, so a reveal in progress
//! never writes into state that has since been discarded.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Strictly growing char-boundary prefixes of `text`, ending with the full
/// string. Safe on multi-byte UTF-8.
pub fn prefixes(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .map(move |(i, c)| &text[..i + c.len_utf8()])
}

/// Handle to a running reveal. Dropping it cancels the emission.
pub struct Typewriter {
    cancel: watch::Sender<bool>,
    // Option so `finished` can take the handle out from under the Drop impl.
    handle: Option<JoinHandle<()>>,
}

impl Typewriter {
    /// Start revealing `text` into `sink`, one character per `interval`.
    /// Starting a new reveal over old output is the caller's concern; the
    /// old one must be cancelled (or dropped) first.
    pub fn start<F>(text: String, interval: Duration, mut sink: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        let (cancel, mut cancelled) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let boundaries: Vec<usize> =
                text.char_indices().map(|(i, c)| i + c.len_utf8()).collect();
            for end in boundaries {
                tokio::select! {
                    _ = ticker.tick() => sink(&text[..end]),
                    // Fires on cancel and on sender drop alike.
                    _ = cancelled.changed() => return,
                }
            }
        });
        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Stop emitting. Idempotent.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait for the reveal to run to completion (or to its cancellation).
    pub async fn finished(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        let _ = self.cancel.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_prefixes_grow_to_full_text() {
        let all: Vec<&str> = prefixes("abc").collect();
        assert_eq!(all, vec!["a", "ab", "abc"]);
    }

    #[test]
    fn test_prefixes_empty() {
        assert_eq!(prefixes("").count(), 0);
    }

    #[test]
    fn test_prefixes_utf8_boundaries() {
        let all: Vec<&str> = prefixes("héy").collect();
        assert_eq!(all, vec!["h", "hé", "héy"]);
    }

    #[tokio::test]
    async fn test_typewriter_reveals_everything() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let tw = Typewriter::start("vibe".to_string(), Duration::from_millis(1), move |p| {
            sink.lock().unwrap().push(p.to_string())
        });
        tw.finished().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.last().map(String::as_str), Some("vibe"));
        assert!(seen.windows(2).all(|w| w[0].len() < w[1].len()));
    }

    #[tokio::test]
    async fn test_is_finished_then_awaitable() {
        let tw = Typewriter::start("ab".to_string(), Duration::from_millis(1), |_| {});
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tw.is_finished());
        // Awaiting after completion must be a no-op, not a hang or panic.
        tw.finished().await;
    }

    #[tokio::test]
    async fn test_typewriter_cancel_stops_emission() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let tw = Typewriter::start(
            "a long narrative that should not finish".to_string(),
            Duration::from_millis(50),
            move |p| sink.lock().unwrap().push(p.to_string()),
        );
        // Let at most a couple of ticks through, then cancel.
        tokio::time::sleep(Duration::from_millis(10)).await;
        tw.cancel();
        tw.finished().await;

        let count = seen.lock().unwrap().len();
        assert!(count < 5, "expected early stop, saw {} emissions", count);
    }

    #[tokio::test]
    async fn test_typewriter_drop_cancels() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        {
            let _tw = Typewriter::start(
                "never fully revealed".to_string(),
                Duration::from_millis(50),
                move |p| sink.lock().unwrap().push(p.to_string()),
            );
        }
        tokio::time::sleep(Duration::from_millis(120)).await;

        let count = seen.lock().unwrap().len();
        assert!(count < 4, "drop should cancel, saw {} emissions", count);
    }
}
