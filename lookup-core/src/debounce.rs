//! Keystroke debouncing.
//!
//! Raw text only becomes the committed query after it has been left untouched for the
//! configured delay. Clearing the text commits immediately.

use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, task::JoinHandle, time::Instant};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(700);

type Commit = Arc<dyn Fn(String) + Send + Sync>;

/// Owns at most one pending commit timer.
///
/// Must be used from within a tokio runtime.
pub struct Debouncer {
    delay: Duration,
    commit: Commit,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    /// `commit` receives every committed query.
    pub fn new(delay: Duration, commit: impl Fn(String) + Send + Sync + 'static) -> Self {
        Self { delay, commit: Arc::new(commit), pending: None }
    }

    /// Debouncer publishing committed queries on a watch channel seeded with `initial`.
    pub fn channel(delay: Duration, initial: impl Into<String>) -> (Self, watch::Receiver<String>) {
        let (tx, rx) = watch::channel(initial.into());
        let debouncer = Self::new(delay, move |query| {
            tx.send_if_modified(|current| {
                if *current == query {
                    return false;
                }
                *current = query;
                true
            });
        });
        (debouncer, rx)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a keystroke. Restarts the timer, or commits right away when `text` is empty.
    pub fn input(&mut self, text: &str) {
        self.cancel();

        if text.is_empty() {
            (self.commit)(String::new());
            return;
        }

        let deadline = Instant::now() + self.delay;
        let commit = Arc::clone(&self.commit);
        let text = text.to_owned();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            commit(text);
        }));
    }

    /// Whether a keystroke is still waiting to be committed.
    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Drop the pending keystroke, if any, without committing it.
    pub fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
