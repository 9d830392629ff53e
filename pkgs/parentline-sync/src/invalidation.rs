use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::debug;

/// A student's list should be reloaded from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListInvalidated {
    pub student_number: String,
}

/// Publishes list invalidations after a settle delay.
///
/// Invalidations for one student inside the delay coalesce into a single
/// notification, sent once the last of them has settled.
#[derive(Clone)]
pub struct ListInvalidator {
    settle_delay: Duration,
    tx: broadcast::Sender<ListInvalidated>,
    generations: Arc<Mutex<HashMap<String, u64>>>,
}

impl ListInvalidator {
    pub fn new(settle_delay: Duration) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            settle_delay,
            tx,
            generations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListInvalidated> {
        self.tx.subscribe()
    }

    fn bump(&self, student_number: &str) -> u64 {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let generation = generations.entry(student_number.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, student_number: &str, generation: u64) -> bool {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        generations.get(student_number) == Some(&generation)
    }

    /// Schedule an invalidation. Must be called from within a tokio runtime.
    pub fn invalidate(&self, student_number: &str) {
        let generation = self.bump(student_number);
        let this = self.clone();
        let student_number = student_number.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(this.settle_delay).await;
            if !this.is_current(&student_number, generation) {
                return;
            }
            debug!("List invalidated for student {}", student_number);
            // No subscribers is fine
            let _ = this.tx.send(ListInvalidated { student_number });
        });
    }
}
