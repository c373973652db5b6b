//! Candidate Queue (C4): a blocking FIFO of topics awaiting fetch, drained
//! by a single dedicated consumer thread.
//!
//! The queue itself is a plain `std::sync::mpsc` channel: cloning the
//! sender gives every producer (the change listener, the retry scheduler,
//! warm-up bypasses it entirely) a thread-safe handle. Shutdown is an
//! explicit `Command::Shutdown` sentinel rather than "drop every sender" —
//! the retry scheduler and the change listener both keep a long-lived
//! `CandidateQueueHandle` of their own for as long as the service runs, so a
//! disconnect-on-drop protocol would never actually disconnect.

use std::sync::mpsc;
use std::thread::JoinHandle;

use tracing::{debug, info};

use crate::topic::Topic;

enum Command {
    Topic(Topic),
    Shutdown,
}

#[derive(Clone)]
pub struct CandidateQueueHandle {
    sender: mpsc::Sender<Command>,
}

impl CandidateQueueHandle {
    /// Enqueue a topic. Duplicates are permitted; they are filtered out at
    /// dequeue time against the in-flight registry and compressor
    /// registry.
    pub fn enqueue(&self, topic: Topic) {
        // The receiver only goes away once the consumer thread has been
        // torn down by `stop()`; enqueueing past that point is a no-op.
        let _ = self.sender.send(Command::Topic(topic));
    }
}

/// Spawns the dedicated consumer thread described in spec.md §4.4/§5: it
/// blocks on `recv()` (never holding any lock while waiting), and for each
/// topic that survives the dedup check, hands it to `on_topic` on the
/// provided async runtime.
pub struct CandidateQueue {
    sender: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl CandidateQueue {
    pub fn start<F>(runtime: tokio::runtime::Handle, on_topic: F) -> Self
    where
        F: Fn(Topic) + Send + Sync + 'static,
    {
        let (sender, receiver) = mpsc::channel::<Command>();

        let worker = std::thread::Builder::new()
            .name("dictionary-retrieval-consumer".to_string())
            .spawn(move || {
                info!("candidate queue consumer started");
                loop {
                    match receiver.recv() {
                        Ok(Command::Topic(topic)) => {
                            debug!(%topic, "dequeued candidate topic");
                            let _guard = runtime.enter();
                            on_topic(topic);
                        }
                        Ok(Command::Shutdown) | Err(_) => break,
                    }
                }
                info!("candidate queue consumer exiting");
            })
            .expect("failed to spawn candidate queue consumer thread");

        Self {
            sender,
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> CandidateQueueHandle {
        CandidateQueueHandle {
            sender: self.sender.clone(),
        }
    }

    /// Sends the shutdown sentinel and joins the consumer thread. Correct
    /// regardless of how many `CandidateQueueHandle` clones are still held
    /// elsewhere (retry scheduler, change listener, metadata repository) —
    /// unlike dropping this queue's own sender, it doesn't depend on every
    /// other clone having been dropped first.
    pub fn stop(mut self) {
        let _ = self.sender.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn dequeues_topics_in_order() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let seen: Arc<Mutex<Vec<Topic>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);

        let queue = CandidateQueue::start(runtime.handle().clone(), move |topic| {
            seen_clone.lock().unwrap().push(topic);
        });

        let handle = queue.handle();
        handle.enqueue(Topic::new("s", 1));
        handle.enqueue(Topic::new("s", 2));

        // Give the consumer thread a moment to drain.
        std::thread::sleep(std::time::Duration::from_millis(100));
        drop(handle);
        queue.stop();

        let collected = seen.lock().unwrap();
        assert_eq!(*collected, vec![Topic::new("s", 1), Topic::new("s", 2)]);
    }

    #[test]
    fn stop_joins_the_consumer_thread() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let queue = CandidateQueue::start(runtime.handle().clone(), |_topic| {});
        let handle = queue.handle();
        drop(handle);
        queue.stop();
    }

    #[test]
    fn stop_joins_even_when_a_handle_is_held_forever() {
        // Regression: a handle kept alive past `stop()` (mirroring what the
        // retry scheduler and change listener do in production) must not
        // prevent the consumer thread from exiting.
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let queue = CandidateQueue::start(runtime.handle().clone(), |_topic| {});
        let _held_forever = queue.handle();
        queue.stop();
    }
}
