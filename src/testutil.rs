//! In-memory fakes shared by unit tests across modules, standing in for the
//! three external collaborators and the candidate queue's consumer thread.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;

use crate::collaborators::CompressorRegistry;
use crate::model::CompressionStrategy;
use crate::queue::{CandidateQueue, CandidateQueueHandle};
use crate::topic::Topic;

#[derive(Default)]
pub struct InMemoryCompressorRegistry {
    installed: Mutex<HashMap<Topic, (CompressionStrategy, Bytes)>>,
}

impl CompressorRegistry for InMemoryCompressorRegistry {
    fn has(&self, topic: &Topic) -> bool {
        self.installed.lock().unwrap().contains_key(topic)
    }

    fn install(&self, strategy: CompressionStrategy, topic: &Topic, dictionary: Bytes) {
        self.installed
            .lock()
            .unwrap()
            .insert(topic.clone(), (strategy, dictionary));
    }

    fn remove(&self, topic: &Topic) {
        self.installed.lock().unwrap().remove(topic);
    }
}

/// Wraps a real [`CandidateQueue`] and collects what the consumer thread
/// dequeues, so tests can assert on enqueue order without racing the
/// consumer thread directly.
pub struct TestQueue {
    queue: CandidateQueue,
    seen: std::sync::Arc<Mutex<Vec<Topic>>>,
}

impl TestQueue {
    pub fn new() -> Self {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let seen_clone = std::sync::Arc::clone(&seen);
        let runtime = tokio::runtime::Handle::current();
        let queue = CandidateQueue::start(runtime, move |topic| {
            seen_clone.lock().unwrap().push(topic);
        });
        Self { queue, seen }
    }

    pub fn handle(&self) -> CandidateQueueHandle {
        self.queue.handle()
    }

    /// Gives the consumer thread a moment to drain, then returns and clears
    /// whatever it has seen so far.
    pub fn drain(&self) -> Vec<Topic> {
        std::thread::sleep(Duration::from_millis(50));
        let mut seen = self.seen.lock().unwrap();
        std::mem::take(&mut *seen)
    }
}
