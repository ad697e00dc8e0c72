//! # Topic Workers & Registry
//!
//! Ordered delivery: each topic owns one queue and one consumer thread, so
//! events emitted in order on a topic are handled in that order. Different
//! topics run concurrently with each other and with the dispatch pool.

use crate::error::BusError;
use crate::event::{Event, TopicId};
use crate::handler::Dispatcher;
use crate::worker::{consume, Command};
use flume::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Upper bound on slots reserved ahead of use; the logical capacity may exceed it.
const MAX_RESERVED_TOPICS: usize = 1024;

/// Single-threaded FIFO consumer for one topic.
pub(crate) struct TopicWorker<E> {
    topic: TopicId,
    queue: Sender<Command<E>>,
    done: Receiver<()>,
    thread: Option<JoinHandle<()>>,
}

impl<E: Event> TopicWorker<E> {
    pub(crate) fn spawn(
        topic: TopicId,
        queue_buffer: usize,
        dispatcher: Arc<Dispatcher<E>>,
    ) -> Result<Self, BusError> {
        let (queue, receiver) = flume::bounded(queue_buffer);
        let (done_tx, done) = flume::bounded(1);
        let worker = format!("topic-bus-topic-{topic}");
        let name = worker.clone();
        let thread = thread::Builder::new()
            .name(worker.clone())
            .spawn(move || consume(&name, receiver, dispatcher, done_tx))
            .map_err(|source| BusError::WorkerSpawn { worker, source })?;

        Ok(Self {
            topic,
            queue,
            done,
            thread: Some(thread),
        })
    }

    pub(crate) fn topic(&self) -> &TopicId {
        &self.topic
    }

    pub(crate) fn sender(&self) -> &Sender<Command<E>> {
        &self.queue
    }

    /// Stop the worker after everything already queued, and wait for it.
    pub(crate) fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if self.queue.send(Command::Stop).is_err() || self.done.recv().is_err() {
            warn!(topic = %self.topic, "Topic queue disconnected during shutdown");
        }
        if thread.join().is_err() {
            warn!(topic = %self.topic, "Topic worker terminated abnormally");
        }
    }
}

/// Topic workers in creation order, found by linear scan.
///
/// Capacity is tracked explicitly and doubles whenever an append finds the
/// registry full. At most one worker exists per topic.
pub(crate) struct TopicRegistry<E> {
    workers: Vec<TopicWorker<E>>,
    capacity: usize,
    queue_buffer: usize,
    dispatcher: Arc<Dispatcher<E>>,
}

impl<E: Event> TopicRegistry<E> {
    pub(crate) fn new(capacity: usize, queue_buffer: usize, dispatcher: Arc<Dispatcher<E>>) -> Self {
        Self {
            workers: Vec::with_capacity(capacity.min(MAX_RESERVED_TOPICS)),
            capacity,
            queue_buffer,
            dispatcher,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub(crate) fn contains(&self, topic: &TopicId) -> bool {
        self.find(topic).is_some()
    }

    /// Queue producer for `topic`, starting its worker on first use.
    pub(crate) fn sender_for(&mut self, topic: &TopicId) -> Result<Sender<Command<E>>, BusError> {
        if let Some(worker) = self.find(topic) {
            return Ok(worker.sender().clone());
        }

        let worker = TopicWorker::spawn(topic.clone(), self.queue_buffer, self.dispatcher.clone())?;
        let sender = worker.sender().clone();
        self.push(worker);
        debug!(%topic, topics = self.len(), capacity = self.capacity, "Topic worker created");
        Ok(sender)
    }

    /// Stop every worker, in creation order.
    pub(crate) fn shutdown_all(&mut self) {
        for mut worker in self.workers.drain(..) {
            worker.shutdown();
        }
    }

    fn find(&self, topic: &TopicId) -> Option<&TopicWorker<E>> {
        self.workers.iter().find(|worker| worker.topic() == topic)
    }

    fn push(&mut self, worker: TopicWorker<E>) {
        if self.workers.len() == self.capacity {
            self.grow();
        }
        self.workers.push(worker);
    }

    fn grow(&mut self) {
        let capacity = self.capacity.saturating_mul(2).max(1);
        let reserved = capacity.min(self.workers.len().saturating_add(MAX_RESERVED_TOPICS));
        self.workers
            .reserve_exact(reserved.saturating_sub(self.workers.len()));
        self.capacity = capacity;
    }
}
