//! # Dispatch Pool
//!
//! Fixed set of threads sharing one bounded queue, used for events without
//! a topic. Delivery order across the pool is not guaranteed.

use crate::error::BusError;
use crate::event::Event;
use crate::handler::Dispatcher;
use crate::sync::Counter;
use crate::worker::{consume, Command};
use flume::{Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

pub(crate) struct DispatchPool<E> {
    queue: Sender<Command<E>>,
    /// Held by the pool so the queue stays connected with zero workers.
    backlog: Receiver<Command<E>>,
    dispatcher: Arc<Dispatcher<E>>,
    done: Receiver<()>,
    live: Counter,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl<E: Event> DispatchPool<E> {
    /// Start `size` workers consuming a queue of `queue_buffer` slots.
    ///
    /// On a spawn failure the already started workers exit as soon as the
    /// returned error drops the queue.
    pub(crate) fn start(
        size: usize,
        queue_buffer: usize,
        dispatcher: Arc<Dispatcher<E>>,
    ) -> Result<Self, BusError> {
        let (queue, receiver) = flume::bounded(queue_buffer);
        let (done_tx, done) = flume::unbounded();
        let live = Counter::new();
        let mut threads = Vec::with_capacity(size);

        for n in 0..size {
            let worker = format!("topic-bus-pool-{n}");
            let receiver = receiver.clone();
            let dispatcher = dispatcher.clone();
            let done_tx = done_tx.clone();
            let name = worker.clone();
            let handle = thread::Builder::new()
                .name(worker.clone())
                .spawn(move || consume(&name, receiver, dispatcher, done_tx))
                .map_err(|source| BusError::WorkerSpawn { worker, source })?;
            live.increment();
            threads.push(handle);
        }

        debug!(workers = size, queue_buffer, "Dispatch pool started");
        Ok(Self {
            queue,
            backlog: receiver,
            dispatcher,
            done,
            live,
            threads: Mutex::new(threads),
        })
    }

    pub(crate) fn sender(&self) -> &Sender<Command<E>> {
        &self.queue
    }

    pub(crate) fn live_workers(&self) -> u32 {
        self.live.get()
    }

    /// Stop every worker after the events already queued.
    ///
    /// One stop command is in flight at a time, so each lands behind all
    /// events queued before it. Events no worker picked up are reported as
    /// [`BusError::ShuttingDown`].
    pub(crate) fn shutdown(&self) {
        while !self.live.is_zero() {
            if self.queue.send(Command::Stop).is_err() || self.done.recv().is_err() {
                warn!("Dispatch pool queue disconnected during shutdown");
                break;
            }
            self.live.decrement();
        }

        for handle in self.threads.lock().drain(..) {
            if handle.join().is_err() {
                warn!("Dispatch pool worker terminated abnormally");
            }
        }

        let mut stranded = 0usize;
        for command in self.backlog.try_iter() {
            if let Command::Deliver(event) = command {
                stranded += 1;
                self.dispatcher
                    .report(event.identifier(), Some(&event), &BusError::ShuttingDown);
            }
        }
        if stranded > 0 {
            warn!(stranded, "Dispatch pool stopped with undelivered events");
        }
        debug!("Dispatch pool drained");
    }
}
