//! Worker task queue shared by the send streams of a call.
//!
//! Tasks run one at a time, in posting order, on a dedicated named thread.
//! Bitrate allocator registration happens here so that it is totally ordered
//! with the allocator's own callbacks.

use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{RecvTimeoutError, Sender};
use log::trace;

use crate::error::{Error, Result};

type Task = Box<dyn FnOnce() + Send + 'static>;

pub struct TaskQueue {
    name: String,
    thread_id: ThreadId,
    sender: Option<Sender<Task>>,
    handle: Option<JoinHandle<()>>,
}

impl TaskQueue {
    /// Spawns the worker thread, named `name`.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded::<Task>();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                for task in receiver.iter() {
                    task();
                }
            })
            .map_err(|err| Error::Other(format!("task queue: {err}")))?;

        Ok(Self {
            name,
            thread_id: handle.thread().id(),
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the caller is running on this queue's worker thread.
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Queues `task` behind everything already posted.
    pub fn post_task<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(Error::ErrTaskQueueClosed)?;
        sender
            .send(Box::new(task))
            .map_err(|_| Error::ErrTaskQueueClosed)
    }

    /// Runs `task` on the worker thread and blocks until it has finished.
    ///
    /// With `timeout` set, gives up waiting after that long. The task itself
    /// stays queued and still runs later.
    pub fn post_and_wait<F, R>(&self, task: F, timeout: Option<Duration>) -> Result<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        debug_assert!(
            !self.is_current(),
            "post_and_wait on {} from its own worker thread",
            self.name
        );

        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        self.post_task(move || {
            let _ = done_tx.send(task());
        })?;

        let result = match timeout {
            Some(timeout) => done_rx.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => Error::ErrTaskQueueTimeout(timeout),
                RecvTimeoutError::Disconnected => Error::ErrTaskQueueClosed,
            }),
            None => done_rx.recv().map_err(|_| Error::ErrTaskQueueClosed),
        };
        trace!("task queue {} finished synchronous task", self.name);
        result
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain what is queued and exit.
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if !self.is_current() {
                let _ = handle.join();
            }
        }
    }
}
