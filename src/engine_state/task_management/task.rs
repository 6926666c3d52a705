//! # Task System Core Types
//!
//! This module defines the unit of background work and the handle used to
//! collect its output.
//!
//! ## Task Lifecycle
//! 1. A `Task` is created and scheduled via `TaskManager::publish_task()`
//! 2. The task's `process()` method is called on a worker thread
//! 3. Its output (or the panic it raised) travels back through a channel
//! 4. The control thread polls the returned `JobHandle` with `is_done()` and
//!    collects the output with `try_take()`
//!
//! Dropping a handle discards the output of its job. The job still runs, but
//! nobody observes the result.

use std::any::Any;
use std::fmt;
use std::sync::mpsc::{Receiver, TryRecvError};

/// A unit of work that can be executed on a worker thread.
///
/// Tasks own all the data they work on. Anything shared with the control
/// thread must be a deep copy.
pub trait Task: Send + 'static {
    /// The value produced by the task.
    type Output: Send + 'static;

    /// Processes the task.
    ///
    /// Runs on a background thread. A panic here does not take the worker
    /// down; it is reported through the job handle as [`JobError::Panicked`].
    fn process(self) -> Self::Output;
}

/// Why a job produced no output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The task panicked; carries the panic message.
    Panicked(String),
    /// The worker went away before the task finished.
    Disconnected,
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::Panicked(message) => write!(f, "background task panicked: {}", message),
            JobError::Disconnected => write!(f, "background task was dropped before completing"),
        }
    }
}

impl std::error::Error for JobError {}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

enum HandleState<T> {
    Pending,
    Done(Result<T, JobError>),
    Taken,
}

/// The pending output of a published task.
pub struct JobHandle<T> {
    receiver: Receiver<Result<T, JobError>>,
    state: HandleState<T>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(receiver: Receiver<Result<T, JobError>>) -> Self {
        JobHandle {
            receiver,
            state: HandleState::Pending,
        }
    }

    fn poll(&mut self) {
        if !matches!(self.state, HandleState::Pending) {
            return;
        }
        match self.receiver.try_recv() {
            Ok(result) => self.state = HandleState::Done(result),
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.state = HandleState::Done(Err(JobError::Disconnected))
            }
        }
    }

    /// Whether the job has finished, successfully or not.
    ///
    /// Never blocks. Stays `true` once the output has been taken.
    pub fn is_done(&mut self) -> bool {
        self.poll();
        !matches!(self.state, HandleState::Pending)
    }

    /// Takes the job's output if it has finished.
    ///
    /// # Returns
    /// `None` while the job is running and after the output has been taken
    /// once; otherwise the output or the reason there is none.
    pub fn try_take(&mut self) -> Option<Result<T, JobError>> {
        self.poll();
        match std::mem::replace(&mut self.state, HandleState::Taken) {
            HandleState::Done(result) => Some(result),
            HandleState::Pending => {
                self.state = HandleState::Pending;
                None
            }
            HandleState::Taken => None,
        }
    }

    /// Blocks until the job finishes and returns its output.
    pub fn wait(mut self) -> Result<T, JobError> {
        match std::mem::replace(&mut self.state, HandleState::Taken) {
            HandleState::Done(result) => result,
            HandleState::Taken => Err(JobError::Disconnected),
            HandleState::Pending => self
                .receiver
                .recv()
                .unwrap_or(Err(JobError::Disconnected)),
        }
    }
}

impl<T> fmt::Debug for JobHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            HandleState::Pending => "pending",
            HandleState::Done(_) => "done",
            HandleState::Taken => "taken",
        };
        f.debug_struct("JobHandle").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use super::*;

    #[test]
    fn output_is_taken_once() {
        let (sender, receiver) = channel();
        let mut handle = JobHandle::new(receiver);
        assert!(!handle.is_done());
        assert_eq!(handle.try_take(), None);

        sender.send(Ok(7)).unwrap();
        assert!(handle.is_done());
        assert_eq!(handle.try_take(), Some(Ok(7)));
        assert_eq!(handle.try_take(), None);
        assert!(handle.is_done());
    }

    #[test]
    fn dropped_sender_reports_disconnection() {
        let (sender, receiver) = channel::<Result<u8, JobError>>();
        let mut handle = JobHandle::new(receiver);
        drop(sender);
        assert_eq!(handle.try_take(), Some(Err(JobError::Disconnected)));
    }

    #[test]
    fn panic_messages_are_extracted() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(3u8)), "unknown panic payload");
    }
}
