//! # Task Management System
//!
//! This module provides the worker pool that runs chunk generation and chunk
//! meshing off the control thread.
//!
//! ## Architecture Overview
//!
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed asynchronously
//! - `JobHandle`: The control thread's view of a published task's output
//! - `TaskChannel`: Communication channel between the control thread and one worker
//!
//! Each worker is a `std::thread` with a dedicated channel. Tasks are handed out
//! round-robin with at most `MAX_TASKS_IN_FLIGHT` per worker; the rest wait in a
//! FIFO queue until `process_queued_tasks()` finds a free worker.
//!
//! ## Task Lifecycle
//! 1. Tasks are created and published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send the output straight to the task's `JobHandle`
//! 4. `process_completed_tasks()` collects completion notices so workers become
//!    available again
//!
//! ## Example Usage
//! ```
//! use voxel_world::engine_state::task_management::{task::Task, TaskManager};
//!
//! struct Square(u64);
//!
//! impl Task for Square {
//!     type Output = u64;
//!     fn process(self) -> u64 {
//!         self.0 * self.0
//!     }
//! }
//!
//! let mut task_manager = TaskManager::new(2);
//! let handle = task_manager.publish_task(Square(12));
//! task_manager.wait_for_idle();
//! assert_eq!(handle.wait(), Ok(144));
//! ```

pub mod task;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use task::{panic_message, JobError, JobHandle, Task};

/// Type-erased work item shipped to a worker.
type Job = Box<dyn FnOnce() + Send>;

/// A communication channel between the control thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends jobs from the control thread to the worker
/// - `result_receiver`: Receives one completion notice per finished job
/// - `num_tasks_in_flight`: Tracks number of jobs currently being processed
/// - `_worker`: Handle to the worker thread
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Job>,
    result_receiver: Receiver<()>,
    num_tasks_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// # Fields
/// - `channels`: Set of active worker channels
/// - `queued_tasks`: Jobs waiting for an available worker
/// - `current_channel`: Index for round-robin scheduling
///
/// Dropping the manager closes every channel; workers finish their current
/// job and exit. Queued jobs are dropped and their handles report
/// [`JobError::Disconnected`].
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Job>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

impl TaskManager {
    /// Creates a new `TaskManager` with the specified number of worker threads.
    ///
    /// # Arguments
    /// * `num_workers` - Number of worker threads to create, at least one
    pub fn new(num_workers: usize) -> Self {
        let num_workers = num_workers.max(1);
        let mut channels = Vec::with_capacity(num_workers);

        log::info!(
            "Available parallelism: {:?}",
            thread::available_parallelism()
        );

        for index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Job>();
            let (result_tx, result_rx) = channel::<()>();

            let task_closure = move || {
                while let Ok(job) = task_rx.recv() {
                    job();
                    if result_tx.send(()).is_err() {
                        break;
                    }
                }
            };

            let worker = match thread::Builder::new()
                .name(format!("chunk-worker-{}", index))
                .spawn(task_closure)
            {
                Ok(worker) => worker,
                Err(err) => {
                    log::error!("Failed to spawn worker thread {}: {}", index, err);
                    continue;
                }
            };

            channels.push(TaskChannel {
                task_sender: task_tx,
                result_receiver: result_rx,
                num_tasks_in_flight: 0,
                _worker: worker,
            });
        }

        log::info!("Task manager started with {} workers", channels.len());

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Number of live worker threads.
    pub fn num_workers(&self) -> usize {
        self.channels.len()
    }

    /// Number of jobs currently running on workers.
    pub fn in_flight(&self) -> usize {
        self.channels.iter().map(|channel| channel.num_tasks_in_flight).sum()
    }

    /// Number of jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Whether no job is queued or running.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.in_flight() == 0
    }

    /// Attempts to send a job to a specific worker channel.
    ///
    /// # Returns
    /// - `Ok(())` if the job was handed to the worker
    /// - `Err(job)` if the worker is gone; the channel is removed from the pool
    fn try_send_task(&mut self, job: Job, channel_idx: usize) -> Result<(), Job> {
        match self.channels[channel_idx].task_sender.send(job) {
            Ok(_) => {
                self.channels[channel_idx].num_tasks_in_flight += 1;
                Ok(())
            }
            Err(err) => {
                log::error!("Worker {} disconnected, removing it from the pool", channel_idx);
                self.channels.remove(channel_idx);
                if self.current_channel >= self.channels.len() {
                    self.current_channel = 0;
                }
                Err(err.0)
            }
        }
    }

    /// Finds an available worker channel using round-robin from the last used channel.
    ///
    /// # Returns
    /// - `Some(usize)` index of a channel below `MAX_TASKS_IN_FLIGHT`
    /// - `None` if all channels are busy or there are no channels available
    fn find_available_channel(&self) -> Option<usize> {
        let len = self.channels.len();
        (0..len)
            .map(|step| (self.current_channel + step) % len)
            .find(|index| self.channels[*index].num_tasks_in_flight < MAX_TASKS_IN_FLIGHT)
    }

    /// Sends a job to a free worker, or queues it.
    fn dispatch(&mut self, mut job: Job) {
        while let Some(channel_idx) = self.find_available_channel() {
            match self.try_send_task(job, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    return;
                }
                Err(returned) => job = returned,
            }
        }
        if self.channels.is_empty() {
            log::error!("No worker threads left, dropping task");
            return;
        }
        self.queued_tasks.push_back(job);
    }

    /// Publishes a new task for execution.
    ///
    /// The task runs as soon as a worker becomes available. A panic inside the
    /// task is caught on the worker and reported through the handle.
    ///
    /// # Arguments
    /// * `task` - The task to be executed
    ///
    /// # Returns
    /// A handle to poll for the task's output.
    pub fn publish_task<T: Task>(&mut self, task: T) -> JobHandle<T::Output> {
        let (sender, receiver) = channel();
        let job: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(|| task.process()))
                .map_err(|payload| JobError::Panicked(panic_message(payload)));
            if let Err(JobError::Panicked(message)) = &result {
                log::warn!("Background task panicked: {}", message);
            }
            // The handle may already be gone; the output is then discarded.
            let _ = sender.send(result);
        });

        self.dispatch(job);
        JobHandle::new(receiver)
    }

    /// Hands queued jobs to workers that have room, oldest first.
    pub fn process_queued_tasks(&mut self) {
        while !self.queued_tasks.is_empty() {
            let Some(channel_idx) = self.find_available_channel() else {
                return;
            };
            let Some(job) = self.queued_tasks.pop_front() else {
                return;
            };
            match self.try_send_task(job, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(job) => {
                    if self.channels.is_empty() {
                        log::error!("No worker threads left, dropping {} tasks", self.queued_tasks.len() + 1);
                        self.queued_tasks.clear();
                        return;
                    }
                    self.queued_tasks.push_front(job);
                }
            }
        }
    }

    /// Collects completion notices so finished workers can take new jobs.
    pub fn process_completed_tasks(&mut self) {
        for channel in &mut self.channels {
            while let Ok(()) = channel.result_receiver.try_recv() {
                channel.num_tasks_in_flight = channel.num_tasks_in_flight.saturating_sub(1);
            }
        }
    }

    /// Blocks until every queued and running job has finished.
    pub fn wait_for_idle(&mut self) {
        loop {
            self.process_completed_tasks();
            self.process_queued_tasks();
            if self.is_idle() {
                return;
            }

            for channel in &mut self.channels {
                if channel.num_tasks_in_flight == 0 {
                    continue;
                }
                match channel.result_receiver.recv() {
                    Ok(()) => channel.num_tasks_in_flight -= 1,
                    Err(_) => channel.num_tasks_in_flight = 0,
                }
            }
        }
    }
}
