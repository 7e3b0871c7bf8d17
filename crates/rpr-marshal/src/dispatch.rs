//! Host-thread dispatch
//!
//! Some host functions may only run on the host's own thread. A call made
//! anywhere else is packaged as a job, queued to the host, and the caller
//! blocks until the host has run it and sent the result back.
//!
//! The host owns a [`HostPump`] and drains it from its own loop (for example
//! a timer or idle callback); any thread holding the [`HostContext`] can
//! submit work.

use rpr_config::Config;
use std::fmt;
use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

/// A unit of work run inside an execution context
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Dispatch errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Host context is closed; no pump is draining calls")]
    Closed,
}

/// An execution context that work can be forwarded into
pub trait ExecutionContext: Send + Sync {
    /// Whether the current thread already runs inside this context
    fn is_current(&self) -> bool;

    /// Queue a job; blocks while the queue is full
    fn submit(&self, job: Job) -> Result<(), DispatchError>;
}

/// Run `f` inside `context` and wait for its result
///
/// Runs inline when already in the context, so a host-thread caller never
/// waits on its own queue.
pub fn run_in<C, F, R>(context: &C, f: F) -> Result<R, DispatchError>
where
    C: ExecutionContext + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if context.is_current() {
        return Ok(f());
    }

    let (reply, response) = oneshot::channel();
    context.submit(Box::new(move || {
        // Receiver gone means the caller stopped waiting; nothing to do.
        let _ = reply.send(f());
    }))?;

    response.blocking_recv().map_err(|_| DispatchError::Closed)
}

/// Submission side of the host thread's queue
///
/// `submit` blocks the calling thread, so it must not be used from inside
/// an async runtime.
pub struct HostContext {
    thread: ThreadId,
    sender: mpsc::Sender<Job>,
}

impl HostContext {
    /// Create a context bound to the calling thread
    ///
    /// `queue_depth` bounds how many forwarded calls may wait at once
    /// (a depth of 0 is treated as 1).
    pub fn new(queue_depth: usize) -> (Self, HostPump) {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let thread = thread::current().id();
        (
            Self { thread, sender },
            HostPump {
                receiver,
                _not_send: PhantomData,
            },
        )
    }

    /// Create a context bound to the calling thread, sized from `config`
    pub fn from_config(config: &Config) -> (Self, HostPump) {
        Self::new(config.queue_depth())
    }

    /// Thread this context is bound to
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl ExecutionContext for HostContext {
    fn is_current(&self) -> bool {
        thread::current().id() == self.thread
    }

    fn submit(&self, job: Job) -> Result<(), DispatchError> {
        self.sender.blocking_send(job).map_err(|_| DispatchError::Closed)
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("thread", &self.thread)
            .field("is_closed", &self.is_closed())
            .finish()
    }
}

/// Receiving side of the host queue
///
/// Not `Send`: it stays on the thread that created the context, which is
/// the thread the jobs must run on.
pub struct HostPump {
    receiver: mpsc::Receiver<Job>,
    _not_send: PhantomData<*const ()>,
}

impl HostPump {
    /// Run every job queued so far without waiting; returns how many ran
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            job();
            ran += 1;
        }
        if ran > 0 {
            trace!(jobs = ran, "host pump drained queue");
        }
        ran
    }

    /// Run jobs until every `HostContext` has been dropped
    pub fn run(mut self) {
        while let Some(job) = self.receiver.blocking_recv() {
            job();
        }
    }
}

impl fmt::Debug for HostPump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostPump").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_inline_when_current() {
        let (context, mut pump) = HostContext::new(4);
        let result = run_in(&context, || 7).unwrap();
        assert_eq!(result, 7);
        assert_eq!(pump.run_pending(), 0);
    }

    #[test]
    fn test_forwarded_job_runs_on_host_thread() {
        let (context, mut pump) = HostContext::new(4);
        let context = Arc::new(context);
        let host = thread::current().id();

        let worker = {
            let context = Arc::clone(&context);
            thread::spawn(move || run_in(context.as_ref(), || thread::current().id()))
        };

        while !worker.is_finished() {
            pump.run_pending();
            thread::yield_now();
        }

        let ran_on = worker.join().unwrap().unwrap();
        assert_eq!(ran_on, host);
    }

    #[test]
    fn test_closed_when_pump_dropped() {
        let (context, pump) = HostContext::new(1);
        drop(pump);
        assert!(context.is_closed());

        let result = thread::spawn(move || run_in(&context, || ()))
            .join()
            .unwrap();
        assert_eq!(result, Err(DispatchError::Closed));
    }

    #[test]
    fn test_zero_depth_still_accepts_jobs() {
        let (context, mut pump) = HostContext::new(0);
        context.submit(Box::new(|| {})).unwrap();
        assert_eq!(pump.run_pending(), 1);
    }
}
