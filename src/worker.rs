//! Background execution of transform requests.
//!
//! A UI thread should not run kernels itself. [`TransformWorker`] owns a
//! thread that pulls requests off a channel, serves them through a
//! [`TransformService`], and sends tagged responses back. Requests are
//! fire-and-wait: the caller may submit again before the previous response
//! arrives, and responses for an image that has since been replaced come
//! back marked with their old generation so they can be dropped.

use core::fmt;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::service::{TransformService, Transformed};
use crate::store::OriginalStore;
use crate::{Transform, TransformError};

/// Sequence number of a submitted request, unique per worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
    /// Raw sequence number.
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Answer to one submitted request.
#[derive(Debug)]
pub struct Response {
    /// Which request this answers.
    pub id: RequestId,
    /// The transform that was requested.
    pub transform: Transform,
    /// Transformed pixels, or why there are none.
    pub result: Result<Transformed, TransformError>,
}

impl Response {
    /// Whether the result still applies to what `store` holds.
    ///
    /// Errors are always current: "no image loaded" is worth showing
    /// whatever arrived in between.
    pub fn is_current(&self, store: &OriginalStore) -> bool {
        match &self.result {
            Ok(out) => out.is_current(store),
            Err(_) => true,
        }
    }
}

/// Errors from the worker channel.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WorkerError {
    /// The worker thread could not be started.
    #[error("failed to spawn transform worker: {0}")]
    Spawn(#[from] std::io::Error),
    /// The worker thread is gone (it panicked or was shut down).
    #[error("transform worker disconnected")]
    Disconnected,
}

struct Job {
    id: RequestId,
    transform: Transform,
}

/// A dedicated thread serving transform requests.
///
/// Dropping the worker closes the request channel; requests already queued
/// are still served, then the thread exits and is joined.
pub struct TransformWorker {
    jobs: Option<Sender<Job>>,
    responses: Receiver<Response>,
    handle: Option<JoinHandle<()>>,
    next_id: u64,
}

impl TransformWorker {
    /// Start a worker thread serving requests through `service`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Spawn`] if the OS refuses a new thread.
    pub fn spawn(service: TransformService) -> Result<Self, WorkerError> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (resp_tx, resp_rx) = crossbeam_channel::unbounded();

        let handle = thread::Builder::new()
            .name("zenfilter-worker".into())
            .spawn(move || serve(&service, &job_rx, &resp_tx))?;
        log::debug!("transform worker started");

        Ok(Self {
            jobs: Some(job_tx),
            responses: resp_rx,
            handle: Some(handle),
            next_id: 0,
        })
    }

    /// Queue `transform` and return the id its response will carry.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the worker thread has exited.
    pub fn submit(&mut self, transform: Transform) -> Result<RequestId, WorkerError> {
        self.next_id += 1;
        let id = RequestId(self.next_id);
        self.jobs
            .as_ref()
            .ok_or(WorkerError::Disconnected)?
            .send(Job { id, transform })
            .map_err(|_| WorkerError::Disconnected)?;
        Ok(id)
    }

    /// Parse `id` and queue it.
    ///
    /// # Errors
    ///
    /// An identifier that does not parse is returned as
    /// [`SubmitError::Transform`] and never reaches the worker. A gone
    /// worker is [`SubmitError::Worker`].
    pub fn submit_named(&mut self, id: &str) -> Result<RequestId, SubmitError> {
        let transform = Transform::parse(id)?;
        Ok(self.submit(transform)?)
    }

    /// Block until the next response.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the worker thread has exited
    /// and no responses remain.
    pub fn recv(&self) -> Result<Response, WorkerError> {
        self.responses.recv().map_err(|_| WorkerError::Disconnected)
    }

    /// Take a response if one is ready.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the worker thread has exited
    /// and no responses remain.
    pub fn try_recv(&self) -> Result<Option<Response>, WorkerError> {
        match self.responses.try_recv() {
            Ok(resp) => Ok(Some(resp)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Wait up to `timeout` for a response.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the worker thread has exited
    /// and no responses remain.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Response>, WorkerError> {
        match self.responses.recv_timeout(timeout) {
            Ok(resp) => Ok(Some(resp)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(WorkerError::Disconnected),
        }
    }

    /// Block until a response that still applies to `store` arrives,
    /// dropping stale ones.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Disconnected`] if the worker thread has exited
    /// and no responses remain.
    pub fn recv_current(&self, store: &OriginalStore) -> Result<Response, WorkerError> {
        loop {
            let resp = self.recv()?;
            if resp.is_current(store) {
                return Ok(resp);
            }
            log::debug!("dropping stale response {} ({})", resp.id, resp.transform);
        }
    }
}

impl Drop for TransformWorker {
    fn drop(&mut self) {
        // Closing the sender ends the worker's receive loop.
        self.jobs = None;
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("transform worker panicked");
        }
    }
}

impl fmt::Debug for TransformWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransformWorker(submitted: {})", self.next_id)
    }
}

/// Error from [`TransformWorker::submit_named`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SubmitError {
    /// The identifier did not parse.
    #[error(transparent)]
    Transform(#[from] TransformError),
    /// The worker is gone.
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

fn serve(service: &TransformService, jobs: &Receiver<Job>, responses: &Sender<Response>) {
    for Job { id, transform } in jobs.iter() {
        let result = service.apply(transform);
        if let Err(e) = &result {
            log::debug!("{id} ({transform}) failed: {e}");
        }
        if responses.send(Response { id, transform, result }).is_err() {
            // Nobody is listening any more.
            break;
        }
    }
    log::debug!("transform worker stopped");
}
