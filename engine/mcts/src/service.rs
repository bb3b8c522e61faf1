//! Batching evaluator service.
//!
//! One thread owns the real evaluator. Workers talk to it through
//! [`EvaluatorClient`]s: each request carries a [`RequestToken`] and the
//! worker's reply channel, and every response is routed back by token, so
//! batching may freely interleave requests from different workers.
//!
//! The service blocks for the first request, drains whatever else is
//! already queued (up to `max_batch`), waits at most `batch_wait` for
//! stragglers, then runs a single `evaluate_batch` call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Mutex;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::cancel::StopSignal;
use crate::evaluator::{EvalResult, Evaluator, EvaluatorError};

/// Correlates a response with the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken {
    pub worker: usize,
    pub seq: u64,
}

struct Request {
    token: RequestToken,
    input: Vec<f32>,
    reply: Sender<Response>,
}

struct Response {
    token: RequestToken,
    result: Result<EvalResult, EvaluatorError>,
}

/// Tuning for the batching loop and its clients.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Largest number of requests folded into one evaluator call.
    pub max_batch: usize,
    /// How long to wait for more requests once the first one arrived.
    pub batch_wait: Duration,
    /// How often idle loops re-check the stop signal.
    pub poll_interval: Duration,
    /// How long a client waits for its response before giving up.
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_batch: 4,
            batch_wait: Duration::from_micros(200),
            poll_interval: Duration::from_millis(20),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Counters reported when the service shuts down.
#[derive(Debug, Clone, Default)]
pub struct ServiceStats {
    pub batches: u64,
    pub requests: u64,
    pub largest_batch: usize,
    pub failed_batches: u64,
}

impl ServiceStats {
    pub fn avg_batch_size(&self) -> f64 {
        if self.batches == 0 {
            0.0
        } else {
            self.requests as f64 / self.batches as f64
        }
    }
}

/// Owner side of a running service.
///
/// The service exits when the stop signal is raised, or when this handle
/// and every client have been dropped (or the handle was closed).
pub struct ServiceHandle {
    requests: Option<Sender<Request>>,
    thread: Option<JoinHandle<ServiceStats>>,
    config: ServiceConfig,
    stop: StopSignal,
}

/// Spawns the batching evaluator thread.
pub struct EvaluatorService;

impl EvaluatorService {
    pub fn spawn<E>(
        evaluator: E,
        config: ServiceConfig,
        stop: StopSignal,
    ) -> Result<ServiceHandle, EvaluatorError>
    where
        E: Evaluator + 'static,
    {
        if config.max_batch == 0 {
            return Err(EvaluatorError::InvalidInput(
                "max_batch must be at least 1".into(),
            ));
        }

        let (tx, rx) = mpsc::channel();
        let loop_config = config.clone();
        let loop_stop = stop.clone();
        let thread = std::thread::Builder::new()
            .name("evaluator".into())
            .spawn(move || run_loop(evaluator, rx, loop_config, loop_stop))
            .map_err(|e| EvaluatorError::Unavailable(format!("failed to spawn evaluator: {}", e)))?;

        info!(
            max_batch = config.max_batch,
            batch_wait_us = config.batch_wait.as_micros() as u64,
            "Evaluator service started"
        );

        Ok(ServiceHandle {
            requests: Some(tx),
            thread: Some(thread),
            config,
            stop,
        })
    }
}

impl ServiceHandle {
    /// Create a client for `worker`.
    pub fn client(&self, worker: usize) -> Result<EvaluatorClient, EvaluatorError> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| EvaluatorError::Unavailable("service handle closed".into()))?
            .clone();
        let (reply_tx, reply_rx) = mpsc::channel();
        Ok(EvaluatorClient {
            worker,
            requests,
            reply_tx,
            replies: Mutex::new(reply_rx),
            seq: AtomicU64::new(0),
            timeout: self.config.request_timeout,
            poll_interval: self.config.poll_interval,
            stop: self.stop.clone(),
        })
    }

    /// Stop handing out clients. The service keeps running until the
    /// existing clients are gone.
    pub fn close(&mut self) {
        self.requests = None;
    }

    /// Wait for the service thread to finish and return its counters.
    pub fn join(mut self) -> Result<ServiceStats, EvaluatorError> {
        self.close();
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| EvaluatorError::EvaluationFailed("evaluator thread panicked".into())),
            None => Ok(ServiceStats::default()),
        }
    }
}

fn run_loop<E: Evaluator>(
    evaluator: E,
    rx: Receiver<Request>,
    config: ServiceConfig,
    stop: StopSignal,
) -> ServiceStats {
    let mut stats = ServiceStats::default();

    loop {
        if stop.is_stopped() {
            debug!("Evaluator service stopping on signal");
            break;
        }

        let first = match rx.recv_timeout(config.poll_interval) {
            Ok(request) => request,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                debug!("All evaluator clients gone");
                break;
            }
        };

        let mut batch = vec![first];
        let deadline = Instant::now() + config.batch_wait;
        while batch.len() < config.max_batch {
            match rx.try_recv() {
                Ok(request) => batch.push(request),
                Err(TryRecvError::Disconnected) => break,
                Err(TryRecvError::Empty) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        break;
                    }
                    match rx.recv_timeout(remaining) {
                        Ok(request) => batch.push(request),
                        Err(_) => break,
                    }
                }
            }
        }

        process_batch(&evaluator, batch, &mut stats);
    }

    info!(
        batches = stats.batches,
        requests = stats.requests,
        largest_batch = stats.largest_batch,
        avg_batch = format!("{:.2}", stats.avg_batch_size()),
        "Evaluator service stopped"
    );
    stats
}

fn process_batch<E: Evaluator>(evaluator: &E, batch: Vec<Request>, stats: &mut ServiceStats) {
    let size = batch.len();
    stats.batches += 1;
    stats.requests += size as u64;
    stats.largest_batch = stats.largest_batch.max(size);

    let (inputs, routes): (Vec<Vec<f32>>, Vec<(RequestToken, Sender<Response>)>) = batch
        .into_iter()
        .map(|r| (r.input, (r.token, r.reply)))
        .unzip();

    let results: Vec<Result<EvalResult, EvaluatorError>> = match evaluator.evaluate_batch(&inputs) {
        Ok(results) if results.len() == size => results.into_iter().map(Ok).collect(),
        Ok(results) => {
            stats.failed_batches += 1;
            let err = EvaluatorError::EvaluationFailed(format!(
                "evaluator returned {} results for {} inputs",
                results.len(),
                size
            ));
            vec![Err(err); size]
        }
        Err(e) => {
            stats.failed_batches += 1;
            warn!(error = %e, batch = size, "Batch evaluation failed");
            vec![Err(e); size]
        }
    };

    for ((token, reply), result) in routes.into_iter().zip(results) {
        if reply.send(Response { token, result }).is_err() {
            trace!(worker = token.worker, seq = token.seq, "Client gone before reply");
        }
    }
    trace!(batch = size, "Batch evaluated");
}

/// Worker-side handle to the evaluator service.
///
/// Implements [`Evaluator`], so a search can use it like any other
/// evaluator. Each call blocks until the matching response arrives.
pub struct EvaluatorClient {
    worker: usize,
    requests: Sender<Request>,
    reply_tx: Sender<Response>,
    replies: Mutex<Receiver<Response>>,
    seq: AtomicU64,
    timeout: Duration,
    poll_interval: Duration,
    stop: StopSignal,
}

impl std::fmt::Debug for EvaluatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorClient")
            .field("worker", &self.worker)
            .field("seq", &self.seq.load(Ordering::Relaxed))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl EvaluatorClient {
    pub fn worker(&self) -> usize {
        self.worker
    }

    fn wait_for(
        &self,
        token: RequestToken,
        replies: &Receiver<Response>,
    ) -> Result<EvalResult, EvaluatorError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.stop.is_stopped() {
                return Err(EvaluatorError::Unavailable("stop requested".into()));
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(EvaluatorError::Timeout(self.timeout));
            }

            match replies.recv_timeout(remaining.min(self.poll_interval)) {
                Ok(response) if response.token == token => return response.result,
                Ok(stale) => {
                    // Answer to a request that already timed out
                    trace!(
                        worker = self.worker,
                        seq = stale.token.seq,
                        "Discarding stale response"
                    );
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(EvaluatorError::Unavailable("reply channel closed".into()));
                }
            }
        }
    }
}

impl Evaluator for EvaluatorClient {
    fn evaluate(&self, input: &[f32]) -> Result<EvalResult, EvaluatorError> {
        let replies = self
            .replies
            .lock()
            .map_err(|_| EvaluatorError::Unavailable("reply lock poisoned".into()))?;

        let token = RequestToken {
            worker: self.worker,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
        };
        let request = Request {
            token,
            input: input.to_vec(),
            reply: self.reply_tx.clone(),
        };
        self.requests
            .send(request)
            .map_err(|_| EvaluatorError::Unavailable("evaluator service has shut down".into()))?;

        self.wait_for(token, &replies)
    }

    fn evaluate_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<EvalResult>, EvaluatorError> {
        inputs.iter().map(|input| self.evaluate(input)).collect()
    }
}
