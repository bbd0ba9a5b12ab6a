//! Per-channel request orchestration
//!
//! One `ChannelController` instance exists per logical channel (coach,
//! analyze). The controller owns the channel's mutable state, selects a
//! transport for every submission at call time, accumulates streaming
//! fragments, and drives the cancellation and rate-limit backoff
//! lifecycles. The two channels are structurally identical but fully
//! independent: no state is shared between controller instances.
//!
//! State is published to observers as immutable snapshots through a
//! `tokio::sync::watch` channel; callers can also pull the current
//! snapshot directly. All writes go through the controller's own
//! continuations, guarded by a per-request generation counter so a
//! superseded in-flight operation can never clobber the state of a newer
//! one.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{AbortHandle, Abortable, Aborted};
use serde_json::Value;
use settingstore::Lang;
use tokio::sync::{Mutex, mpsc, watch};
use tracing::{debug, warn};

use crate::backoff::BackoffTimer;
use crate::config::BackoffConfig;
use crate::i18n;
use crate::llm::{ChatError, Transport};
use crate::ticket::TaskPayload;

/// Which logical channel a controller drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Coach,
    Analyze,
}

/// Result of a settled `submit`/`retry`
///
/// A rate-limited attempt settles as `Success`: recovery is automatic via
/// the backoff countdown and is never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Cancelled,
    /// Carries the localized user-facing message
    Failed(String),
}

/// Immutable view of a channel, published after every state change
#[derive(Debug, Clone, Default)]
pub struct ChannelSnapshot {
    /// True exactly while a network exchange is in flight
    pub loading: bool,
    /// Last successful result, or the accumulating partial result while streaming
    pub response: Option<Value>,
    /// Snapshot of `response` taken before the latest analyze submission
    pub previous_response: Option<Value>,
    pub cancelled: bool,
    pub had_error: bool,
    /// Localized message for the failure behind `had_error`
    pub error_message: Option<String>,
    /// Fragments per second since the first fragment arrived
    pub stream_speed: f64,
    /// Nonzero only while a rate-limit countdown is active
    pub backoff_remaining: u64,
}

/// Picks the transport for a submission at call time
///
/// Selection happens on every `submit`/`retry`, so a mode change between
/// attempts takes effect without rebuilding the controller.
pub trait TransportSelector: Send + Sync {
    fn select(&self, kind: ChannelKind) -> Arc<dyn Transport>;
}

struct ChannelState {
    loading: bool,
    response: Option<Value>,
    previous_response: Option<Value>,
    cancelled: bool,
    had_error: bool,
    error_message: Option<String>,
    stream_speed: f64,
    backoff_remaining: u64,
    last_payload: Option<TaskPayload>,
    /// Increments on every submit; stale continuations compare and bail
    generation: u64,
    /// Cancellation handle for the most recent request
    abort: Option<AbortHandle>,
    /// Armed rate-limit countdown, if any
    backoff: Option<BackoffTimer>,
}

impl ChannelState {
    fn new() -> Self {
        Self {
            loading: false,
            response: None,
            previous_response: None,
            cancelled: false,
            had_error: false,
            error_message: None,
            stream_speed: 0.0,
            backoff_remaining: 0,
            last_payload: None,
            generation: 0,
            abort: None,
            backoff: None,
        }
    }

    fn snapshot(&self) -> ChannelSnapshot {
        ChannelSnapshot {
            loading: self.loading,
            response: self.response.clone(),
            previous_response: self.previous_response.clone(),
            cancelled: self.cancelled,
            had_error: self.had_error,
            error_message: self.error_message.clone(),
            stream_speed: self.stream_speed,
            backoff_remaining: self.backoff_remaining,
        }
    }
}

struct Inner {
    kind: ChannelKind,
    lang: Lang,
    backoff: BackoffConfig,
    selector: Arc<dyn TransportSelector>,
    state: Mutex<ChannelState>,
    publish: watch::Sender<ChannelSnapshot>,
}

/// Controller for one channel; cheap to clone, all clones share state
#[derive(Clone)]
pub struct ChannelController {
    inner: Arc<Inner>,
}

fn stream_speed(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { count as f64 / secs } else { count as f64 }
}

impl ChannelController {
    pub fn new(kind: ChannelKind, selector: Arc<dyn TransportSelector>, lang: Lang, backoff: BackoffConfig) -> Self {
        let (publish, _) = watch::channel(ChannelSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                kind,
                lang,
                backoff,
                selector,
                state: Mutex::new(ChannelState::new()),
                publish,
            }),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.inner.kind
    }

    /// Pull the current state
    pub async fn snapshot(&self) -> ChannelSnapshot {
        self.inner.state.lock().await.snapshot()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ChannelSnapshot> {
        self.inner.publish.subscribe()
    }

    /// Submit a payload through the currently configured transport
    ///
    /// Always resolves; every failure path settles the channel state and
    /// returns an `Outcome`. A concurrent older submission keeps running
    /// but its continuations are ignored from here on.
    pub async fn submit(&self, payload: TaskPayload) -> Outcome {
        let transport = self.inner.selector.select(self.inner.kind);
        let (abort_handle, abort_reg) = AbortHandle::new_pair();
        let generation = self.begin_request(&payload, abort_handle).await;
        debug!(kind = ?self.inner.kind, generation, "submit: request started");

        let (tx, rx) = mpsc::channel::<String>(64);
        let exec = async move { transport.execute(&payload, tx).await };

        match Abortable::new(self.drive(generation, exec, rx), abort_reg).await {
            Err(Aborted) => self.settle_cancelled(generation).await,
            Ok(Ok(value)) => self.settle_success(generation, value).await,
            Ok(Err(e)) if e.is_cancelled() => self.settle_cancelled(generation).await,
            Ok(Err(ChatError::RateLimited)) => {
                self.arm_backoff(generation).await;
                Outcome::Success
            }
            Ok(Err(e)) => self.settle_failed(generation, e).await,
        }
    }

    /// Cancel the most recent request or an active backoff countdown
    ///
    /// Cancelling a countdown is a clean abort: the remaining seconds drop
    /// to zero and no error is flagged.
    pub async fn cancel(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(timer) = state.backoff.take() {
            debug!(kind = ?self.inner.kind, "cancel: stopping backoff countdown");
            timer.stop();
            state.backoff_remaining = 0;
            self.publish(&state);
        }
        if let Some(abort) = state.abort.take() {
            debug!(kind = ?self.inner.kind, "cancel: aborting in-flight request");
            abort.abort();
        }
    }

    /// Resubmit the last payload; a no-op success when none exists
    pub async fn retry(&self) -> Outcome {
        let payload = self.inner.state.lock().await.last_payload.clone();
        match payload {
            Some(payload) => self.submit(payload).await,
            None => {
                debug!(kind = ?self.inner.kind, "retry: no prior payload");
                Outcome::Success
            }
        }
    }

    /// Reset response, flags, speed, and backoff; keeps `last_payload` so
    /// `retry()` stays possible
    pub async fn clear(&self) {
        let mut state = self.inner.state.lock().await;
        if let Some(timer) = state.backoff.take() {
            timer.stop();
        }
        state.response = None;
        state.previous_response = None;
        state.cancelled = false;
        state.had_error = false;
        state.error_message = None;
        state.stream_speed = 0.0;
        state.backoff_remaining = 0;
        self.publish(&state);
    }

    // ─── request lifecycle ───────────────────────────────────────────────

    async fn begin_request(&self, payload: &TaskPayload, abort: AbortHandle) -> u64 {
        let mut state = self.inner.state.lock().await;
        state.generation += 1;
        let generation = state.generation;

        if let Some(timer) = state.backoff.take() {
            timer.stop();
        }
        state.backoff_remaining = 0;
        state.cancelled = false;
        state.had_error = false;
        state.error_message = None;
        state.stream_speed = 0.0;
        state.loading = true;
        state.last_payload = Some(payload.clone());
        if self.inner.kind == ChannelKind::Analyze {
            state.previous_response = state.response.take();
        } else {
            state.response = None;
        }
        state.abort = Some(abort);
        self.publish(&state);
        generation
    }

    /// Run the transport while folding fragments into the response
    async fn drive<F>(&self, generation: u64, exec: F, mut rx: mpsc::Receiver<String>) -> Result<Value, ChatError>
    where
        F: Future<Output = Result<Value, ChatError>>,
    {
        tokio::pin!(exec);
        let mut buffer = String::new();
        let mut count: u64 = 0;
        let mut first_at: Option<Instant> = None;
        let mut rx_open = true;

        let result = loop {
            if rx_open {
                tokio::select! {
                    result = &mut exec => break result,
                    maybe = rx.recv() => match maybe {
                        Some(fragment) => {
                            count += 1;
                            let first = *first_at.get_or_insert_with(Instant::now);
                            buffer.push_str(&fragment);
                            self.apply_fragment(generation, &buffer, stream_speed(count, first.elapsed())).await;
                        }
                        // webhook transports drop the sender immediately
                        None => rx_open = false,
                    },
                }
            } else {
                break exec.await;
            }
        };

        // fragments that arrived in the same poll as completion
        while let Ok(fragment) = rx.try_recv() {
            count += 1;
            let first = *first_at.get_or_insert_with(Instant::now);
            buffer.push_str(&fragment);
            self.apply_fragment(generation, &buffer, stream_speed(count, first.elapsed())).await;
        }

        result
    }

    /// Republish the accumulating response so observers see monotonically
    /// growing text
    async fn apply_fragment(&self, generation: u64, buffer: &str, speed: f64) {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            debug!(kind = ?self.inner.kind, generation, "apply_fragment: stale fragment ignored");
            return;
        }
        state.response = Some(serde_json::json!({ "markdown_msg": buffer, "message": buffer }));
        state.stream_speed = speed;
        self.publish(&state);
    }

    async fn settle_success(&self, generation: u64, value: Value) -> Outcome {
        let mut state = self.inner.state.lock().await;
        if state.generation == generation {
            state.loading = false;
            state.abort = None;
            state.response = Some(value);
            self.publish(&state);
        } else {
            debug!(kind = ?self.inner.kind, generation, "settle_success: superseded request, result dropped");
        }
        Outcome::Success
    }

    async fn settle_cancelled(&self, generation: u64) -> Outcome {
        let mut state = self.inner.state.lock().await;
        if state.generation == generation {
            state.loading = false;
            state.abort = None;
            state.cancelled = true;
            state.had_error = false;
            self.publish(&state);
        }
        debug!(kind = ?self.inner.kind, generation, "settle_cancelled: request cancelled");
        Outcome::Cancelled
    }

    async fn settle_failed(&self, generation: u64, error: ChatError) -> Outcome {
        let message = i18n::error_message(self.inner.lang, &error);
        warn!(kind = ?self.inner.kind, generation, error = %error, "settle_failed: request failed");
        let mut state = self.inner.state.lock().await;
        if state.generation == generation {
            state.loading = false;
            state.abort = None;
            state.had_error = true;
            state.error_message = Some(message.clone());
            self.publish(&state);
        }
        Outcome::Failed(message)
    }

    /// Enter the backoff phase after a rate-limited attempt
    ///
    /// The request is settled (not loading) before the countdown starts: a
    /// channel is never in flight and in backoff at the same time.
    async fn arm_backoff(&self, generation: u64) {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            debug!(kind = ?self.inner.kind, generation, "arm_backoff: superseded request, not arming");
            return;
        }
        debug!(kind = ?self.inner.kind, generation, seconds = self.inner.backoff.seconds, "arm_backoff: rate limited");
        state.loading = false;
        state.abort = None;
        if let Some(timer) = state.backoff.take() {
            timer.stop();
        }
        state.backoff_remaining = self.inner.backoff.seconds;
        state.backoff = Some(BackoffTimer::arm(self.inner.backoff.clone(), generation, self.clone()));
        self.publish(&state);
    }

    /// One countdown tick; returns false when the countdown was superseded
    pub(crate) async fn backoff_tick(&self, generation: u64, remaining: u64) -> bool {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            return false;
        }
        state.backoff_remaining = remaining;
        self.publish(&state);
        true
    }

    /// Countdown reached zero: resubmit the last payload as a full request
    pub(crate) async fn backoff_fire(&self, generation: u64) {
        let payload = {
            let mut state = self.inner.state.lock().await;
            if state.generation != generation {
                return;
            }
            state.backoff = None;
            state.last_payload.clone()
        };
        if let Some(payload) = payload {
            debug!(kind = ?self.inner.kind, generation, "backoff_fire: auto-resubmitting");
            // boxed to break the submit -> backoff -> submit type cycle
            let _ = self.submit(payload).boxed().await;
        }
    }

    fn publish(&self, state: &ChannelState) {
        self.inner.publish.send_replace(state.snapshot());
    }
}
