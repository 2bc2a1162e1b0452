#![forbid(unsafe_code)]

//! Per-field validation orchestration with deterministic concurrency.
//!
//! A pipeline owns one field's rule chain and drives it through the state
//! machine `Idle -> Pending -> Settled(valid|invalid)`; `Settled` is reached
//! directly when no async rule needs to run.
//!
//! # Design principles
//!
//! 1. **Sync before async**: synchronous rules run to completion in declared
//!    order; the first failure settles the field invalid and async rules are
//!    never dispatched for that pass.
//! 2. **Monotonic run tokens**: every trigger takes a fresh [`RunToken`].
//!    Async results carry the token they were computed for and are discarded
//!    on arrival when it is no longer current — last trigger wins, stale
//!    results are dropped, not raced.
//! 3. **Deterministic reporting**: async rules run concurrently, one worker
//!    thread each, and may complete in any order; the reported failure is
//!    always the lowest declaration index among the failures.
//! 4. **Debounce against an injected clock**: value-driven triggers coalesce
//!    within a per-field window and fire from `poll`; explicit `run` calls
//!    bypass the window. Tests drive a fixed `Arc<AtomicU64>` clock instead
//!    of sleeping.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::message_bag::{Clear, MessageBag, MessageKind};
use crate::messages::MessageResolver;
use crate::rule::{CheckContext, Rule, RuleError};
use crate::transport::{ConfigError, TransportError};

/// Default per-field debounce window for value-driven triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Where the pipeline reads time from.
///
/// Production uses the system monotonic clock; tests inject a fixed
/// nanosecond counter and advance it by hand.
#[derive(Debug, Clone)]
pub enum TimeSource {
    System { epoch: Instant },
    Fixed(Arc<AtomicU64>),
}

impl TimeSource {
    /// The system monotonic clock, measured from now.
    #[must_use]
    pub fn system() -> Self {
        Self::System {
            epoch: Instant::now(),
        }
    }

    /// A hand-driven clock for deterministic tests.
    #[must_use]
    pub fn fixed(clock: Arc<AtomicU64>) -> Self {
        Self::Fixed(clock)
    }

    /// Nanoseconds since the source's epoch.
    #[must_use]
    pub fn now_ns(&self) -> u64 {
        match self {
            Self::System { epoch } => epoch.elapsed().as_nanos() as u64,
            Self::Fixed(clock) => clock.load(Ordering::SeqCst),
        }
    }
}

impl Default for TimeSource {
    fn default() -> Self {
        Self::system()
    }
}

// ---------------------------------------------------------------------------
// RunToken
// ---------------------------------------------------------------------------

/// A monotonically increasing token identifying one validation pass.
///
/// Strictly monotonic per pipeline; zero is reserved for "no run".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RunToken(u64);

impl RunToken {
    /// The null token.
    pub const NONE: Self = Self(0);

    /// The raw counter value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Debouncer
// ---------------------------------------------------------------------------

/// Coalesces value-driven triggers into one deadline per window.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window_ns: u64,
    due_ns: Option<u64>,
}

impl Debouncer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window_ns: window.as_nanos() as u64,
            due_ns: None,
        }
    }

    /// Record a trigger: the deadline moves to `now + window`.
    pub fn touch(&mut self, now_ns: u64) {
        self.due_ns = Some(now_ns + self.window_ns);
    }

    /// `true` when a coalesced trigger is waiting and its deadline passed.
    #[must_use]
    pub fn is_due(&self, now_ns: u64) -> bool {
        self.due_ns.is_some_and(|due| now_ns >= due)
    }

    /// `true` while a coalesced trigger is waiting, due or not.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.due_ns.is_some()
    }

    /// Drop any waiting trigger.
    pub fn clear(&mut self) {
        self.due_ns = None;
    }

    /// The configured window.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_nanos(self.window_ns)
    }
}

// ---------------------------------------------------------------------------
// Faults
// ---------------------------------------------------------------------------

/// Why a fault was raised.
#[derive(Debug, Clone, PartialEq)]
pub enum FaultKind {
    Config(ConfigError),
    Transport(TransportError),
}

impl From<RuleError> for FaultKind {
    fn from(error: RuleError) -> Self {
        match error {
            RuleError::Config(e) => Self::Config(e),
            RuleError::Transport(e) => Self::Transport(e),
        }
    }
}

/// An out-of-band error signal: the system could not check, or is wired
/// wrong. Distinct from the validation messages in the bag.
#[derive(Debug, Clone, PartialEq)]
pub struct Fault {
    /// Name of the rule that raised the fault.
    pub rule: String,
    pub kind: FaultKind,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FaultKind::Config(e) => write!(f, "rule '{}': {e}", self.rule),
            FaultKind::Transport(e) => write!(f, "rule '{}': {e}", self.rule),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline state
// ---------------------------------------------------------------------------

/// Public view of the per-pass state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No pass has run since construction or reset.
    Idle,
    /// Async rules are in flight.
    Pending,
    /// The last pass completed and every rule held.
    Valid,
    /// The last pass completed with at least one failure.
    Invalid,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Pending {
        token: RunToken,
        outstanding: usize,
        failures: Vec<usize>,
        /// Rendered message per async rule index, prepared at dispatch time
        /// so settling needs no context.
        messages: BTreeMap<usize, String>,
    },
    Settled {
        valid: bool,
    },
}

struct AsyncOutcome {
    token: RunToken,
    index: usize,
    result: Result<bool, RuleError>,
}

// ---------------------------------------------------------------------------
// RulePipeline
// ---------------------------------------------------------------------------

/// One field's validation pipeline.
pub struct RulePipeline {
    rules: Vec<Arc<dyn Rule>>,
    bag: MessageBag,
    messages: Arc<MessageResolver>,
    phase: Phase,
    validated: bool,
    next_token: u64,
    debounce: Debouncer,
    faults: Vec<Fault>,
    tx: Sender<AsyncOutcome>,
    rx: Receiver<AsyncOutcome>,
}

impl fmt::Debug for RulePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RulePipeline")
            .field("rules", &self.rules.len())
            .field("state", &self.state())
            .field("validated", &self.validated)
            .finish()
    }
}

impl RulePipeline {
    /// Build a pipeline over `rules` in declaration order.
    ///
    /// The effective debounce window is `base_debounce` raised to the
    /// largest per-rule override.
    #[must_use]
    pub fn new(
        rules: Vec<Arc<dyn Rule>>,
        messages: Arc<MessageResolver>,
        base_debounce: Duration,
    ) -> Self {
        let window = rules
            .iter()
            .filter_map(|r| r.debounce_override())
            .fold(base_debounce, Duration::max);
        let (tx, rx) = mpsc::channel();
        Self {
            rules,
            bag: MessageBag::new(),
            messages,
            phase: Phase::Idle,
            validated: false,
            next_token: 0,
            debounce: Debouncer::new(window),
            faults: Vec::new(),
            tx,
            rx,
        }
    }

    /// The rule chain, in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Arc<dyn Rule>] {
        &self.rules
    }

    /// The field's message bag.
    #[must_use]
    pub fn bag(&self) -> &MessageBag {
        &self.bag
    }

    /// Mutable bag access for host-injected prepend/append messages.
    pub fn bag_mut(&mut self) -> &mut MessageBag {
        &mut self.bag
    }

    /// Current state-machine position.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        match &self.phase {
            Phase::Idle => PipelineState::Idle,
            Phase::Pending { .. } => PipelineState::Pending,
            Phase::Settled { valid: true } => PipelineState::Valid,
            Phase::Settled { valid: false } => PipelineState::Invalid,
        }
    }

    /// `true` while async work is in flight.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    /// `true` once any pass has been triggered since the last reset.
    #[must_use]
    pub fn validated(&self) -> bool {
        self.validated
    }

    /// Drain faults raised since the last call.
    pub fn take_faults(&mut self) -> Vec<Fault> {
        std::mem::take(&mut self.faults)
    }

    /// Record a value-driven trigger; it fires from [`Self::poll_due`] once
    /// the debounce window elapses.
    pub fn schedule(&mut self, now_ns: u64) {
        self.debounce.touch(now_ns);
    }

    /// `true` when a coalesced trigger's deadline has passed.
    #[must_use]
    pub fn poll_due(&self, now_ns: u64) -> bool {
        self.debounce.is_due(now_ns)
    }

    /// The debounce window in effect for this field.
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        self.debounce.window()
    }

    fn render(&self, index: usize, ctx: &CheckContext) -> String {
        let rule = &self.rules[index];
        self.messages.message_for(
            rule.name(),
            rule.message_template(),
            &rule.message_params(ctx),
        )
    }

    /// Run one validation pass immediately, bypassing debounce.
    ///
    /// `contexts` must align index-for-index with [`Self::rules`]; the
    /// caller prepares them from the store on the main thread.
    pub fn run(&mut self, contexts: &[CheckContext]) -> PipelineState {
        debug_assert_eq!(contexts.len(), self.rules.len());
        self.debounce.clear();
        self.next_token += 1;
        let token = RunToken(self.next_token);
        self.bag.clear_base(Clear::All);
        self.validated = true;

        // Sync phase: declaration order, first failure settles.
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.is_async() {
                continue;
            }
            let ctx = &contexts[index];
            let verdict = match rule.check(ctx) {
                Ok(verdict) => verdict,
                Err(error) => {
                    tracing::warn!(rule = rule.name(), %error, "sync rule fault, failing closed");
                    self.faults.push(Fault {
                        rule: rule.name().to_string(),
                        kind: error.into(),
                    });
                    false
                }
            };
            if !verdict {
                let message = self.render(index, ctx);
                self.bag.push_base(message, MessageKind::Error);
                self.phase = Phase::Settled { valid: false };
                return self.state();
            }
        }

        // Async phase: all remaining rules concurrently.
        let async_indices: Vec<usize> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_async())
            .map(|(i, _)| i)
            .collect();
        if async_indices.is_empty() {
            self.phase = Phase::Settled { valid: true };
            return self.state();
        }

        let rendered: BTreeMap<usize, String> = async_indices
            .iter()
            .map(|&i| (i, self.render(i, &contexts[i])))
            .collect();
        self.phase = Phase::Pending {
            token,
            outstanding: async_indices.len(),
            failures: Vec::new(),
            messages: rendered,
        };
        for index in async_indices {
            let rule = Arc::clone(&self.rules[index]);
            let ctx = contexts[index].clone();
            let tx = self.tx.clone();
            thread::spawn(move || {
                let result = rule.check(&ctx);
                // The pipeline may be gone by the time we finish; that's a
                // normal teardown, not an error.
                let _ = tx.send(AsyncOutcome {
                    token,
                    index,
                    result,
                });
            });
        }
        self.state()
    }

    /// Drain completed async results. Returns `true` when state changed.
    pub fn drain(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.rx.try_recv() {
                Ok(outcome) => changed |= self.apply(outcome),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    /// Block until the current pass settles or `timeout` elapses.
    ///
    /// Returns the settled validity, or `None` on timeout or when no pass
    /// has run.
    pub fn settle_blocking(&mut self, timeout: Duration) -> Option<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.phase {
                Phase::Idle => return None,
                Phase::Settled { valid } => return Some(valid),
                Phase::Pending { .. } => {}
            }
            let remaining = deadline.checked_duration_since(Instant::now())?;
            match self.rx.recv_timeout(remaining) {
                Ok(outcome) => {
                    self.apply(outcome);
                }
                Err(_) => return None,
            }
        }
    }

    /// Reset to the initial state: empty bag, flags cleared, any in-flight
    /// pass voided. The field's value is untouched.
    pub fn reset(&mut self) {
        self.next_token += 1;
        self.phase = Phase::Idle;
        self.validated = false;
        self.bag.clear(Clear::All);
        self.debounce.clear();
        self.faults.clear();
    }

    fn apply(&mut self, outcome: AsyncOutcome) -> bool {
        let current = match &self.phase {
            Phase::Pending { token, .. } => *token,
            _ => {
                tracing::debug!(
                    token = outcome.token.raw(),
                    "async result after settle/reset discarded"
                );
                return false;
            }
        };
        if outcome.token != current {
            tracing::debug!(
                token = outcome.token.raw(),
                current = current.raw(),
                "stale async result discarded"
            );
            return false;
        }

        let fault = match &outcome.result {
            Err(error) => {
                tracing::warn!(
                    rule = self.rules[outcome.index].name(),
                    %error,
                    "async rule fault, failing closed"
                );
                Some(Fault {
                    rule: self.rules[outcome.index].name().to_string(),
                    kind: error.clone().into(),
                })
            }
            Ok(_) => None,
        };
        if let Some(fault) = fault {
            self.faults.push(fault);
        }

        let settled = {
            let Phase::Pending {
                outstanding,
                failures,
                ..
            } = &mut self.phase
            else {
                unreachable!("checked above")
            };
            if !matches!(outcome.result, Ok(true)) {
                failures.push(outcome.index);
            }
            *outstanding -= 1;
            *outstanding == 0
        };
        if !settled {
            return true;
        }

        // Settle: completion order varied, the report must not. The lowest
        // declaration index among the failures is the one surfaced.
        let (failures, mut messages) = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Pending {
                failures, messages, ..
            } => (failures, messages),
            _ => unreachable!("checked above"),
        };
        let valid = failures.is_empty();
        if let Some(first) = failures.iter().min()
            && let Some(message) = messages.remove(first)
        {
            self.bag.push_base(message, MessageKind::Error);
        }
        self.phase = Phase::Settled { valid };
        true
    }
}
