use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::output::Reporter;
use crate::probe::{self, Reachable};

/// Pause between passes.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Bound on a single connect attempt.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub connect_timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            connect_timeout: CONNECT_TIMEOUT,
        }
    }
}

/// How the wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Connected {
        reachable: Reachable,
        elapsed: Duration,
        attempts: u32,
    },
    TimedOut {
        elapsed: Duration,
        attempts: u32,
    },
    Interrupted {
        elapsed: Duration,
        attempts: u32,
    },
}

impl Outcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Connected { .. } => 0,
            Outcome::TimedOut { .. } | Outcome::Interrupted { .. } => 1,
        }
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            Outcome::Connected { attempts, .. }
            | Outcome::TimedOut { attempts, .. }
            | Outcome::Interrupted { attempts, .. } => attempts,
        }
    }
}

#[derive(Debug)]
pub struct PollState {
    attempts: u32,
    started: Instant,
}

impl PollState {
    pub fn start() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Poll `config.host` until a port answers, the deadline passes, or `cancel` fires.
///
/// The first pass runs immediately. After each failed pass the loop waits for the next
/// tick of `settings.interval`, measured from the start, unless the deadline comes first.
pub async fn wait_for_host(
    config: &SessionConfig,
    settings: &PollSettings,
    reporter: &mut dyn Reporter,
    cancel: CancellationToken,
) -> Outcome {
    let mut state = PollState::start();
    reporter.waiting(&config.host, &config.target_description());
    info!(
        host = %config.host,
        ports = ?config.ports,
        timeout = ?config.timeout,
        "waiting for host"
    );

    // A deadline past what the clock can represent is the same as no deadline.
    let deadline = config.timeout.and_then(|t| state.started.checked_add(t));
    let mut ticker = time::interval_at(state.started + settings.interval, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        state.attempts += 1;
        let hit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return interrupted(&state, reporter),
            hit = probe::probe_once(&config.host, &config.ports, settings.connect_timeout) => hit,
        };

        if let Some(reachable) = hit {
            let elapsed = state.elapsed();
            info!(port = reachable.port, attempts = state.attempts, "host reachable");
            reporter.connected(&config.host, &reachable, elapsed, state.attempts);
            return Outcome::Connected {
                reachable,
                elapsed,
                attempts: state.attempts,
            };
        }

        debug!(attempt = state.attempts, "no port answered");
        reporter.tick();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return interrupted(&state, reporter),
            _ = until(deadline) => {
                let elapsed = state.elapsed();
                info!(attempts = state.attempts, "timeout reached");
                reporter.timed_out(elapsed, state.attempts);
                return Outcome::TimedOut { elapsed, attempts: state.attempts };
            }
            _ = ticker.tick() => {}
        }
    }
}

fn interrupted(state: &PollState, reporter: &mut dyn Reporter) -> Outcome {
    let elapsed = state.elapsed();
    info!(attempts = state.attempts, "interrupted");
    reporter.interrupted(elapsed, state.attempts);
    Outcome::Interrupted {
        elapsed,
        attempts: state.attempts,
    }
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => future::pending().await,
    }
}
