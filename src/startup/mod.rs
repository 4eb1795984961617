//! Startup gate
//!
//! Blocks start-up until the data store accepts connections. A [`Probe`]
//! performs one connectivity check per attempt; failures it classifies as
//! retryable are followed by a fixed sleep and another attempt, anything
//! else is returned to the caller at once.
//!
//! ```ignore
//! let gate = StartupGate::new(Duration::from_secs(1))?;
//! let ready = gate
//!     .wait_until_ready(&DatabaseProbe::new(config.database.clone()), |event| println!("{}", event))
//!     .await?;
//! ```

pub mod probe;

pub use probe::{DatabaseProbe, DatabaseProbeError};

use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use std::time::Duration;

use crate::config::Config;

/// Pause between attempts unless configured otherwise
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Classification carried by probe errors
pub trait Retryable {
    /// `true` when another attempt may succeed (the store is starting,
    /// unreachable, or momentarily saturated)
    fn is_retryable(&self) -> bool;
}

/// A single readiness check
#[async_trait]
pub trait Probe: Send + Sync {
    type Error: Retryable + std::error::Error + Send + Sync + 'static;

    async fn check(&self) -> Result<(), Self::Error>;
}

/// Something that can wait
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the Tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Successful outcome of the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    /// Probe calls made, including the successful one
    pub attempts: u32,
}

/// Returned when the gate is built with a zero interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("startup interval must be greater than zero")]
pub struct InvalidInterval;

/// Why the gate gave up
#[derive(Debug, thiserror::Error)]
pub enum GateError<E> {
    /// The probe failed with an error that is not worth retrying
    #[error(transparent)]
    Probe(E),

    /// Every allowed attempt failed retryably
    #[error("database still unavailable after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },

    #[error(transparent)]
    InvalidInterval(#[from] InvalidInterval),
}

/// Progress notices, in the order they are emitted
#[derive(Debug)]
pub enum GateEvent<'a, E> {
    /// Before the first attempt
    Waiting,
    /// A retryable failure; the gate sleeps `retry_in` next
    Unavailable {
        attempt: u32,
        retry_in: Duration,
        error: &'a E,
    },
    /// The probe succeeded
    Ready { attempts: u32 },
}

impl<E> fmt::Display for GateEvent<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateEvent::Waiting => f.write_str("Waiting for database..."),
            GateEvent::Unavailable { retry_in, .. } => {
                write!(f, "Database unavailable, waiting {}...", describe_interval(*retry_in))
            }
            GateEvent::Ready { .. } => f.write_str("Database available!"),
        }
    }
}

/// "1 second", "3 seconds", "500 milliseconds"
pub fn describe_interval(interval: Duration) -> String {
    if interval.subsec_nanos() == 0 {
        match interval.as_secs() {
            1 => "1 second".to_string(),
            secs => format!("{} seconds", secs),
        }
    } else {
        match interval.as_millis() {
            1 => "1 millisecond".to_string(),
            millis => format!("{} milliseconds", millis),
        }
    }
}

/// Whole milliseconds, saturating at `u64::MAX`
fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Polls a [`Probe`] until it succeeds.
///
/// Runs sequentially on the calling task: one probe, then (on a retryable
/// failure) one sleep, and so on. Dropping the future cancels the wait.
#[derive(Debug, Clone)]
pub struct StartupGate<S = TokioSleeper> {
    interval: Duration,
    max_attempts: Option<u32>,
    sleeper: S,
}

impl StartupGate<TokioSleeper> {
    /// Gate with unbounded retries.
    ///
    /// # Errors
    ///
    /// `InvalidInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, InvalidInterval> {
        if interval.is_zero() {
            return Err(InvalidInterval);
        }
        Ok(Self {
            interval,
            max_attempts: None,
            sleeper: TokioSleeper,
        })
    }
}

impl<S: Sleeper> StartupGate<S> {
    /// Give up after `max_attempts` probe calls. `None` (the default) retries
    /// forever; `Some(0)` is treated as `Some(1)`.
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts.map(|n| n.max(1));
        self
    }

    /// Replace the sleeping capability
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> StartupGate<T> {
        StartupGate {
            interval: self.interval,
            max_attempts: self.max_attempts,
            sleeper,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }

    /// Probe until ready, delivering every notice to `notify`.
    ///
    /// Notices are also emitted as tracing events.
    pub async fn wait_until_ready<P, F>(
        &self,
        probe: &P,
        mut notify: F,
    ) -> Result<Ready, GateError<P::Error>>
    where
        P: Probe + ?Sized,
        F: FnMut(&GateEvent<'_, P::Error>),
    {
        let waiting = GateEvent::Waiting;
        tracing::info!("{}", waiting);
        notify(&waiting);

        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);

            match probe.check().await {
                Ok(()) => {
                    let ready = GateEvent::Ready { attempts };
                    tracing::info!(attempts, "{}", ready);
                    notify(&ready);
                    return Ok(Ready { attempts });
                }
                Err(e) if e.is_retryable() => {
                    if self.max_attempts.is_some_and(|max| attempts >= max) {
                        tracing::error!(error = %e, attempts, "Giving up waiting for database");
                        return Err(GateError::Exhausted { attempts, last: e });
                    }

                    let unavailable = GateEvent::Unavailable {
                        attempt: attempts,
                        retry_in: self.interval,
                        error: &e,
                    };
                    tracing::warn!(
                        error = %e,
                        attempt = attempts,
                        retry_delay_ms = saturating_millis(self.interval),
                        "{}",
                        unavailable
                    );
                    notify(&unavailable);

                    self.sleeper.sleep(self.interval).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, attempt = attempts, "Database probe failed");
                    return Err(GateError::Probe(e));
                }
            }
        }
    }
}

impl<S: Sleeper> StartupGate<S> {
    /// [`wait_until_ready`](Self::wait_until_ready) with every notice
    /// written to `out` as its own line
    pub async fn wait_until_ready_printing<P, W>(
        &self,
        probe: &P,
        out: &mut W,
    ) -> Result<Ready, GateError<P::Error>>
    where
        P: Probe + ?Sized,
        W: Write,
    {
        self.wait_until_ready(probe, |event| {
            if let Err(e) = writeln!(out, "{}", event).and_then(|_| out.flush()) {
                tracing::warn!(error = %e, "Failed to write startup notice");
            }
        })
        .await
    }
}

/// The `wait-for-db` command: gate on the configured database, printing
/// notices to `out`. Any error means the process should exit non-zero.
pub async fn wait_for_database<W: Write>(
    config: &Config,
    out: &mut W,
) -> Result<Ready, GateError<DatabaseProbeError>> {
    let gate = StartupGate::new(config.startup.interval())?
        .with_max_attempts(config.startup.max_attempts);
    let probe = DatabaseProbe::new(config.database.clone());

    gate.wait_until_ready_printing(&probe, out).await
}

/// Probe every `interval` until ready, at most `max_attempts` times
/// (`None` for no limit). Notices go to tracing only.
pub async fn wait_until_ready<P>(
    probe: &P,
    interval: Duration,
    max_attempts: Option<u32>,
) -> Result<Ready, GateError<P::Error>>
where
    P: Probe + ?Sized,
{
    StartupGate::new(interval)?
        .with_max_attempts(max_attempts)
        .wait_until_ready(probe, |_| {})
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    enum TestError {
        #[error("store unavailable")]
        Unavailable,
        #[error("connection refused")]
        Refused,
        #[error("bad credentials")]
        Fatal,
    }

    impl Retryable for TestError {
        fn is_retryable(&self) -> bool {
            !matches!(self, TestError::Fatal)
        }
    }

    /// Replays a script of outcomes, then succeeds forever
    struct ScriptedProbe {
        script: Mutex<VecDeque<Result<(), TestError>>>,
        calls: AtomicU32,
    }

    impl ScriptedProbe {
        fn new(script: impl IntoIterator<Item = Result<(), TestError>>) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Probe for ScriptedProbe {
        type Error = TestError;

        async fn check(&self) -> Result<(), TestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    /// Always fails the same way
    struct FailingProbe(TestError);

    #[async_trait]
    impl Probe for FailingProbe {
        type Error = TestError;

        async fn check(&self) -> Result<(), TestError> {
            Err(self.0)
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        slept: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        fn sleeps(&self) -> Vec<Duration> {
            self.slept.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn gate(sleeper: &RecordingSleeper) -> StartupGate<RecordingSleeper> {
        StartupGate::new(DEFAULT_INTERVAL)
            .unwrap()
            .with_sleeper(sleeper.clone())
    }

    #[tokio::test]
    async fn test_ready_on_first_call() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([Ok(())]);

        let ready = gate(&sleeper).wait_until_ready(&probe, |_| {}).await.unwrap();

        assert_eq!(ready, Ready { attempts: 1 });
        assert_eq!(probe.calls(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_retries_after_unavailable() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([Err(TestError::Unavailable); 3]);

        let ready = gate(&sleeper).wait_until_ready(&probe, |_| {}).await.unwrap();

        assert_eq!(ready.attempts, 4);
        assert_eq!(probe.calls(), 4);
        assert_eq!(sleeper.sleeps(), vec![DEFAULT_INTERVAL; 3]);
    }

    #[tokio::test]
    async fn test_fatal_error_propagates_without_sleep() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([Err(TestError::Fatal)]);

        let err = gate(&sleeper).wait_until_ready(&probe, |_| {}).await.unwrap_err();

        assert!(matches!(err, GateError::Probe(TestError::Fatal)));
        assert_eq!(probe.calls(), 1);
        assert!(sleeper.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_retryable_errors() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([
            Err(TestError::Unavailable),
            Err(TestError::Unavailable),
            Err(TestError::Refused),
            Err(TestError::Refused),
        ]);

        let ready = gate(&sleeper).wait_until_ready(&probe, |_| {}).await.unwrap();

        assert_eq!(ready.attempts, 5);
        assert_eq!(probe.calls(), 5);
        assert_eq!(sleeper.sleeps().len(), 4);
    }

    #[tokio::test]
    async fn test_fatal_after_retries() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([
            Err(TestError::Refused),
            Err(TestError::Fatal),
            Ok(()),
        ]);

        let err = gate(&sleeper).wait_until_ready(&probe, |_| {}).await.unwrap_err();

        assert!(matches!(err, GateError::Probe(TestError::Fatal)));
        assert_eq!(probe.calls(), 2);
        assert_eq!(sleeper.sleeps().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let probe = FailingProbe(TestError::Unavailable);

        let err = gate(&sleeper)
            .with_max_attempts(Some(3))
            .wait_until_ready(&probe, |_| {})
            .await
            .unwrap_err();

        match err {
            GateError::Exhausted { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last, TestError::Unavailable);
            }
            other => panic!("Expected Exhausted, got {:?}", other),
        }
        assert_eq!(sleeper.sleeps().len(), 2);
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert_eq!(StartupGate::new(Duration::ZERO).unwrap_err(), InvalidInterval);
        assert!(StartupGate::new(Duration::from_millis(1)).is_ok());
    }

    #[tokio::test]
    async fn test_free_function_rejects_zero_interval() {
        let probe = ScriptedProbe::new(Vec::new());

        let err = wait_until_ready(&probe, Duration::ZERO, None).await.unwrap_err();

        assert!(matches!(err, GateError::InvalidInterval(_)));
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn test_notices() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([Err(TestError::Unavailable), Err(TestError::Refused)]);
        let mut notices = Vec::new();

        gate(&sleeper)
            .wait_until_ready(&probe, |event| notices.push(event.to_string()))
            .await
            .unwrap();

        assert_eq!(
            notices,
            vec![
                "Waiting for database...",
                "Database unavailable, waiting 1 second...",
                "Database unavailable, waiting 1 second...",
                "Database available!",
            ]
        );
    }

    #[tokio::test]
    async fn test_no_ready_notice_on_failure() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([Err(TestError::Fatal)]);
        let mut notices = Vec::new();

        let _ = gate(&sleeper)
            .wait_until_ready(&probe, |event| notices.push(event.to_string()))
            .await;

        assert_eq!(notices, vec!["Waiting for database..."]);
    }

    #[tokio::test]
    async fn test_notices_printed_as_lines() {
        let sleeper = RecordingSleeper::default();
        let probe = ScriptedProbe::new([Err(TestError::Unavailable)]);
        let mut out = Vec::new();

        gate(&sleeper)
            .wait_until_ready_printing(&probe, &mut out)
            .await
            .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Waiting for database...\n\
             Database unavailable, waiting 1 second...\n\
             Database available!\n"
        );
    }

    #[tokio::test]
    async fn test_wait_for_database_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.url = dir.path().join("recipe.db").to_string_lossy().to_string();
        let mut out = Vec::new();

        let ready = wait_for_database(&config, &mut out).await.unwrap();

        assert_eq!(ready.attempts, 1);
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Waiting for database...\n"));
        assert!(out.ends_with("Database available!\n"));
    }

    #[tokio::test]
    async fn test_wait_for_database_fatal_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.database.url = file.path().join("recipe.db").to_string_lossy().to_string();
        let mut out = Vec::new();

        let err = wait_for_database(&config, &mut out).await.unwrap_err();

        assert!(matches!(err, GateError::Probe(DatabaseProbeError::Fatal(_))), "got {}", err);
        assert_eq!(String::from_utf8(out).unwrap(), "Waiting for database...\n");
    }

    #[test]
    fn test_saturating_millis() {
        assert_eq!(saturating_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(saturating_millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_describe_interval() {
        assert_eq!(describe_interval(Duration::from_secs(1)), "1 second");
        assert_eq!(describe_interval(Duration::from_secs(5)), "5 seconds");
        assert_eq!(describe_interval(Duration::from_millis(250)), "250 milliseconds");
        assert_eq!(describe_interval(Duration::from_millis(1500)), "1500 milliseconds");
    }

    fn outcome() -> impl Strategy<Value = Result<(), TestError>> {
        prop_oneof![
            4 => Just(Err(TestError::Unavailable)),
            4 => Just(Err(TestError::Refused)),
            1 => Just(Err(TestError::Fatal)),
            1 => Just(Ok(())),
        ]
    }

    proptest! {
        #[test]
        fn prop_n_retryable_failures_mean_n_sleeps(n in 0usize..30, interval_ms in 1u64..5_000) {
            let interval = Duration::from_millis(interval_ms);
            let sleeper = RecordingSleeper::default();
            let probe = ScriptedProbe::new(vec![Err(TestError::Unavailable); n]);
            let gate = StartupGate::new(interval).unwrap().with_sleeper(sleeper.clone());

            let ready = tokio_test::block_on(gate.wait_until_ready(&probe, |_| {})).unwrap();

            prop_assert_eq!(ready.attempts as usize, n + 1);
            prop_assert_eq!(probe.calls() as usize, n + 1);
            prop_assert_eq!(sleeper.sleeps(), vec![interval; n]);
        }

        #[test]
        fn prop_gate_follows_first_decisive_outcome(
            script in proptest::collection::vec(outcome(), 0..20),
            max_attempts in proptest::option::of(1u32..25),
        ) {
            let sleeper = RecordingSleeper::default();
            let probe = ScriptedProbe::new(script.clone());
            let gate = StartupGate::new(DEFAULT_INTERVAL)
                .unwrap()
                .with_max_attempts(max_attempts)
                .with_sleeper(sleeper.clone());

            let result = tokio_test::block_on(gate.wait_until_ready(&probe, |_| {}));

            // Walk the script the way the gate should.
            let mut expected_calls = 0u32;
            let mut expected = None;
            for step in script.iter().copied().chain(std::iter::repeat(Ok(()))) {
                expected_calls += 1;
                match step {
                    Ok(()) => { expected = Some("ready"); break; }
                    Err(TestError::Fatal) => { expected = Some("fatal"); break; }
                    Err(_) if max_attempts == Some(expected_calls) => {
                        expected = Some("exhausted");
                        break;
                    }
                    Err(_) => {}
                }
            }

            prop_assert_eq!(probe.calls(), expected_calls);
            match (expected, &result) {
                (Some("ready"), Ok(ready)) => {
                    prop_assert_eq!(ready.attempts, expected_calls);
                    prop_assert_eq!(sleeper.sleeps().len() as u32, expected_calls - 1);
                }
                (Some("fatal"), Err(GateError::Probe(TestError::Fatal))) => {
                    prop_assert_eq!(sleeper.sleeps().len() as u32, expected_calls - 1);
                }
                (Some("exhausted"), Err(GateError::Exhausted { attempts, .. })) => {
                    prop_assert_eq!(*attempts, expected_calls);
                    prop_assert_eq!(sleeper.sleeps().len() as u32, expected_calls - 1);
                }
                (expected, result) => {
                    prop_assert!(false, "expected {:?}, got {:?}", expected, result);
                }
            }
        }
    }
}
