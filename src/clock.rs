//! Time sources and sleep primitives injected into the client.
//!
//! Expiry checks and rate-limit accounting read the current instant from a [`Clock`], and the
//! rate gate waits through a [`Sleeper`]. Production code uses [`SystemClock`] and
//! [`TokioSleeper`]; tests swap in [`ManualClock`] and [`ManualSleeper`] so an hour-long
//! rate-limit window can be crossed without any real waiting.

// self
use crate::_prelude::*;

/// Boxed future returned by [`Sleeper::sleep`].
pub type SleepFuture<'a> = Pin<Box<dyn Future<Output = ()> + 'a + Send>>;

/// Source of the current UTC instant.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Suspends the caller for a duration.
pub trait Sleeper
where
	Self: Send + Sync,
{
	/// Completes once `duration` has elapsed.
	fn sleep(&self, duration: Duration) -> SleepFuture<'_>;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Sleeper backed by the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;
impl Sleeper for TokioSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		let duration = std::time::Duration::try_from(duration).unwrap_or_default();

		Box::pin(tokio::time::sleep(duration))
	}
}

/// Manually driven clock for tests and simulations.
#[derive(Clone, Debug)]
pub struct ManualClock(Arc<Mutex<OffsetDateTime>>);
impl ManualClock {
	/// Creates a clock frozen at `start`.
	pub fn new(start: OffsetDateTime) -> Self {
		Self(Arc::new(Mutex::new(start)))
	}

	/// Moves the clock forward (or backward, for negative durations).
	pub fn advance(&self, by: Duration) {
		*self.0.lock() += by;
	}

	/// Jumps the clock to `instant`.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Default for ManualClock {
	fn default() -> Self {
		Self::new(OffsetDateTime::now_utc())
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Sleeper that returns immediately after advancing a [`ManualClock`] by the requested duration.
///
/// Every requested duration is recorded so tests can assert when and how long a caller would
/// have waited.
#[derive(Clone, Debug)]
pub struct ManualSleeper {
	clock: ManualClock,
	sleeps: Arc<Mutex<Vec<Duration>>>,
}
impl ManualSleeper {
	/// Creates a sleeper that drives `clock`.
	pub fn new(clock: ManualClock) -> Self {
		Self { clock, sleeps: Default::default() }
	}

	/// Returns every duration requested so far.
	pub fn sleeps(&self) -> Vec<Duration> {
		self.sleeps.lock().clone()
	}

	/// Returns the sum of all requested durations.
	pub fn total_slept(&self) -> Duration {
		self.sleeps.lock().iter().fold(Duration::ZERO, |acc, d| acc + *d)
	}
}
impl Sleeper for ManualSleeper {
	fn sleep(&self, duration: Duration) -> SleepFuture<'_> {
		self.sleeps.lock().push(duration);
		self.clock.advance(duration);

		Box::pin(async {})
	}
}

/// Converts an instant into fractional unix seconds.
pub fn to_unix_seconds(instant: OffsetDateTime) -> f64 {
	instant.unix_timestamp() as f64 + f64::from(instant.nanosecond()) / 1_000_000_000.0
}

/// Converts fractional unix seconds into an instant, if representable.
pub fn from_unix_seconds(seconds: f64) -> Option<OffsetDateTime> {
	if !seconds.is_finite() {
		return None;
	}

	let whole = seconds.floor();
	let nanos = ((seconds - whole) * 1_000_000_000.0).round() as i128;
	let total = (whole as i128).checked_mul(1_000_000_000)?.checked_add(nanos)?;

	OffsetDateTime::from_unix_timestamp_nanos(total).ok()
}
