//! Rate limit policy contracts and the sliding-window budget consulted before every
//! resource request.
//!
//! A [`RateLimitPolicy`] only decides; it never sleeps. The [`RateGate`] owns the waiting
//! loop: it asks the policy, sleeps through the injected [`Sleeper`] when told to delay, and
//! asks again. Admission and reservation happen in one step inside the policy, so concurrent
//! callers sharing a gate can never overshoot the budget, and nothing is locked while a caller
//! waits.

// std
use std::collections::VecDeque;
// self
use crate::{
	_prelude::*,
	clock::{Clock, Sleeper},
	obs,
};

/// Strategy that inspects the call budget before the client hits a resource endpoint.
pub trait RateLimitPolicy
where
	Self: Send + Sync,
{
	/// Decides whether the call described by `context` may proceed now.
	///
	/// Returning [`RateLimitDecision::Allow`] consumes one unit of budget.
	fn evaluate(&self, context: &RateLimitContext) -> RateLimitDecision;
}

/// Context shared with a [`RateLimitPolicy`] before an outbound call is made.
#[derive(Clone, Debug)]
pub struct RateLimitContext {
	/// Logical operation being attempted.
	pub operation: String,
	/// Timestamp the client observed before invoking the policy.
	pub observed_at: OffsetDateTime,
}
impl RateLimitContext {
	/// Creates a new context for the given operation.
	pub fn new(operation: impl Into<String>) -> Self {
		Self { operation: operation.into(), observed_at: OffsetDateTime::now_utc() }
	}

	/// Overrides the timestamp associated with the observation.
	pub fn with_observed_at(mut self, instant: OffsetDateTime) -> Self {
		self.observed_at = instant;

		self
	}
}

/// Result emitted by a [`RateLimitPolicy`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
	/// The request may proceed immediately.
	Allow,
	/// The request should be delayed.
	Delay(RetryDirective),
}

/// Advises callers when to retry after a [`RateLimitDecision::Delay`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryDirective {
	/// Instant when it is safe to retry.
	pub earliest_retry_at: OffsetDateTime,
	/// Suggested backoff duration.
	pub recommended_backoff: Duration,
	/// Optional descriptive string.
	pub reason: Option<String>,
}
impl RetryDirective {
	/// Creates a new directive with the provided timing metadata.
	pub fn new(earliest_retry_at: OffsetDateTime, recommended_backoff: Duration) -> Self {
		Self { earliest_retry_at, recommended_backoff, reason: None }
	}

	/// Adds a human-readable reason.
	pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
		self.reason = Some(reason.into());

		self
	}
}

/// Call budget: at most `calls` dispatches in any window of `period`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitQuota {
	/// Maximum dispatches per window.
	pub calls: u32,
	/// Length of the rolling window.
	pub period: Duration,
}
impl RateLimitQuota {
	/// Creates a quota of `calls` per `period`.
	pub const fn new(calls: u32, period: Duration) -> Self {
		Self { calls, period }
	}
}
impl Default for RateLimitQuota {
	fn default() -> Self {
		Self::new(125, Duration::hours(1))
	}
}

/// Sliding-log policy that admits at most `quota.calls` calls in any rolling `quota.period`.
///
/// The log lives as long as the policy and is never persisted; a fresh process starts with a
/// full budget.
#[derive(Debug)]
pub struct SlidingWindowPolicy {
	quota: RateLimitQuota,
	dispatched: Mutex<VecDeque<OffsetDateTime>>,
}
impl SlidingWindowPolicy {
	/// Creates a policy enforcing `quota`.
	pub fn new(quota: RateLimitQuota) -> Self {
		Self {
			quota,
			dispatched: Mutex::new(VecDeque::with_capacity(quota.calls as usize)),
		}
	}

	/// Returns the enforced quota.
	pub fn quota(&self) -> RateLimitQuota {
		self.quota
	}

	/// Returns how many calls may still be admitted at `instant`.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> u32 {
		let mut log = self.dispatched.lock();

		self.prune(&mut log, instant);

		self.quota.calls.saturating_sub(u32::try_from(log.len()).unwrap_or(u32::MAX))
	}

	fn prune(&self, log: &mut VecDeque<OffsetDateTime>, now: OffsetDateTime) {
		while log.front().is_some_and(|oldest| now - *oldest >= self.quota.period) {
			log.pop_front();
		}
	}
}
impl Default for SlidingWindowPolicy {
	fn default() -> Self {
		Self::new(RateLimitQuota::default())
	}
}
impl RateLimitPolicy for SlidingWindowPolicy {
	fn evaluate(&self, context: &RateLimitContext) -> RateLimitDecision {
		let now = context.observed_at;
		let mut log = self.dispatched.lock();

		self.prune(&mut log, now);

		if log.len() < self.quota.calls as usize {
			// Callers may read the clock before contending for the lock; keep the log sorted.
			let at = log.partition_point(|dispatched| *dispatched <= now);

			log.insert(at, now);

			return RateLimitDecision::Allow;
		}

		// Only reachable with a zero quota, which descriptor validation rejects.
		let Some(oldest) = log.front().copied() else {
			return RateLimitDecision::Delay(RetryDirective::new(now, self.quota.period));
		};
		let earliest_retry_at = oldest + self.quota.period;

		RateLimitDecision::Delay(
			RetryDirective::new(earliest_retry_at, earliest_retry_at - now).with_reason(format!(
				"{} calls per {}s budget exhausted",
				self.quota.calls,
				self.quota.period.whole_seconds()
			)),
		)
	}
}

/// Explicit pre-call step that blocks until the policy admits the call.
#[derive(Clone)]
pub struct RateGate {
	policy: Arc<dyn RateLimitPolicy>,
	sleeper: Arc<dyn Sleeper>,
}
impl RateGate {
	/// Creates a gate over `policy` that waits through `sleeper`.
	pub fn new(policy: Arc<dyn RateLimitPolicy>, sleeper: Arc<dyn Sleeper>) -> Self {
		Self { policy, sleeper }
	}

	/// Replaces the policy, keeping the sleeper.
	pub fn with_policy(mut self, policy: Arc<dyn RateLimitPolicy>) -> Self {
		self.policy = policy;

		self
	}

	/// Replaces the sleeper, keeping the policy.
	pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
		self.sleeper = sleeper;

		self
	}

	/// Waits until one unit of budget is reserved for `operation`.
	///
	/// Returns the total time spent waiting. The caller is never rejected.
	pub async fn acquire(&self, clock: &dyn Clock, operation: &str) -> Duration {
		let mut waited = Duration::ZERO;

		loop {
			let context = RateLimitContext::new(operation).with_observed_at(clock.now());

			match self.policy.evaluate(&context) {
				RateLimitDecision::Allow => return waited,
				RateLimitDecision::Delay(directive) => {
					obs::record_rate_limit_delay(operation, &directive);

					waited += directive.recommended_backoff;

					self.sleeper.sleep(directive.recommended_backoff).await;
				},
			}
		}
	}
}
impl Debug for RateGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("RateGate(..)")
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::clock::{ManualClock, ManualSleeper};

	fn context_at(instant: OffsetDateTime) -> RateLimitContext {
		RateLimitContext::new("test").with_observed_at(instant)
	}

	#[test]
	fn sliding_window_admits_up_to_quota_then_delays() {
		let start = macros::datetime!(2025-01-01 00:00 UTC);
		let policy = SlidingWindowPolicy::new(RateLimitQuota::new(3, Duration::minutes(1)));

		for offset in 0..3 {
			assert_eq!(
				policy.evaluate(&context_at(start + Duration::seconds(offset))),
				RateLimitDecision::Allow
			);
		}

		match policy.evaluate(&context_at(start + Duration::seconds(10))) {
			RateLimitDecision::Delay(directive) => {
				assert_eq!(directive.earliest_retry_at, start + Duration::minutes(1));
				assert_eq!(directive.recommended_backoff, Duration::seconds(50));
				assert!(directive.reason.is_some());
			},
			other => panic!("Expected a delay once the budget is spent, got {other:?}."),
		}

		assert_eq!(policy.remaining_at(start + Duration::seconds(10)), 0);
	}

	#[test]
	fn sliding_window_frees_budget_one_call_at_a_time() {
		let start = macros::datetime!(2025-01-01 00:00 UTC);
		let policy = SlidingWindowPolicy::new(RateLimitQuota::new(2, Duration::minutes(1)));

		assert_eq!(policy.evaluate(&context_at(start)), RateLimitDecision::Allow);
		assert_eq!(
			policy.evaluate(&context_at(start + Duration::seconds(30))),
			RateLimitDecision::Allow
		);
		assert_eq!(policy.remaining_at(start + Duration::seconds(59)), 0);
		assert_eq!(policy.remaining_at(start + Duration::seconds(60)), 1);
		assert_eq!(policy.remaining_at(start + Duration::seconds(90)), 2);
	}

	#[test]
	fn late_arriving_observation_is_logged_in_order() {
		let start = macros::datetime!(2025-01-01 00:00 UTC);
		let policy = SlidingWindowPolicy::new(RateLimitQuota::new(2, Duration::minutes(1)));

		assert_eq!(
			policy.evaluate(&context_at(start + Duration::seconds(10))),
			RateLimitDecision::Allow
		);
		// Observed earlier, admitted later.
		assert_eq!(
			policy.evaluate(&context_at(start + Duration::seconds(5))),
			RateLimitDecision::Allow
		);
		assert_eq!(policy.remaining_at(start + Duration::seconds(64)), 0);
		assert_eq!(policy.remaining_at(start + Duration::seconds(65)), 1);
		assert_eq!(
			policy.evaluate(&context_at(start + Duration::seconds(65))),
			RateLimitDecision::Allow
		);

		match policy.evaluate(&context_at(start + Duration::seconds(66))) {
			RateLimitDecision::Delay(directive) => {
				assert_eq!(directive.earliest_retry_at, start + Duration::seconds(70));
				assert_eq!(directive.recommended_backoff, Duration::seconds(4));
			},
			other => panic!("Expected a delay until the older call leaves, got {other:?}."),
		}
	}

	#[test]
	fn default_quota_matches_hourly_budget() {
		let policy = SlidingWindowPolicy::default();

		assert_eq!(policy.quota(), RateLimitQuota::new(125, Duration::seconds(3600)));
	}

	#[tokio::test]
	async fn gate_sleeps_until_window_admits_call() {
		let clock = ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC));
		let sleeper = ManualSleeper::new(clock.clone());
		let gate = RateGate::new(
			Arc::new(SlidingWindowPolicy::new(RateLimitQuota::new(2, Duration::minutes(1)))),
			Arc::new(sleeper.clone()),
		);

		assert_eq!(gate.acquire(&clock, "test").await, Duration::ZERO);

		clock.advance(Duration::seconds(15));

		assert_eq!(gate.acquire(&clock, "test").await, Duration::ZERO);
		assert_eq!(gate.acquire(&clock, "test").await, Duration::seconds(45));
		assert_eq!(sleeper.sleeps(), vec![Duration::seconds(45)]);
		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:01 UTC));
	}
}
