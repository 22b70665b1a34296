//! Extension contracts around the client's outbound calls.
//!
//! Only rate limiting lives here today: a [`RateLimitPolicy`] decides whether a call may go
//! out, and the [`RateGate`] waits on its behalf. Callers may supply their own policy through
//! `Client::with_rate_limit_policy`, or share one policy across several clients to make the
//! budget process-wide.

pub mod rate_limit;

pub use rate_limit::*;
