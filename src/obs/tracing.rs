// self
use crate::{_prelude::*, ext::RetryDirective, obs::FlowKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// A span builder used by client flows.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Creates a new span tagged with the provided flow kind + stage.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("fitbit_client.flow", flow = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits an event once a refresh has replaced the held tokens.
pub fn record_refresh_success(expires_at: OffsetDateTime) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(%expires_at, "access token refreshed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = expires_at;
	}
}

/// Emits an event when a refresh fails; only the error display is logged, never tokens.
pub fn record_refresh_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(%error, "token refresh failed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}

/// Emits an event and bumps the delay counter when the rate gate holds a call back.
pub fn record_rate_limit_delay(operation: &str, directive: &RetryDirective) {
	#[cfg(feature = "tracing")]
	{
		tracing::info!(
			operation,
			backoff_secs = directive.recommended_backoff.as_seconds_f64(),
			earliest_retry_at = %directive.earliest_retry_at,
			"rate limit reached; waiting"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = directive;
	}

	super::record_rate_limit_delay_metric(operation);
}
