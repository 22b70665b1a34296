//! Relative paths of the documented Fitbit resources.
//!
//! [`Resource`] only builds URLs. `Client::get_resource` accepts any URL, so endpoints that are
//! not listed here remain reachable.

// crates.io
use time::Date;
// self
use crate::_prelude::*;

/// Documented Fitbit resource for the authorized user (`-`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
	/// User profile.
	Profile,
	/// Daily activity summary for a date.
	ActivitySummary {
		/// Day to summarize.
		date: Date,
	},
	/// One-day heart-rate time series for a date.
	HeartRate {
		/// Day to fetch.
		date: Date,
	},
	/// Sleep log entries for a date.
	Sleep {
		/// Day to fetch.
		date: Date,
	},
}
impl Resource {
	/// Returns the path relative to the API base, without a leading slash.
	pub fn path(&self) -> String {
		match self {
			Self::Profile => "1/user/-/profile.json".into(),
			Self::ActivitySummary { date } =>
				format!("1/user/-/activities/date/{}.json", format_date(*date)),
			Self::HeartRate { date } =>
				format!("1/user/-/activities/heart/date/{}/1d.json", format_date(*date)),
			Self::Sleep { date } => format!("1.2/user/-/sleep/date/{}.json", format_date(*date)),
		}
	}

	/// Joins [`Self::path`] onto `api_base`.
	pub fn url(&self, api_base: &Url) -> Result<Url, url::ParseError> {
		api_base.join(&self.path())
	}
}
impl Display for Resource {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.path())
	}
}

fn format_date(date: Date) -> String {
	format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}
