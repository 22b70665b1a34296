//! Token records issued by the refresh-token grant.

pub mod record;
pub mod secret;
