//! Credential state, token records, and redacting secret wrappers.

pub mod credentials;
pub mod token;

pub use credentials::*;
pub use token::{record::*, secret::*};
