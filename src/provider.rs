//! Provider-facing configuration (descriptor) and resource URL helpers.
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`) covering the token endpoint,
//! the API base every resource path is joined onto, the client authentication method used for
//! refreshes, and the request budget. `resource` names the documented date-scoped endpoints.

pub mod descriptor;
pub mod resource;

pub use descriptor::*;
pub use resource::*;
