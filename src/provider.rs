//! Provider-facing descriptors.
//!
//! `descriptor` exposes validated metadata (`ProviderDescriptor`): the API base URL, the token
//! exchange and access request paths, the refresh endpoint, and the public client settings used
//! by the session guard.

pub mod descriptor;

pub use descriptor::*;
