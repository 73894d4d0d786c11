//! Token value types: redacted secrets, identity tokens, and cached access tokens.

pub mod access;
pub mod identity;
pub mod secret;
