//! Auth-domain identifiers, scope sets, claims, tokens, and session records.

pub mod claims;
pub mod id;
pub mod profile;
pub mod scope;
pub mod session;
pub mod token;

pub use claims::*;
pub use id::*;
pub use profile::*;
pub use scope::*;
pub use session::*;
pub use token::{access::*, identity::*, secret::*};
