//! Per-key session state shared across connections.
//!
//! A [`SessionRegistry`] maps session keys to [`Context`] values. The map is
//! the only state shared by every connection thread; each context sits behind
//! its own mutex so requests for the same key run one at a time while requests
//! for different keys proceed independently.

mod context;
mod errors;
mod registry;

pub use self::context::Context;
pub use self::errors::SessionError;
pub use self::registry::{SessionRegistry, SharedContext};

const SESSION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::session");
