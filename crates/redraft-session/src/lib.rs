// redraft-session: streams proposed rewrites into live documents as reviewable hunks.

pub mod config;
pub mod error;
pub mod registry;
pub mod session;


pub use config::RegistryConfig;
pub use error::PatchError;
pub use registry::{SessionEvent, SessionRegistry, TickOutcome};
pub use session::{DiffSession, SessionState, StreamOptions, StreamPoll};
