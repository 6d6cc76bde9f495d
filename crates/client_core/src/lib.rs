//! Reactive core of the task tracker client.
//!
//! A single router ([`update::update`]) owns all state and turns messages
//! into effects; [`program::Program`] feeds it and hands the effects to a
//! backend worker that talks to the server.

pub mod api;
pub mod bridge;
pub mod debounce;
pub mod drag;
pub mod effect;
pub mod error;
pub mod fanout;
pub mod guard;
pub mod message;
pub mod preferences;
pub mod program;
pub mod remote;
pub mod session;
pub mod state;
pub mod update;

pub use api::{HttpTrackerApi, TrackerApi};
pub use bridge::{ClipboardWriter, ContainerGeometry, EffectRunner, FixedGeometry, MemoryClipboard};
pub use effect::Effect;
pub use error::{Failure, ValidationError};
pub use message::{Msg, TaskScope, TaskTransition};
pub use program::Program;
pub use remote::Remote;
pub use state::AppState;
pub use update::update;

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
