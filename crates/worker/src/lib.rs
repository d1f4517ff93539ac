//! Execution plumbing shared by live code documents.
//!
//! * [`GenerationClock`] / [`SessionToken`]: per-session identity and
//!   cooperative cancellation.
//! * [`DeferredQueue`]: FIFO of work postponed to the next host turn.
//! * [`spawn_named_thread`]: dedicated threads for interpreter hosts.

mod queue;
mod spawn;
mod token;

pub use queue::{DeferredItem, DeferredQueue, WorkScope};
pub use spawn::spawn_named_thread;
pub use token::{GenerationClock, SessionToken};
