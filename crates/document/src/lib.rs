//! Observable live code documents.
//!
//! A [`Document`] is the single mutable record behind one editable, runnable
//! code block. It tracks edits and versions, drives cancellable execution
//! sessions against an external [`Interpreter`], collects the session's log
//! stream, and notifies field subscribers after every atomic action.
//!
//! Documents are created through a [`DocumentRegistry`], which guarantees one
//! live instance per identifier and owns the state documents share: bootstrap
//! configuration, interpreter handle, deferred invocation queue and
//! user-facing notifications.
//!
//! ```ignore
//! let registry = DocumentRegistry::new(config, interpreter);
//! let doc = registry.get_or_create(init)?;
//! let _sub = doc.subscribe(move || redraw(), Field::Logs);
//! doc.exec_script()?;
//! registry.pump();
//! ```

mod bridge;
mod document;
mod error;
mod field;
mod interpreter;
mod log;
mod model;
mod notifications;
mod registry;
mod subscription;
#[cfg(test)]
mod test_support;

pub use bridge::FieldBridge;
pub use document::execution::INTERPRETER_UNAVAILABLE_MESSAGE;
pub use document::{Document, DocumentMut};
pub use error::{ConstructionError, ExecError};
pub use field::{Field, FieldValue};
pub use interpreter::thread::{ENGINE_PANIC_MESSAGE, THREAD_GONE_MESSAGE};
pub use interpreter::{Delivery, Interpreter, InterpreterThread, Invocation, LogSink, RUNNER_MODULE, ScriptEngine};
pub use livecode_config::{BootstrapConfig, RoutingMode};
pub use livecode_primitives::{CodeId, DocumentId, Origin};
pub use livecode_worker::SessionToken;
pub use log::{CANVAS_OUTPUT_TAG, GraphicsOutput, LogKind, LogMessage, TURTLE_OUTPUT_TAG};
pub use model::{DocumentProps, InitState, SaveOutcome, Status, StoredScript, Version};
pub use notifications::{Level, Notification};
pub use registry::{DocumentRegistry, PumpReport};
pub use subscription::Subscription;
