//! Bounded confirmation loops for asynchronously-provisioned cloud resources.
//!
//! A controller that asks a remote control plane to delete (or create) a
//! resource does not own that resource's state machine: it can only submit
//! the request and poll for the outcome. This crate provides the generic
//! confirmation machinery for that situation:
//!
//! - [`error`] classifies opaque control-plane errors into retry/terminal
//!   categories using swappable code tables.
//! - [`wait`] drives a bounded, cancellable polling loop until a terminal
//!   condition is reached or the wait budget is exhausted.
//! - [`orchestrator`] sequences "submit teardown" → "confirm via polling"
//!   and tears down groups of resources in dependency order.
//!
//! The actual network calls are supplied by the caller as async closures;
//! this crate treats them as opaque collaborators.

pub mod error;
pub mod orchestrator;
pub mod resource;
pub mod wait;

pub use error::{CodeClassifier, ErrorCategory, ErrorClassifier, RemoteError};
pub use orchestrator::{Orchestrator, TeardownReport};
pub use resource::{ResourceKind, ResourceRef};
pub use wait::{CompletionPoller, Goal, LifecycleVerdict, OperationOutcome, WaitBudget};
