//! Serialized admission of mutating requests

pub mod classifier;
pub mod controller;
pub mod lock;
pub mod queue;
pub mod ticket;

#[cfg(test)]
mod tests;

pub use classifier::{RequestClass, RequestClassifier, operation_of};
pub use controller::{AdmissionGate, GateError, GateStats};
pub use lock::{AdmissionLock, AdmissionPermit};
pub use queue::AdmissionQueue;
pub use ticket::{RunOutcome, Ticket};
