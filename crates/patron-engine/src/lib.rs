//! The customer lifecycle engine.
//!
//! Orchestrates create/update/soft-delete/restore/anonymize and sub-record
//! operations against the collaborator traits in [`patron_core::store`],
//! enforcing the governance rules (deleter-or-supervisor restoration, the
//! empty-portfolio anonymization gate) and recording every state change
//! through a decoupled audit worker.
//!
//! The engine is stateless between calls: all durable state lives behind the
//! store traits, so concurrent calls for different customers are fully
//! independent.

mod engine;
mod recorder;
mod records;

pub use engine::Engine;
pub use recorder::AuditRecorder;

#[cfg(test)]
mod tests;
