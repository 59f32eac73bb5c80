//! Domain layer containing business entities and storage contracts.
//!
//! The domain layer has no dependencies on infrastructure or presentation
//! layers. Storage traits are implemented by `crate::infrastructure`; business
//! rules live in [`crate::application::services`].
//!
//! # Architecture
//!
//! - [`entities`] - Identity, tinylink and refresh credential types
//! - [`repositories`] - Storage trait definitions
//! - [`visit_event`] - Usage accounting event model
//! - [`visit_worker`] - Asynchronous usage accounting worker
//!
//! # Visit Processing Flow
//!
//! 1. A redirect resolves from the authoritative store
//! 2. A [`visit_event::VisitEvent`] is offered to a bounded channel
//! 3. [`visit_worker::run_visit_worker`] applies it with retry
//! 4. The counter is persisted via [`repositories::LinkStore::record_visit`]

pub mod entities;
pub mod repositories;
pub mod visit_event;
pub mod visit_worker;
