//! Outward service layer
//!
//! Thin bindings of the orchestration components to the two HTTP surfaces
//! (admin and rag). Transport lives outside this workspace; handlers map
//! [`crate::Error::status_code`] onto responses.

mod admin;
mod rag;

pub use admin::{AdminService, DocumentStatus};
pub use rag::RagService;
