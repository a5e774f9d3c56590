//! Prompted model flows.
//!
//! A flow owns its typed input, the prompt it builds, and how the model's
//! reply becomes a typed output.

pub mod product_description;
pub mod transcription;

use serde::Serialize;

pub use product_description::{ProductDescriptionFlow, ProductDescriptionInput};
pub use transcription::{TranscriptionFlow, TranscriptionInput};

/// Registry entry exposed for local inspection.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FlowDescriptor {
    pub name: &'static str,
    pub model: String,
}
