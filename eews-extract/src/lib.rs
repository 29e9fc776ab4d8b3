//! eews-extract library interface
//!
//! Few-shot annotation of earthquake-alert screenshots with a multimodal
//! generative model. Exposed as a library for integration testing.

pub mod extractor;
pub mod model;
pub mod prompt;
pub mod response;
pub mod vertex;

pub use extractor::{ExtractionReport, Extractor};
pub use model::{AnnotationModel, AnnotationRequest, ModelError, PromptPart};
