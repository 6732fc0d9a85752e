pub mod agent;
pub mod archive;
pub mod llm;
pub mod normalizer;
pub mod pipeline;
pub mod validation;

pub use agent::ReportAgent;
pub use archive::{ArchiveWriter, StorageError};
pub use llm::{LlmClient, ReportModel};
pub use pipeline::{PipelineError, ReportPipeline};
