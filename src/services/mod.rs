pub mod chunker;
pub mod extractor;
pub mod fallback_writer;
pub mod joiner;
pub mod labeler;
pub mod llm_service;
pub mod prompt_builder;
pub mod quality_gate;
pub mod usage_store;

pub use chunker::Chunker;
pub use extractor::{PdfTextExtractor, PlainTextExtractor, TextExtractor};
pub use fallback_writer::FallbackWriter;
pub use joiner::join;
pub use labeler::label;
pub use llm_service::LlmService;
pub use prompt_builder::PromptBuilder;
pub use quality_gate::{GateReport, QualityGate};
pub use usage_store::{InMemoryUsageStore, UsageStore};
