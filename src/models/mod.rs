pub mod document;
pub mod generation;
pub mod loaders;
pub mod request;
pub mod tool;
pub mod unit;

pub use document::{AcceptedOutput, FinalDocument, Strategy, SENTINEL};
pub use generation::{GenerationRequest, Role, RoleSegment};
pub use loaders::{load_all_requests, load_request};
pub use request::{GenerationOptions, StudyRequest};
pub use tool::{OutputBudgets, SectionSpec, Tier, Tool, ToolProfile};
pub use unit::{Segment, Unit};
