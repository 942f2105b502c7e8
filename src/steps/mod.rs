//! Step management: template sources and the step registry

pub mod source;
pub mod store;

pub use source::{builtin_template, FsTemplateSource, InMemoryTemplates, TemplateSource};
pub use store::{ConfigFormat, SaveOutcome, StepOverride, StepStore};
