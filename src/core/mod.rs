//! Core domain models
//!
//! Steps, their templates and dependencies, model responses and the
//! configuration files that define the default step set.

pub mod config;
pub mod dependency;
pub mod response;
pub mod results;
pub mod state;
pub mod step;
pub mod template;

pub use dependency::{detect_dependencies, has_cycles, refresh_dependencies, DependencyGraph};
pub use response::{parse_response, ParsedResponse};
pub use results::StepResults;
pub use state::RunState;
pub use step::{Step, StepContent};
pub use template::StepTemplate;
