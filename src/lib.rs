pub mod creator;
pub mod error;
pub mod options;
pub mod pipeline;
pub mod plan;
pub mod wasm;

pub use creator::{compile, create_plan, create_plan_with};
pub use error::CompilerError;
pub use options::PlanOptions;
