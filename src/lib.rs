// ABOUTME: Main library module for the es6-templates interpolation engine
// ABOUTME: Exports the engine facade, template stores, expression evaluator and ambient setup

pub mod config;
pub mod engine;
pub mod expr;
pub mod fs;
pub mod logging;
pub mod template;

// Re-export commonly used types
pub use config::Config;
pub use engine::{Engine, EngineInfo, EngineOptions, InitReport, RenderOptions, METADATA};
pub use expr::{EvalError, Value};
pub use fs::{DirectoryOptions, FileSystem, LocalFileSystem};
pub use template::{HelperRegistry, Locals, PartialStore, RenderError, Renderer, TemplateError};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
