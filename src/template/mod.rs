// ABOUTME: Template module for the interpolation engine
// ABOUTME: Provides helper registry, partial store, render context and renderer

pub mod context;
pub mod error;
pub mod helpers;
pub mod partials;
pub mod registry;
pub mod renderer;

pub use context::{build_context, EvaluationContext, Locals};
pub use error::{RenderError, Result, TemplateError, ENGINE_NAME};
pub use partials::{partial_name, PartialStore};
pub use registry::{HelperRegistry, HELPER_EXTENSIONS};
pub use renderer::Renderer;
