// ABOUTME: Renderer that turns a template body and locals into a resolved string
// ABOUTME: Substitutes partials, builds the context, compiles and evaluates the body

use tracing::{debug, warn};

use super::context::{build_context, Locals};
use super::error::RenderError;
use super::partials::PartialStore;
use super::registry::HelperRegistry;
use crate::expr::{CompiledTemplate, EvalError};

/// Borrowed view over the helper registry and partial store.
///
/// Rendering never mutates either, so any number of renders may share them.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    helpers: &'a HelperRegistry,
    partials: &'a PartialStore,
}

impl<'a> Renderer<'a> {
    pub fn new(helpers: &'a HelperRegistry, partials: &'a PartialStore) -> Self {
        Self { helpers, partials }
    }

    /// Render `body` as the template called `template_name`.
    pub fn render(
        &self,
        template_name: &str,
        body: &str,
        locals: &Locals,
    ) -> Result<String, RenderError> {
        let source = self.partials.substitute(body);
        self.render_source(template_name, &source, locals)
    }

    /// Render text whose partials have already been substituted.
    pub(crate) fn render_source(
        &self,
        template_name: &str,
        source: &str,
        locals: &Locals,
    ) -> Result<String, RenderError> {
        let context = build_context(self.helpers, locals);

        let result = CompiledTemplate::compile(source).and_then(|compiled| {
            debug!(
                "Compiled template '{}' with {} placeholders against {} bindings",
                template_name,
                compiled.placeholder_count(),
                context.len()
            );
            compiled.render(&context)
        });

        result.map_err(|cause| {
            warn!("Failed to render template '{}': {}", template_name, cause);
            RenderError::new(template_name, cause)
        })
    }

    /// Apply partial substitution only.
    pub fn substitute_partials(&self, body: &str) -> String {
        self.partials.substitute(body)
    }

    /// Check template syntax without rendering.
    pub fn validate_template(&self, body: &str) -> Result<(), EvalError> {
        CompiledTemplate::compile(&self.partials.substitute(body)).map(|_| ())
    }

    /// Whether a string contains any `${...}` placeholder.
    pub fn has_templates(&self, text: &str) -> bool {
        text.find("${")
            .is_some_and(|start| text[start + 2..].contains('}'))
    }
}
