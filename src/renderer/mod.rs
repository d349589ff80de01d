//! Template rendering for the `template` tag.

pub mod engine;

use std::collections::HashMap;

use crate::error::Result;

pub use engine::HandlebarsRenderer;

/// Trait for template rendering engines.
pub trait TemplateRenderer {
    /// Renders a template string with the given partials and data.
    ///
    /// # Arguments
    /// * `template` - Template string to render
    /// * `partials` - Raw partial texts available for inclusion
    /// * `data` - Projected context variables
    ///
    /// # Returns
    /// * `Result<String>` - Rendered text. A `RenderError` message starts with
    ///   `line N: ` when the failure has a position inside `template`.
    fn render(
        &self,
        template: &str,
        partials: &HashMap<String, String>,
        data: &serde_json::Value,
    ) -> Result<String>;
}
