//! Template rendering boundary.
//!
//! The core only knows the [`TemplateEngine`] trait; concrete engines live in
//! their own crates and are installed on the server.

use thiserror::Error;

/// Renders named templates into response bytes.
pub trait TemplateEngine: Send + Sync + 'static {
    /// Renders template `name` with `data`.
    fn render(&self, name: &str, data: &serde_json::Value) -> Result<Vec<u8>, TemplateError>;
}

/// Template rendering failures.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// `Context::render` was called but no engine is installed.
    #[error("no template engine configured")]
    NoEngine,

    /// The engine has no template with this name.
    #[error("template not found: {0}")]
    NotFound(String),

    /// The render data could not be converted for the engine.
    #[error("invalid template data: {0}")]
    Data(#[from] serde_json::Error),

    /// Loading the template source failed.
    #[error("failed to load templates: {0}")]
    Load(#[from] std::io::Error),

    /// The engine failed while rendering.
    #[error("failed to render template {name}: {message}")]
    Render {
        /// Template name.
        name: String,
        /// Engine-specific message.
        message: String,
    },
}
