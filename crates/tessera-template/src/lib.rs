//! # Tessera Template
//!
//! A [`TemplateEngine`] backed by [MiniJinja](https://docs.rs/minijinja).
//!
//! Templates come either from a directory, loaded lazily by relative path on
//! first use, or from strings registered with [`JinjaEngine::add_template`].
//!
//! ```
//! use serde_json::json;
//! use tessera_core::TemplateEngine;
//! use tessera_template::JinjaEngine;
//!
//! let engine = JinjaEngine::new();
//! engine.add_template("login.html", "<h1>Hello {{ name }}</h1>").unwrap();
//!
//! let page = engine.render("login.html", &json!({ "name": "Tom" })).unwrap();
//! assert_eq!(page, b"<h1>Hello Tom</h1>");
//! ```

#![doc(html_root_url = "https://docs.rs/tessera-template/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

use std::io;
use std::path::{Path, PathBuf};

use minijinja::{Environment, ErrorKind};
use parking_lot::RwLock;
use tessera_core::{TemplateEngine, TemplateError};
use tracing::debug;

/// MiniJinja-backed template engine.
pub struct JinjaEngine {
    env: RwLock<Environment<'static>>,
    root: Option<PathBuf>,
}

impl Default for JinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl JinjaEngine {
    /// Creates an engine with no templates.
    #[must_use]
    pub fn new() -> Self {
        Self {
            env: RwLock::new(Environment::new()),
            root: None,
        }
    }

    /// Creates an engine that loads templates from `dir`.
    ///
    /// Template names are paths relative to `dir`, e.g. `"login.gohtml"` or
    /// `"admin/index.html"`. Fails if `dir` is not a directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, TemplateError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(TemplateError::Load(io::Error::new(
                io::ErrorKind::NotFound,
                format!("template directory {} does not exist", dir.display()),
            )));
        }

        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir));
        debug!(dir = %dir.display(), "Template engine loading from directory");

        Ok(Self {
            env: RwLock::new(env),
            root: Some(dir.to_path_buf()),
        })
    }

    /// Registers a template from source, replacing any template of that name.
    ///
    /// The source is compiled immediately so syntax errors surface here.
    pub fn add_template(
        &self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<(), TemplateError> {
        let name = name.into();
        self.env
            .write()
            .add_template_owned(name.clone(), source.into())
            .map_err(|err| TemplateError::Render {
                name,
                message: err.to_string(),
            })
    }

    /// The directory templates are loaded from, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

impl TemplateEngine for JinjaEngine {
    fn render(&self, name: &str, data: &serde_json::Value) -> Result<Vec<u8>, TemplateError> {
        let env = self.env.read();
        let template = env.get_template(name).map_err(|err| match err.kind() {
            ErrorKind::TemplateNotFound => TemplateError::NotFound(name.to_owned()),
            _ => TemplateError::Render {
                name: name.to_owned(),
                message: err.to_string(),
            },
        })?;

        template
            .render(data)
            .map(String::into_bytes)
            .map_err(|err| TemplateError::Render {
                name: name.to_owned(),
                message: err.to_string(),
            })
    }
}

impl std::fmt::Debug for JinjaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaEngine")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}
