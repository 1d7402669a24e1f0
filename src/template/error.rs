// ABOUTME: Error types for template loading and rendering
// ABOUTME: Load failures abort initialisation; render failures carry engine and template names

use std::path::PathBuf;
use thiserror::Error;

use crate::expr::EvalError;

/// Identifier reported on every render failure.
pub const ENGINE_NAME: &str = "web-es6-templates";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to scan directory: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Failed to load helper module {path}: {message}")]
    HelperModule { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TemplateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TemplateError::IoError {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn helper_module(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        TemplateError::HelperModule {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Structured failure returned by every render call.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Error rendering template: {template_name}")]
pub struct RenderError {
    pub engine_name: &'static str,
    pub template_name: String,
    #[source]
    pub cause: EvalError,
}

impl RenderError {
    pub fn new(template_name: impl Into<String>, cause: EvalError) -> Self {
        Self {
            engine_name: ENGINE_NAME,
            template_name: template_name.into(),
            cause,
        }
    }
}

pub type Result<T> = std::result::Result<T, TemplateError>;
