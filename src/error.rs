//! Error types for trueno-plot operations.
//!
//! Problems visible without data (contradictory facet/pair settings, unusable variable
//! references) surface immediately as [`Error::Configuration`] or
//! [`Error::Binding`]. Anything that only fails once data is involved is
//! raised by the compile step and wrapped in [`Error::Compile`], which records
//! the step and variable that failed.

use std::io;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while specifying, compiling or rendering a plot.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error (file operations, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// PNG encoding error.
    #[error("PNG encoding error: {0}")]
    PngEncoding(#[from] png::EncodingError),

    /// Configuration file could not be parsed.
    #[error("Configuration file error: {0}")]
    Config(#[from] serde_yaml_ng::Error),

    /// Invalid dimensions for framebuffer or figure.
    #[error("Invalid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// A plot variable could not be resolved against its data source.
    #[error("Could not bind variable `{variable}`: {reason}")]
    Binding {
        /// Plot variable being bound (x, y, color, ...).
        variable: String,
        /// What went wrong.
        reason: String,
    },

    /// The plot specification contradicts itself.
    #[error("Invalid plot specification: {0}")]
    Configuration(String),

    /// A data-dependent compilation step failed.
    #[error("{step} failed{}", variable.as_ref().map(|v| format!(" for the `{v}` variable")).unwrap_or_default())]
    Compile {
        /// Name of the compilation step.
        step: String,
        /// Variable being processed, when the step is variable specific.
        variable: Option<String>,
        /// Root cause.
        #[source]
        source: Box<Error>,
    },

    /// A property value or parameter is malformed.
    #[error("Invalid value: {0}")]
    Value(String),

    /// Color parsing error.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Rendering error.
    #[error("Rendering error: {0}")]
    Rendering(String),
}

impl Error {
    /// Shorthand for a [`Error::Value`].
    pub(crate) fn value(msg: impl Into<String>) -> Self {
        Error::Value(msg.into())
    }

    /// Shorthand for a [`Error::Configuration`].
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Build a closure that wraps a root cause with compile-step context.
    ///
    /// ```
    /// use trueno_plot::Error;
    ///
    /// let err = Err::<(), _>(Error::Value("bad".into()))
    ///     .map_err(Error::during("Scale setup", "color"))
    ///     .unwrap_err();
    /// assert_eq!(err.to_string(), "Scale setup failed for the `color` variable");
    /// ```
    pub fn during<'a>(step: &'a str, variable: &'a str) -> impl FnOnce(Error) -> Error + 'a {
        move |source| Error::Compile {
            step: step.to_string(),
            variable: (!variable.is_empty()).then(|| variable.to_string()),
            source: Box::new(source),
        }
    }

    /// The innermost error of a chain of [`Error::Compile`] wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Compile { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
