use std::path::PathBuf;

use msghub_common::{BoxedSource, FromContext};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported config format: .{extension}")]
    UnsupportedFormat { extension: String },

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl FromContext for Error {
    fn from_context(context: String, source: Option<BoxedSource>) -> Self {
        Self::Context { context, source }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

msghub_common::impl_context!();
