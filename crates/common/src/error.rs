use std::error::Error as StdError;

use thiserror::Error;

/// Boxed cause kept behind a context message.
pub type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

fn with_cause(source: &Option<BoxedSource>) -> String {
    source
        .as_ref()
        .map(|source| format!(": {source}"))
        .unwrap_or_default()
}

/// Error for msghub crates that have no richer error type of their own.
#[derive(Error, Debug)]
pub enum Error {
    /// A context message, optionally wrapping the error that caused it.
    #[error("{context}{}", with_cause(.source))]
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

// ── Context helpers ─────────────────────────────────────────────────────────

/// Error types that can wrap a context message and an optional cause.
///
/// Crates implement this for their own `Error` and then invoke
/// [`impl_context!`] in their error module to get `.context()` and
/// `.with_context()` on `Result` and `Option`. The cause stays reachable
/// through [`std::error::Error::source`].
pub trait FromContext: Sized {
    fn from_context(context: String, source: Option<BoxedSource>) -> Self;
}

/// Generate a crate-local `Context` trait.
///
/// Invoke inside a module that defines `Error: FromContext` and
/// `type Result<T> = std::result::Result<T, Error>`:
///
/// ```ignore
/// // in crates/foo/src/error.rs
/// msghub_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E> Context<T> for std::result::Result<T, E>
        where
            E: std::error::Error + Send + Sync + 'static,
        {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    <Error as $crate::FromContext>::from_context(
                        f().into(),
                        Some(Box::new(source)),
                    )
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.with_context(|| context)
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromContext>::from_context(f().into(), None))
            }
        }
    };
}
