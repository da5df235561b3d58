/// Errors raised while parsing addresses or decoding envelopes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid node address: {value:?}")]
    InvalidNode { value: String },

    /// The JSON object carries none of `content`, `event` or `method`.
    #[error("unrecognised envelope: expected one of `content`, `event` or `method`")]
    UnknownEnvelope,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
