// Core error types shared by the array codec, the space codec and the training glue.

/// Errors across the space codec and the behaviour-cloning glue.
#[derive(thiserror::Error, Debug)]
pub enum SpaceError {
    /// A space variant outside the closed wire set, or an empty/unknown wire tag.
    #[error("[{0}] is not a supported space type")]
    UnsupportedSpaceType(String),
    #[error("Unsupported array dtype: {0}")]
    UnsupportedDtype(String),
    #[error("Array payload holds {found} elements but shape {shape:?} requires {expected}")]
    PayloadLength {
        shape: Vec<usize>,
        expected: usize,
        found: usize,
    },
    #[error("Raw array payload of {len} bytes is not a multiple of the {width}-byte element width")]
    RawPayloadAlignment { len: usize, width: usize },
    #[error("Box bounds mismatch: {0}")]
    BoundsMismatch(String),
    #[error("Invalid space: {0}")]
    InvalidSpace(String),
    #[error("Duplicate dict key: {0}")]
    DuplicateKey(String),
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Model not found: {name} (iteration {iteration})")]
    ModelNotFound { name: String, iteration: i64 },
    #[error("Model registry error: {0}")]
    Registry(String),
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results using SpaceError.
pub type Result<T> = std::result::Result<T, SpaceError>;
