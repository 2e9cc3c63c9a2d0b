use thiserror::Error;

/// Failures surfaced by the bridge. Every engine call failure maps to exactly
/// one variant; nothing is retried here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BridgeError {
    /// `StartRendergirl` returned a nonzero code. The log system has already
    /// been torn down when this is returned.
    #[error("engine failed to start (code {code})")]
    EngineStartup { code: i32 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// `AddSceneGroup` rejected the named object.
    #[error("error adding object {object} to the engine (code {code})")]
    Submission { object: String, code: i32 },

    /// `Render` returned its failure sentinel. Submitted geometry is still
    /// resident in the engine until the scene is cleared.
    #[error("error rendering frame, please check the logs")]
    Render,

    /// The native engine cannot be reached at all.
    #[error("native engine unavailable: {0}")]
    EngineFatal(String),

    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("a render session is already active")]
    SessionActive,
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
