use thiserror::Error;

use super::modules::error::ModuleError;

/// Fatal errors of the status line engine.
///
/// Every variant terminates the process: there is no partial restart of a
/// single module and no recovery from a lost output stream.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Two activated modules share a name.
    #[error("Module '{0}' is activated more than once")]
    DuplicateModule(String),

    /// No modules were activated.
    #[error("No modules specified. Available modules: {0}")]
    NoModules(String),

    /// A module could not be constructed or its producer hit a structural failure.
    #[error("Module '{name}' failed: {source}")]
    Module {
        name: String,
        #[source]
        source: ModuleError,
    },

    /// A module task panicked or was cancelled.
    #[error("Module task '{name}' aborted: {reason}")]
    ModuleAborted { name: String, reason: String },

    /// Writing or flushing the status stream failed.
    #[error("Failed to write status output: {0}")]
    Output(#[from] std::io::Error),

    /// Frame serialization failed.
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),

    /// Every update signal was dropped while the aggregator was waiting.
    #[error("Update signal channel closed")]
    SignalClosed,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
