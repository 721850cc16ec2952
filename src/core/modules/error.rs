use thiserror::Error;

/// Error type for module producers.
///
/// Transient variants (`FileRead`, `ParseError`, `CommandFailed`, ...) are
/// normally logged by the producer and retried on its own schedule. When a
/// producer returns one from `Module::run` or a factory returns one at
/// startup, it is treated as a structural failure and ends the process.
#[derive(Error, Debug)]
pub enum ModuleError {
    /// Failed to read a file from disk.
    #[error("Failed to read file {path}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Encountered a parsing error while extracting a value.
    #[error("Failed to parse {metric} from {location}: {reason}")]
    ParseError {
        metric: String,
        location: String,
        reason: String,
    },

    /// Data was found but did not conform to the expected format.
    #[error("Invalid format in {location}: {reason}")]
    InvalidFormat { location: String, reason: String },

    /// A low-level system call failed.
    #[error("System call failed: {syscall} - {reason}")]
    SystemCall { syscall: String, reason: String },

    /// A required file or directory does not exist.
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    /// A command could not be started or its output could not be read.
    #[error("Command '{command}' failed: {source}")]
    CommandExecution {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A command ran but exited unsuccessfully or produced no usable output.
    #[error("Command '{command}' failed: {reason}")]
    CommandFailed { command: String, reason: String },

    /// Filesystem notification setup or delivery failed.
    #[error("Watch on {path} failed: {source}")]
    Watch {
        path: String,
        #[source]
        source: notify::Error,
    },

    /// A module option is missing or invalid.
    #[error("Invalid configuration for module '{module}': {reason}")]
    InvalidConfig { module: String, reason: String },

    /// No module with this name is registered in the catalog.
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    /// The module cannot run on this platform.
    #[error("Unsupported module: {0}")]
    UnsupportedModule(String),
}
