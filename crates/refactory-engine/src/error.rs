//! Error types for the engine binary.

/// Top-level error for the engine binary.
///
/// Each variant wraps a subsystem error so `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: refactory_core::config::ConfigError,
    },

    /// The session could not be built.
    #[error("session error: {source}")]
    Session {
        /// The underlying tick error.
        #[from]
        source: refactory_core::tick::TickError,
    },

    /// The run loop failed.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: refactory_core::runner::RunnerError,
    },

    /// The starter script file could not be read.
    #[error("failed to read starter script {path}: {source}")]
    StarterScript {
        /// The configured path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
