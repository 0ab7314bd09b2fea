use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// A band definition is malformed (inverted range, blank or duplicate name).
    #[error("Bande invalide « {name} » : {reason}")]
    InvalidBand {
        /// Name of the offending band, as written in the config.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },
}
