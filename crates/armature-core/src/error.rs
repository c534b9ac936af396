//! Error types for the condensation engine.

use thiserror::Error;

/// Errors that can occur during condensation.
///
/// Clustering and name generation never fail; fatal paths exist only in
/// configuration validation, transform propagation (under fail-fast
/// mode), and interface resolution. Every variant names the specific
/// part, mate, link, or module implicated.
#[derive(Error, Debug)]
pub enum CondenseError {
    /// Invalid condensation settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Two link-name overrides produce the same final name.
    #[error("link name overrides for {first:?} and {second:?} both produce {name:?}")]
    OverrideCollision {
        /// The colliding override target.
        name: String,
        /// Derived name of the first override source.
        first: String,
        /// Derived name of the second override source.
        second: String,
    },

    /// A part's world transform is missing and fail-fast mode is on.
    #[error("world transform missing for part {part:?}")]
    MissingWorldTransform {
        /// Occurrence id of the part without a transform.
        part: String,
    },

    /// A frame required for re-basing could not be inverted.
    #[error("frame of {frame:?} is singular and cannot be inverted")]
    SingularTransform {
        /// Name of the link or mate whose frame is degenerate.
        frame: String,
    },

    /// An interface mate's endpoint does not resolve to any link.
    #[error("interface mate {mate:?} references part {part:?} which belongs to no link")]
    InterfaceEndpointNotFound {
        /// Name of the interface mate.
        mate: String,
        /// Occurrence id of the unresolved endpoint.
        part: String,
    },

    /// An interface mate has no surviving joint in the link graph.
    #[error("interface mate {mate:?} has no joint in the condensed graph")]
    InterfaceJointNotFound {
        /// Name of the interface mate.
        mate: String,
    },

    /// Failed to parse a TOML settings document.
    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result type for condensation operations.
pub type Result<T> = std::result::Result<T, CondenseError>;
