// Typed errors with thiserror. Surface meaningful messages to JS.
// Configuration problems are fatal at startup; load failures are recovered by the navigator.

use thiserror::Error;

/// Tour error types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TourError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Tour has no scenes")]
    EmptyRegistry,

    #[error("Scene not found: {0}")]
    SceneNotFound(String),

    #[error("Marker {marker} in scene {scene} targets unknown scene {target}")]
    DanglingTarget {
        scene: String,
        marker: String,
        target: String,
    },

    #[error("Marker id {marker} is declared in both {first_scene} and {second_scene}")]
    DuplicateMarkerId {
        marker: String,
        first_scene: String,
        second_scene: String,
    },

    #[error("Marker {marker} has an invalid position: {message}")]
    InvalidPosition { marker: String, message: String },

    #[error("Menu item {item} is invalid: {message}")]
    InvalidMenuItem { item: String, message: String },

    #[error("Panorama {panorama} failed to load: {message}")]
    PanoramaLoad { panorama: String, message: String },

    #[error("Panorama {panorama} did not load within {timeout_ms}ms")]
    LoadTimeout { panorama: String, timeout_ms: u64 },

    #[error("Cannot enter scene {0} while another transition is in flight")]
    TransitionInFlight(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TourError {
    fn from(err: serde_json::Error) -> Self {
        TourError::Serialization(err.to_string())
    }
}
