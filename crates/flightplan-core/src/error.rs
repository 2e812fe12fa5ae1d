//! Error taxonomy for flight plan generation.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FlightPlanError>;

/// Every failure that aborts a planning run.
///
/// Degraded terrain samples are not errors; they are reported per waypoint
/// through [`crate::models::TerrainStatus`].
#[derive(Debug, Error)]
pub enum FlightPlanError {
    /// Bad overlap/agl/gsd/interval values. Raised before any geometry work.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Degenerate or self-intersecting AOI / no-fly polygon.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Nothing left to fly after clipping.
    #[error("empty flight path: {0}")]
    EmptyPath(String),

    /// The terrain raster could not be opened or decoded.
    #[error("terrain source error: {0}")]
    Terrain(String),

    /// Unset altitude or unwritable mission output.
    #[error("mission encoding failed: {0}")]
    Encoding(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FlightPlanError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        Self::InvalidGeometry(message.into())
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding(message.into())
    }
}
