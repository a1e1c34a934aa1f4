use thiserror::Error;

use crate::operations::intersection::IntersectionStatus;

/// Top-level error type for the surfmill crate.
#[derive(Debug, Error)]
pub enum SurfmillError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Milling(#[from] MillingError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to geometric construction and evaluation.
#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("degenerate geometry: {0}")]
    Degenerate(String),

    #[error("zero-length vector")]
    ZeroVector,

    #[error("object `{0}` is not a parametric surface")]
    NotASurface(String),
}

/// Errors raised by the scene arena.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("surface `{0}` not found")]
    NotFound(String),

    #[error("object id is not part of the scene")]
    UnknownId,

    #[error("name `{0}` is already taken")]
    DuplicateName(String),

    #[error("object `{0}` is still referenced by another object")]
    StillReferenced(String),
}

/// Errors raised while building or walking a segment graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid graph input: {0}")]
    InvalidInput(String),

    #[error("no edge {edge} between vertices {from} and {to}")]
    MissingEdge { edge: usize, from: usize, to: usize },
}

/// Errors raised by the stage path generators.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("expected an intersection between `{first}` and `{second}` ({status})")]
    IntersectionNotFound {
        first: String,
        second: String,
        status: IntersectionStatus,
    },

    #[error("invalid path input: {0}")]
    InvalidInput(String),

    #[error("failed to load silhouette image: {0}")]
    Image(#[from] image::ImageError),
}

/// Reasons a single simulated cutter move is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MillingError {
    #[error("position ({x:.3}, {y:.3}) leaves the milling area (limit x: ±{limit_x:.3}, y: ±{limit_y:.3} around the stock centre)")]
    OutOfMargin {
        x: f64,
        y: f64,
        limit_x: f64,
        limit_y: f64,
    },

    #[error("cutter tip at z = {z:.3} goes below the base thickness {base:.3}")]
    BelowBase { z: f64, base: f64 },

    #[error("non-cutting part of the cutter touches material at ({x:.3}, {y:.3}): material height {height:.3}, cutting edge ends at {limit:.3}")]
    NonCuttingContact {
        x: f64,
        y: f64,
        height: f64,
        limit: f64,
    },

    #[error("flat cutter plunges into material at {angle_deg:.1}° (max {max_deg:.1}°)")]
    ExcessiveAngle { angle_deg: f64, max_deg: f64 },
}

/// Errors raised while reading path files.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: malformed command `{content}`")]
    Malformed { line: usize, content: String },

    #[error("line {line}: invalid number `{value}`")]
    InvalidNumber { line: usize, value: String },

    #[error("unknown cutter designation `{0}`")]
    UnknownCutter(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("cannot write configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for results using [`SurfmillError`].
pub type Result<T> = std::result::Result<T, SurfmillError>;
