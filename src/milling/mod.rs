//! Height-field milling simulation and program playback.

pub mod animator;
pub mod cutter;
pub mod gcode;
pub mod height_field;
pub mod simulator;
pub mod stock;

pub use animator::{AnimationFailure, AnimationOutcome, AnimationState, AnimationTask, PathAnimator};
pub use cutter::{Cutter, CutterKind};
pub use gcode::{format_coordinate, parse_program, read_program, write_program, MillingCommand, MoveKind};
pub use height_field::{HeightField, HeightFieldStats};
pub use simulator::{Milling, MillingParams};
pub use stock::Stock;
