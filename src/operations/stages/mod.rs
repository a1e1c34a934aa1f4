//! Toolpath generators for the four machining stages.
//!
//! Every stage starts and ends above the stock at the safe height and can
//! shift its output so the stock centre sits at the origin.

pub mod common;
pub mod stage_four;
pub mod stage_one;
pub mod stage_three;
pub mod stage_two;

pub use common::{join_with_lifts, remove_collinear, translate_back, with_safe_ends, Toolpath};
pub use stage_four::{StageFour, StageFourParams};
pub use stage_one::{StageOne, StageOneParams};
pub use stage_three::{CutDirection, NeighborSpec, PartSpec, StageThree, StageThreeParams};
pub use stage_two::{ContourHint, StageTwo, StageTwoParams};
