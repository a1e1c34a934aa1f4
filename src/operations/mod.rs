pub mod contour;
pub mod intersection;
pub mod segment_graph;
pub mod stages;
