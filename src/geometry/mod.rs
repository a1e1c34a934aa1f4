pub mod surface;

pub use surface::{
    BSplineSurface, BezierSurface, NormalMode, OffsetSurface, Plane, Surface, SurfaceDomain,
    Torus,
};
