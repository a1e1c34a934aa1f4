use std::collections::HashSet;

use crate::geometry::surface::{BSplineSurface, BezierSurface, Plane, Surface, Torus};
use crate::math::Point3;

slotmap::new_key_type! {
    /// Unique identifier for an object in the scene arena.
    pub struct ObjectId;
}

/// Kind tag of a scene object, used for default naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Point,
    Bezier,
    BSpline,
    Torus,
    Plane,
}

impl ObjectKind {
    /// Human readable prefix of default names.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Point => "Point",
            Self::Bezier => "BezierSurface",
            Self::BSpline => "BSplineSurface",
            Self::Torus => "Torus",
            Self::Plane => "Plane",
        }
    }
}

/// Geometry carried by a scene object.
#[derive(Debug, Clone)]
pub enum Geometry {
    Point(Point3),
    Bezier(BezierSurface),
    BSpline(BSplineSurface),
    Torus(Torus),
    Plane(Plane),
}

impl Geometry {
    /// Kind tag of this geometry.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Point(_) => ObjectKind::Point,
            Self::Bezier(_) => ObjectKind::Bezier,
            Self::BSpline(_) => ObjectKind::BSpline,
            Self::Torus(_) => ObjectKind::Torus,
            Self::Plane(_) => ObjectKind::Plane,
        }
    }

    /// The parametric-surface capability, if this geometry has one.
    #[must_use]
    pub fn as_surface(&self) -> Option<&dyn Surface> {
        match self {
            Self::Point(_) => None,
            Self::Bezier(s) => Some(s),
            Self::BSpline(s) => Some(s),
            Self::Torus(s) => Some(s),
            Self::Plane(s) => Some(s),
        }
    }
}

/// An object stored in the [`Scene`](super::Scene) arena.
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Unique name, used by the stage generators to look up parts.
    pub name: String,
    /// Stable serial number.
    pub serial: u32,
    /// The object's geometry.
    pub geometry: Geometry,
    pub(crate) parents: HashSet<ObjectId>,
}

impl SceneObject {
    /// Objects that reference this one.
    pub fn parents(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.parents.iter().copied()
    }

    /// Returns `true` if some other object still references this one.
    #[must_use]
    pub fn is_referenced(&self) -> bool {
        !self.parents.is_empty()
    }

    /// Shorthand for [`Geometry::as_surface`].
    #[must_use]
    pub fn as_surface(&self) -> Option<&dyn Surface> {
        self.geometry.as_surface()
    }
}
