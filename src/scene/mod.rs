//! Object arena holding the scene geometry the path generators work on.

pub mod names;
pub mod object;

pub use names::NameAllocator;
pub use object::{Geometry, ObjectId, ObjectKind, SceneObject};

use std::collections::HashSet;

use slotmap::SlotMap;
use tracing::debug;

use crate::error::{GeometryError, Result, SceneError};
use crate::geometry::surface::{OffsetSurface, Surface};

/// Arena that owns every scene object.
///
/// Objects reference each other via [`ObjectId`]s. A child records the ids
/// of the objects that use it (for example the control points of a patch
/// record the patch); it can only be removed once that set is empty.
#[derive(Debug, Default)]
pub struct Scene {
    objects: SlotMap<ObjectId, SceneObject>,
    names: NameAllocator,
}

impl Scene {
    /// Creates an empty scene with fresh name counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scene drawing names from `names`.
    #[must_use]
    pub fn with_allocator(names: NameAllocator) -> Self {
        Self {
            objects: SlotMap::with_key(),
            names,
        }
    }

    /// Inserts an object under a default name and returns its id.
    pub fn add(&mut self, geometry: Geometry) -> ObjectId {
        let mut name = self.names.next_name(geometry.kind());
        while self.find(&name).is_some() {
            name = self.names.next_name(geometry.kind());
        }
        self.insert(name, geometry)
    }

    /// Inserts an object under an explicit name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is already in use.
    pub fn add_named(&mut self, name: impl Into<String>, geometry: Geometry) -> Result<ObjectId> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(SceneError::DuplicateName(name).into());
        }
        Ok(self.insert(name, geometry))
    }

    fn insert(&mut self, name: String, geometry: Geometry) -> ObjectId {
        let serial = self.names.next_serial();
        debug!(%name, serial, "scene object added");
        self.objects.insert(SceneObject {
            name,
            serial,
            geometry,
            parents: HashSet::new(),
        })
    }

    /// Number of objects in the scene.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Returns `true` if the scene holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns the object with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is not part of the scene.
    pub fn get(&self, id: ObjectId) -> Result<&SceneObject> {
        self.objects.get(id).ok_or_else(|| SceneError::UnknownId.into())
    }

    /// Looks up an object id by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find_map(|(id, obj)| (obj.name == name).then_some(id))
    }

    /// Iterates over all objects in insertion-independent arena order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects.iter()
    }

    /// All objects with the surface capability, with their names.
    pub fn surfaces(&self) -> impl Iterator<Item = (&str, &dyn Surface)> {
        self.objects
            .values()
            .filter_map(|obj| obj.as_surface().map(|s| (obj.name.as_str(), s)))
    }

    /// The surface capability of the object with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is unknown or the object is not a surface.
    pub fn surface(&self, id: ObjectId) -> Result<&dyn Surface> {
        let obj = self.get(id)?;
        obj.as_surface()
            .ok_or_else(|| GeometryError::NotASurface(obj.name.clone()).into())
    }

    /// The surface with the given name.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::NotFound`] if no object has that name, or
    /// [`GeometryError::NotASurface`] if it is not a surface.
    pub fn surface_by_name(&self, name: &str) -> Result<&dyn Surface> {
        let id = self
            .find(name)
            .ok_or_else(|| SceneError::NotFound(name.to_owned()))?;
        self.surface(id)
    }

    /// Wraps the object with the given id into an [`OffsetSurface`].
    ///
    /// # Errors
    ///
    /// Returns an error if the object lacks the surface capability.
    pub fn offset_surface(&self, id: ObjectId, radius: f64) -> Result<OffsetSurface<'_>> {
        Ok(OffsetSurface::new(self.surface(id)?, radius))
    }

    /// Records that `parent` references `child`.
    ///
    /// # Errors
    ///
    /// Returns an error if either id is unknown.
    pub fn link(&mut self, parent: ObjectId, child: ObjectId) -> Result<()> {
        self.get(parent)?;
        let child = self.objects.get_mut(child).ok_or(SceneError::UnknownId)?;
        child.parents.insert(parent);
        Ok(())
    }

    /// Drops the reference from `parent` to `child`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if `child` is unknown.
    pub fn unlink(&mut self, parent: ObjectId, child: ObjectId) -> Result<()> {
        let child = self.objects.get_mut(child).ok_or(SceneError::UnknownId)?;
        child.parents.remove(&parent);
        Ok(())
    }

    /// Removes an object that nothing references any more.
    ///
    /// References held by the removed object are released.
    ///
    /// # Errors
    ///
    /// Returns [`SceneError::StillReferenced`] if some object still uses it.
    pub fn remove(&mut self, id: ObjectId) -> Result<SceneObject> {
        let obj = self.get(id)?;
        if obj.is_referenced() {
            return Err(SceneError::StillReferenced(obj.name.clone()).into());
        }
        let removed = self.objects.remove(id).ok_or(SceneError::UnknownId)?;
        for other in self.objects.values_mut() {
            other.parents.remove(&id);
        }
        debug!(name = %removed.name, "scene object removed");
        Ok(removed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::SurfmillError;
    use crate::geometry::surface::BezierSurface;
    use crate::math::{Point3, Vector3};
    use crate::geometry::surface::Torus;

    fn torus() -> Geometry {
        Geometry::Torus(Torus::new(Point3::origin(), 2.0, 0.5, Vector3::z(), Vector3::x()).unwrap())
    }

    #[test]
    fn default_names_and_lookup() {
        let mut scene = Scene::new();
        let a = scene.add(torus());
        let b = scene.add(torus());
        assert_eq!(scene.get(a).unwrap().name, "Torus 1");
        assert_eq!(scene.get(b).unwrap().name, "Torus 2");
        assert_eq!(scene.find("Torus 2"), Some(b));
        assert!(scene.surface_by_name("Torus 1").is_ok());
    }

    #[test]
    fn missing_surface_is_reported() {
        let scene = Scene::new();
        let err = scene.surface_by_name("body").err().unwrap();
        assert!(matches!(err, SurfmillError::Scene(SceneError::NotFound(ref n)) if n == "body"));
    }

    #[test]
    fn point_is_not_a_surface() {
        let mut scene = Scene::new();
        let p = scene.add(Geometry::Point(Point3::origin()));
        let err = scene.offset_surface(p, 1.0).err().unwrap();
        assert!(matches!(err, SurfmillError::Geometry(GeometryError::NotASurface(_))));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut scene = Scene::new();
        scene.add_named("body", torus()).unwrap();
        assert!(scene.add_named("body", torus()).is_err());
        // A default name skips over a user name that collides with it.
        scene.add_named("Torus 1", torus()).unwrap();
        let id = scene.add(torus());
        assert_eq!(scene.get(id).unwrap().name, "Torus 2");
    }

    #[test]
    fn referenced_objects_cannot_be_removed() {
        let mut scene = Scene::new();
        let patch = scene.add(Geometry::Bezier(
            BezierSurface::flat(Point3::origin(), 1.0, 1.0, 1, 1).unwrap(),
        ));
        let point = scene.add(Geometry::Point(Point3::origin()));
        scene.link(patch, point).unwrap();
        assert!(scene.remove(point).is_err());
        scene.remove(patch).unwrap();
        assert!(!scene.get(point).unwrap().is_referenced());
        scene.remove(point).unwrap();
        assert!(scene.is_empty());
    }

    #[test]
    fn injected_allocator_continues_counting() {
        let mut names = NameAllocator::new();
        names.next_name(ObjectKind::Torus);
        let mut scene = Scene::with_allocator(names);
        let id = scene.add(torus());
        assert_eq!(scene.get(id).unwrap().name, "Torus 2");
    }
}
