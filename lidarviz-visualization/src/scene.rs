//! The set of objects drawn every frame

use std::sync::Arc;

use crate::cloud::{Cloud, CloudFrame};
use crate::cuboid::{Cuboid, CuboidFrame};
use crate::image::{Image, ImageFrame};
use crate::label::{Label, LabelFrame};

/// A shared reference to any drawable object
///
/// Objects are compared by identity: two handles are the same scene object
/// when they point at the same allocation.
#[derive(Debug, Clone)]
pub enum SceneObject {
    Cloud(Arc<Cloud>),
    Image(Arc<Image>),
    Cuboid(Arc<Cuboid>),
    Label(Arc<Label>),
}

impl SceneObject {
    pub fn same_object(&self, other: &SceneObject) -> bool {
        match (self, other) {
            (SceneObject::Cloud(a), SceneObject::Cloud(b)) => Arc::ptr_eq(a, b),
            (SceneObject::Image(a), SceneObject::Image(b)) => Arc::ptr_eq(a, b),
            (SceneObject::Cuboid(a), SceneObject::Cuboid(b)) => Arc::ptr_eq(a, b),
            (SceneObject::Label(a), SceneObject::Label(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SceneObject::Cloud(_) => "cloud",
            SceneObject::Image(_) => "image",
            SceneObject::Cuboid(_) => "cuboid",
            SceneObject::Label(_) => "label",
        }
    }
}

impl From<Arc<Cloud>> for SceneObject {
    fn from(cloud: Arc<Cloud>) -> Self {
        SceneObject::Cloud(cloud)
    }
}

impl From<&Arc<Cloud>> for SceneObject {
    fn from(cloud: &Arc<Cloud>) -> Self {
        SceneObject::Cloud(Arc::clone(cloud))
    }
}

impl From<Arc<Image>> for SceneObject {
    fn from(image: Arc<Image>) -> Self {
        SceneObject::Image(image)
    }
}

impl From<&Arc<Image>> for SceneObject {
    fn from(image: &Arc<Image>) -> Self {
        SceneObject::Image(Arc::clone(image))
    }
}

impl From<Arc<Cuboid>> for SceneObject {
    fn from(cuboid: Arc<Cuboid>) -> Self {
        SceneObject::Cuboid(cuboid)
    }
}

impl From<&Arc<Cuboid>> for SceneObject {
    fn from(cuboid: &Arc<Cuboid>) -> Self {
        SceneObject::Cuboid(Arc::clone(cuboid))
    }
}

impl From<Arc<Label>> for SceneObject {
    fn from(label: Arc<Label>) -> Self {
        SceneObject::Label(label)
    }
}

impl From<&Arc<Label>> for SceneObject {
    fn from(label: &Arc<Label>) -> Self {
        SceneObject::Label(Arc::clone(label))
    }
}

/// Objects currently in the render set, in insertion order
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; returns false if it was already present
    pub fn add(&mut self, object: impl Into<SceneObject>) -> bool {
        let object = object.into();
        if self.contains(&object) {
            return false;
        }
        self.objects.push(object);
        true
    }

    /// Remove an object; returns false if it was not present
    pub fn remove(&mut self, object: impl Into<SceneObject>) -> bool {
        let object = object.into();
        let before = self.objects.len();
        self.objects.retain(|o| !o.same_object(&object));
        self.objects.len() != before
    }

    pub fn contains(&self, object: &SceneObject) -> bool {
        self.objects.iter().any(|o| o.same_object(object))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn objects(&self) -> &[SceneObject] {
        &self.objects
    }

    /// Capture the current state of every object
    pub fn snapshot(&self) -> SceneSnapshot {
        let mut snapshot = SceneSnapshot::default();
        for object in &self.objects {
            match object {
                SceneObject::Cloud(c) => snapshot.clouds.push(c.snapshot()),
                SceneObject::Image(i) => snapshot.images.push(i.snapshot()),
                SceneObject::Cuboid(c) => snapshot.cuboids.push(c.snapshot()),
                SceneObject::Label(l) => snapshot.labels.push(l.snapshot()),
            }
        }
        snapshot
    }
}

/// Frame-ready copies of every object in a scene
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub clouds: Vec<CloudFrame>,
    pub images: Vec<ImageFrame>,
    pub cuboids: Vec<CuboidFrame>,
    pub labels: Vec<LabelFrame>,
}

impl SceneSnapshot {
    /// Number of objects captured
    pub fn len(&self) -> usize {
        self.clouds.len() + self.images.len() + self.cuboids.len() + self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lidarviz_core::Pose;

    #[test]
    fn test_add_is_idempotent() {
        let mut scene = Scene::new();
        let cuboid = Arc::new(Cuboid::new(Pose::identity(), &[1.0]).unwrap());
        assert!(scene.add(&cuboid));
        assert!(!scene.add(&cuboid));
        assert_eq!(scene.len(), 1);

        assert!(scene.remove(&cuboid));
        assert!(scene.is_empty());
        assert!(!scene.remove(&cuboid));
    }

    #[test]
    fn test_identity_not_equality() {
        let mut scene = Scene::new();
        let a = Arc::new(Label::new_3d("same", 0.0, 0.0, 0.0));
        let b = Arc::new(Label::new_3d("same", 0.0, 0.0, 0.0));
        assert!(scene.add(&a));
        assert!(scene.add(&b));
        assert!(!scene.remove(Arc::new(Label::new_3d("same", 0.0, 0.0, 0.0))));
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn test_scene_keeps_object_alive() {
        let mut scene = Scene::new();
        let cloud = Arc::new(Cloud::new(8).unwrap());
        let weak = Arc::downgrade(&cloud);
        scene.add(cloud);
        assert!(weak.upgrade().is_some());

        let snapshot = scene.snapshot();
        assert_eq!(snapshot.clouds.len(), 1);
        assert_eq!(snapshot.len(), 1);

        let handle = weak.upgrade().map(SceneObject::from);
        assert!(handle.is_some_and(|h| scene.remove(h)));
        assert!(weak.upgrade().is_none());
    }
}
