//! Scene - Host Object/Material Model
//!
//! The host owns objects, selection and material slots. `SceneHost` is the
//! seam; `Scene` is an in-memory host used by the CLI and tests.

use serde::{Deserialize, Serialize};

use crate::material::Material;

pub type ObjectId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Mesh,
    Curve,
    Light,
    Camera,
    Empty,
}

pub trait SceneHost {
    fn selected_objects(&self) -> Vec<ObjectId>;
    fn active_object(&self) -> Option<ObjectId>;
    fn object_kind(&self, object: ObjectId) -> Option<ObjectKind>;
    /// Store a material, returning the name the host gave it.
    fn add_material(&mut self, material: Material) -> String;
    fn append_material_slot(&mut self, object: ObjectId, material: &str);
}

/// Attach `material` to the target meshes: every selected object when
/// `apply_to_all` is set, otherwise only the active one. Non-mesh objects are
/// skipped. Returns how many objects received the material.
pub fn apply_material<H: SceneHost + ?Sized>(host: &mut H, material: &str, apply_to_all: bool) -> usize {
    let targets = if apply_to_all {
        host.selected_objects()
    } else {
        host.active_object().into_iter().collect()
    };

    let meshes: Vec<_> = targets
        .into_iter()
        .filter(|&obj| host.object_kind(obj) == Some(ObjectKind::Mesh))
        .collect();
    for &obj in &meshes {
        host.append_material_slot(obj, material);
    }
    meshes.len()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub kind: ObjectKind,
    #[serde(default)]
    pub selected: bool,
    #[serde(default)]
    pub materials: Vec<String>,
}

impl SceneObject {
    pub fn new(name: &str, kind: ObjectKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            selected: false,
            materials: vec![],
        }
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub objects: Vec<SceneObject>,
    /// Name of the active object.
    #[serde(default)]
    pub active: Option<String>,
    #[serde(default)]
    pub materials: Vec<Material>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, object: SceneObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_active(mut self, name: &str) -> Self {
        self.active = Some(name.to_string());
        self
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.name == name)
    }
}

impl SceneHost for Scene {
    fn selected_objects(&self) -> Vec<ObjectId> {
        self.objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.selected)
            .map(|(i, _)| i)
            .collect()
    }

    fn active_object(&self) -> Option<ObjectId> {
        let active = self.active.as_deref()?;
        self.objects.iter().position(|o| o.name == active)
    }

    fn object_kind(&self, object: ObjectId) -> Option<ObjectKind> {
        self.objects.get(object).map(|o| o.kind)
    }

    fn add_material(&mut self, mut material: Material) -> String {
        let taken = |name: &str| self.materials.iter().any(|m| m.name == name);
        if taken(&material.name) {
            let base = material.name.clone();
            if let Some(name) = (1..).map(|n| format!("{}.{:03}", base, n)).find(|n| !taken(n)) {
                material.name = name;
            }
        }
        let name = material.name.clone();
        self.materials.push(material);
        name
    }

    fn append_material_slot(&mut self, object: ObjectId, material: &str) {
        if let Some(o) = self.objects.get_mut(object) {
            o.materials.push(material.to_string());
        }
    }
}
