use crate::backend::{ColorSpace, DrawCall, MeshHandle, RenderBackend, TextureHandle, TextureSet};
use crate::error::RenderError;
use glam::{Mat4, Quat, Vec3};
use meshview_assets::{ModelAsset, TextureImage};
use meshview_common::{TextureSlot, Transform};
use std::collections::BTreeMap;

/// Material name used when a model has no material library.
pub const DEFAULT_MATERIAL: &str = "default";

/// A drawable model instance: uploaded mesh, material textures and a transform.
#[derive(Debug, Clone)]
pub struct SceneObject {
    mesh: MeshHandle,
    index_count: u32,
    /// Never empty; sorted by material name.
    materials: Vec<(String, TextureSet)>,
    active: usize,
    color_override: Option<TextureHandle>,
    pub transform: Transform,
}

impl SceneObject {
    pub fn new(mesh: MeshHandle, index_count: u32, textures: TextureSet) -> Self {
        Self {
            mesh,
            index_count,
            materials: vec![(DEFAULT_MATERIAL.to_string(), textures)],
            active: 0,
            color_override: None,
            transform: Transform::default(),
        }
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn triangle_count(&self) -> u32 {
        self.index_count / 3
    }

    pub fn material_names(&self) -> impl Iterator<Item = &str> {
        self.materials.iter().map(|(name, _)| name.as_str())
    }

    pub fn active_material(&self) -> &str {
        &self.materials[self.active].0
    }

    /// Draw with the named material's textures.
    pub fn set_active_material(&mut self, name: &str) -> Result<(), RenderError> {
        let index = self
            .materials
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| RenderError::ObjectNotFound(format!("material {name}")))?;
        self.active = index;
        Ok(())
    }

    /// Textures bound for the next draw, with any color override in the diffuse slot.
    pub fn textures(&self) -> TextureSet {
        let mut set = self.materials[self.active].1;
        if let Some(color) = self.color_override {
            set.set(TextureSlot::Diffuse, color);
        }
        set
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    /// Compose a further rotation after the current one.
    pub fn rotate(&mut self, rotation: Quat) {
        self.transform.rotation = (self.transform.rotation * rotation).normalize();
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
    }

    /// Replace the diffuse texture with a solid color.
    pub fn set_color_texture(&mut self, texture: TextureHandle) {
        self.color_override = Some(texture);
    }

    pub fn clear_color_override(&mut self) {
        self.color_override = None;
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.transform.matrix()
    }

    pub fn draw_call(&self) -> DrawCall {
        DrawCall {
            mesh: self.mesh,
            index_count: self.index_count,
            textures: self.textures(),
            model: self.model_matrix(),
        }
    }
}

/// Named scene objects, drawn in name order.
///
/// The placeholder texture is uploaded once and shared by every missing map,
/// so a scene must always be used with the backend it was loaded into.
#[derive(Debug, Default)]
pub struct Scene {
    objects: BTreeMap<String, SceneObject>,
    placeholder: Option<TextureHandle>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload a model and add it under `name`, replacing any object with that name.
    ///
    /// Textures that failed to load (or were never named) share the placeholder.
    /// A texture the backend refuses also falls back to it.
    pub fn load_model<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        name: &str,
        model: &ModelAsset,
    ) -> Result<&mut SceneObject, RenderError> {
        if model.mesh.is_empty() {
            return Err(RenderError::Resource(format!("model {name} has no triangles")));
        }
        let index_count = u32::try_from(model.mesh.index_count())
            .map_err(|_| RenderError::Resource(format!("model {name} has too many indices")))?;
        let mesh = backend.upload_mesh(name, &model.mesh)?;
        let placeholder = self.placeholder(backend)?;

        let mut materials = Vec::with_capacity(model.materials.len());
        for (material_name, material) in &model.materials {
            let loaded = model.load_material_textures(material);
            let mut set = TextureSet::uniform(placeholder);
            for (slot, texture) in TextureSlot::ALL.into_iter().zip(loaded) {
                if texture.is_fallback {
                    continue;
                }
                let label = format!("{name}/{material_name}/{}", slot.label());
                let color_space = ColorSpace::for_slot(slot);
                match backend.upload_texture(&label, &texture.image, color_space) {
                    Ok(handle) => set.set(slot, handle),
                    Err(e) => tracing::warn!(texture = %label, "texture upload failed, using placeholder: {e}"),
                }
            }
            materials.push((material_name.clone(), set));
        }

        let mut object = SceneObject::new(mesh, index_count, TextureSet::uniform(placeholder));
        if !materials.is_empty() {
            object.materials = materials;
        }
        tracing::info!(
            object = name,
            triangles = object.triangle_count(),
            materials = object.materials.len(),
            "scene object loaded"
        );

        self.objects.insert(name.to_string(), object);
        self.get_mut(name)
    }

    /// Upload a 1x1 texture and use it as the object's diffuse color.
    pub fn set_color<B: RenderBackend>(
        &mut self,
        backend: &mut B,
        name: &str,
        rgba: [u8; 4],
    ) -> Result<(), RenderError> {
        // Check the name before allocating GPU memory for it.
        self.get(name)?;
        let label = format!("{name}/color");
        let texture =
            backend.upload_texture(&label, &TextureImage::solid(rgba), ColorSpace::Srgb)?;
        self.get_mut(name)?.set_color_texture(texture);
        Ok(())
    }

    fn placeholder<B: RenderBackend>(&mut self, backend: &mut B) -> Result<TextureHandle, RenderError> {
        if let Some(handle) = self.placeholder {
            return Ok(handle);
        }
        let handle = backend.upload_texture(
            "placeholder",
            &TextureImage::placeholder(),
            ColorSpace::Srgb,
        )?;
        self.placeholder = Some(handle);
        Ok(handle)
    }

    pub fn insert(&mut self, name: impl Into<String>, object: SceneObject) -> Option<SceneObject> {
        self.objects.insert(name.into(), object)
    }

    pub fn get(&self, name: &str) -> Result<&SceneObject, RenderError> {
        self.objects
            .get(name)
            .ok_or_else(|| RenderError::ObjectNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut SceneObject, RenderError> {
        self.objects
            .get_mut(name)
            .ok_or_else(|| RenderError::ObjectNotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<SceneObject, RenderError> {
        self.objects
            .remove(name)
            .ok_or_else(|| RenderError::ObjectNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SceneObject)> {
        self.objects.iter().map(|(name, object)| (name.as_str(), object))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingBackend};
    use meshview_common::{Material, MeshPrimitive, Vertex};
    use std::path::PathBuf;

    fn triangle() -> MeshPrimitive {
        let mut mesh = MeshPrimitive::new();
        for x in [0.0, 1.0, 2.0] {
            let v = Vertex {
                position: [x, 0.0, 0.0],
                ..Vertex::default()
            };
            let i = mesh.push_vertex(&v);
            mesh.indices.push(i);
        }
        mesh
    }

    fn model(materials: &[Material]) -> ModelAsset {
        ModelAsset {
            name: "tri".into(),
            mesh: triangle(),
            materials: materials.iter().map(|m| (m.name.clone(), m.clone())).collect(),
            material_source: None,
            texture_dir: PathBuf::from("/nonexistent"),
        }
    }

    #[test]
    fn unknown_object_is_an_error_not_a_panic() {
        let mut scene = Scene::new();
        assert!(matches!(scene.get("Player"), Err(RenderError::ObjectNotFound(n)) if n == "Player"));
        assert!(matches!(scene.get_mut("Player"), Err(RenderError::ObjectNotFound(_))));
        assert!(scene.remove("Player").is_err());
    }

    #[test]
    fn model_without_materials_uses_placeholder_everywhere() {
        let mut backend = RecordingBackend::new();
        let mut scene = Scene::new();
        let object = scene.load_model(&mut backend, "tri", &model(&[])).unwrap();
        assert_eq!(object.index_count(), 3);
        assert_eq!(object.active_material(), DEFAULT_MATERIAL);

        let placeholder = backend.texture_handle("placeholder").unwrap();
        assert_eq!(object.textures(), TextureSet::uniform(placeholder));
    }

    #[test]
    fn missing_maps_share_one_placeholder_upload() {
        let mut backend = RecordingBackend::new();
        let mut scene = Scene::new();
        let mut body = Material::new("Body");
        body.set_map(TextureSlot::Diffuse, "missing.png");
        let asset = model(&[body, Material::new("Trim")]);

        scene.load_model(&mut backend, "a", &asset).unwrap();
        scene.load_model(&mut backend, "b", &asset).unwrap();

        let texture_uploads = backend
            .calls
            .iter()
            .filter(|c| matches!(c, Call::UploadTexture(_)))
            .count();
        assert_eq!(texture_uploads, 1);
        assert_eq!(
            scene.get("a").unwrap().material_names().collect::<Vec<_>>(),
            ["Body", "Trim"]
        );
    }

    #[test]
    fn data_maps_upload_as_linear() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["body.png", "body_s.png"] {
            image::RgbaImage::new(2, 2).save(dir.path().join(file)).unwrap();
        }
        let mut body = Material::new("Body");
        body.set_map(TextureSlot::Diffuse, "body.png");
        body.set_map(TextureSlot::Specular, "body_s.png");
        let mut asset = model(&[body]);
        asset.texture_dir = dir.path().to_path_buf();

        let mut backend = RecordingBackend::new();
        let mut scene = Scene::new();
        scene.load_model(&mut backend, "tri", &asset).unwrap();
        scene.set_color(&mut backend, "tri", [255, 0, 0, 255]).unwrap();

        assert_eq!(
            backend.texture_color_space("tri/Body/diffuse"),
            Some(ColorSpace::Srgb)
        );
        assert_eq!(
            backend.texture_color_space("tri/Body/specular"),
            Some(ColorSpace::Linear)
        );
        assert_eq!(backend.texture_color_space("tri/color"), Some(ColorSpace::Srgb));
        assert_eq!(backend.texture_color_space("tri/Body/roughness"), None);
    }

    #[test]
    fn empty_mesh_is_rejected() {
        let mut backend = RecordingBackend::new();
        let mut scene = Scene::new();
        let mut asset = model(&[]);
        asset.mesh = MeshPrimitive::new();
        assert!(matches!(
            scene.load_model(&mut backend, "empty", &asset),
            Err(RenderError::Resource(_))
        ));
        assert!(scene.is_empty());
    }

    #[test]
    fn mutators_update_model_matrix() {
        let mut object = SceneObject::new(MeshHandle(1), 3, TextureSet::uniform(TextureHandle(0)));
        object.set_position(Vec3::new(0.0, -1.0, -4.0));
        object.set_scale(Vec3::splat(0.5));
        let p = object.model_matrix().transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert!((p - Vec3::new(1.0, -1.0, -4.0)).length() < 1e-5);

        object.rotate(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        object.rotate(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2));
        let p = object.model_matrix().transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert!((p - Vec3::new(-1.0, -1.0, -4.0)).length() < 1e-5);
    }

    #[test]
    fn color_override_replaces_diffuse_only() {
        let mut backend = RecordingBackend::new();
        let mut scene = Scene::new();
        scene.load_model(&mut backend, "tri", &model(&[])).unwrap();
        scene.set_color(&mut backend, "tri", [255, 0, 0, 255]).unwrap();

        let color = backend.texture_handle("tri/color").unwrap();
        let placeholder = backend.texture_handle("placeholder").unwrap();
        let set = scene.get("tri").unwrap().textures();
        assert_eq!(set.diffuse, color);
        assert_eq!(set.normal, placeholder);

        assert!(scene.set_color(&mut backend, "ghost", [0; 4]).is_err());
        assert!(backend.texture_handle("ghost/color").is_none());
    }

    #[test]
    fn active_material_selects_texture_set() {
        let mut backend = RecordingBackend::new();
        let mut scene = Scene::new();
        let asset = model(&[Material::new("A"), Material::new("B")]);
        let object = scene.load_model(&mut backend, "tri", &asset).unwrap();
        assert_eq!(object.active_material(), "A");
        object.set_active_material("B").unwrap();
        assert_eq!(object.active_material(), "B");
        assert!(object.set_active_material("C").is_err());
    }

    #[test]
    fn iteration_is_name_ordered() {
        let mut scene = Scene::new();
        let object = SceneObject::new(MeshHandle(0), 3, TextureSet::uniform(TextureHandle(0)));
        for name in ["zeta", "alpha", "mid"] {
            scene.insert(name, object.clone());
        }
        let names: Vec<_> = scene.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["alpha", "mid", "zeta"]);
    }
}
