use meshview_render::RenderError;
use std::borrow::Cow;
use std::path::{Path, PathBuf};

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Built-in textured mesh shader.
///
/// Custom shaders must keep the same bind groups: `Globals` at group 0, the
/// per-object `Model` at group 1 and the four material textures plus sampler at
/// group 2, in diffuse, normal, specular, roughness order.
pub const MESH_SHADER: &str = r#"
struct Globals {
    projection: mat4x4<f32>,
    view: mat4x4<f32>,
    light_dir: vec3<f32>,
    ambient: f32,
};

struct Model {
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
};

@group(0) @binding(0)
var<uniform> globals: Globals;

@group(1) @binding(0)
var<uniform> locals: Model;

@group(2) @binding(0) var t_diffuse: texture_2d<f32>;
@group(2) @binding(1) var t_normal: texture_2d<f32>;
@group(2) @binding(2) var t_specular: texture_2d<f32>;
@group(2) @binding(3) var t_roughness: texture_2d<f32>;
@group(2) @binding(4) var s_material: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) uv: vec2<f32>,
    @location(2) normal: vec3<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) world_position: vec3<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    let world = locals.model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = globals.projection * globals.view * world;
    // OBJ texture space has v pointing up.
    out.uv = vec2<f32>(vertex.uv.x, 1.0 - vertex.uv.y);
    out.world_normal = (locals.normal * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.world_position = world.xyz;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let albedo = textureSample(t_diffuse, s_material, in.uv);
    let specular = textureSample(t_specular, s_material, in.uv).r;
    let roughness = textureSample(t_roughness, s_material, in.uv).r;

    // Tangents are not imported, so the normal map stays unused here.
    var n = in.world_normal;
    if dot(n, n) < 1e-8 {
        n = vec3<f32>(0.0, 1.0, 0.0);
    }
    n = normalize(n);

    let rotation = mat3x3<f32>(globals.view[0].xyz, globals.view[1].xyz, globals.view[2].xyz);
    let eye = -(transpose(rotation) * globals.view[3].xyz);
    let v = normalize(eye - in.world_position);
    let l = normalize(-globals.light_dir);
    let h = normalize(l + v);

    let diffuse = max(dot(n, l), 0.0);
    let shininess = mix(64.0, 4.0, roughness);
    let highlight = pow(max(dot(n, h), 0.0), shininess) * specular * 0.5;

    let lit = albedo.rgb * (globals.ambient + diffuse * (1.0 - globals.ambient)) + vec3<f32>(highlight);
    return vec4<f32>(lit, albedo.a);
}
"#;

/// Where the mesh shader's WGSL comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ShaderSource {
    #[default]
    BuiltIn,
    File(PathBuf),
}

impl ShaderSource {
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) => ShaderSource::File(path.to_path_buf()),
            None => ShaderSource::BuiltIn,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ShaderSource::BuiltIn => "built-in mesh shader".to_string(),
            ShaderSource::File(path) => path.display().to_string(),
        }
    }

    pub fn load(&self) -> Result<Cow<'static, str>, RenderError> {
        match self {
            ShaderSource::BuiltIn => Ok(Cow::Borrowed(MESH_SHADER)),
            ShaderSource::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| RenderError::ShaderCompile(format!("cannot read {}: {e}", path.display()))),
        }
    }
}
