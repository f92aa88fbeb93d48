use crate::camera::{Camera, Sampling};
use crate::color::RGB;
use crate::kd::KdConfig;
use crate::point::Point3;
use crate::shading::{Material, ShadingModel};
use crate::shape::{Cuboid, Cylinder, Geometry, Primitive, Sphere, Torus, Triangle};
use crate::transform::Transform;
use crate::vector::Vector3;
use crate::world::{Light, World};

use serde::Deserialize;
use serde_json;
use std::{collections::HashMap, convert, fs, io, path, rc::Rc};
use wavefront_obj::obj;

pub struct Scene {
    pub logistics: Logistics,
    pub camera: Camera,
    pub world: World,
}

#[derive(Deserialize)]
pub struct Logistics {
    pub resolution_x: u32,
    pub resolution_y: u32,
    #[serde(default)]
    pub supersample: bool,
}

// Package together third party library errors and
// Scene local errors to be returned from the
// deserialize function.
#[derive(Debug)]
pub enum DeserializeError {
    ObjLibraryError(wavefront_obj::ParseError),
    JsonLibraryError(serde_json::Error),
    IoError(io::Error),
    LocalError(String),
}
impl convert::From<wavefront_obj::ParseError> for DeserializeError {
    fn from(obj_error: wavefront_obj::ParseError) -> Self {
        DeserializeError::ObjLibraryError(obj_error)
    }
}
impl convert::From<serde_json::Error> for DeserializeError {
    fn from(serde_error: serde_json::Error) -> Self {
        DeserializeError::JsonLibraryError(serde_error)
    }
}
impl convert::From<io::Error> for DeserializeError {
    fn from(err: io::Error) -> Self {
        DeserializeError::IoError(err)
    }
}

#[derive(Deserialize)]
struct CameraDescription {
    position: Point3,
    look_at: Point3,
    up: Vector3,
    fov: f64,
}

// Fields common to every primitive entry.
#[derive(Clone, Deserialize)]
struct SurfaceDescription {
    color: RGB,
    #[serde(default)]
    kr: f64,
    #[serde(default)]
    kt: f64,
    material: String,
    shading: String,
    #[serde(default)]
    transform: Option<Transform>,
}

#[derive(Deserialize)]
struct SphereDescription {
    center: Point3,
    radius: f64,
    #[serde(flatten)]
    surface: SurfaceDescription,
}

#[derive(Deserialize)]
struct CuboidDescription {
    center: Point3,
    width: f64,
    height: f64,
    depth: f64,
    #[serde(flatten)]
    surface: SurfaceDescription,
}

#[derive(Deserialize)]
struct CylinderDescription {
    center: Point3,
    radius: f64,
    height: f64,
    #[serde(flatten)]
    surface: SurfaceDescription,
}

#[derive(Deserialize)]
struct TorusDescription {
    center: Point3,
    major_radius: f64,
    minor_radius: f64,
    #[serde(flatten)]
    surface: SurfaceDescription,
}

#[derive(Deserialize)]
struct TriangleDescription {
    vertices: [Point3; 3],
    #[serde(default)]
    uvs: Option<[(f64, f64); 3]>,
    #[serde(flatten)]
    surface: SurfaceDescription,
}

#[derive(Deserialize)]
struct MeshDescription {
    file_path: String,
    #[serde(flatten)]
    surface: SurfaceDescription,
}

// Deserializes a JSON scene specification into a renderable Scene.
pub fn deserialize(data: &str, spec_dir: &path::Path) -> Result<Scene, DeserializeError> {
    let top_level: serde_json::Value = serde_json::from_str(data)?;
    if !top_level.is_object() {
        return Err(DeserializeError::LocalError(String::from(
            "Top level scene spec is not a JSON object.",
        )));
    }

    let logistics_value = get_required_key(&top_level, "Logistics")?;
    let logistics: Logistics = serde_json::from_value(serde_json::Value::clone(logistics_value))?;

    let camera_value = get_required_key(&top_level, "Camera")?;
    let camera_desc: CameraDescription =
        serde_json::from_value(serde_json::Value::clone(camera_value))?;
    let sampling = if logistics.supersample {
        Sampling::Super2x2
    } else {
        Sampling::Normal
    };
    let camera = Camera::new(
        camera_desc.position,
        camera_desc.look_at,
        camera_desc.up,
        camera_desc.fov,
        logistics.resolution_x,
        logistics.resolution_y,
        sampling,
    );

    let light_value = get_required_key(&top_level, "Light")?;
    let light: Light = serde_json::from_value(serde_json::Value::clone(light_value))?;

    let background = match top_level.get("Background") {
        Some(v) => serde_json::from_value(serde_json::Value::clone(v))?,
        None => RGB::new(0.5, 0.7, 1.0),
    };

    // Create materials library
    let materials_value = get_required_key(&top_level, "Materials")?;
    let materials: HashMap<String, Material> =
        serde_json::from_value(serde_json::Value::clone(materials_value))?;

    // Shading models deserialize polymorphically; the scene refers to
    // them by name.
    let shading_value = get_required_key(&top_level, "Shading")?;
    let boxed_models: HashMap<String, Box<dyn ShadingModel>> =
        serde_json::from_value(serde_json::Value::clone(shading_value))?;
    let shading_models: HashMap<String, Rc<dyn ShadingModel>> = boxed_models
        .into_iter()
        .map(|(name, model)| (name, Rc::from(model)))
        .collect();

    let primitives_value = get_required_key(&top_level, "Primitives")?;
    let primitives_json = match primitives_value.as_array() {
        Some(array) => array,
        None => {
            return Err(DeserializeError::LocalError(String::from(
                "'Primitives' is not a JSON array.",
            )))
        }
    };
    let mut primitives: Vec<Primitive> = Vec::with_capacity(primitives_json.len());
    for entry in primitives_json {
        deserialize_primitive(entry, spec_dir, &materials, &shading_models, &mut primitives)?;
    }

    let mut world = World::new(light, background);
    if let Some(kd_value) = top_level.get("KdTree") {
        let config: KdConfig = serde_json::from_value(serde_json::Value::clone(kd_value))?;
        world.set_kd_config(config);
    }
    if let Some(depth_value) = top_level.get("MaxDepth") {
        let max_depth: u32 = serde_json::from_value(serde_json::Value::clone(depth_value))?;
        world.set_max_depth(max_depth);
    }
    world.add_all(primitives);

    Ok(Scene {
        logistics: logistics,
        camera: camera,
        world: world,
    })
}

// Just a helper for getting a key expected in the JSON.
fn get_required_key<'a>(
    dict: &'a serde_json::Value,
    key: &str,
) -> Result<&'a serde_json::Value, DeserializeError> {
    match dict.get(key) {
        Some(v) => Ok(v),
        None => Err(DeserializeError::LocalError(format!(
            "Required key {} is missing.",
            key
        ))),
    }
}

fn deserialize_primitive(
    json: &serde_json::Value,
    spec_dir: &path::Path,
    materials: &HashMap<String, Material>,
    shading_models: &HashMap<String, Rc<dyn ShadingModel>>,
    primitives: &mut Vec<Primitive>,
) -> Result<(), DeserializeError> {
    if !json.is_object() {
        return Err(DeserializeError::LocalError(format!(
            "Expected JSON object for value in Primitives array: {}",
            serde_json::to_string(json)?
        )));
    }

    let primitive_type = match get_required_key(json, "type")?.as_str() {
        Some(t) => t,
        None => {
            return Err(DeserializeError::LocalError(format!(
                "Expected 'type' key for primitive to be a string: {}",
                serde_json::to_string(json)?
            )))
        }
    };
    match primitive_type {
        "Sphere" => {
            let desc: SphereDescription = serde_json::from_value(serde_json::Value::clone(json))?;
            let geometry = Geometry::Sphere(Sphere::new(desc.center, desc.radius));
            push_primitive(geometry, desc.surface, materials, shading_models, primitives)
        }
        "Cuboid" => {
            let desc: CuboidDescription = serde_json::from_value(serde_json::Value::clone(json))?;
            let geometry =
                Geometry::Cuboid(Cuboid::new(desc.center, desc.width, desc.height, desc.depth));
            push_primitive(geometry, desc.surface, materials, shading_models, primitives)
        }
        "Cylinder" => {
            let desc: CylinderDescription = serde_json::from_value(serde_json::Value::clone(json))?;
            let geometry =
                Geometry::Cylinder(Cylinder::new(desc.center, desc.radius, desc.height));
            push_primitive(geometry, desc.surface, materials, shading_models, primitives)
        }
        "Torus" => {
            let desc: TorusDescription = serde_json::from_value(serde_json::Value::clone(json))?;
            let geometry = Geometry::Torus(Torus::new(
                desc.center,
                desc.major_radius,
                desc.minor_radius,
            ));
            push_primitive(geometry, desc.surface, materials, shading_models, primitives)
        }
        "Triangle" => {
            let desc: TriangleDescription = serde_json::from_value(serde_json::Value::clone(json))?;
            let geometry = Geometry::Triangle(Triangle::new(desc.vertices, desc.uvs));
            push_primitive(geometry, desc.surface, materials, shading_models, primitives)
        }
        "Mesh" => deserialize_mesh(json, spec_dir, materials, shading_models, primitives),
        _ => Err(DeserializeError::LocalError(format!(
            "Unknown primitive 'type' {} given.",
            primitive_type
        ))),
    }
}

fn push_primitive(
    mut geometry: Geometry,
    surface: SurfaceDescription,
    materials: &HashMap<String, Material>,
    shading_models: &HashMap<String, Rc<dyn ShadingModel>>,
    primitives: &mut Vec<Primitive>,
) -> Result<(), DeserializeError> {
    let material = match materials.get(&surface.material) {
        Some(m) => m.clone(),
        None => {
            return Err(DeserializeError::LocalError(format!(
                "Missing Material {} for primitive.",
                surface.material
            )))
        }
    };
    let shading = match shading_models.get(&surface.shading) {
        Some(model) => Rc::clone(model),
        None => {
            return Err(DeserializeError::LocalError(format!(
                "Missing shading model {} for primitive.",
                surface.shading
            )))
        }
    };

    if let Some(transform) = &surface.transform {
        geometry
            .transform(&transform.create_matrix())
            .map_err(|e| DeserializeError::LocalError(format!("Bad primitive transform: {}", e)))?;
    }

    let primitive = Primitive::new(geometry, surface.color, surface.kr, surface.kt, material, shading)
        .map_err(DeserializeError::LocalError)?;
    primitives.push(primitive);
    Ok(())
}

// Meshes are parsed at this boundary; the tracer core only ever sees the
// resulting vertex and uv buffers as plain triangles.
fn deserialize_mesh(
    json: &serde_json::Value,
    spec_dir: &path::Path,
    materials: &HashMap<String, Material>,
    shading_models: &HashMap<String, Rc<dyn ShadingModel>>,
    primitives: &mut Vec<Primitive>,
) -> Result<(), DeserializeError> {
    let desc: MeshDescription = serde_json::from_value(serde_json::Value::clone(json))?;

    let obj_string = fs::read_to_string(spec_dir.join(&desc.file_path))?;
    let obj_set = obj::parse(obj_string)?;

    for object in obj_set.objects {
        let vertices: Vec<Point3> = object.vertices.into_iter().map(Point3::from).collect();
        let tex_coords: Vec<(f64, f64)> =
            object.tex_vertices.iter().map(|t| (t.u, t.v)).collect();

        for geometry in &object.geometry {
            for shape in &geometry.shapes {
                match &shape.primitive {
                    obj::Primitive::Triangle(v0, v1, v2) => {
                        let corners = [
                            mesh_vertex(&vertices, v0.0, &desc.file_path, &object.name)?,
                            mesh_vertex(&vertices, v1.0, &desc.file_path, &object.name)?,
                            mesh_vertex(&vertices, v2.0, &desc.file_path, &object.name)?,
                        ];
                        let uvs = match (v0.1, v1.1, v2.1) {
                            (Some(t0), Some(t1), Some(t2)) => Some([
                                mesh_uv(&tex_coords, t0, &desc.file_path, &object.name)?,
                                mesh_uv(&tex_coords, t1, &desc.file_path, &object.name)?,
                                mesh_uv(&tex_coords, t2, &desc.file_path, &object.name)?,
                            ]),
                            _ => None,
                        };
                        push_primitive(
                            Geometry::Triangle(Triangle::new(corners, uvs)),
                            desc.surface.clone(),
                            materials,
                            shading_models,
                            primitives,
                        )?;
                    }
                    _ => {
                        return Err(DeserializeError::LocalError(format!(
                            "Only triangles are allowed in meshes, but file {}, object {} had another type of primitive.",
                            desc.file_path, object.name
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

fn mesh_vertex(
    vertices: &[Point3],
    index: usize,
    file_path: &str,
    object_name: &str,
) -> Result<Point3, DeserializeError> {
    match vertices.get(index) {
        Some(v) => Ok(*v),
        None => Err(DeserializeError::LocalError(format!(
            "Vertex index {} out of range for file {}, object {}.",
            index, file_path, object_name
        ))),
    }
}

fn mesh_uv(
    tex_coords: &[(f64, f64)],
    index: usize,
    file_path: &str,
    object_name: &str,
) -> Result<(f64, f64), DeserializeError> {
    match tex_coords.get(index) {
        Some(uv) => Ok(*uv),
        None => Err(DeserializeError::LocalError(format!(
            "Texture index {} out of range for file {}, object {}.",
            index, file_path, object_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC_SCENE: &str = r#"{
        "Logistics": { "resolution_x": 16, "resolution_y": 16, "supersample": true },
        "Camera": {
            "position": [0, 1, -5],
            "look_at": [0, 0, 0],
            "up": [0, 1, 0],
            "fov": 60
        },
        "Light": { "position": [5, 10, -5], "color": [1, 1, 1] },
        "Background": [0.1, 0.1, 0.1],
        "MaxDepth": 4,
        "KdTree": { "max_leaf": 2, "split": "sah" },
        "Materials": {
            "shiny": { "specular_color": [1, 1, 1], "shininess": 80 },
            "glass": { "refractive_index": 1.5 }
        },
        "Shading": {
            "plastic": { "Phong": {} },
            "brushed": { "BlinnPhong": { "specular_exponent": 20 } },
            "tiles": { "Checkerboard": { "check_size": 1.0 } },
            "fractal": { "Mandelbrot": { "max_iter": 50 } },
            "terrazzo": { "Mosaic": { "seed": 7 } }
        },
        "Primitives": [
            {
                "type": "Sphere",
                "center": [0, 0, 0],
                "radius": 1,
                "color": [1, 0, 0],
                "kr": 0.25,
                "material": "shiny",
                "shading": "plastic"
            },
            {
                "type": "Sphere",
                "center": [2, 0, 0],
                "radius": 0.5,
                "kt": 0.9,
                "color": [1, 1, 1],
                "material": "glass",
                "shading": "brushed"
            },
            {
                "type": "Cuboid",
                "center": [0, -2, 0],
                "width": 8,
                "height": 0.5,
                "depth": 8,
                "color": [0, 1, 0],
                "material": "shiny",
                "shading": "tiles",
                "transform": { "translate": [0, -0.5, 0] }
            },
            {
                "type": "Cylinder",
                "center": [-2, 0, 0],
                "radius": 0.5,
                "height": 2,
                "color": [0, 0, 1],
                "material": "shiny",
                "shading": "plastic"
            },
            {
                "type": "Torus",
                "center": [0, 2, 0],
                "major_radius": 1,
                "minor_radius": 0.25,
                "color": [1, 1, 0],
                "material": "shiny",
                "shading": "plastic"
            },
            {
                "type": "Triangle",
                "vertices": [[-1, 0, 2], [1, 0, 2], [0, 1, 2]],
                "uvs": [[0, 0], [1, 0], [0.5, 1]],
                "color": [1, 0, 1],
                "material": "shiny",
                "shading": "plastic"
            }
        ]
    }"#;

    #[test]
    fn full_scene_round_trip() {
        let scene = deserialize(BASIC_SCENE, path::Path::new(".")).unwrap();
        assert_eq!(scene.logistics.resolution_x, 16);
        assert!(scene.logistics.supersample);
        assert_eq!(scene.world.objects().len(), 6);
        assert_eq!(scene.world.background.r, 0.1);
        // The translated floor cuboid moved half a unit down.
        let floor_bounds = scene.world.objects()[2].bounds();
        assert!((floor_bounds.max.y - (-2.25)).abs() < 1e-9);
    }

    #[test]
    fn missing_material_is_an_error() {
        let broken = BASIC_SCENE.replace("\"material\": \"shiny\"", "\"material\": \"nope\"");
        match deserialize(&broken, path::Path::new(".")) {
            Err(DeserializeError::LocalError(message)) => {
                assert!(message.contains("nope"));
            }
            other => panic!("expected a local error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn unknown_material_field_is_an_error() {
        let broken = BASIC_SCENE.replace(
            "\"shininess\": 80",
            "\"shininess\": 80, \"glossiness\": 1",
        );
        match deserialize(&broken, path::Path::new(".")) {
            Err(DeserializeError::JsonLibraryError(_)) => {}
            other => panic!("expected a serde error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn transmissive_without_index_is_an_error() {
        let broken = BASIC_SCENE.replace("\"material\": \"glass\"", "\"material\": \"shiny\"");
        assert!(deserialize(&broken, path::Path::new(".")).is_err());
    }

    #[test]
    fn unknown_primitive_type_is_an_error() {
        let broken = BASIC_SCENE.replace("\"type\": \"Torus\"", "\"type\": \"Blob\"");
        assert!(deserialize(&broken, path::Path::new(".")).is_err());
    }
}
