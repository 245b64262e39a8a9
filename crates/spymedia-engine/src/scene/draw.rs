use glam::{Mat4, Vec3};

use super::{GeometryId, LightKind, MaterialId, NodeId, NodeKind, PerspectiveCamera, SceneGraph};

/// One mesh draw, resolved to world space.
#[derive(Debug, Copy, Clone)]
pub struct DrawItem {
    pub node: NodeId,
    pub geometry: GeometryId,
    pub material: MaterialId,
    pub model: Mat4,
    /// View-space distance of the node origin in front of the camera.
    pub depth: f32,
}

/// A positional light resolved to world space.
#[derive(Debug, Copy, Clone)]
pub struct LightInstance {
    pub kind: LightKind,
    /// Linear RGB premultiplied by intensity.
    pub radiance: [f32; 3],
    pub position: Vec3,
    /// Unit vector the light points along (spots only, zero otherwise).
    pub direction: Vec3,
}

/// Flattened, ordered view of a scene graph for one frame.
#[derive(Debug, Default, Clone)]
pub struct DrawList {
    /// Front to back.
    pub opaque: Vec<DrawItem>,
    /// Back to front.
    pub transparent: Vec<DrawItem>,
    pub lights: Vec<LightInstance>,
    /// Sum of all ambient lights, linear RGB.
    pub ambient: [f32; 3],
}

impl DrawList {
    pub fn build(graph: &SceneGraph, camera: &PerspectiveCamera) -> Self {
        let worlds = graph.world_matrices();
        let view = camera.view_matrix();
        let mut list = DrawList::default();

        for (id, node) in graph.nodes() {
            if !graph.is_visible(id) {
                continue;
            }
            let world = worlds[id.index()];

            match &node.kind {
                NodeKind::Group => {}
                NodeKind::Mesh { geometry, material } => {
                    let Some(mat) = graph.material(*material) else {
                        continue;
                    };
                    let origin = world.transform_point3(Vec3::ZERO);
                    let item = DrawItem {
                        node: id,
                        geometry: *geometry,
                        material: *material,
                        model: world,
                        depth: -view.transform_point3(origin).z,
                    };
                    if mat.is_transparent() {
                        list.transparent.push(item);
                    } else {
                        list.opaque.push(item);
                    }
                }
                NodeKind::Light(light) => {
                    let [r, g, b, _] = light.color.scaled_linear(light.intensity);
                    if light.is_ambient() {
                        list.ambient[0] += r;
                        list.ambient[1] += g;
                        list.ambient[2] += b;
                        continue;
                    }

                    let position = world.transform_point3(Vec3::ZERO);
                    let direction = match light.kind {
                        LightKind::Spot { .. } => (Vec3::ZERO - position).normalize_or_zero(),
                        _ => Vec3::ZERO,
                    };
                    list.lights.push(LightInstance {
                        kind: light.kind,
                        radiance: [r, g, b],
                        position,
                        direction,
                    });
                }
            }
        }

        list.opaque.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        list.transparent.sort_by(|a, b| b.depth.total_cmp(&a.depth));
        list
    }

    pub fn draw_count(&self) -> usize {
        self.opaque.len() + self.transparent.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawItem> {
        self.opaque.iter().chain(self.transparent.iter())
    }
}
