//! Scene graph and everything that hangs off it.
//!
//! A `SceneGraph` is an arena of nodes (groups, meshes, lights) plus the
//! geometries and materials meshes refer to. Scenes build it once at mount
//! and afterwards only mutate node transforms.

mod camera;
mod draw;
mod geometry;
mod graph;
mod light;
mod material;
mod transform;

pub use camera::{CameraConfig, PerspectiveCamera};
pub use draw::{DrawItem, DrawList, LightInstance};
pub use geometry::{Geometry, Topology};
pub use graph::{FogExp2, GeometryId, MaterialId, Node, NodeId, NodeKind, SceneGraph};
pub use light::{Light, LightKind};
pub use material::{Blending, Material, MaterialKind};
pub use transform::Transform;
