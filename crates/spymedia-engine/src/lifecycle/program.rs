use crate::controls::OrbitConfig;
use crate::paint::Color;
use crate::scene::{CameraConfig, FogExp2, SceneGraph};
use crate::surface::SurfaceOptions;

/// Everything the lifecycle needs to know about a scene before building it.
#[derive(Debug, Clone, Default)]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub surface: SurfaceOptions,
    pub background: Option<Color>,
    pub fog: Option<FogExp2>,
    /// Orbit controls are attached only when set.
    pub controls: Option<OrbitConfig>,
}

/// A scene: fixed node set plus a time-driven update.
pub trait SceneProgram {
    /// Handles to the nodes `animate` touches.
    type Nodes;

    fn name(&self) -> &str;

    fn config(&self) -> SceneConfig;

    /// Adds the scene's nodes, geometries and materials to an empty graph.
    fn build(&self, graph: &mut SceneGraph) -> Self::Nodes;

    /// Sets node transforms for `elapsed` seconds since mount.
    ///
    /// Must depend on `elapsed` only, never on frame count or previous state.
    fn animate(&self, nodes: &Self::Nodes, graph: &mut SceneGraph, elapsed: f32);
}
