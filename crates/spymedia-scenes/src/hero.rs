use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use spymedia_engine::lifecycle::{SceneConfig, SceneProgram};
use spymedia_engine::paint::Color;
use spymedia_engine::scene::{
    Blending, CameraConfig, FogExp2, Geometry, Light, Material, NodeId, SceneGraph, Transform,
};
use spymedia_engine::surface::SurfaceOptions;

use crate::place;

const ACCENT: u32 = 0x6bf2ff;

const STREAK_COUNT: usize = 120;
const PARTICLE_COUNT: usize = 500;
const BLADE_COUNT: usize = 6;

// Rotation rates in radians per second.
const LENS_SPIN: f32 = 0.15;
const GLASS_SPIN: f32 = 0.2;
const PARTICLE_DRIFT: f32 = 0.05;
const STREAK_DRIFT: f32 = 0.02;

/// Nodes the hero animation rotates.
#[derive(Debug, Copy, Clone)]
pub struct HeroNodes {
    pub lens: NodeId,
    pub glass: NodeId,
    pub particles: NodeId,
    pub streaks: NodeId,
}

/// Animated lens, light streaks and particle fog behind the hero section.
#[derive(Debug, Clone, Default)]
pub struct HeroLensScene {
    seed: Option<u64>,
}

impl HeroLensScene {
    /// Streaks and particles are scattered differently on every mount.
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}

impl SceneProgram for HeroLensScene {
    type Nodes = HeroNodes;

    fn name(&self) -> &str {
        "hero"
    }

    fn config(&self) -> SceneConfig {
        SceneConfig {
            camera: CameraConfig {
                fov_y_degrees: 42.0,
                near: 0.1,
                far: 100.0,
                position: Vec3::new(0.0, 0.0, 10.0),
                target: Vec3::ZERO,
            },
            surface: SurfaceOptions {
                antialias: true,
                transparent: true,
                clear_color: Color::BLACK,
                ..SurfaceOptions::default()
            },
            background: None,
            fog: Some(FogExp2::new(Color::from_hex(0x050506), 0.02)),
            controls: None,
        }
    }

    fn build(&self, graph: &mut SceneGraph) -> HeroNodes {
        let root = graph.root();
        let mut rng = self.rng();

        let lens = graph.add_group(root);

        // Outer ring.
        let ring_geo = graph.add_geometry(Geometry::torus(3.0, 0.25, 32, 160));
        let ring_mat = graph.add_material(
            Material::physical(Color::from_hex(0x101116))
                .with_metalness(0.9)
                .with_roughness(0.15)
                .with_opacity(0.95)
                .with_transmission(0.3),
        );
        graph.add_mesh(lens, ring_geo, ring_mat);

        // Aperture blades, one shared sector rotated around the axis.
        let blade_geo = graph.add_geometry(Geometry::ring(1.2, 1.8, 32, 1, 0.0, PI / 3.0));
        let blade_mat = graph.add_material(
            Material::standard(Color::from_hex(0x0f1b1d))
                .with_emissive(Color::from_hex(0x041f24), 1.0)
                .with_metalness(1.0)
                .with_roughness(0.2),
        );
        for i in 0..BLADE_COUNT {
            let blade = graph.add_mesh(lens, blade_geo, blade_mat);
            place(
                graph,
                blade,
                Transform::IDENTITY.with_rotation(Vec3::new(0.0, 0.0, i as f32 * PI / 3.0)),
            );
        }

        let glass_geo = graph.add_geometry(Geometry::sphere(1.1, 48, 48));
        let glass_mat = graph.add_material(
            Material::physical(Color::from_hex(0x0a0b0d))
                .with_metalness(0.2)
                .with_roughness(0.0)
                .with_transmission(0.9),
        );
        let glass = graph.add_mesh(lens, glass_geo, glass_mat);

        let streak_geo = graph.add_geometry(Geometry::line_segments(&streak_segments(&mut rng)));
        let streak_mat =
            graph.add_material(Material::line_basic(Color::from_hex(ACCENT)).with_opacity(0.35));
        let streaks = graph.add_mesh(root, streak_geo, streak_mat);

        let particle_geo = graph.add_geometry(Geometry::points(&particle_positions(&mut rng)));
        let particle_mat = graph.add_material(
            Material::points(Color::from_hex(ACCENT), 0.05)
                .with_opacity(0.5)
                .with_blending(Blending::Additive)
                .with_depth_write(false),
        );
        let particles = graph.add_mesh(root, particle_geo, particle_mat);

        graph.add_light(root, Light::ambient(Color::from_hex(0x88a0ff), 0.6));

        let rim = graph.add_light(root, Light::point(Color::from_hex(ACCENT), 2.4, 30.0));
        place(graph, rim, Transform::from_position(Vec3::new(6.0, 4.0, 6.0)));

        let warm = graph.add_light(root, Light::point(Color::from_hex(0xffd0a0), 1.2, 40.0));
        place(graph, warm, Transform::from_position(Vec3::new(-5.0, -2.0, -6.0)));

        HeroNodes {
            lens,
            glass,
            particles,
            streaks,
        }
    }

    fn animate(&self, nodes: &HeroNodes, graph: &mut SceneGraph, elapsed: f32) {
        if let Some(t) = graph.transform_mut(nodes.lens) {
            t.rotation.z = elapsed * LENS_SPIN;
        }
        if let Some(t) = graph.transform_mut(nodes.glass) {
            t.rotation.y = elapsed * GLASS_SPIN;
        }
        if let Some(t) = graph.transform_mut(nodes.particles) {
            t.rotation.y = elapsed * PARTICLE_DRIFT;
        }
        if let Some(t) = graph.transform_mut(nodes.streaks) {
            t.rotation.y = elapsed * STREAK_DRIFT;
        }
    }
}

/// Radial streaks evenly spaced around the lens, each pointing outwards.
fn streak_segments(rng: &mut StdRng) -> Vec<(Vec3, Vec3)> {
    (0..STREAK_COUNT)
        .map(|i| {
            let angle = i as f32 / STREAK_COUNT as f32 * TAU;
            let radius = 4.0 + rng.random::<f32>() * 1.5;
            let y = (rng.random::<f32>() - 0.5) * 2.0;
            let start = Vec3::new(angle.cos() * radius, y, angle.sin() * radius);
            (start, start * 1.2)
        })
        .collect()
}

/// Uniform scatter in a 30 x 20 x 30 box around the origin.
fn particle_positions(rng: &mut StdRng) -> Vec<Vec3> {
    (0..PARTICLE_COUNT)
        .map(|_| {
            Vec3::new(
                (rng.random::<f32>() - 0.5) * 30.0,
                (rng.random::<f32>() - 0.5) * 20.0,
                (rng.random::<f32>() - 0.5) * 30.0,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use spymedia_engine::headless::HeadlessHost;
    use spymedia_engine::lifecycle::{FrameOutcome, LifecycleState, SceneInstance};
    use spymedia_engine::scene::{NodeKind, Topology};

    fn built(seed: u64) -> (SceneGraph, HeroNodes) {
        let mut graph = SceneGraph::new();
        let nodes = HeroLensScene::with_seed(seed).build(&mut graph);
        (graph, nodes)
    }

    fn geometry_of(graph: &SceneGraph, node: NodeId) -> &Geometry {
        match graph.node(node).map(|n| &n.kind) {
            Some(NodeKind::Mesh { geometry, .. }) => graph.geometry(*geometry).unwrap(),
            other => panic!("expected mesh, got {other:?}"),
        }
    }

    #[test]
    fn builds_lens_streaks_particles_and_lights() {
        let (graph, nodes) = built(7);

        // root, lens group, ring, 6 blades, glass, streaks, particles, 3 lights
        assert_eq!(graph.node_count(), 15);
        assert_eq!(graph.node(nodes.lens).unwrap().children().len(), 1 + BLADE_COUNT + 1);

        let lights = graph
            .nodes()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Light(_)))
            .count();
        assert_eq!(lights, 3);

        let streaks = geometry_of(&graph, nodes.streaks);
        assert_eq!(streaks.topology, Topology::Lines);
        assert_eq!(streaks.vertex_count(), STREAK_COUNT * 2);

        let particles = geometry_of(&graph, nodes.particles);
        assert_eq!(particles.topology, Topology::Points);
        assert_eq!(particles.vertex_count(), PARTICLE_COUNT);
    }

    #[test]
    fn scatter_stays_in_bounds() {
        let (graph, nodes) = built(11);

        let streaks = geometry_of(&graph, nodes.streaks);
        for pair in streaks.positions.chunks(2) {
            let start = Vec3::from(pair[0]);
            let end = Vec3::from(pair[1]);
            let radius = Vec3::new(start.x, 0.0, start.z).length();
            assert!((4.0 - 1e-4..=5.5 + 1e-4).contains(&radius), "radius {radius}");
            assert!(start.y.abs() <= 1.0);
            assert!(end.abs_diff_eq(start * 1.2, 1e-5));
        }

        let particles = geometry_of(&graph, nodes.particles);
        for p in &particles.positions {
            assert!(p[0].abs() <= 15.0 && p[1].abs() <= 10.0 && p[2].abs() <= 15.0);
        }
    }

    #[test]
    fn same_seed_same_scatter() {
        let (a, na) = built(42);
        let (b, nb) = built(42);
        assert_eq!(
            geometry_of(&a, na.particles).positions,
            geometry_of(&b, nb.particles).positions
        );

        let (c, nc) = built(43);
        assert_ne!(
            geometry_of(&a, na.particles).positions,
            geometry_of(&c, nc.particles).positions
        );
    }

    #[test]
    fn rotations_are_linear_in_elapsed_time() {
        let scene = HeroLensScene::with_seed(1);
        let (mut graph, nodes) = built(1);

        scene.animate(&nodes, &mut graph, 10.0);
        let rot = |id| graph.transform(id).unwrap().rotation;
        assert!((rot(nodes.lens).z - 1.5).abs() < 1e-5);
        assert!((rot(nodes.glass).y - 2.0).abs() < 1e-5);
        assert!((rot(nodes.particles).y - 0.5).abs() < 1e-5);
        assert!((rot(nodes.streaks).y - 0.2).abs() < 1e-5);

        // Same time, same pose regardless of what ran before.
        scene.animate(&nodes, &mut graph, 3.0);
        scene.animate(&nodes, &mut graph, 10.0);
        assert!((graph.transform(nodes.lens).unwrap().rotation.z - 1.5).abs() < 1e-5);
    }

    #[test]
    fn mounts_transparent_with_fog() {
        let host = Rc::new(HeadlessHost::new(1280, 720));
        let start = Instant::now();
        let mut scene =
            SceneInstance::mount_at(HeroLensScene::with_seed(3), host.clone(), start).unwrap();

        assert_eq!(scene.state(), LifecycleState::Running);
        assert!(scene.controls().is_none());
        assert!(scene.graph().fog.is_some());
        assert_eq!(scene.camera().fov_y_degrees, 42.0);

        let request = host.take_frame_requests()[0];
        let outcome = scene
            .on_frame(request, start + Duration::from_secs(2))
            .unwrap();
        match outcome {
            FrameOutcome::Rendered(t) => assert!((t.elapsed - 2.0).abs() < 1e-3),
            other => panic!("expected a rendered frame, got {other:?}"),
        }
        let z = scene.graph().transform(scene.nodes().unwrap().lens).unwrap().rotation.z;
        assert!((z - 0.3).abs() < 1e-3);

        // ring, six blades, glass, streaks, particles
        let snap = host.snapshot();
        assert_eq!(snap.last_draw_count, 10);
        assert_eq!(snap.last_backing_size, (1280, 720));

        scene.finalize();
        assert!(host.snapshot().is_clean());
    }
}
