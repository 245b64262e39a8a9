use std::f32::consts::PI;

use glam::Vec3;

use spymedia_engine::controls::OrbitConfig;
use spymedia_engine::lifecycle::{SceneConfig, SceneProgram};
use spymedia_engine::paint::Color;
use spymedia_engine::scene::{
    CameraConfig, Geometry, Light, Material, NodeId, SceneGraph, Transform,
};
use spymedia_engine::surface::SurfaceOptions;

use crate::place;

const PROPELLER_POSITIONS: [Vec3; 4] = [
    Vec3::new(1.15, 0.25, 0.4),
    Vec3::new(-1.15, 0.25, 0.4),
    Vec3::new(1.15, 0.25, -0.4),
    Vec3::new(-1.15, 0.25, -0.4),
];

const PROPELLER_SPIN: f32 = 8.0;
const BOB_RATE: f32 = 0.6;
const BOB_AMPLITUDE: f32 = 0.05;

#[derive(Debug, Copy, Clone)]
pub struct DroneNodes {
    pub drone: NodeId,
    pub propellers: [NodeId; 4],
}

/// Stylised drone the viewer can orbit, with spinning propellers.
#[derive(Debug, Clone, Default)]
pub struct DroneViewerScene;

impl DroneViewerScene {
    pub fn new() -> Self {
        Self
    }

    /// Signed propeller spin: even propellers turn one way, odd the other.
    pub fn propeller_direction(index: usize) -> f32 {
        if index % 2 == 0 { 1.0 } else { -1.0 }
    }
}

impl SceneProgram for DroneViewerScene {
    type Nodes = DroneNodes;

    fn name(&self) -> &str {
        "drone"
    }

    fn config(&self) -> SceneConfig {
        SceneConfig {
            camera: CameraConfig {
                fov_y_degrees: 38.0,
                near: 0.1,
                far: 100.0,
                position: Vec3::new(0.0, 0.6, 5.0),
                target: Vec3::ZERO,
            },
            surface: SurfaceOptions {
                antialias: true,
                transparent: true,
                ..SurfaceOptions::default()
            },
            background: Some(Color::from_hex(0x040405)),
            fog: None,
            controls: Some(OrbitConfig {
                enable_damping: true,
                enable_pan: false,
                min_distance: 2.0,
                max_distance: 6.0,
                auto_rotate: true,
                auto_rotate_speed: 1.25,
                ..OrbitConfig::default()
            }),
        }
    }

    fn build(&self, graph: &mut SceneGraph) -> DroneNodes {
        let root = graph.root();

        let key = graph.add_light(
            root,
            Light::spot(Color::from_hex(0x6bf2ff), 2.5, 40.0, PI / 6.0, 0.5),
        );
        place(graph, key, Transform::from_position(Vec3::new(7.0, 10.0, 6.0)));

        let fill = graph.add_light(
            root,
            Light::spot(Color::from_hex(0xfff1d6), 1.2, 40.0, PI / 5.0, 0.5),
        );
        place(graph, fill, Transform::from_position(Vec3::new(-4.0, -3.0, -2.0)));

        graph.add_light(root, Light::ambient(Color::WHITE, 0.35));

        let drone = graph.add_group(root);

        let body_mat = graph.add_material(
            Material::standard(Color::from_hex(0x101217))
                .with_metalness(0.6)
                .with_roughness(0.3)
                .with_emissive(Color::from_hex(0x041317), 0.4),
        );
        let accent_mat = graph.add_material(
            Material::standard(Color::from_hex(0x6bf2ff))
                .with_emissive(Color::from_hex(0x0f3a40), 0.8)
                .with_metalness(1.0)
                .with_roughness(0.05),
        );
        let lens_mat = graph.add_material(
            Material::physical(Color::from_hex(0x1a2d30))
                .with_transmission(0.8)
                .with_roughness(0.1)
                .with_metalness(0.2),
        );

        let body_geo = graph.add_geometry(Geometry::cuboid(1.4, 0.35, 1.0));
        graph.add_mesh(drone, body_geo, body_mat);

        let lens_geo = graph.add_geometry(Geometry::cylinder(0.2, 0.25, 0.5, 32));
        let lens = graph.add_mesh(drone, lens_geo, lens_mat);
        place(
            graph,
            lens,
            Transform::from_position(Vec3::new(0.8, -0.1, 0.0))
                .with_rotation(Vec3::new(0.0, 0.0, PI / 2.0)),
        );

        let arm_geo = graph.add_geometry(Geometry::cylinder(0.06, 0.06, 2.3, 24));
        let arm = graph.add_mesh(drone, arm_geo, body_mat);
        place(
            graph,
            arm,
            Transform::from_position(Vec3::new(0.0, 0.05, 0.4))
                .with_rotation(Vec3::new(0.0, 0.0, PI / 2.0)),
        );
        if let Some(back_arm) = graph.clone_node(arm, drone) {
            if let Some(t) = graph.transform_mut(back_arm) {
                t.position.z = -0.4;
            }
        }

        // Lie the disc flat so spinning about Y turns it in place.
        let prop_geo = graph.add_geometry(Geometry::circle(0.35, 32).rotate_x(-PI / 2.0));
        let propellers = PROPELLER_POSITIONS.map(|position| {
            let prop = graph.add_mesh(drone, prop_geo, accent_mat);
            place(graph, prop, Transform::from_position(position));
            prop
        });

        let strip_geo = graph.add_geometry(Geometry::cuboid(1.2, 0.05, 0.12));
        let strip = graph.add_mesh(drone, strip_geo, accent_mat);
        place(graph, strip, Transform::from_position(Vec3::new(0.0, -0.15, 0.0)));

        DroneNodes { drone, propellers }
    }

    fn animate(&self, nodes: &DroneNodes, graph: &mut SceneGraph, elapsed: f32) {
        if let Some(t) = graph.transform_mut(nodes.drone) {
            t.position.y = (elapsed * BOB_RATE).sin() * BOB_AMPLITUDE;
        }
        for (i, prop) in nodes.propellers.iter().enumerate() {
            if let Some(t) = graph.transform_mut(*prop) {
                t.rotation.y = elapsed * PROPELLER_SPIN * Self::propeller_direction(i);
            }
        }
    }
}
