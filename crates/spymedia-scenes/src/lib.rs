//! The two SPYMEDIA 3D scenes.
//!
//! - [`HeroLensScene`]: decorative camera-lens background with light streaks
//!   and a particle field, rendered over a transparent clear.
//! - [`DroneViewerScene`]: a stylised drone the viewer can orbit and zoom.
//!
//! Both are plain [`SceneProgram`](spymedia_engine::lifecycle::SceneProgram)s;
//! mounting, resizing and teardown are the engine's job.

mod drone;
mod hero;

use std::fmt;

use spymedia_engine::lifecycle::SceneFactory;
use spymedia_engine::scene::{NodeId, SceneGraph, Transform};

pub use drone::{DroneNodes, DroneViewerScene};
pub use hero::{HeroLensScene, HeroNodes};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SceneKind {
    Hero,
    Drone,
}

impl SceneKind {
    pub const ALL: [SceneKind; 2] = [SceneKind::Hero, SceneKind::Drone];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Hero => "hero",
            SceneKind::Drone => "drone",
        }
    }

    /// Factory mounting a fresh instance on every call.
    ///
    /// With a seed the hero's streaks and particles are identical across
    /// mounts; without one each mount scatters them anew.
    pub fn factory(self, seed: Option<u64>) -> Box<dyn SceneFactory> {
        match self {
            SceneKind::Hero => Box::new(move || match seed {
                Some(seed) => HeroLensScene::with_seed(seed),
                None => HeroLensScene::new(),
            }),
            SceneKind::Drone => Box::new(DroneViewerScene::new),
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn place(graph: &mut SceneGraph, node: NodeId, transform: Transform) {
    if let Some(t) = graph.transform_mut(node) {
        *t = transform;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::rc::Rc;

    use spymedia_engine::headless::HeadlessHost;
    use spymedia_engine::lifecycle::MountedScene;

    #[test]
    fn factories_mount_the_named_scene() {
        let host = Rc::new(HeadlessHost::new(640, 480));
        for kind in SceneKind::ALL {
            let mut scene = kind.factory(Some(1)).mount(host.clone()).unwrap();
            assert_eq!(scene.name(), kind.name());
            assert_eq!(kind.to_string(), kind.name());
            scene.finalize();
        }
        assert!(host.snapshot().is_clean());
    }
}
