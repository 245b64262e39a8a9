use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use log::debug;

use crate::controls::OrbitControls;
use crate::coords::Viewport;
use crate::host::{FrameRequestId, Host};
use crate::input::InputEvent;
use crate::scene::{PerspectiveCamera, SceneGraph};
use crate::time::{AnimationClock, FrameTime};

use super::{AliveFlag, MountScope, SceneConfig, SceneProgram};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LifecycleState {
    /// Never mounted: the container was missing or empty.
    Uninitialized,
    Running,
    Finalized,
}

#[derive(Debug, Copy, Clone)]
pub enum FrameOutcome {
    Rendered(FrameTime),
    /// Not the request this instance is waiting for.
    Stale,
    /// The instance is inert or finalized; nothing ran.
    Stopped,
}

/// One mounted scene.
pub struct SceneInstance<P: SceneProgram> {
    program: P,
    config: SceneConfig,
    state: LifecycleState,
    scope: Option<MountScope>,
    camera: PerspectiveCamera,
    graph: SceneGraph,
    nodes: Option<P::Nodes>,
    clock: AnimationClock,
}

impl<P: SceneProgram> SceneInstance<P> {
    pub fn mount(program: P, host: Rc<dyn Host>) -> Result<Self> {
        Self::mount_at(program, host, Instant::now())
    }

    /// Mounts `program` into the host's container with the clock starting at
    /// `now`.
    ///
    /// A missing or zero-sized container yields an inert instance. The first
    /// frame is requested, not rendered; it arrives through
    /// [`SceneInstance::on_frame`].
    pub fn mount_at(program: P, host: Rc<dyn Host>, now: Instant) -> Result<Self> {
        let config = program.config();

        let Some(size) = host.container_size().filter(|s| !s.is_empty()) else {
            debug!("{}: no usable container, staying inert", program.name());
            return Ok(Self::inert(program, config, now));
        };

        // Any early return below drops `scope`, releasing what it holds.
        let mut scope = MountScope::new(host.clone());

        let mut surface = host
            .create_surface(&config.surface)
            .with_context(|| format!("{}: failed to create render surface", program.name()))?;
        surface.set_pixel_ratio(config.surface.clamp_pixel_ratio(host.device_pixel_ratio()));
        surface.set_size(size.width, size.height);
        surface.set_clear_color(config.surface.resolve_clear_color(config.background));
        let output = surface.output();
        scope.surface = Some(surface);

        host.insert_output(output)
            .with_context(|| format!("{}: failed to attach output", program.name()))?;
        scope.output = Some(output);

        let camera = PerspectiveCamera::new(config.camera, size.aspect());

        let mut graph = SceneGraph::new();
        graph.background = config.background;
        graph.fog = config.fog;
        let nodes = program.build(&mut graph);

        if let Some(surface) = scope.surface.as_mut() {
            surface
                .upload(&graph)
                .with_context(|| format!("{}: failed to upload geometry", program.name()))?;
        }

        scope.controls = config.controls.map(|c| OrbitControls::new(c, &camera));
        scope.listener = Some(host.add_resize_listener());

        let clock = AnimationClock::start_at(now);
        scope.pending_frame = Some(host.request_frame());

        debug!(
            "{}: mounted at {}x{} ({} nodes)",
            program.name(),
            size.width,
            size.height,
            graph.node_count()
        );

        Ok(Self {
            program,
            config,
            state: LifecycleState::Running,
            scope: Some(scope),
            camera,
            graph,
            nodes: Some(nodes),
            clock,
        })
    }

    fn inert(program: P, config: SceneConfig, now: Instant) -> Self {
        Self {
            camera: PerspectiveCamera::new(config.camera, 1.0),
            program,
            config,
            state: LifecycleState::Uninitialized,
            scope: None,
            graph: SceneGraph::new(),
            nodes: None,
            clock: AnimationClock::start_at(now),
        }
    }

    /// Runs one animation frame for `request`.
    ///
    /// Advances the clock, steps the controls, applies the program's
    /// animation, renders once and requests the next frame. Render errors
    /// propagate and stop the driver.
    pub fn on_frame(&mut self, request: FrameRequestId, now: Instant) -> Result<FrameOutcome> {
        let Some(scope) = self.scope.as_mut() else {
            return Ok(FrameOutcome::Stopped);
        };
        if !scope.alive().is_alive() {
            return Ok(FrameOutcome::Stopped);
        }
        if scope.pending_frame != Some(request) {
            return Ok(FrameOutcome::Stale);
        }
        scope.pending_frame = None;

        let time = self.clock.tick_at(now);

        if let Some(controls) = scope.controls.as_mut() {
            controls.update(&mut self.camera, time.dt);
        }
        if let Some(nodes) = &self.nodes {
            self.program.animate(nodes, &mut self.graph, time.elapsed);
        }

        let surface = scope
            .surface
            .as_mut()
            .context("running scene has no render surface")?;
        surface
            .render(&self.graph, &self.camera)
            .with_context(|| format!("{}: render failed", self.program.name()))?;

        if scope.alive().is_alive() {
            scope.pending_frame = Some(scope.host().request_frame());
        }

        Ok(FrameOutcome::Rendered(time))
    }

    /// Re-reads the container size and matches surface and camera to it.
    ///
    /// Returns false when nothing was applied: the instance is not running,
    /// its listener is gone or the container is missing.
    pub fn on_resize(&mut self) -> bool {
        if self.state != LifecycleState::Running {
            return false;
        }
        let Some(scope) = self.scope.as_mut() else {
            return false;
        };
        if scope.listener.is_none() {
            return false;
        }
        let Some(size) = scope.host().container_size().filter(|s| !s.is_empty()) else {
            return false;
        };

        let ratio = self
            .config
            .surface
            .clamp_pixel_ratio(scope.host().device_pixel_ratio());
        if let Some(surface) = scope.surface.as_mut() {
            surface.set_pixel_ratio(ratio);
            surface.set_size(size.width, size.height);
        }

        self.camera.aspect = size.aspect();
        self.camera.update_projection_matrix();
        true
    }

    /// Forwards pointer, touch and wheel input to the orbit controls.
    pub fn on_input(&mut self, event: &InputEvent) -> bool {
        if self.state != LifecycleState::Running {
            return false;
        }
        let Some(scope) = self.scope.as_mut() else {
            return false;
        };
        let height = scope
            .surface
            .as_ref()
            .map(|s| s.viewport().height as f32)
            .unwrap_or(1.0);

        match scope.controls.as_mut() {
            Some(controls) => controls.handle_event(event, height),
            None => false,
        }
    }

    /// Releases everything the instance holds. Safe to call repeatedly.
    pub fn finalize(&mut self) {
        if self.state == LifecycleState::Finalized {
            return;
        }
        if let Some(scope) = self.scope.as_mut() {
            scope.release();
        }
        self.state = LifecycleState::Finalized;
        debug!("{}: finalized", self.program.name());
    }

    pub fn name(&self) -> &str {
        self.program.name()
    }

    pub fn program(&self) -> &P {
        &self.program
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn nodes(&self) -> Option<&P::Nodes> {
        self.nodes.as_ref()
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.scope.as_ref()?.controls.as_ref()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        let scope = self.scope.as_ref()?;
        scope.surface.as_ref().map(|s| s.viewport())
    }

    pub fn alive_flag(&self) -> Option<AliveFlag> {
        self.scope.as_ref().map(|s| s.alive().clone())
    }

    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.scope.as_ref()?.pending_frame
    }
}

impl<P: SceneProgram> Drop for SceneInstance<P> {
    fn drop(&mut self) {
        self.finalize();
    }
}

/// Object-safe view of a scene instance, for hosts that drive several
/// different programs.
pub trait MountedScene {
    fn name(&self) -> &str;
    fn state(&self) -> LifecycleState;
    fn pending_frame(&self) -> Option<FrameRequestId>;
    fn on_frame(&mut self, request: FrameRequestId, now: Instant) -> Result<FrameOutcome>;
    fn on_resize(&mut self) -> bool;
    fn on_input(&mut self, event: &InputEvent) -> bool;
    fn finalize(&mut self);
}

impl<P: SceneProgram> MountedScene for SceneInstance<P> {
    fn name(&self) -> &str {
        SceneInstance::name(self)
    }

    fn state(&self) -> LifecycleState {
        SceneInstance::state(self)
    }

    fn pending_frame(&self) -> Option<FrameRequestId> {
        SceneInstance::pending_frame(self)
    }

    fn on_frame(&mut self, request: FrameRequestId, now: Instant) -> Result<FrameOutcome> {
        SceneInstance::on_frame(self, request, now)
    }

    fn on_resize(&mut self) -> bool {
        SceneInstance::on_resize(self)
    }

    fn on_input(&mut self, event: &InputEvent) -> bool {
        SceneInstance::on_input(self, event)
    }

    fn finalize(&mut self) {
        SceneInstance::finalize(self)
    }
}

/// Something that can mount fresh instances of a scene, e.g. on remount.
pub trait SceneFactory {
    fn mount(&self, host: Rc<dyn Host>) -> Result<Box<dyn MountedScene>>;
}

impl<F, P> SceneFactory for F
where
    F: Fn() -> P,
    P: SceneProgram + 'static,
{
    fn mount(&self, host: Rc<dyn Host>) -> Result<Box<dyn MountedScene>> {
        Ok(Box::new(SceneInstance::mount(self(), host)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use glam::Vec3;

    use crate::controls::OrbitConfig;
    use crate::headless::{HeadlessHost, drive_frames};
    use crate::input::{
        Modifiers, MouseButton, MouseButtonState, PointerButtonEvent, PointerMoveEvent,
    };
    use crate::paint::Color;
    use crate::scene::{Geometry, Light, Material, NodeId};

    const SPIN_RATE: f32 = 0.5;

    #[derive(Default)]
    struct Spinner {
        controls: Option<OrbitConfig>,
    }

    impl SceneProgram for Spinner {
        type Nodes = NodeId;

        fn name(&self) -> &str {
            "spinner"
        }

        fn config(&self) -> SceneConfig {
            SceneConfig {
                controls: self.controls,
                ..SceneConfig::default()
            }
        }

        fn build(&self, graph: &mut SceneGraph) -> NodeId {
            let geo = graph.add_geometry(Geometry::cuboid(1.0, 1.0, 1.0));
            let mat = graph.add_material(Material::standard(Color::WHITE));
            let mesh = graph.add_mesh(graph.root(), geo, mat);
            graph.add_light(graph.root(), Light::ambient(Color::WHITE, 0.5));
            mesh
        }

        fn animate(&self, mesh: &NodeId, graph: &mut SceneGraph, elapsed: f32) {
            if let Some(t) = graph.transform_mut(*mesh) {
                t.rotation.y = SPIN_RATE * elapsed;
            }
        }
    }

    fn host(width: u32, height: u32) -> Rc<HeadlessHost> {
        Rc::new(HeadlessHost::new(width, height))
    }

    /// Delivers every pending request to `scene` at `now`.
    fn pump(host: &HeadlessHost, scene: &mut SceneInstance<Spinner>, now: Instant) -> usize {
        let mut rendered = 0;
        for request in host.take_frame_requests() {
            if let FrameOutcome::Rendered(_) = scene.on_frame(request, now).unwrap() {
                rendered += 1;
            }
        }
        rendered
    }

    #[test]
    fn mount_acquires_and_schedules_without_rendering() {
        let host = host(800, 600);
        let scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();

        assert_eq!(scene.state(), LifecycleState::Running);
        let snap = host.snapshot();
        assert_eq!(snap.outputs, 1);
        assert_eq!(snap.resize_listeners, 1);
        assert_eq!(snap.pending_frames, 1);
        assert_eq!(snap.live_surfaces, 1);
        assert_eq!(snap.live_buffers, 2);
        assert_eq!(snap.renders, 0);

        assert_eq!(scene.camera().aspect, 800.0 / 600.0);
        assert_eq!(scene.viewport(), Some(Viewport::new(800, 600, 1.0)));
    }

    #[test]
    fn unmount_before_first_frame_leaves_nothing() {
        let host = host(800, 600);
        let mut scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();
        let first = scene.pending_frame().unwrap();

        scene.finalize();
        assert_eq!(scene.state(), LifecycleState::Finalized);
        assert!(host.snapshot().is_clean());

        // Even if the host delivered the cancelled callback anyway.
        assert!(matches!(scene.on_frame(first, Instant::now()).unwrap(), FrameOutcome::Stopped));
        assert_eq!(host.snapshot().renders, 0);
        assert_eq!(host.snapshot().rejected_renders, 0);
    }

    #[test]
    fn missing_container_is_inert() {
        let host = Rc::new(HeadlessHost::detached());
        let mut scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();

        assert_eq!(scene.state(), LifecycleState::Uninitialized);
        assert!(scene.nodes().is_none());
        assert!(!scene.on_resize());
        assert!(host.snapshot().is_clean());
        assert_eq!(host.snapshot(), Default::default());

        scene.finalize();
        assert_eq!(scene.state(), LifecycleState::Finalized);
    }

    #[test]
    fn zero_sized_container_is_inert() {
        let host = host(0, 600);
        let scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();
        assert_eq!(scene.state(), LifecycleState::Uninitialized);
        assert_eq!(host.snapshot(), Default::default());
    }

    #[test]
    fn resize_sets_exact_aspect() {
        let host = host(800, 600);
        let mut scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();

        host.resize(1023, 767);
        host.set_pixel_ratio(3.0);
        assert!(scene.on_resize());

        assert_eq!(scene.camera().aspect, 1023.0 / 767.0);
        assert_eq!(scene.viewport(), Some(Viewport::new(1023, 767, 2.0)));

        let expected = PerspectiveCamera::new(SceneConfig::default().camera, 1023.0 / 767.0);
        assert_eq!(scene.camera().projection_matrix(), expected.projection_matrix());

        assert_eq!(pump(&host, &mut scene, Instant::now()), 1);
        let snap = host.snapshot();
        assert_eq!(snap.last_backing_size, (2046, 1534));
        assert_eq!(snap.last_draw_count, 1);
    }

    #[test]
    fn resize_after_finalize_is_ignored() {
        let host = host(800, 600);
        let mut scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();
        let aspect = scene.camera().aspect;
        scene.finalize();

        host.resize(300, 900);
        assert!(!scene.on_resize());
        assert_eq!(scene.camera().aspect, aspect);
        assert_eq!(host.snapshot().resize_listeners, 0);
    }

    #[test]
    fn resize_with_missing_container_is_ignored() {
        let host = host(800, 600);
        let mut scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();
        host.detach();
        assert!(!scene.on_resize());
        scene.finalize();
        assert!(host.snapshot().is_clean());
    }

    #[test]
    fn rotation_is_linear_in_elapsed_time() {
        let host = host(800, 600);
        let t0 = Instant::now();
        let mut scene = SceneInstance::mount_at(Spinner::default(), host.clone(), t0).unwrap();
        let mesh = *scene.nodes().unwrap();

        // Irregular frame spacing, including a long stall.
        let mut at = Duration::ZERO;
        for step_ms in [16, 17, 16, 250, 3, 1000, 16] {
            at += Duration::from_millis(step_ms);
            assert_eq!(pump(&host, &mut scene, t0 + at), 1);

            let rotation = scene.graph().transform(mesh).unwrap().rotation.y;
            let expected = SPIN_RATE * at.as_secs_f32();
            assert!((rotation - expected).abs() < 1e-5, "{rotation} != {expected}");
        }
    }

    #[test]
    fn each_frame_renders_once_and_reschedules() {
        let host = host(800, 600);
        let t0 = Instant::now();
        let mut scene = SceneInstance::mount_at(Spinner::default(), host.clone(), t0).unwrap();

        for i in 1..=5u64 {
            assert_eq!(pump(&host, &mut scene, t0 + Duration::from_millis(16 * i)), 1);
            assert_eq!(host.snapshot().pending_frames, 1);
        }
        assert_eq!(host.snapshot().renders, 5);
    }

    #[test]
    fn stale_request_is_ignored() {
        let host = host(800, 600);
        let mut scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();
        let foreign = host.request_frame();

        assert!(matches!(scene.on_frame(foreign, Instant::now()).unwrap(), FrameOutcome::Stale));
        assert_eq!(host.snapshot().renders, 0);
    }

    #[test]
    fn frame_after_finalize_never_renders() {
        let host = host(800, 600);
        let t0 = Instant::now();
        let mut scene = SceneInstance::mount_at(Spinner::default(), host.clone(), t0).unwrap();
        pump(&host, &mut scene, t0 + Duration::from_millis(16));

        let request = scene.pending_frame().unwrap();
        scene.finalize();

        assert!(matches!(
            scene.on_frame(request, t0 + Duration::from_millis(32)).unwrap(),
            FrameOutcome::Stopped
        ));
        let snap = host.snapshot();
        assert_eq!(snap.renders, 1);
        assert_eq!(snap.rejected_renders, 0);
        assert!(snap.is_clean());
    }

    #[test]
    fn fifty_mount_cycles_leave_no_resources() {
        let host = host(800, 600);
        let t0 = Instant::now();

        for cycle in 0..50u64 {
            let start = t0 + Duration::from_secs(cycle);
            let mut scene =
                SceneInstance::mount_at(Spinner::default(), host.clone(), start).unwrap();
            for f in 0..(cycle % 4) {
                pump(&host, &mut scene, start + Duration::from_millis(16 * (f + 1)));
            }
            if cycle % 2 == 0 {
                scene.finalize();
            }
            // Odd cycles release through Drop.
        }

        let snap = host.snapshot();
        assert!(snap.is_clean(), "{snap:?}");
        assert_eq!(snap.rejected_renders, 0);
    }

    #[test]
    fn surface_failure_propagates_and_leaks_nothing() {
        let host = host(800, 600);
        host.fail_next_surface();
        let err = SceneInstance::mount(Spinner::default(), host.clone()).err().unwrap();
        assert!(format!("{err:#}").contains("failed to create render surface"));
        assert!(host.snapshot().is_clean());
    }

    #[test]
    fn upload_failure_releases_partial_mount() {
        let host = host(800, 600);
        host.fail_next_upload();
        assert!(SceneInstance::mount(Spinner::default(), host.clone()).is_err());
        assert!(host.snapshot().is_clean());
    }

    #[test]
    fn finalize_tolerates_removed_container() {
        let host = host(800, 600);
        let mut scene = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();
        host.detach();
        scene.finalize();
        scene.finalize();
        assert!(host.snapshot().is_clean());
    }

    #[test]
    fn input_reaches_controls_only_when_configured() {
        let press = InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state: MouseButtonState::Pressed,
            x: 10.0,
            y: 10.0,
            modifiers: Modifiers::default(),
        });

        let host = host(800, 600);
        let mut plain = SceneInstance::mount(Spinner::default(), host.clone()).unwrap();
        assert!(!plain.on_input(&press));

        let mut orbiting = SceneInstance::mount(
            Spinner {
                controls: Some(OrbitConfig::default()),
            },
            host.clone(),
        )
        .unwrap();
        assert!(orbiting.on_input(&press));
        let drag = InputEvent::PointerMoved(PointerMoveEvent { x: 60.0, y: 10.0 });
        assert!(orbiting.on_input(&drag));

        let before = orbiting.camera().position;
        let t0 = Instant::now();
        for request in host.take_frame_requests() {
            plain.on_frame(request, t0).unwrap();
            orbiting.on_frame(request, t0).unwrap();
        }
        assert_ne!(orbiting.camera().position, before);
        assert!((orbiting.camera().position.length() - 5.0).abs() < 1e-4);
        assert_eq!(plain.camera().position, Vec3::new(0.0, 0.0, 5.0));

        orbiting.finalize();
        assert!(orbiting.controls().unwrap().is_disposed());
        assert!(!orbiting.on_input(&press));
    }

    #[test]
    fn factory_mounts_boxed_scenes() {
        let host = host(800, 600);
        let factory = Spinner::default;
        let mut scenes = vec![
            factory.mount(host.clone()).unwrap(),
            factory.mount(host.clone()).unwrap(),
        ];

        let rendered = drive_frames(
            &host,
            &mut scenes,
            Instant::now(),
            10,
            Duration::from_millis(16),
        )
        .unwrap();
        assert_eq!(rendered, 20);

        for scene in &mut scenes {
            scene.finalize();
            assert_eq!(scene.state(), LifecycleState::Finalized);
        }
        assert!(host.snapshot().is_clean());
    }
}
