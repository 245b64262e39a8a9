//! SPYMEDIA scene engine.
//!
//! Runs animated 3D scenes through a mount / animate / resize / interact /
//! finalize lifecycle. A scene is a [`lifecycle::SceneProgram`]: it builds a
//! [`scene::SceneGraph`] once and mutates transforms every frame.
//! Scenes run against a [`host::Host`], which is a winit window with a wgpu
//! surface on the desktop ([`window`], [`render`], [`device`]) and an
//! in-memory resource counter in tests ([`headless`]).

pub mod logging;
pub mod time;
pub mod coords;
pub mod paint;
pub mod input;

pub mod scene;
pub mod controls;

pub mod host;
pub mod surface;
pub mod lifecycle;
pub mod headless;

pub mod device;
pub mod render;
pub mod window;
