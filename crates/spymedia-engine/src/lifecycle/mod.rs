//! Scene lifecycle: mount, animate, resize, interact, finalize.
//!
//! A scene is described by a [`SceneProgram`] (what to build, how to animate
//! it). [`SceneInstance`] runs one program against a [`Host`](crate::host::Host)
//! through the `Uninitialized -> Running -> Finalized` state machine. All
//! acquired resources live in a [`MountScope`] guard that releases them on
//! every exit path.

mod instance;
mod program;
mod scope;

pub use instance::{FrameOutcome, LifecycleState, MountedScene, SceneFactory, SceneInstance};
pub use program::{SceneConfig, SceneProgram};
pub use scope::{AliveFlag, MountScope};
