//! Time subsystem.
//!
//! Scenes animate as pure functions of wall-clock time elapsed since mount,
//! so the clock only ever answers "how long have we been running".
//! Intended usage:
//! - one `AnimationClock` per mounted scene instance
//! - call `tick()` (or `tick_at()` with a host-provided timestamp) once per frame

mod animation_clock;

pub use animation_clock::{AnimationClock, FrameTime};
