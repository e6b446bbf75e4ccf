//! # weft
//!
//! Graphics backend agnostic per-frame render pipeline for immediate-mode UI.
//!
//! A UI traversal records draw commands into frame arenas; at the end of the
//! frame the [`Context`] places glyphs and images in texture atlases, replays
//! the commands into batched vertex/index buffers and hands everything to a
//! [`RenderBackend`]. Images load asynchronously and can be drawn before their
//! pixels exist.

mod arena;
mod atlas;
mod batch;
mod color;
mod command;
mod font;
mod frame;
mod images;
mod string_arena;
pub mod tessellate;

pub use arena::*;
pub use atlas::*;
pub use batch::*;
pub use color::*;
pub use command::*;
pub use font::*;
pub use frame::*;
pub use images::*;
pub use string_arena::*;
