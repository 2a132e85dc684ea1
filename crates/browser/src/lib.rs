//! Glue between the tag tree and the transfer layer: one browsed
//! document owning the arena, the scripting engine, and a context per
//! frame, with frames fetched through `net` on demand.

pub mod context;
pub mod document;

pub use context::FrameContext;
pub use document::Document;
