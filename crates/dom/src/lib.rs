//! The tag tree and its two decoration passes.
//!
//! An external tokenizer hands over a flat list of [`TagToken`]s; this
//! crate builds the parent/child/sibling tree, repairs the structural
//! damage lenient parsers leave behind, normalizes form semantics
//! (prerender), and mirrors the tree into a scripting engine's object
//! graph (decorate).

pub mod build;
pub mod decorate;
pub mod node;
pub mod prerender;
pub mod repair;
pub mod tag;

pub use build::{append_tokens, build_tree, DocumentBase, TagToken};
pub use decorate::{decorate, prepare_document, Decorator};
pub use node::{Id, Node, NodeArena, Step};
pub use prerender::{display_options, prerender, DocumentHooks, NoHooks, PrerenderOutcome};
pub use repair::repair_tree;
pub use tag::{tag_info, Action, InputType};
