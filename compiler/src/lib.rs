// nmc — Node Material Compiler
//
// Library root. One module per pipeline stage plus the shared modules they
// build on; `cache` is the entry point for callers.

pub mod builder;
pub mod cache;
pub mod channels;
pub mod compose;
pub mod diag;
pub mod dot;
pub mod error;
pub mod glsl;
pub mod graph;
pub mod id;
pub mod merge;
pub mod node_type;
pub mod pass;
pub mod pipeline;
pub mod prune;
pub mod rewrite;
pub mod tree;
pub mod validate;
