//! Profile-driven build orchestrator for Quake-style map compilers.
//!
//! A build profile lists external tools (`qbsp`, `light`, `vis`, ...) with
//! argument templates; a map profile names a source map and where the
//! compiled result goes. The pipeline runs the tools in order against one map,
//! stops at the first failure, and places the compiled artifact.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoker;
pub mod launcher;
pub mod listing;
pub mod model;
pub mod pipeline;
pub mod resolver;
pub mod store;
