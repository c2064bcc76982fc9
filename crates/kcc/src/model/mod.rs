//! Profile domain types: build/map profiles, scaffolds, and artifact naming.

pub mod naming;
pub mod scaffold;
pub mod types;

pub use naming::*;
pub use scaffold::*;
pub use types::*;
