//! The extraction engine.
//!
//! Data flows from the [`resolver`] (locate the start inode) through the
//! [`walker`] (traverse in enumeration order) into the [`materializer`]
//! (one host action per entry), which asks [`naming`] where each entry goes.

pub mod materializer;
pub mod naming;
pub mod resolver;
pub mod walker;

pub use materializer::Materializer;
pub use resolver::ResolvedTarget;
pub use resolver::resolve;
pub use walker::extract_target;
pub use walker::walk;
