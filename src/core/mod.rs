//! Core geometry primitives.
//!
//! Plain value types with no game knowledge. Everything above this module
//! (world model, resolvers, wire formats) builds on these two.

pub mod segment;
pub mod vec2;

// Re-export core types
pub use segment::Segment;
pub use vec2::Vec2;
