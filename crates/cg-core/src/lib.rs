//! content-graph/crates/cg-core/src/lib.rs
//!
//! The central domain model and interface definitions for the content graph.

pub mod error;
pub mod ids;
pub mod models;
pub mod notify;
pub mod pagination;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use ids::parse_canonical;
pub use models::*;
pub use notify::{BroadcastSink, NullSink};
pub use pagination::{paginate_slice, PageRequest};
pub use traits::*;
