//! # Ragkit Vector
//!
//! Vector database implementations of the `ragkit-core` seam:
//! - [`QdrantHttp`]: client for the Qdrant REST API (timestamped
//!   collections, aliases, hybrid queries with server-side RRF)
//! - [`MemoryVectorDb`]: in-memory store with client-side dense/sparse
//!   scoring and RRF fusion, for tests and local runs
//! - [`HashedSparseEmbedder`]: keyword-weight sparse embedding

pub mod memory;
pub mod qdrant;
pub mod rrf;
pub mod sparse;

pub use memory::MemoryVectorDb;
pub use qdrant::QdrantHttp;
pub use rrf::{FusedHit, RrfConfig, RrfFusion};
pub use sparse::HashedSparseEmbedder;
