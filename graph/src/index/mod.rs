pub mod adjacency;

pub use adjacency::AdjacencyIndex;
