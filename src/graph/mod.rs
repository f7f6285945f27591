pub mod hierarchy;

pub use hierarchy::HierarchyGraph;
