mod graph_builder;
mod propagator;

pub use graph_builder::{build_dependency_graph, canonical_path, BatchTarget};
pub use propagator::{propagate_risk, PropagationPolicy};
