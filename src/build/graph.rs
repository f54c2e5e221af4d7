// src/build/graph.rs

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;

use crate::build::step::{BuildStep, StepSet};

/// Declared ordering between build steps.
///
/// ```text
/// clean -> compile-scripts -> generate
/// clean -> compile-styles  -> generate
/// ```
///
/// The two compile steps have disjoint outputs and no edge between them.
#[derive(Debug, Clone)]
pub struct StepGraph {
    graph: DiGraphMap<BuildStep, ()>,
}

impl Default for StepGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StepGraph {
    pub fn new() -> Self {
        let mut graph = DiGraphMap::new();
        for step in BuildStep::ALL {
            graph.add_node(step);
        }
        graph.add_edge(BuildStep::Clean, BuildStep::CompileScripts, ());
        graph.add_edge(BuildStep::Clean, BuildStep::CompileStyles, ());
        graph.add_edge(BuildStep::CompileScripts, BuildStep::Generate, ());
        graph.add_edge(BuildStep::CompileStyles, BuildStep::Generate, ());
        Self { graph }
    }

    /// Steps of `set` that must be terminal before `step` may start.
    ///
    /// Ordering is transitive, so in `{clean, generate}` generate still waits
    /// for clean even though the compile steps in between are absent.
    pub fn dependencies_within(&self, step: BuildStep, set: &StepSet) -> Vec<BuildStep> {
        set.iter()
            .filter(|&other| other != step && has_path_connecting(&self.graph, other, step, None))
            .collect()
    }

    /// Steps of `set` that transitively depend on `step`.
    pub fn dependents_within(&self, step: BuildStep, set: &StepSet) -> Vec<BuildStep> {
        set.iter()
            .filter(|&other| other != step && has_path_connecting(&self.graph, step, other, None))
            .collect()
    }

    /// `set` in a valid execution order.
    pub fn ordered(&self, set: &StepSet) -> Vec<BuildStep> {
        match toposort(&self.graph, None) {
            Ok(order) => order.into_iter().filter(|s| set.contains(*s)).collect(),
            // The graph is fixed and acyclic.
            Err(_) => set.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BuildSequence;

    #[test]
    fn generate_waits_for_both_compiles() {
        let g = StepGraph::new();
        let set = StepSet::from(BuildSequence::Rebuild);
        let deps = g.dependencies_within(BuildStep::Generate, &set);
        assert_eq!(deps, vec![BuildStep::CompileScripts, BuildStep::CompileStyles]);
        assert!(g.dependencies_within(BuildStep::CompileScripts, &set).is_empty());
    }

    #[test]
    fn ordering_is_transitive_across_missing_steps() {
        let g = StepGraph::new();
        let set = StepSet::from_sequences([BuildSequence::Clean, BuildSequence::Generate]);
        assert_eq!(
            g.dependencies_within(BuildStep::Generate, &set),
            vec![BuildStep::Clean]
        );
    }

    #[test]
    fn ordered_puts_clean_first_and_generate_last() {
        let g = StepGraph::new();
        let order = g.ordered(&StepSet::from(BuildSequence::Full));
        assert_eq!(order.first(), Some(&BuildStep::Clean));
        assert_eq!(order.last(), Some(&BuildStep::Generate));
    }
}
