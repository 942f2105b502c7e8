//! Dependency analysis between steps
//!
//! A step depends on another step when its prompt references
//! `{other_output}` or `{other_summary}`. Dependencies are derived from the
//! prompt text and are never stored.

use crate::core::step::Step;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-z0-9_]+)_(?:output|summary)\}").expect("placeholder pattern is valid")
});

/// Ids referenced by `prompt` that exist in `known_ids`, excluding `own_id`
fn referenced_ids(prompt: &str, own_id: &str, known_ids: &HashSet<String>) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(prompt) {
        let candidate = &caps[1];
        if candidate != own_id
            && known_ids.contains(candidate)
            && !found.iter().any(|id| id == candidate)
        {
            found.push(candidate.to_string());
        }
    }
    found
}

/// Detect the dependencies of `step` against the given step set
pub fn detect_dependencies(step: &Step, all_steps: &[Step]) -> Vec<String> {
    let known_ids: HashSet<String> = all_steps.iter().map(|s| s.id.clone()).collect();
    referenced_ids(&step.content.step_prompt, &step.id, &known_ids)
}

/// Recompute the derived dependency list of every step
pub fn refresh_dependencies(steps: &mut [Step]) {
    let known_ids: HashSet<String> = steps.iter().map(|s| s.id.clone()).collect();
    for step in steps.iter_mut() {
        step.dependencies = referenced_ids(&step.content.step_prompt, &step.id, &known_ids);
    }
}

/// Adjacency map from step id to the ids it depends on
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Build the graph from the steps' dependency lists
    pub fn from_steps(steps: &[Step]) -> Self {
        let edges = steps
            .iter()
            .map(|s| (s.id.clone(), s.dependencies.clone()))
            .collect();
        Self { edges }
    }

    pub fn dependencies_of(&self, step_id: &str) -> &[String] {
        self.edges.get(step_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the graph contains a directed cycle
    pub fn has_cycles(&self) -> bool {
        self.find_cycle().is_some()
    }

    /// Return one cycle as a path of ids whose last element repeats the first
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited = HashSet::new();

        for step_id in self.edges.keys() {
            if !visited.contains(step_id.as_str()) {
                if let Some(cycle) = self.search(step_id, &mut visited, None) {
                    return Some(cycle);
                }
            }
        }

        None
    }

    /// Return a cycle that passes through `step_id`, starting and ending there
    pub fn find_cycle_through(&self, step_id: &str) -> Option<Vec<String>> {
        let root = self.edges.get_key_value(step_id)?.0;
        self.search(root, &mut HashSet::new(), Some(step_id))
    }

    /// Depth-first walk from `root` with an explicit stack.
    ///
    /// Reports the first edge back onto the current path, or only edges
    /// back to `target` when one is given.
    fn search<'a>(
        &'a self,
        root: &'a str,
        visited: &mut HashSet<&'a str>,
        target: Option<&str>,
    ) -> Option<Vec<String>> {
        let mut path: Vec<&'a str> = vec![root];
        let mut cursors: Vec<usize> = vec![0];
        let mut on_path: HashSet<&'a str> = HashSet::from([root]);

        while let Some(&step_id) = path.last() {
            let depth = path.len() - 1;
            let Some(dep) = self.dependencies_of(step_id).get(cursors[depth]) else {
                path.pop();
                cursors.pop();
                on_path.remove(step_id);
                visited.insert(step_id);
                continue;
            };
            cursors[depth] += 1;
            let dep = dep.as_str();

            if on_path.contains(dep) {
                if target.map_or(true, |t| t == dep) {
                    let start = path.iter().position(|id| *id == dep).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                    cycle.push(dep.to_string());
                    return Some(cycle);
                }
                continue;
            }
            if !visited.contains(dep) {
                path.push(dep);
                cursors.push(0);
                on_path.insert(dep);
            }
        }

        None
    }
}

/// Whether the steps' dependency lists form a cycle
pub fn has_cycles(steps: &[Step]) -> bool {
    DependencyGraph::from_steps(steps).has_cycles()
}
