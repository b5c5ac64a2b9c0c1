//! Circular reference detection between calculations.
//!
//! A calculation that (directly or through others) references itself would
//! recurse forever during resolution. This module searches the declared
//! reference graph depth-first for such loops.

use std::collections::{HashMap, HashSet};

use super::calculation::{CalcId, Calculation};
use super::deps::declared_references;

/// Declared references of every calculation, keyed by id.
pub fn reference_graph(calculations: &[Calculation]) -> HashMap<CalcId, Vec<CalcId>> {
    calculations
        .iter()
        .map(|c| (c.id.clone(), declared_references(c)))
        .collect()
}

/// Detect a reference cycle reachable from `start`.
/// Returns the loop as a path that begins and ends with the same id.
pub fn detect_cycle(start: &str, graph: &HashMap<CalcId, Vec<CalcId>>) -> Option<Vec<CalcId>> {
    let mut visiting = HashSet::new();
    let mut done = HashSet::new();
    let mut path = Vec::new();

    if detect_cycle_dfs(start, graph, &mut visiting, &mut done, &mut path) {
        // Drop the approach to the loop.
        let last = path.last()?;
        let first = path.iter().position(|id| id == last)?;
        Some(path.split_off(first))
    } else {
        None
    }
}

fn detect_cycle_dfs(
    current: &str,
    graph: &HashMap<CalcId, Vec<CalcId>>,
    visiting: &mut HashSet<CalcId>,
    done: &mut HashSet<CalcId>,
    path: &mut Vec<CalcId>,
) -> bool {
    if visiting.contains(current) {
        path.push(current.to_string());
        return true;
    }
    if done.contains(current) {
        return false;
    }

    let Some(deps) = graph.get(current) else {
        return false;
    };

    visiting.insert(current.to_string());
    path.push(current.to_string());

    for dep in deps {
        if detect_cycle_dfs(dep, graph, visiting, done, path) {
            return true;
        }
    }

    path.pop();
    visiting.remove(current);
    done.insert(current.to_string());
    false
}

/// Render a cycle path as `a -> b -> a`.
pub fn describe_cycle(path: &[CalcId]) -> String {
    path.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Parameter;

    fn calc(id: &str, refs: &[&str]) -> Calculation {
        refs.iter().fold(Calculation::standard(id, "0"), |c, r| {
            c.with_parameter(Parameter::reference(&format!("p_{}", r), r))
        })
    }

    #[test]
    fn test_no_cycle() {
        let graph = reference_graph(&[calc("a", &["b", "c"]), calc("b", &["c"]), calc("c", &[])]);
        assert_eq!(detect_cycle("a", &graph), None);
    }

    #[test]
    fn test_self_reference() {
        let graph = reference_graph(&[calc("a", &["a"])]);
        assert_eq!(detect_cycle("a", &graph), Some(vec!["a".to_string(), "a".to_string()]));
    }

    #[test]
    fn test_cycle_path_excludes_approach() {
        let graph = reference_graph(&[calc("x", &["a"]), calc("a", &["b"]), calc("b", &["a"])]);
        let cycle = detect_cycle("x", &graph).unwrap();
        assert_eq!(describe_cycle(&cycle), "a -> b -> a");
    }

    #[test]
    fn test_missing_reference_is_not_a_cycle() {
        let graph = reference_graph(&[calc("a", &["ghost"])]);
        assert_eq!(detect_cycle("a", &graph), None);
    }
}
