//! Reference analysis over calculation declarations.
//!
//! Recorded edges (see [`super::cache`]) reflect what the last resolution
//! touched. The functions here work from the definitions instead, so they
//! answer "what would be affected" before anything has run.

use std::collections::HashSet;

use super::calculation::{CalcId, Calculation};

/// Ids referenced by calculation-typed parameters, in declaration order,
/// without duplicates.
pub fn declared_references(calc: &Calculation) -> Vec<CalcId> {
    let mut refs: Vec<CalcId> = Vec::new();
    for id in calc.parameters.iter().filter_map(|p| p.referenced_calculation()) {
        if !refs.iter().any(|r| r == id) {
            refs.push(id.to_string());
        }
    }
    refs
}

/// Calculations that declare a parameter referencing `id`.
pub fn find_dependents(id: &str, calculations: &[Calculation]) -> Vec<CalcId> {
    calculations
        .iter()
        .filter(|c| c.parameters.iter().any(|p| p.referenced_calculation() == Some(id)))
        .map(|c| c.id.clone())
        .collect()
}

/// Every calculation that depends on `id` directly or through others.
pub fn transitive_dependents(id: &str, calculations: &[Calculation]) -> Vec<CalcId> {
    let mut to_process = vec![id.to_string()];
    let mut visited = HashSet::new();
    let mut dependents = Vec::new();

    while let Some(current) = to_process.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        for dep in find_dependents(&current, calculations) {
            if dep != id && !dependents.contains(&dep) {
                dependents.push(dep.clone());
            }
            to_process.push(dep);
        }
    }

    dependents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Parameter;

    fn calc(id: &str, refs: &[&str]) -> Calculation {
        refs.iter().fold(
            Calculation::standard(id, "0").with_parameter(Parameter::literal("x")),
            |c, r| c.with_parameter(Parameter::reference(&format!("p_{}", r), r)),
        )
    }

    #[test]
    fn test_declared_references() {
        let c = calc("a", &["b", "c", "b"]);
        assert_eq!(declared_references(&c), vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_blank_reference_is_ignored() {
        let c = calc("a", &["  "]);
        assert!(declared_references(&c).is_empty());
    }

    #[test]
    fn test_dependents() {
        let calcs = vec![calc("area", &[]), calc("volume", &["area"]), calc("mass", &["volume"]), calc("cost", &["area"])];
        assert_eq!(find_dependents("area", &calcs), vec!["volume".to_string(), "cost".to_string()]);

        let mut all = transitive_dependents("area", &calcs);
        all.sort();
        assert_eq!(all, vec!["cost".to_string(), "mass".to_string(), "volume".to_string()]);
    }
}
