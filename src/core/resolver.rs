//! Dependency resolution
//!
//! Computes each unit's full dependency list and the global build order,
//! detecting circular dependencies.

use crate::core::unit::{UnitId, UnitTable};
use crate::core::unit_list::UnitList;
use crate::error::ResolverError;

/// Resolve every unit in the table and compute the build order
///
/// The build order lists each unit's full dependency list followed by the
/// unit itself, for every unit in creation order, without duplicates. Every
/// dependency therefore precedes every dependent.
pub fn resolve(units: &mut UnitTable) -> Result<UnitList, ResolverError> {
    let ids: Vec<UnitId> = units.ids().collect();
    let mut parents = Vec::new();
    let mut order = UnitList::new();

    for id in ids {
        visit(units, id, &mut parents)?;
        if let Some(full) = units[id].full_dependencies() {
            order.add_all(full.iter());
        }
        order.add(id);
    }

    tracing::debug!("Build order: {}", units.names(&order).join(", "));
    Ok(order)
}

/// Compute the full dependency list of `id`
///
/// `parents` holds the units currently being visited; meeting one of them
/// again means the graph has a cycle.
fn visit(units: &mut UnitTable, id: UnitId, parents: &mut Vec<UnitId>) -> Result<(), ResolverError> {
    if units[id].full_dependencies().is_some() {
        return Ok(());
    }

    if let Some(start) = parents.iter().position(|&p| p == id) {
        let mut cycle: Vec<String> = parents[start..]
            .iter()
            .map(|&p| units[p].name().to_string())
            .collect();
        cycle.push(units[id].name().to_string());
        return Err(ResolverError::CircularDependency { cycle });
    }

    parents.push(id);
    let mut list = UnitList::new();
    let deps = units[id].direct_dependencies().to_vec();
    for dep in deps {
        visit(units, dep, parents)?;
        if let Some(full) = units[dep].full_dependencies() {
            list.add_all(full.iter());
        }
        list.add(dep);
    }
    parents.pop();

    units[id].set_full_dependencies(list);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::MIN_PROPTEST_ITERATIONS;
    use crate::test_utils::fakes::FakeMaker;
    use crate::test_utils::generators::dag;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::path::PathBuf;

    /// Build a table from (name, dependencies) pairs
    fn table(graph: &[(&str, &[&str])]) -> UnitTable {
        let mut units = UnitTable::new();
        for (name, _) in graph {
            units.insert("main", Box::new(FakeMaker::new(name)), PathBuf::from("/out").join(name));
        }
        for (name, deps) in graph {
            let id = units.id_of(name).unwrap();
            for dep in *deps {
                let dep = units.id_of(dep).unwrap();
                units[id].add_direct_dependency(dep);
            }
        }
        units
    }

    #[test]
    fn test_simple_dependency_order() {
        let mut units = table(&[("app", &["lib"]), ("lib", &["core"]), ("core", &[])]);
        let order = resolve(&mut units).unwrap();
        assert_eq!(units.names(&order), vec!["core", "lib", "app"]);

        let app = units.by_name("app").unwrap();
        let names = units.names(app.full_dependencies().unwrap());
        assert_eq!(names, vec!["core", "lib"]);
    }

    #[test]
    fn test_shared_dependency_appears_once() {
        let mut units = table(&[
            ("app", &["left", "right"]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("base", &[]),
        ]);
        let order = resolve(&mut units).unwrap();
        assert_eq!(units.names(&order), vec!["base", "left", "right", "app"]);
        let app = units.by_name("app").unwrap();
        assert_eq!(app.full_dependencies().unwrap().len(), 3);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let mut units = table(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        match resolve(&mut units) {
            Err(ResolverError::CircularDependency { cycle }) => {
                assert_eq!(cycle, vec!["a", "b", "c", "a"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_below_the_root_is_traced_from_its_start() {
        let mut units = table(&[("app", &["a"]), ("a", &["b"]), ("b", &["a"])]);
        let err = resolve(&mut units).unwrap_err();
        assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut units = table(&[("a", &["a"])]);
        assert!(matches!(
            resolve(&mut units),
            Err(ResolverError::CircularDependency { cycle }) if cycle == vec!["a", "a"]
        ));
    }

    fn reachable(graph: &[Vec<usize>], from: usize) -> HashSet<usize> {
        let mut seen = HashSet::new();
        let mut stack = graph[from].clone();
        while let Some(n) = stack.pop() {
            if seen.insert(n) {
                stack.extend(graph[n].iter().copied());
            }
        }
        seen
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(MIN_PROPTEST_ITERATIONS))]

        #[test]
        fn test_build_order_is_topological(graph in dag(25)) {
            let names: Vec<String> = (0..graph.len()).map(|i| format!("m{i}")).collect();
            // Insert in reverse so creation order differs from dependency order
            let mut units = UnitTable::new();
            for name in names.iter().rev() {
                units.insert("main", Box::new(FakeMaker::new(name)), PathBuf::from(name));
            }
            for (i, deps) in graph.iter().enumerate() {
                let id = units.id_of(&names[i]).unwrap();
                for &d in deps {
                    let dep = units.id_of(&names[d]).unwrap();
                    units[id].add_direct_dependency(dep);
                }
            }

            let order = resolve(&mut units).unwrap();
            prop_assert_eq!(order.len(), graph.len());

            for (i, _) in graph.iter().enumerate() {
                let id = units.id_of(&names[i]).unwrap();
                let full = units[id].full_dependencies().unwrap();
                prop_assert!(!full.contains(id));
                let pos = order.position(id).unwrap();
                for dep in full {
                    prop_assert!(order.position(dep).unwrap() < pos);
                }
                let expected: HashSet<String> =
                    reachable(&graph, i).into_iter().map(|n| names[n].clone()).collect();
                let actual: HashSet<String> = units.names(full).into_iter().collect();
                prop_assert_eq!(actual, expected);
            }
        }
    }
}
