//! Insertion-order resolution for data models.
//!
//! Explicit `dependencies` are hard edges and must be acyclic. Foreign-key
//! edges are overlaid afterwards and only kept when they do not close a cycle.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

use crate::datamodel::{DataModel, table_ref};
use crate::error::{Error, Result};
use crate::issues::Warning;
use crate::model::{EntityInfo, SchemaManager};

type Graph = BTreeMap<EntityInfo, BTreeSet<EntityInfo>>;

/// Data models in insertion order plus the FK edges that had to be dropped.
#[derive(Debug, Clone)]
pub struct ResolvedOrder<'a> {
    pub models: Vec<&'a DataModel>,
    pub warnings: Vec<Warning>,
}

/// Serializable summary of a [`ResolvedOrder`].
#[derive(Debug, Clone, Serialize)]
pub struct OrderReport {
    pub order: Vec<String>,
    pub warnings: Vec<Warning>,
}

impl ResolvedOrder<'_> {
    pub fn keys(&self) -> Vec<String> {
        self.models.iter().map(|model| model.key()).collect()
    }

    pub fn report(&self) -> OrderReport {
        OrderReport {
            order: self.keys(),
            warnings: self.warnings.clone(),
        }
    }
}

/// Order `models` so every table follows the tables it depends on.
///
/// Ties are broken by `(schema, table)` so the result is deterministic.
pub fn resolve_insertion_order<'a>(
    models: &'a [DataModel],
    schemas: &SchemaManager,
) -> Result<ResolvedOrder<'a>> {
    let mut nodes: BTreeMap<EntityInfo, &'a DataModel> = BTreeMap::new();
    for model in models {
        if nodes.insert(model.entity(), model).is_some() {
            return Err(Error::Validation(format!(
                "duplicate data model {}",
                model.key()
            )));
        }
    }

    let mut graph: Graph = nodes.keys().map(|key| (key.clone(), BTreeSet::new())).collect();

    for (key, model) in &nodes {
        for dependency in model.dependency_refs()? {
            if !nodes.contains_key(&dependency) {
                return Err(Error::Validation(format!(
                    "data model {} depends on {}, which is not part of the data model set",
                    table_ref(key),
                    table_ref(&dependency)
                )));
            }
            add_edge(&mut graph, &dependency, key);
        }
    }

    if let Err(remaining) = toposort(&graph) {
        return Err(Error::Cycle {
            nodes: find_cycle(&graph, &remaining)
                .iter()
                .map(table_ref)
                .collect(),
        });
    }

    let mut warnings = Vec::new();
    for key in nodes.keys() {
        let Some(table) = schemas.find_table(key) else {
            continue;
        };
        let targets: BTreeSet<&EntityInfo> = table
            .relations
            .iter()
            .map(|relation| &relation.target)
            .collect();

        for target in targets {
            if target == key {
                continue;
            }
            if !nodes.contains_key(target) {
                warnings.push(
                    Warning::new(
                        "fk_target_outside_set",
                        table_ref(key),
                        format!(
                            "{} references {}, which has no data model in this set",
                            table_ref(key),
                            table_ref(target)
                        ),
                    )
                    .with_hint("rows referencing it must already exist in the database"),
                );
                continue;
            }
            if graph.get(target).is_some_and(|edges| edges.contains(key)) {
                continue;
            }
            if reachable(&graph, key, target) {
                tracing::warn!(
                    event = "fk_edge_rejected",
                    from = %table_ref(target),
                    to = %table_ref(key)
                );
                warnings.push(
                    Warning::new(
                        "fk_edge_rejected",
                        table_ref(key),
                        format!(
                            "foreign key {} -> {} would close a cycle and is ignored for ordering",
                            table_ref(key),
                            table_ref(target)
                        ),
                    )
                    .with_hint("declare an explicit dependency if this order matters"),
                );
                continue;
            }
            add_edge(&mut graph, target, key);
        }
    }

    let order = toposort(&graph).map_err(|remaining| Error::Cycle {
        nodes: find_cycle(&graph, &remaining)
            .iter()
            .map(table_ref)
            .collect(),
    })?;

    let models = order
        .iter()
        .filter_map(|key| nodes.get(key).copied())
        .collect();

    Ok(ResolvedOrder { models, warnings })
}

fn add_edge(graph: &mut Graph, from: &EntityInfo, to: &EntityInfo) {
    graph.entry(to.clone()).or_default();
    graph.entry(from.clone()).or_default().insert(to.clone());
}

/// True when `to` can be reached from `from` following graph edges.
fn reachable(graph: &Graph, from: &EntityInfo, to: &EntityInfo) -> bool {
    let mut seen = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);
    while let Some(node) = queue.pop_front() {
        if node == to {
            return true;
        }
        for next in graph.get(node).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    false
}

fn toposort<K: Ord + Clone>(
    graph: &BTreeMap<K, BTreeSet<K>>,
) -> std::result::Result<Vec<K>, Vec<K>> {
    let mut indegree: BTreeMap<K, usize> = graph.keys().map(|node| (node.clone(), 0)).collect();

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(target.clone()).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<K> = indegree
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(node, _)| node.clone())
        .collect();

    let mut order = Vec::with_capacity(indegree.len());

    while let Some(node) = ready.pop_first() {
        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(target.clone());
                    }
                }
            }
        }
        order.push(node);
    }

    if order.len() == indegree.len() {
        Ok(order)
    } else {
        Err(indegree
            .into_iter()
            .filter_map(|(node, count)| (count > 0).then_some(node))
            .collect())
    }
}

/// Extract one concrete cycle from the nodes Kahn's algorithm left behind.
///
/// Every leftover node has a leftover predecessor, so walking predecessors
/// must revisit a node. The result starts and ends with the same node.
fn find_cycle(graph: &Graph, remaining: &[EntityInfo]) -> Vec<EntityInfo> {
    let remaining: BTreeSet<&EntityInfo> = remaining.iter().collect();
    let mut predecessors: BTreeMap<&EntityInfo, BTreeSet<&EntityInfo>> = BTreeMap::new();
    for (from, targets) in graph {
        if !remaining.contains(from) {
            continue;
        }
        for to in targets {
            if remaining.contains(to) {
                predecessors.entry(to).or_default().insert(from);
            }
        }
    }

    let Some(start) = remaining.first().copied() else {
        return Vec::new();
    };
    let mut path: Vec<&EntityInfo> = Vec::new();
    let mut position: BTreeMap<&EntityInfo, usize> = BTreeMap::new();
    let mut current = start;

    loop {
        if let Some(&index) = position.get(current) {
            let mut cycle: Vec<EntityInfo> = path[index..].iter().rev().map(|node| (*node).clone()).collect();
            if let Some(first) = cycle.first().cloned() {
                cycle.push(first);
            }
            return cycle;
        }
        position.insert(current, path.len());
        path.push(current);
        match predecessors.get(current).and_then(|preds| preds.first()) {
            Some(next) => current = *next,
            None => return remaining.iter().map(|node| (*node).clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::path::Path;

    fn schemas(yaml_tables: &str) -> SchemaManager {
        SchemaManager::from_yaml_str(&format!("schemas:\n  main:\n    tables:\n{yaml_tables}"))
            .expect("schema")
    }

    /// `table(name, &[fk targets])` as indented YAML.
    fn table(name: &str, references: &[&str]) -> String {
        let mut yaml = format!(
            "      {name}:\n        columns:\n          - {{ columnName: id, columnType: INT, primaryKey: 1 }}\n"
        );
        for target in references {
            yaml.push_str(&format!(
                "          - {{ columnName: {target}_id, columnType: INT }}\n"
            ));
        }
        if !references.is_empty() {
            yaml.push_str("        relations:\n");
            for target in references {
                yaml.push_str(&format!(
                    "          - target: {{ schemaName: main, tableName: {target} }}\n            bindColumns: [{{ sourceColumn: {target}_id, targetColumn: id }}]\n"
                ));
            }
        }
        yaml
    }

    fn model(name: &str, deps: &[&str]) -> DataModel {
        let mut model = DataModel::new(Path::new("."), "main", name);
        model.dependencies = deps.iter().map(|dep| format!("main@{dep}")).collect();
        model
    }

    fn position(order: &[String], name: &str) -> usize {
        order
            .iter()
            .position(|key| key == &format!("main@{name}"))
            .expect("present")
    }

    #[test]
    fn orders_by_foreign_keys() {
        let schemas = schemas(&[
            table("orders", &["users"]),
            table("roles", &[]),
            table("users", &["roles"]),
        ]
        .concat());
        let models = vec![model("orders", &[]), model("users", &[]), model("roles", &[])];
        let resolved = resolve_insertion_order(&models, &schemas).expect("order");
        assert_eq!(resolved.keys(), vec!["main@roles", "main@users", "main@orders"]);
        assert!(resolved.warnings.is_empty());
    }

    #[test]
    fn tolerates_foreign_key_cycles() {
        let schemas = schemas(&[table("a", &["b"]), table("b", &["c"]), table("c", &["a"])].concat());
        let models = vec![model("a", &[]), model("b", &[]), model("c", &[])];
        let resolved = resolve_insertion_order(&models, &schemas).expect("order");
        let order = resolved.keys();
        assert_eq!(order.len(), 3);

        let rejected: Vec<&Warning> = resolved
            .warnings
            .iter()
            .filter(|warning| warning.code == "fk_edge_rejected")
            .collect();
        assert_eq!(rejected.len(), 1);

        // Each FK `x -> y` means y must come first unless it was the rejected one.
        let edges = [("a", "b"), ("b", "c"), ("c", "a")];
        let satisfied = edges
            .iter()
            .filter(|(from, to)| position(&order, to) < position(&order, from))
            .count();
        assert_eq!(satisfied, 2);
    }

    #[test]
    fn explicit_dependencies_win_over_foreign_keys() {
        let schemas = schemas(&[table("a", &[]), table("b", &["a"])].concat());
        let models = vec![model("a", &["b"]), model("b", &[])];
        let resolved = resolve_insertion_order(&models, &schemas).expect("order");
        assert_eq!(resolved.keys(), vec!["main@b", "main@a"]);
        assert_eq!(resolved.warnings.len(), 1);
        assert_eq!(resolved.warnings[0].code, "fk_edge_rejected");
    }

    #[test]
    fn explicit_cycles_fail() {
        let schemas = schemas(&[table("a", &[]), table("b", &[])].concat());
        let models = vec![model("a", &["b"]), model("b", &["a"])];
        let err = resolve_insertion_order(&models, &schemas).expect_err("cycle");
        assert_eq!(err.kind(), ErrorKind::Cycle);
        let Error::Cycle { nodes } = err else {
            panic!("expected cycle");
        };
        assert!(nodes.contains(&"main@a".to_string()));
        assert!(nodes.contains(&"main@b".to_string()));
        assert_eq!(nodes.first(), nodes.last());
    }

    #[test]
    fn unresolved_dependencies_are_errors() {
        let schemas = schemas(&table("a", &[]));
        let models = vec![model("a", &["ghost"])];
        let err = resolve_insertion_order(&models, &schemas).expect_err("unresolved");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("main@ghost"));
    }

    #[test]
    fn ties_break_lexicographically_and_outside_targets_warn() {
        let schemas = schemas(&[table("zeta", &["users"]), table("alpha", &[]), table("users", &[])].concat());
        let models = vec![model("zeta", &[]), model("alpha", &[])];
        let resolved = resolve_insertion_order(&models, &schemas).expect("order");
        assert_eq!(resolved.keys(), vec!["main@alpha", "main@zeta"]);
        assert_eq!(resolved.warnings.len(), 1);
        assert_eq!(resolved.warnings[0].code, "fk_target_outside_set");
    }

    #[test]
    fn explicit_edges_hold_next_to_foreign_key_cycles() {
        let schemas = schemas(&[table("a", &["c"]), table("b", &[]), table("c", &["a"])].concat());
        let models = vec![model("a", &[]), model("b", &["c"]), model("c", &[])];
        let resolved = resolve_insertion_order(&models, &schemas).expect("order");
        let order = resolved.keys();
        assert!(position(&order, "c") < position(&order, "b"));
        assert_eq!(
            resolved
                .warnings
                .iter()
                .filter(|warning| warning.code == "fk_edge_rejected")
                .count(),
            1
        );
    }
}
