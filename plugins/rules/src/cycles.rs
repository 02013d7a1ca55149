//! Cycle detection between slices, the packages directly below the base package.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use stratum_core::SourceFile;

pub type SliceEdges = BTreeSet<(String, String)>;

/// First package segment below `base_package`, e.g. `billing` for
/// `com.acme.billing.core` under `com.acme`.
pub fn slice_of(package: &str, base_package: &str) -> Option<String> {
    let rest = package.strip_prefix(base_package)?.strip_prefix('.')?;
    rest.split('.').next().filter(|s| !s.is_empty()).map(str::to_string)
}

/// Slice-to-slice edges derived from package imports. Edges within one slice
/// are never added.
pub fn slice_edges<'a, I>(sources: I, base_package: &str) -> SliceEdges
where
    I: IntoIterator<Item = &'a SourceFile>,
{
    let mut edges = SliceEdges::new();

    for source in sources {
        let from = match source.package.as_deref().and_then(|p| slice_of(p, base_package)) {
            Some(slice) => slice,
            None => continue,
        };

        for import in &source.imports {
            if let Some(to) = slice_of(import, base_package) {
                if to != from {
                    edges.insert((from.clone(), to));
                }
            }
        }
    }

    edges
}

/// Every cycle found by a depth-first search with a recursion stack. Each
/// cycle is closed by repeating its first node.
pub fn detect_cycles(edges: &SliceEdges) -> Vec<Vec<String>> {
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (from, to) in edges {
        if from == to {
            continue;
        }
        graph.entry(from.as_str()).or_default().push(to.as_str());
        graph.entry(to.as_str()).or_default();
    }

    let mut cycles = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut on_stack: HashSet<&str> = HashSet::new();
    let mut path: Vec<&str> = Vec::new();

    for &node in graph.keys() {
        if !visited.contains(node) {
            dfs(node, &graph, &mut visited, &mut on_stack, &mut path, &mut cycles);
        }
    }

    cycles
}

fn dfs<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    on_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    visited.insert(node);
    on_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for &neighbor in neighbors {
            if !visited.contains(neighbor) {
                dfs(neighbor, graph, visited, on_stack, path, cycles);
            } else if on_stack.contains(neighbor) {
                if let Some(start) = path.iter().position(|n| *n == neighbor) {
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(neighbor.to_string());
                    cycles.push(cycle);
                }
            }
        }
    }

    path.pop();
    on_stack.remove(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn edges(pairs: &[(&str, &str)]) -> SliceEdges {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn test_triangle_has_one_cycle() {
        let cycles = detect_cycles(&edges(&[("a", "b"), ("b", "c"), ("c", "a")]));
        assert_eq!(cycles.len(), 1);
        let members: BTreeSet<&str> = cycles[0].iter().map(String::as_str).collect();
        assert_eq!(members, ["a", "b", "c"].into_iter().collect());
        assert_eq!(cycles[0].first(), cycles[0].last());
    }

    #[test]
    fn test_chain_has_no_cycle() {
        assert!(detect_cycles(&edges(&[("a", "b"), ("b", "c")])).is_empty());
    }

    #[test]
    fn test_self_edge_is_ignored() {
        assert!(detect_cycles(&edges(&[("a", "a")])).is_empty());
    }

    #[test]
    fn test_slice_edges_skip_same_slice() {
        let billing = SourceFile::parse(
            Path::new("Invoice.java"),
            "package com.acme.billing.core;\nimport com.acme.billing.api.InvoiceService;\nimport com.acme.customer.api.Customer;\nimport java.util.List;\nclass Invoice {}\n",
        )
        .unwrap();
        let customer = SourceFile::parse(
            Path::new("Customer.java"),
            "package com.acme.customer.api;\nimport com.acme.billing.api.Invoice;\nclass Customer {}\n",
        )
        .unwrap();

        let found = slice_edges([&billing, &customer], "com.acme");
        assert_eq!(found, edges(&[("billing", "customer"), ("customer", "billing")]));
        assert_eq!(detect_cycles(&found).len(), 1);
    }

    #[test]
    fn test_slice_of() {
        assert_eq!(slice_of("com.acme.billing.core", "com.acme").as_deref(), Some("billing"));
        assert_eq!(slice_of("com.acme", "com.acme"), None);
        assert_eq!(slice_of("com.acmeish.x", "com.acme"), None);
    }
}
