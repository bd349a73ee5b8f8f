//! The trail graph: canonical edge keys, adjacency, and shortest paths.
//!
//! Path search is plain breadth-first — trail length is hops, never weights.
//! Edge quality only breaks ties: at each node, neighbors are expanded in
//! score order (permanent, then used-this-season, then streak) so that among
//! equal-length routes the better-kept one wins, deterministically.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::hex;
use crate::model::TrailMap;

/// Adjacency built from a trail map. `BTreeMap` keys keep traversal order
/// deterministic for equal tie-break scores.
pub type TrailGraph = BTreeMap<String, Vec<String>>;

/// The canonical key for the unordered pair `{a, b}`: both endpoints
/// normalized, ordered by hex order, lower-cased, joined with `-`.
/// Idempotent under argument swap.
#[must_use]
pub fn canonical_edge(a: &str, b: &str) -> String {
    let a = hex::normalize(a);
    let b = hex::normalize(b);
    let (first, second) = if hex::order(&a, &b).is_le() {
        (a, b)
    } else {
        (b, a)
    };
    format!(
        "{}-{}",
        first.to_ascii_lowercase(),
        second.to_ascii_lowercase()
    )
}

/// Build an undirected graph: every edge key contributes both directed arcs.
/// Keys that do not split into exactly two endpoints are silently skipped.
#[must_use]
pub fn build_graph(trails: &TrailMap) -> TrailGraph {
    let mut graph = TrailGraph::new();
    for key in trails.keys() {
        let parts: Vec<&str> = key.split('-').collect();
        let [a, b] = parts.as_slice() else {
            continue;
        };
        let (a, b) = (hex::normalize(a), hex::normalize(b));
        if a.is_empty() || b.is_empty() {
            continue;
        }
        graph.entry(a.clone()).or_default().push(b.clone());
        graph.entry(b).or_default().push(a);
    }
    graph
}

/// Shortest path from `start` to `dest`, excluding the start node (the path
/// is "where to move to", not "where you are").
///
/// Returns `Some(vec![])` when already at the destination and `None` when
/// either endpoint is absent from the graph or unreachable.
#[must_use]
pub fn shortest_path(
    graph: &TrailGraph,
    trails: &TrailMap,
    start: &str,
    dest: &str,
) -> Option<Vec<String>> {
    let start = hex::normalize(start);
    let dest = hex::normalize(dest);

    if start == dest {
        return Some(Vec::new());
    }
    if !graph.contains_key(&start) || !graph.contains_key(&dest) {
        return None;
    }

    let mut queue = VecDeque::from([start.clone()]);
    let mut parent: BTreeMap<String, String> = BTreeMap::new();
    let mut visited = BTreeSet::from([start.clone()]);

    while let Some(current) = queue.pop_front() {
        if current == dest {
            let mut path = vec![current.clone()];
            let mut node = current.as_str();
            while let Some(prev) = parent.get(node) {
                path.push(prev.clone());
                node = prev;
            }
            path.pop(); // drop the start node
            path.reverse();
            return Some(path);
        }

        let Some(neighbors) = graph.get(&current) else {
            continue;
        };
        let mut candidates: Vec<(&String, u32)> = neighbors
            .iter()
            .filter(|n| !visited.contains(*n))
            .map(|n| (n, tie_break_score(trails, &current, n)))
            .collect();
        // Stable sort: equal scores keep adjacency order, which is itself
        // deterministic (sorted edge keys).
        candidates.sort_by_key(|(_, score)| std::cmp::Reverse(*score));

        for (next, _) in candidates {
            visited.insert(next.clone());
            parent.insert(next.clone(), current.clone());
            queue.push_back(next.clone());
        }
    }

    None
}

/// Preference score for the edge `{u, v}`: permanent trails over
/// recently-used ones over higher streaks. Never affects path length.
fn tie_break_score(trails: &TrailMap, u: &str, v: &str) -> u32 {
    let Some(edge) = trails.get(&canonical_edge(u, v)) else {
        return 0;
    };
    let mut score = 0;
    if edge.permanent {
        score += 1000;
    }
    if edge.used_this_season {
        score += 100;
    }
    score + u32::from(edge.streak)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrailEdge;

    fn trail_map(keys: &[&str]) -> TrailMap {
        keys.iter()
            .map(|k| ((*k).to_string(), TrailEdge::default()))
            .collect()
    }

    #[test]
    fn canonical_edge_is_swap_idempotent() {
        assert_eq!(canonical_edge("P13", "P12"), canonical_edge("P12", "P13"));
        assert_eq!(canonical_edge("p12", "P13"), "p12-p13");
        // Hex order, not plain string order: row 2 before row 10.
        assert_eq!(canonical_edge("B10", "B2"), "b2-b10");
    }

    #[test]
    fn malformed_keys_are_skipped() {
        let mut trails = trail_map(&["p12-p13"]);
        trails.insert("p12".into(), TrailEdge::default());
        trails.insert("p12-p13-p14".into(), TrailEdge::default());
        let graph = build_graph(&trails);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph["P12"], vec!["P13"]);
    }

    #[test]
    fn bfs_finds_the_chain() {
        let trails = trail_map(&["p12-p13", "p13-q13", "q13-r14"]);
        let graph = build_graph(&trails);
        let path = shortest_path(&graph, &trails, "P12", "R14").unwrap();
        assert_eq!(path, vec!["P13", "Q13", "R14"]);
    }

    #[test]
    fn same_node_is_empty_and_absent_is_none() {
        let trails = trail_map(&["p12-p13"]);
        let graph = build_graph(&trails);
        assert_eq!(
            shortest_path(&graph, &trails, "X9", "X9"),
            Some(Vec::new())
        );
        assert_eq!(shortest_path(&graph, &trails, "P12", "Z1"), None);

        // Disconnected components are unreachable.
        let trails = trail_map(&["p12-p13", "a1-a2"]);
        let graph = build_graph(&trails);
        assert_eq!(shortest_path(&graph, &trails, "P12", "A1"), None);
    }

    #[test]
    fn permanent_edge_breaks_ties() {
        // Two length-2 routes P12→Q12: via P13 and via Q11. Make the Q11 leg
        // permanent; it must win regardless of adjacency order.
        let mut trails = trail_map(&["p12-p13", "p13-q12", "p12-q11", "q11-q12"]);
        trails.get_mut("p12-q11").unwrap().permanent = true;
        trails.get_mut("q11-q12").unwrap().permanent = true;
        let graph = build_graph(&trails);
        let path = shortest_path(&graph, &trails, "P12", "Q12").unwrap();
        assert_eq!(path, vec!["Q11", "Q12"]);
    }

    #[test]
    fn used_this_season_outranks_streak() {
        let mut trails = trail_map(&["p12-p13", "p13-q12", "p12-q11", "q11-q12"]);
        trails.get_mut("p12-p13").unwrap().streak = 3;
        trails.get_mut("p12-q11").unwrap().used_this_season = true;
        let graph = build_graph(&trails);
        let path = shortest_path(&graph, &trails, "P12", "Q12").unwrap();
        assert_eq!(path[0], "Q11");
    }
}
