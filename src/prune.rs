//! Restrict a topology to edges that can still reach the finish node.
//!
//! Edges that lead only into dead ends can never appear on a start→finish route,
//! so they never receive a belief.

use crate::belief::{EdgeBelief, NigPrior};
use crate::graph::{Edge, Graph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reach {
    Unvisited,
    InProgress,
    ToFinish,
    DeadEnd,
}

/// Classify every node reachable from `start` as leading to `finish` or not.
///
/// Explicit-stack DFS; each node is expanded once. `finish` is classified up front
/// and its outgoing edges are never explored. Relies on the graph being acyclic
/// from `start` (an in-progress target is treated as not reaching `finish`).
fn classify<E>(graph: &Graph<E>) -> Vec<Reach> {
    let mut marks = vec![Reach::Unvisited; graph.node_count()];
    marks[graph.finish()] = Reach::ToFinish;

    let mut stack: Vec<(usize, usize)> = vec![(graph.start(), 0)];
    marks[graph.start()] = Reach::InProgress;

    while let Some(frame) = stack.last_mut() {
        let v = frame.0;
        let out = graph.edges_from(v);
        match out.get(frame.1) {
            Some(edge) => {
                frame.1 += 1;
                if marks[edge.to] == Reach::Unvisited {
                    marks[edge.to] = Reach::InProgress;
                    stack.push((edge.to, 0));
                }
            }
            None => {
                let reaches = out.iter().any(|e| marks[e.to] == Reach::ToFinish);
                marks[v] = if reaches {
                    Reach::ToFinish
                } else {
                    Reach::DeadEnd
                };
                stack.pop();
            }
        }
    }
    marks
}

/// Build the initial belief graph: same nodes, only edges on some route to finish,
/// each seeded from `prior`.
pub fn prune_to_finish<E>(graph: &Graph<E>, prior: &NigPrior) -> Graph<EdgeBelief> {
    let marks = classify(graph);
    let adjacency = (0..graph.node_count())
        .map(|from| {
            if marks[from] == Reach::Unvisited || from == graph.finish() {
                return Vec::new();
            }
            graph
                .edges_from(from)
                .iter()
                .filter(|e| marks[e.to] == Reach::ToFinish)
                .map(|e| Edge {
                    to: e.to,
                    state: EdgeBelief::from_prior(prior),
                })
                .collect()
        })
        .collect();
    Graph::from_parts(graph.node_count(), graph.start(), graph.finish(), adjacency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Topology;
    use proptest::prelude::*;

    fn topo(n: usize, s: usize, f: usize, edges: &[(usize, usize)]) -> Topology {
        Graph::new(n, s, f, edges.iter().map(|&(a, b)| (a, b, ()))).unwrap()
    }

    fn shape<E>(g: &Graph<E>) -> Vec<(usize, usize)> {
        g.edges().map(|(a, b, _)| (a, b)).collect()
    }

    #[test]
    fn drops_dead_end_branches() {
        // 0 -> 1 -> 3 (finish), 0 -> 2 -> 4 (dead end), 1 -> 4.
        let g = topo(5, 0, 3, &[(0, 1), (0, 2), (1, 3), (2, 4), (1, 4)]);
        let pruned = prune_to_finish(&g, &NigPrior::default());
        assert_eq!(shape(&pruned), vec![(0, 1), (1, 3)]);
        assert_eq!(pruned.node_count(), 5);
    }

    #[test]
    fn keeps_every_route_of_a_diamond() {
        let g = topo(4, 0, 3, &[(0, 1), (0, 2), (1, 3), (2, 3), (1, 2)]);
        let pruned = prune_to_finish(&g, &NigPrior::default());
        assert_eq!(pruned.edge_count(), 5);
    }

    #[test]
    fn beliefs_start_at_prior() {
        let prior = NigPrior {
            alpha: 4.0,
            beta: 3.0,
            mu: -1.0,
            nu: 0.5,
        };
        let g = topo(3, 0, 2, &[(0, 1), (1, 2), (0, 2)]);
        let pruned = prune_to_finish(&g, &prior);
        for (_, _, b) in pruned.edges() {
            assert_eq!(*b, EdgeBelief::from_prior(&prior));
        }
    }

    #[test]
    fn edges_out_of_finish_and_unreachable_nodes_are_dropped() {
        // finish = 1 has an outgoing edge; node 3 is not reachable from start.
        let g = topo(4, 0, 1, &[(0, 1), (1, 2), (3, 1)]);
        let pruned = prune_to_finish(&g, &NigPrior::default());
        assert_eq!(shape(&pruned), vec![(0, 1)]);
    }

    /// Random DAG: edges only go from lower to higher ids; finish is the last node,
    /// and a spine 0 -> 1 -> ... guarantees reachability.
    fn arb_dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (3usize..9).prop_flat_map(|n| {
            let pairs: Vec<(usize, usize)> = (0..n)
                .flat_map(|a| ((a + 1)..n).map(move |b| (a, b)))
                .filter(|&(a, b)| b != a + 1)
                .collect();
            let k = pairs.len();
            (
                Just(n),
                Just(pairs),
                proptest::collection::vec(any::<bool>(), k),
                1usize..n,
            )
                .prop_map(|(n, pairs, keep, spine_len)| {
                    let mut edges: Vec<(usize, usize)> =
                        (0..spine_len).map(|i| (i, i + 1)).collect();
                    edges.extend(pairs.into_iter().zip(keep).filter(|(_, k)| *k).map(|(p, _)| p));
                    (n, edges)
                })
        })
    }

    fn reaches(n: usize, edges: &[(usize, usize)], from: usize, to: usize) -> bool {
        let mut seen = vec![false; n];
        let mut stack = vec![from];
        while let Some(v) = stack.pop() {
            if v == to {
                return true;
            }
            if std::mem::replace(&mut seen[v], true) {
                continue;
            }
            stack.extend(edges.iter().filter(|e| e.0 == v).map(|e| e.1));
        }
        false
    }

    proptest! {
        #[test]
        fn keeps_exactly_edges_on_routes_to_finish((n, edges) in arb_dag()) {
            let finish = n - 1;
            // The spine may stop short of `finish`; only keep graphs where it is reachable.
            prop_assume!(reaches(n, &edges, 0, finish));
            let g = topo(n, 0, finish, &edges);
            let pruned = prune_to_finish(&g, &NigPrior::default());

            for &(a, b) in &edges {
                let expected = a != finish
                    && reaches(n, &edges, 0, a)
                    && reaches(n, &edges, b, finish);
                prop_assert_eq!(pruned.contains_edge(a, b), expected, "edge {} -> {}", a, b);
            }
            prop_assert!(pruned.shortest_path(|b| b.expected_cost()).is_ok());
        }
    }
}
