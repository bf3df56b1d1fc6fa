//! Validated DAG with a cost-pluggable shortest-path routine.
//!
//! A [`Graph`] is generic over its edge payload so the same shape can carry learned
//! beliefs ([`EdgeBelief`](crate::EdgeBelief)), true simulator parameters
//! ([`LogNormalEdge`](crate::LogNormalEdge)), or nothing at all ([`Topology`]).
//!
//! Construction checks every structural invariant once:
//! - `n > 0` and all ids in `[0, n)`
//! - `start != finish`
//! - no duplicate `(from, to)` pair
//! - no cycle reachable from `start`
//! - `finish` reachable from `start`
//!
//! Nothing revalidates afterwards; graphs are never mutated structurally.

use crate::{Error, Result};

/// One outgoing edge: target node plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<E> {
    pub to: usize,
    pub state: E,
}

/// Directed acyclic graph with designated start and finish nodes.
#[derive(Debug, Clone)]
pub struct Graph<E> {
    n: usize,
    start: usize,
    finish: usize,
    adjacency: Vec<Vec<Edge<E>>>,
}

/// A graph that only carries shape.
pub type Topology = Graph<()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Finalized,
}

impl<E> Graph<E> {
    /// Build and validate a graph from an edge list `(from, to, payload)`.
    ///
    /// Adjacency keeps the order edges were given in; that order is the
    /// relaxation order in [`Graph::shortest_path`] and the sampling order in the solver.
    pub fn new<I>(n: usize, start: usize, finish: usize, edges: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, E)>,
    {
        if n == 0 {
            return Err(Error::EmptyGraph);
        }
        let in_range = |node: usize| -> Result<usize> {
            if node < n {
                Ok(node)
            } else {
                Err(Error::NodeOutOfRange { node, n })
            }
        };
        in_range(start)?;
        in_range(finish)?;
        if start == finish {
            return Err(Error::StartIsFinish(start));
        }

        let mut adjacency: Vec<Vec<Edge<E>>> = (0..n).map(|_| Vec::new()).collect();
        for (from, to, state) in edges {
            in_range(from)?;
            in_range(to)?;
            if adjacency[from].iter().any(|e| e.to == to) {
                return Err(Error::DuplicateEdge { from, to });
            }
            adjacency[from].push(Edge { to, state });
        }

        let g = Self {
            n,
            start,
            finish,
            adjacency,
        };
        let marks = g.check_acyclic_from_start()?;
        if marks[finish] == Mark::Unvisited {
            return Err(Error::Unreachable { start, finish });
        }
        Ok(g)
    }

    /// Assemble a graph that is already known to satisfy the invariants.
    pub(crate) fn from_parts(
        n: usize,
        start: usize,
        finish: usize,
        adjacency: Vec<Vec<Edge<E>>>,
    ) -> Self {
        debug_assert_eq!(adjacency.len(), n);
        Self {
            n,
            start,
            finish,
            adjacency,
        }
    }

    /// Iterative DFS from `start`; an edge into an in-progress node closes a cycle.
    fn check_acyclic_from_start(&self) -> Result<Vec<Mark>> {
        let mut marks = vec![Mark::Unvisited; self.n];
        let mut stack: Vec<(usize, usize)> = vec![(self.start, 0)];
        marks[self.start] = Mark::InProgress;

        while let Some(frame) = stack.last_mut() {
            let v = frame.0;
            match self.adjacency[v].get(frame.1) {
                Some(edge) => {
                    frame.1 += 1;
                    match marks[edge.to] {
                        Mark::Unvisited => {
                            marks[edge.to] = Mark::InProgress;
                            stack.push((edge.to, 0));
                        }
                        Mark::InProgress => {
                            return Err(Error::Cycle {
                                from: v,
                                to: edge.to,
                            })
                        }
                        Mark::Finalized => {}
                    }
                }
                None => {
                    marks[v] = Mark::Finalized;
                    stack.pop();
                }
            }
        }
        Ok(marks)
    }

    pub fn node_count(&self) -> usize {
        self.n
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn finish(&self) -> usize {
        self.finish
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// Outgoing edges of `node` in insertion order (empty if out of range).
    pub fn edges_from(&self, node: usize) -> &[Edge<E>] {
        self.adjacency.get(node).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Payload of edge `from -> to`, if present.
    pub fn edge(&self, from: usize, to: usize) -> Option<&E> {
        self.edges_from(from)
            .iter()
            .find(|e| e.to == to)
            .map(|e| &e.state)
    }

    pub fn edge_mut(&mut self, from: usize, to: usize) -> Option<&mut E> {
        self.adjacency
            .get_mut(from)?
            .iter_mut()
            .find(|e| e.to == to)
            .map(|e| &mut e.state)
    }

    pub fn contains_edge(&self, from: usize, to: usize) -> bool {
        self.edge(from, to).is_some()
    }

    /// All edges as `(from, to, payload)`, ordered by source node then insertion.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &E)> + '_ {
        self.adjacency
            .iter()
            .enumerate()
            .flat_map(|(from, out)| out.iter().map(move |e| (from, e.to, &e.state)))
    }

    /// Mutable payloads in the same order as [`Graph::edges`].
    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut E> + '_ {
        self.adjacency
            .iter_mut()
            .flat_map(|out| out.iter_mut().map(|e| &mut e.state))
    }

    /// Same shape, new payloads.
    pub fn map<T, F>(&self, mut f: F) -> Graph<T>
    where
        F: FnMut(usize, usize, &E) -> T,
    {
        let adjacency = self
            .adjacency
            .iter()
            .enumerate()
            .map(|(from, out)| {
                out.iter()
                    .map(|e| Edge {
                        to: e.to,
                        state: f(from, e.to, &e.state),
                    })
                    .collect()
            })
            .collect();
        Graph::from_parts(self.n, self.start, self.finish, adjacency)
    }

    /// Drop payloads, keeping only shape.
    pub fn topology(&self) -> Topology {
        self.map(|_, _, _| ())
    }

    /// Minimum-cost route from start to finish under `cost`.
    ///
    /// Dense label-correcting search: each round scans all unfinished nodes for
    /// the smallest defined distance (first strict minimum in id order), finalizes
    /// it, and relaxes its outgoing edges. `cost` runs once per relaxation attempt,
    /// so it may be a fresh sample or a posterior expectation.
    ///
    /// `O(n^2 + E)`; meant for small graphs.
    ///
    /// Returns `(total_cost, route)` with `route[0] == start` and
    /// `route.last() == finish`.
    pub fn shortest_path<F>(&self, mut cost: F) -> Result<(f64, Vec<usize>)>
    where
        F: FnMut(&E) -> f64,
    {
        let n = self.n;
        let mut dist: Vec<Option<f64>> = vec![None; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut finalized = vec![false; n];
        dist[self.start] = Some(0.0);

        for _ in 0..n {
            let mut best: Option<(usize, f64)> = None;
            for v in 0..n {
                if finalized[v] {
                    continue;
                }
                if let Some(d) = dist[v] {
                    if best.map_or(true, |(_, b)| d < b) {
                        best = Some((v, d));
                    }
                }
            }
            let Some((v, dv)) = best else {
                break;
            };
            finalized[v] = true;

            for edge in &self.adjacency[v] {
                let candidate = dv + cost(&edge.state);
                if dist[edge.to].map_or(true, |d| candidate < d) {
                    dist[edge.to] = Some(candidate);
                    prev[edge.to] = Some(v);
                }
            }
        }

        let broken = Error::BrokenPath {
            start: self.start,
            finish: self.finish,
        };
        let total = dist[self.finish].ok_or_else(|| broken.clone())?;
        let mut route = vec![self.finish];
        let mut node = self.finish;
        while node != self.start {
            node = prev[node].ok_or_else(|| broken.clone())?;
            route.push(node);
            if route.len() > n {
                return Err(broken);
            }
        }
        route.reverse();
        Ok((total, route))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topo(n: usize, s: usize, f: usize, edges: &[(usize, usize)]) -> Result<Topology> {
        Graph::new(n, s, f, edges.iter().map(|&(a, b)| (a, b, ())))
    }

    #[test]
    fn rejects_structural_errors() {
        assert_eq!(topo(0, 0, 0, &[]).unwrap_err(), Error::EmptyGraph);
        assert_eq!(
            topo(2, 0, 2, &[(0, 1)]).unwrap_err(),
            Error::NodeOutOfRange { node: 2, n: 2 }
        );
        assert_eq!(
            topo(3, 0, 2, &[(0, 1), (1, 3)]).unwrap_err(),
            Error::NodeOutOfRange { node: 3, n: 3 }
        );
        assert_eq!(
            topo(2, 0, 1, &[(0, 1), (0, 1)]).unwrap_err(),
            Error::DuplicateEdge { from: 0, to: 1 }
        );
        assert_eq!(
            topo(3, 0, 2, &[(1, 2)]).unwrap_err(),
            Error::Unreachable {
                start: 0,
                finish: 2
            }
        );
    }

    #[test]
    fn start_equal_to_finish_is_rejected() {
        assert_eq!(topo(1, 0, 0, &[]).unwrap_err(), Error::StartIsFinish(0));
        assert_eq!(
            topo(3, 1, 1, &[(0, 1), (1, 2)]).unwrap_err(),
            Error::StartIsFinish(1)
        );
    }

    #[test]
    fn rejects_cycle_reachable_from_start() {
        let err = topo(4, 0, 3, &[(0, 1), (1, 2), (2, 1), (2, 3)]).unwrap_err();
        assert!(matches!(err, Error::Cycle { .. }), "{err:?}");
    }

    #[test]
    fn ignores_cycle_unreachable_from_start() {
        let g = topo(4, 0, 1, &[(0, 1), (2, 3), (3, 2)]).unwrap();
        assert_eq!(g.edge_count(), 3);
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let g = topo(4, 0, 3, &[(0, 1), (0, 2), (1, 3), (2, 3)]).unwrap();
        assert_eq!(g.edge_count(), 4);
    }

    #[test]
    fn shortest_path_picks_cheaper_detour() {
        let g = Graph::new(3, 0, 2, [(0, 2, 10.0), (0, 1, 1.0), (1, 2, 2.0)]).unwrap();
        let (cost, route) = g.shortest_path(|w: &f64| *w).unwrap();
        assert_eq!(route, vec![0, 1, 2]);
        assert!((cost - 3.0).abs() < 1e-12);
    }

    #[test]
    fn shortest_path_invokes_cost_once_per_relaxation() {
        let g = Graph::new(
            4,
            0,
            3,
            [(0, 1, 1.0), (0, 2, 1.0), (1, 3, 1.0), (2, 3, 1.0)],
        )
        .unwrap();
        let mut calls = 0;
        g.shortest_path(|w: &f64| {
            calls += 1;
            *w
        })
        .unwrap();
        assert_eq!(calls, g.edge_count());
    }

    #[test]
    fn ties_keep_first_relaxed_predecessor() {
        // Both branches cost 2; node 1 is finalized first and claims node 3.
        let g = Graph::new(
            4,
            0,
            3,
            [(0, 1, 1.0), (0, 2, 1.0), (1, 3, 1.0), (2, 3, 1.0)],
        )
        .unwrap();
        let (_, route) = g.shortest_path(|w: &f64| *w).unwrap();
        assert_eq!(route, vec![0, 1, 3]);
    }

    #[test]
    fn broken_predecessor_chain_is_an_error() {
        // Bypass validation: finish has no incoming edge.
        let g: Graph<f64> = Graph::from_parts(
            3,
            0,
            2,
            vec![vec![Edge { to: 1, state: 1.0 }], vec![], vec![]],
        );
        assert_eq!(
            g.shortest_path(|w| *w).unwrap_err(),
            Error::BrokenPath {
                start: 0,
                finish: 2
            }
        );
    }

    #[test]
    fn map_and_topology_preserve_shape() {
        let g = Graph::new(3, 0, 2, [(0, 1, 1.5), (1, 2, 2.5), (0, 2, 9.0)]).unwrap();
        let doubled = g.map(|_, _, w| w * 2.0);
        assert_eq!(doubled.edge(1, 2), Some(&5.0));
        let t = g.topology();
        let shape: Vec<(usize, usize)> = t.edges().map(|(a, b, _)| (a, b)).collect();
        assert_eq!(shape, vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!((t.start(), t.finish(), t.node_count()), (0, 2, 3));
    }

    #[test]
    fn edge_mut_updates_payload_in_place() {
        let mut g = Graph::new(2, 0, 1, [(0, 1, 1.0)]).unwrap();
        *g.edge_mut(0, 1).unwrap() = 4.0;
        assert_eq!(g.edge(0, 1), Some(&4.0));
        assert!(g.edge_mut(1, 0).is_none());
        assert!(g.edge_mut(7, 0).is_none());
    }
}
