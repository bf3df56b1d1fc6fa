//! `pathmux`: learn the fastest route through a network whose edge latencies are random.
//!
//! The network is a DAG with a start and a finish node. Each edge's travel time is
//! log-normal with unknown parameters. The only way to learn them is to traverse
//! whole routes and observe the realized per-edge times.
//!
//! The solver treats this as a combinatorial bandit:
//!
//! - **Beliefs** ([`EdgeBelief`]): one Normal-Inverse-Gamma posterior over log-latency
//!   per edge, seeded from a shared [`NigPrior`].
//! - **Exploration**: Thompson sampling. Every iteration draws one `(mean, var)` per edge,
//!   routes along the shortest path under `exp(mean + var/2)`, traverses it, and updates
//!   the posteriors of the edges it actually used.
//! - **Stopping**: once the sampled route has stayed the same for `last_stable_steps`
//!   iterations (or a hard cap is hit), the solver commits to the route that is shortest
//!   under posterior means ([`Solution`]).
//!
//! All of it sits on one primitive: [`Graph::shortest_path`], which takes the edge-cost
//! interpretation as a closure.
//!
//! **Goals:**
//! - **Deterministic by default**: same topology + config + seed → same run.
//! - **Small graphs**: the shortest-path routine is `O(n^2 + E)`.
//! - **Transport-agnostic**: the environment is anything implementing [`Network`],
//!   including plain closures.
//!
//! **Non-goals:**
//! - Concurrent or multi-agent exploration.
//! - Latency models other than log-normal.
//! - Retrying failed traversals: an environment error ends the run.
//!
//! # Example
//!
//! ```rust
//! use pathmux::{LogNormalNetwork, PathSolver, SolverConfig};
//!
//! // 0 -> 2 is slow; 0 -> 1 -> 2 is fast.
//! let network = LogNormalNetwork::from_edges(
//!     3,
//!     0,
//!     2,
//!     [(0, 2, 3.0, 0.3), (0, 1, 0.0, 0.3), (1, 2, 0.0, 0.3)],
//!     7,
//! )
//! .unwrap();
//! let topology = network.topology();
//!
//! let cfg = SolverConfig {
//!     max_explore_steps: 2_000,
//!     last_stable_steps: 30,
//!     ..SolverConfig::default()
//! };
//! let mut solver = PathSolver::new(&topology, network, cfg).unwrap();
//! let best = solver.solve().unwrap();
//! assert_eq!(best.route, vec![0, 1, 2]);
//! ```

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod graph;
pub use graph::*;

mod belief;
pub use belief::*;

mod prune;
pub use prune::*;

mod network;
pub use network::*;

mod solver;
pub use solver::*;
