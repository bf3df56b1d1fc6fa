//! The environment seam: something that turns a route into realized travel times.
//!
//! [`Network`] is what the solver talks to. Any `FnMut(&[usize]) -> Result<Vec<f64>>`
//! is a `Network`, which is how a transport client (HTTP, RPC, ...) plugs in.
//!
//! [`LogNormalNetwork`] is an in-process environment with known per-edge log-normal
//! parameters. It is seedable, so runs against it are reproducible.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, LogNormal};

use crate::graph::{Graph, Topology};
use crate::{Error, Result};

/// An environment that serves traversal requests.
pub trait Network {
    /// Traverse `route` and return one positive travel time per edge
    /// (`route.len() - 1` values), or an error if the route is rejected or the
    /// request fails.
    fn traverse(&mut self, route: &[usize]) -> Result<Vec<f64>>;
}

impl<F> Network for F
where
    F: FnMut(&[usize]) -> Result<Vec<f64>>,
{
    fn traverse(&mut self, route: &[usize]) -> Result<Vec<f64>> {
        self(route)
    }
}

/// True latency parameters of one edge: `log t ~ Normal(mu, sigma)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogNormalEdge {
    pub mu: f64,
    pub sigma: f64,
}

impl LogNormalEdge {
    /// `E[t] = exp(mu + sigma^2 / 2)`.
    pub fn expected_time(&self) -> f64 {
        (self.mu + self.sigma * self.sigma / 2.0).exp()
    }
}

/// Simulated environment with fixed log-normal edge latencies.
#[derive(Debug, Clone)]
pub struct LogNormalNetwork {
    params: Graph<LogNormalEdge>,
    rng: StdRng,
    requests: u64,
}

impl LogNormalNetwork {
    /// Wrap a validated graph of edge parameters.
    pub fn new(params: Graph<LogNormalEdge>, seed: u64) -> Result<Self> {
        for (from, to, p) in params.edges() {
            if !(p.mu.is_finite() && p.sigma.is_finite()) {
                return Err(Error::InvalidEdgeParams {
                    from,
                    to,
                    reason: "mu and sigma must be finite",
                });
            }
            if p.sigma < 0.0 {
                return Err(Error::InvalidEdgeParams {
                    from,
                    to,
                    reason: "sigma must be >= 0",
                });
            }
        }
        Ok(Self {
            params,
            rng: StdRng::seed_from_u64(seed),
            requests: 0,
        })
    }

    /// Build from `(from, to, mu, sigma)` rows.
    pub fn from_edges<I>(n: usize, start: usize, finish: usize, edges: I, seed: u64) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize, f64, f64)>,
    {
        let params = Graph::new(
            n,
            start,
            finish,
            edges
                .into_iter()
                .map(|(from, to, mu, sigma)| (from, to, LogNormalEdge { mu, sigma })),
        )?;
        Self::new(params, seed)
    }

    /// Shape only, as handed to an agent.
    pub fn topology(&self) -> Topology {
        self.params.topology()
    }

    /// True edge parameters.
    pub fn params(&self) -> &Graph<LogNormalEdge> {
        &self.params
    }

    /// Route with the smallest true expected travel time.
    pub fn expected_shortest_path(&self) -> Result<(f64, Vec<usize>)> {
        self.params.shortest_path(LogNormalEdge::expected_time)
    }

    /// Number of accepted traversal requests so far.
    pub fn requests(&self) -> u64 {
        self.requests
    }

    fn check_route(&self, route: &[usize]) -> std::result::Result<(), &'static str> {
        if route.len() < 2 {
            return Err("route needs at least two nodes");
        }
        let n = self.params.node_count();
        if route.iter().any(|&v| v >= n) {
            return Err("node out of range");
        }
        if route[0] != self.params.start() {
            return Err("route does not begin at start");
        }
        if route[route.len() - 1] != self.params.finish() {
            return Err("route does not end at finish");
        }
        if route.windows(2).any(|w| !self.params.contains_edge(w[0], w[1])) {
            return Err("consecutive nodes are not adjacent");
        }
        Ok(())
    }
}

impl Network for LogNormalNetwork {
    fn traverse(&mut self, route: &[usize]) -> Result<Vec<f64>> {
        if let Err(reason) = self.check_route(route) {
            tracing::debug!(?route, reason, "rejected route");
            return Err(Error::InvalidRoute {
                route: route.to_vec(),
                reason,
            });
        }
        self.requests += 1;
        let mut times = Vec::with_capacity(route.len() - 1);
        for w in route.windows(2) {
            let p = self
                .params
                .edge(w[0], w[1])
                .ok_or_else(|| Error::InvalidRoute {
                    route: route.to_vec(),
                    reason: "consecutive nodes are not adjacent",
                })?;
            let dist = LogNormal::new(p.mu, p.sigma)
                .map_err(|e| Error::Sampling(format!("lognormal({}, {}): {e}", p.mu, p.sigma)))?;
            times.push(dist.sample(&mut self.rng));
        }
        Ok(times)
    }
}
