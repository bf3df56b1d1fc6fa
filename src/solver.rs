//! Explore/exploit loop: Thompson sampling over routes until the sampled route settles.
//!
//! Each exploring iteration:
//! 1. route = shortest path under each edge's *sampled* expected time
//! 2. traverse it, fold every realized time into that edge's posterior
//! 3. resample every edge (visited or not)
//! 4. update the stability counter and check for convergence
//!
//! On convergence the certainty-equivalent route (posterior means) is computed once and
//! cached. After that the solver either stops or keeps issuing the cached route
//! without learning.

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::belief::{EdgeBelief, NigPrior, UpdateRule};
use crate::graph::Graph;
use crate::network::Network;
use crate::prune::prune_to_finish;
use crate::{Error, Result};

/// Run configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverConfig {
    /// Global prior every belief starts from.
    pub prior: NigPrior,
    /// Iteration index at which exploration ends even if the route never settled.
    pub max_explore_steps: u64,
    /// Warm-up length, and the run of identical sampled routes that counts as settled.
    pub last_stable_steps: u64,
    /// Stop as soon as the exploitation route is known.
    pub stop_after_convergence: bool,
    /// With `stop_after_convergence = false`: how many times [`PathSolver::solve`]
    /// issues the exploitation route before returning. `None` issues it forever.
    pub exploit_steps: Option<u64>,
    /// Seed for belief resampling.
    pub seed: u64,
    pub update: UpdateRule,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            prior: NigPrior::default(),
            max_explore_steps: 10_000,
            last_stable_steps: 500,
            stop_after_convergence: true,
            exploit_steps: None,
            seed: 0,
            update: UpdateRule::Exact,
        }
    }
}

impl SolverConfig {
    /// Convergence rule, evaluated after the exploring iteration with zero-based `iteration`.
    ///
    /// Requires `iteration >= last_stable_steps`, then either the hard cap or a long
    /// enough run of unchanged routes.
    pub fn is_converged(&self, iteration: u64, stable_run_length: u64) -> bool {
        iteration >= self.last_stable_steps
            && (iteration >= self.max_explore_steps
                || stable_run_length >= self.last_stable_steps)
    }
}

/// Learning phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mode {
    Exploring,
    Converged,
}

/// A route with its estimated expected travel time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    pub cost: f64,
    pub route: Vec<usize>,
}

/// What one call to [`PathSolver::step`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A sampled route was traversed and learned from.
    Explored {
        /// Zero-based exploring iteration.
        iteration: u64,
        route: Vec<usize>,
        /// Sum of realized travel times.
        total: f64,
        stable_run_length: u64,
        /// This iteration triggered convergence.
        converged: bool,
    },
    /// The cached exploitation route was traversed (no learning).
    Exploited { route: Vec<usize>, total: f64 },
    /// Converged with `stop_after_convergence`; the environment was not contacted.
    Stopped,
}

/// Thompson-sampling route learner over a DAG with log-normal edge latencies.
#[derive(Debug)]
pub struct PathSolver<N> {
    cfg: SolverConfig,
    beliefs: Graph<EdgeBelief>,
    network: N,
    rng: StdRng,
    explore_steps: u64,
    exploit_requests: u64,
    stable_run_length: u64,
    previous_route: Option<Vec<usize>>,
    exploitation: Option<Solution>,
    totals: Vec<f64>,
}

impl<N: Network> PathSolver<N> {
    /// Prune `topology` to edges that can reach finish and seed their beliefs.
    ///
    /// Only the shape of `topology` is read.
    pub fn new<E>(topology: &Graph<E>, network: N, cfg: SolverConfig) -> Result<Self> {
        cfg.prior.validate()?;
        let beliefs = prune_to_finish(topology, &cfg.prior);
        Ok(Self {
            cfg,
            beliefs,
            network,
            rng: StdRng::seed_from_u64(cfg.seed),
            explore_steps: 0,
            exploit_requests: 0,
            stable_run_length: 0,
            previous_route: None,
            exploitation: None,
            totals: Vec::new(),
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.cfg
    }

    pub fn mode(&self) -> Mode {
        if self.exploitation.is_some() {
            Mode::Converged
        } else {
            Mode::Exploring
        }
    }

    /// Cached exploitation route; `Some` exactly when converged.
    pub fn exploitation(&self) -> Option<&Solution> {
        self.exploitation.as_ref()
    }

    /// Consecutive exploring iterations whose sampled route matched the previous one.
    pub fn stable_run_length(&self) -> u64 {
        self.stable_run_length
    }

    /// Exploring iterations completed.
    pub fn explore_steps(&self) -> u64 {
        self.explore_steps
    }

    /// Exploitation routes issued after convergence.
    pub fn exploit_requests(&self) -> u64 {
        self.exploit_requests
    }

    /// Sampled route of the latest exploring iteration.
    pub fn previous_route(&self) -> Option<&[usize]> {
        self.previous_route.as_deref()
    }

    /// Realized total travel time of every request, in order.
    pub fn totals(&self) -> &[f64] {
        &self.totals
    }

    pub fn beliefs(&self) -> &Graph<EdgeBelief> {
        &self.beliefs
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn into_network(self) -> N {
        self.network
    }

    /// Run one iteration of the state machine.
    pub fn step(&mut self) -> Result<Step> {
        match self.exploitation.as_ref().map(|s| s.route.clone()) {
            None => self.explore(),
            Some(_) if self.cfg.stop_after_convergence => Ok(Step::Stopped),
            Some(route) => {
                let total = self.request(&route)?.1;
                self.exploit_requests += 1;
                tracing::trace!(?route, total, "exploitation request");
                Ok(Step::Exploited { route, total })
            }
        }
    }

    /// Step until finished and return the exploitation route.
    ///
    /// Finished means converged and either `stop_after_convergence` is set or
    /// `exploit_steps` requests have been issued. With neither, this only returns on error.
    pub fn solve(&mut self) -> Result<Solution> {
        loop {
            if let Some(solution) = self.finished() {
                return Ok(solution.clone());
            }
            self.step()?;
        }
    }

    fn finished(&self) -> Option<&Solution> {
        let solution = self.exploitation.as_ref()?;
        let done = self.cfg.stop_after_convergence
            || self
                .cfg
                .exploit_steps
                .is_some_and(|limit| self.exploit_requests >= limit);
        done.then_some(solution)
    }

    fn explore(&mut self) -> Result<Step> {
        let (_, route) = self.beliefs.shortest_path(EdgeBelief::sampled_cost)?;
        let (times, total) = self.request(&route)?;

        for (w, &t) in route.windows(2).zip(&times) {
            let belief = self
                .beliefs
                .edge_mut(w[0], w[1])
                .ok_or_else(|| Error::InvalidRoute {
                    route: route.clone(),
                    reason: "edge has no belief",
                })?;
            belief.observe(t, &self.cfg.prior, self.cfg.update)?;
        }
        for belief in self.beliefs.states_mut() {
            belief.resample(&mut self.rng)?;
        }

        if self.previous_route.as_ref() == Some(&route) {
            self.stable_run_length += 1;
        } else {
            self.stable_run_length = 0;
        }
        self.previous_route = Some(route.clone());

        let iteration = self.explore_steps;
        self.explore_steps += 1;
        let converged = self.cfg.is_converged(iteration, self.stable_run_length);
        tracing::debug!(
            iteration,
            ?route,
            total,
            stable_run_length = self.stable_run_length,
            "explored"
        );

        if converged {
            let (cost, best) = self.beliefs.shortest_path(EdgeBelief::expected_cost)?;
            tracing::info!(iteration, cost, route = ?best, "converged");
            self.exploitation = Some(Solution { cost, route: best });
        }

        Ok(Step::Explored {
            iteration,
            route,
            total,
            stable_run_length: self.stable_run_length,
            converged,
        })
    }

    /// Traverse `route`, check the response shape, and record its total.
    fn request(&mut self, route: &[usize]) -> Result<(Vec<f64>, f64)> {
        let times = self.network.traverse(route)?;
        let expected = route.len().saturating_sub(1);
        if times.len() != expected {
            return Err(Error::ObservationCount {
                expected,
                got: times.len(),
            });
        }
        if let Some(&value) = times.iter().find(|t| !(t.is_finite() && **t > 0.0)) {
            return Err(Error::InvalidObservation { value });
        }
        let total: f64 = times.iter().sum();
        self.totals.push(total);
        Ok((times, total))
    }
}
