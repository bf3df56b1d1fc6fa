//! Per-edge Normal-Inverse-Gamma beliefs over log-latency.
//!
//! Each edge's travel time is modelled as log-normal, so `log t` is Gaussian with
//! unknown mean and variance. The conjugate prior is Normal-Inverse-Gamma:
//!
//! ```text
//!   var  ~ InvGamma(alpha, beta)
//!   mean ~ Normal(mu, var / nu)
//! ```
//!
//! The posterior is recomputed from the fixed global prior and the full log history
//! on every observation (not chained observation-to-observation). `alpha` and `nu`
//! are incremented per call.

use rand::Rng;
use rand_distr::{Distribution, Gamma, Normal};

use crate::{Error, Result};

/// Global Normal-Inverse-Gamma prior shared by every edge.
///
/// Read-only for the lifetime of a solver.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NigPrior {
    /// Inverse-Gamma shape (must be > 1 so the prior variance has a mean).
    pub alpha: f64,
    /// Inverse-Gamma scale (must be > 0).
    pub beta: f64,
    /// Prior mean of log-latency.
    pub mu: f64,
    /// Pseudo-observation count behind `mu` (must be > 0).
    pub nu: f64,
}

impl Default for NigPrior {
    fn default() -> Self {
        Self {
            alpha: 2.0,
            beta: 1.0,
            mu: 0.0,
            nu: 1.0,
        }
    }
}

impl NigPrior {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha.is_finite() && self.beta.is_finite()) {
            return Err(Error::InvalidPrior("alpha and beta must be finite"));
        }
        if !(self.mu.is_finite() && self.nu.is_finite()) {
            return Err(Error::InvalidPrior("mu and nu must be finite"));
        }
        if self.alpha <= 1.0 {
            return Err(Error::InvalidPrior("alpha must be > 1"));
        }
        if self.beta <= 0.0 {
            return Err(Error::InvalidPrior("beta must be > 0"));
        }
        if self.nu <= 0.0 {
            return Err(Error::InvalidPrior("nu must be > 0"));
        }
        Ok(())
    }

    /// Mean of the prior variance, `beta / (alpha - 1)`.
    pub fn expected_var(&self) -> f64 {
        self.beta / (self.alpha - 1.0)
    }
}

/// How the sum of squared deviations is obtained on each update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdateRule {
    /// Recompute `sum((x - mean)^2)` over the whole history (`O(n)` per update).
    #[default]
    Exact,
    /// Welford's running recurrence (`O(1)` per update). Agrees with `Exact` up to
    /// floating-point rounding.
    Incremental,
}

/// Posterior state and current Thompson sample for one edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeBelief {
    pub alpha: f64,
    pub beta: f64,
    pub mu: f64,
    pub nu: f64,
    /// Running sum of log-observations.
    pub logsum: f64,
    /// Observation count.
    pub n: u64,
    /// Every log-observation, in arrival order.
    pub vals: Vec<f64>,
    /// Sampled log-mean from the latest resample.
    pub mean: f64,
    /// Sampled log-variance from the latest resample.
    pub var: f64,
    // Welford accumulators for `UpdateRule::Incremental`.
    running_mean: f64,
    m2: f64,
}

impl EdgeBelief {
    /// Fresh belief at the prior; the initial sample is the prior mean of `(mean, var)`.
    pub fn from_prior(prior: &NigPrior) -> Self {
        Self {
            alpha: prior.alpha,
            beta: prior.beta,
            mu: prior.mu,
            nu: prior.nu,
            logsum: 0.0,
            n: 0,
            vals: Vec::new(),
            mean: prior.mu,
            var: prior.expected_var(),
            running_mean: 0.0,
            m2: 0.0,
        }
    }

    /// Fold one realized travel time into the posterior.
    ///
    /// `t` must be finite and positive; otherwise the belief is left untouched.
    /// `mean` and `var` are not modified.
    pub fn observe(&mut self, t: f64, prior: &NigPrior, rule: UpdateRule) -> Result<()> {
        if !(t.is_finite() && t > 0.0) {
            return Err(Error::InvalidObservation { value: t });
        }
        let x = t.ln();

        self.vals.push(x);
        self.n += 1;
        self.logsum += x;
        let n = self.n as f64;
        let logmean = self.logsum / n;

        let delta = x - self.running_mean;
        self.running_mean += delta / n;
        self.m2 += delta * (x - self.running_mean);

        let ss = match rule {
            UpdateRule::Exact => self.vals.iter().map(|v| (v - logmean).powi(2)).sum::<f64>(),
            UpdateRule::Incremental => self.m2,
        };

        self.alpha += 0.5;
        self.mu = (prior.nu * prior.mu + n * logmean) / (prior.nu + n);
        self.beta = prior.beta
            + ss / 2.0
            + prior.nu * n * (logmean - prior.mu).powi(2) * 0.5 / (prior.nu + n);
        self.nu += 1.0;
        Ok(())
    }

    /// Draw a fresh `(mean, var)` from the posterior and store it.
    ///
    /// `var = 1 / Gamma(alpha, scale = 1/beta)`, then `mean ~ Normal(mu, sqrt(var / nu))`.
    pub fn resample<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let precision = Gamma::new(self.alpha, 1.0 / self.beta)
            .map_err(|e| Error::Sampling(format!("gamma({}, {}): {e}", self.alpha, self.beta)))?
            .sample(rng);
        let var = 1.0 / precision;
        let sd = (var / self.nu).sqrt();
        let mean = Normal::new(self.mu, sd)
            .map_err(|e| Error::Sampling(format!("normal({}, {sd}): {e}", self.mu)))?
            .sample(rng);
        self.mean = mean;
        self.var = var;
        Ok(())
    }

    /// Expected travel time under the current sample: `exp(mean + var / 2)`.
    pub fn sampled_cost(&self) -> f64 {
        (self.mean + self.var / 2.0).exp()
    }

    /// Certainty-equivalent travel time: `exp(mu + E[var] / 2)` with
    /// `E[var] = beta / (alpha - 1)`.
    pub fn expected_cost(&self) -> f64 {
        (self.mu + (self.beta / (self.alpha - 1.0)) / 2.0).exp()
    }
}
