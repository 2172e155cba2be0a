//! Affine-invariant ensemble transition kernel (walk move).
//!
//! Implements the walk move of Goodman & Weare (2010), Equation (11): each
//! walker proposes a step composed of Gaussian-weighted displacements of a
//! randomly chosen subset of the other walkers about that subset's centroid.
//! Because the proposal is built purely from differences of ensemble
//! positions, the move is invariant under any invertible affine
//! reparametrization of the target, and there is no step-size parameter to
//! tune.
//!
//! One [`WalkMove::transition`] call advances the whole ensemble by a single
//! generation, reading only the pre-transition snapshot. The kernel borrows
//! the random stream and the model; it owns neither.
//!
//! # References
//!
//! Goodman, J., & Weare, J. (2010). Ensemble samplers with affine invariance.
//! Communications in Applied Mathematics and Computational Science, 5(1), 65-80.

use crate::ensemble::WalkerSet;
use crate::errors::{Error, Result};
use crate::model::DensityModel;
use ndarray::{Array1, ArrayView2};
use rand::Rng;
use rand_distr::StandardNormal;
use std::io::{self, Write};

/// The walk move transition kernel.
///
/// Stateless: all chain state lives in the [`WalkerSet`], and all entropy
/// comes from the caller's `Rng`. Re-running a transition with the same
/// snapshot and a generator in the same state reproduces the output exactly.
///
/// The per-walker draw order is part of the reproducibility contract: for
/// each walker index ascending, first the subset Bernoullis (one per
/// candidate index ascending, repeated in full if the subset came up empty),
/// then one standard normal per selected index ascending, then one uniform
/// for the accept decision. The uniform is drawn even when acceptance is
/// certain, so the stream position never depends on acceptance outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkMove;

/// Result of advancing the ensemble by one generation.
#[derive(Debug, Clone)]
pub struct Transition {
    /// The next generation.
    pub walkers: WalkerSet,

    /// Metropolis acceptance probability computed for each walker's proposal.
    pub accept_probs: Array1<f64>,

    /// Whether each walker's proposal was accepted.
    pub accepted: Vec<bool>,
}

impl Transition {
    /// Number of walkers whose proposal was accepted this generation.
    pub fn n_accepted(&self) -> usize {
        self.accepted.iter().filter(|&&a| a).count()
    }
}

impl WalkMove {
    /// Advance every walker by one walk move, producing the next generation.
    ///
    /// Walkers are updated independently from the immutable snapshot
    /// `current`; a walker never sees a sibling updated earlier in the same
    /// pass. For each walker: choose a complementary subset, form the
    /// centroid-relative Gaussian proposal, evaluate the model, and
    /// accept/reject by the Metropolis criterion
    /// `min(1, exp(logp_proposal - logp_current))`.
    ///
    /// # Arguments
    ///
    /// * `model` - Target density
    /// * `current` - Pre-transition snapshot of the ensemble
    /// * `rng` - Shared random stream, consumed sequentially
    ///
    /// # Returns
    ///
    /// The next generation together with per-walker acceptance diagnostics,
    /// or an error if the snapshot's dimension does not match the model.
    pub fn transition<M, R>(&self, model: &M, current: &WalkerSet, rng: &mut R) -> Result<Transition>
    where
        M: DensityModel,
        R: Rng + ?Sized,
    {
        if current.n_params() != model.dim() {
            return Err(Error::ShapeMismatch {
                expected: format!("walkers of dimension {}", model.dim()),
                actual: format!("dimension {}", current.n_params()),
            });
        }

        let n_walkers = current.n_walkers();
        let snapshot = current.positions();

        let mut positions = current.positions.clone();
        let mut log_probs = current.log_probs.clone();
        let mut n_accepted = current.n_accepted.clone();
        let mut n_proposed = current.n_proposed.clone();
        let mut accept_probs = Array1::zeros(n_walkers);
        let mut accepted = vec![false; n_walkers];

        for i in 0..n_walkers {
            let subset = choose_walkers(i, n_walkers, rng);
            let proposal = propose_walker(&snapshot, i, &subset, rng);
            let log_prob_new = model.log_density(proposal.view());

            let alpha = acceptance_probability(current.log_prob(i), log_prob_new);
            // Drawn unconditionally to keep the stream position independent
            // of the accept decision.
            let u: f64 = rng.gen();

            accept_probs[i] = alpha;
            n_proposed[i] += 1;

            if u < alpha {
                positions.row_mut(i).assign(&proposal);
                log_probs[i] = log_prob_new;
                n_accepted[i] += 1;
                accepted[i] = true;
            }
        }

        let transition = Transition {
            walkers: WalkerSet {
                positions,
                log_probs,
                n_accepted,
                n_proposed,
            },
            accept_probs,
            accepted,
        };

        log::debug!(
            "walk move transition: accepted {}/{} proposals",
            transition.n_accepted(),
            n_walkers
        );

        Ok(transition)
    }

    /// Write the kernel's metric description to an optional diagnostic sink.
    ///
    /// The walk move has no tunable scale, so this emits a single comment
    /// line. A missing sink is silently accepted.
    pub fn write_metric(&self, sink: Option<&mut dyn io::Write>) -> io::Result<()> {
        if let Some(out) = sink {
            writeln!(out, "# No free parameters for walk move ensemble sampler")?;
        }
        Ok(())
    }
}

/// Choose the complementary subset for the walker at `exclude`.
///
/// Every other index is included independently with probability 1/2, in
/// ascending order; the whole draw is repeated until the subset is
/// non-empty. Each redraw succeeds with probability `1 - 2^-(N-1)`, so the
/// loop almost never runs twice except for the smallest ensembles (`N = 2`
/// needs two attempts on average).
///
/// A singleton subset is allowed; it degenerates to a zero displacement
/// because its only member coincides with the centroid.
pub fn choose_walkers<R: Rng + ?Sized>(exclude: usize, n_walkers: usize, rng: &mut R) -> Vec<usize> {
    assert!(n_walkers >= 2, "subset selection needs at least 2 walkers");
    debug_assert!(exclude < n_walkers);

    let mut subset = Vec::with_capacity(n_walkers - 1);
    while subset.is_empty() {
        for j in 0..n_walkers {
            if j != exclude && rng.gen_bool(0.5) {
                subset.push(j);
            }
        }
    }
    subset
}

/// Metropolis acceptance probability for a proposed walker state.
///
/// `min(1, exp(log_prob_proposal - log_prob_current))`, with one explicit
/// policy for degenerate evaluations: a non-finite proposal log-density
/// (`NaN`, `+inf` or `-inf`) yields probability 0, i.e. the proposal is
/// always rejected. A walker whose *current* log-density is non-finite can
/// still escape, since any finite proposal beats it.
pub fn acceptance_probability(log_prob_current: f64, log_prob_proposal: f64) -> f64 {
    if !log_prob_proposal.is_finite() {
        return 0.0;
    }
    (log_prob_proposal - log_prob_current).exp().min(1.0)
}

/// Elementwise mean of the selected walkers' positions.
fn centroid(positions: &ArrayView2<f64>, subset: &[usize]) -> Array1<f64> {
    let mut mean = Array1::<f64>::zeros(positions.ncols());
    for &j in subset {
        mean += &positions.row(j);
    }
    mean / subset.len() as f64
}

/// Walk move proposal for the walker at `index`:
/// `x_i + sum_j z_j (x_j - centroid)` over the subset, `z_j` i.i.d. standard
/// normal. Equivalent to a Gaussian step with covariance equal to the sample
/// covariance of the subset.
fn propose_walker<R: Rng + ?Sized>(
    positions: &ArrayView2<f64>,
    index: usize,
    subset: &[usize],
    rng: &mut R,
) -> Array1<f64> {
    let mean = centroid(positions, subset);
    let mut proposal = positions.row(index).to_owned();

    for &j in subset {
        let z: f64 = rng.sample(StandardNormal);
        let displacement = &positions.row(j) - &mean;
        proposal.scaled_add(z, &displacement);
    }
    proposal
}
