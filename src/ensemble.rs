//! Ensemble state: one generation of walkers and initialization strategies.

use crate::errors::{Error, Result};
use crate::model::DensityModel;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One generation of an ensemble: the positions of all walkers and the
/// log-density of each.
///
/// A walker is one row of [`positions`](Self::positions) plus the matching
/// entry of [`log_probs`](Self::log_probs). Generations are replaced
/// wholesale by [`crate::sampler::WalkMove::transition`]; a `WalkerSet` is
/// never mutated mid-transition, so a reference to it is always a consistent
/// snapshot.
///
/// Invariant: every stored log-density equals the model's `log_density`
/// evaluated at the walker's own position at the time the walker was last
/// accepted. Construction enforces this by evaluating the model up front.
///
/// Cumulative acceptance counters travel with the state so a driver can
/// report mixing without recomputing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkerSet {
    /// Walker positions: shape (n_walkers, n_params)
    pub(crate) positions: Array2<f64>,

    /// Log-densities at the walker positions: shape (n_walkers,)
    pub(crate) log_probs: Array1<f64>,

    /// Total number of proposals accepted for each walker
    pub(crate) n_accepted: Array1<usize>,

    /// Total number of proposals made for each walker
    pub(crate) n_proposed: Array1<usize>,
}

impl WalkerSet {
    /// Create a new ensemble from initial positions, evaluating the model at
    /// every walker.
    ///
    /// # Arguments
    ///
    /// * `model` - Target density; its `dim()` must match the position width
    /// * `positions` - Initial walker positions, shape (n_walkers, n_params)
    ///
    /// # Returns
    ///
    /// A `WalkerSet` with freshly evaluated log-densities and zeroed
    /// acceptance counters, or an error if fewer than two walkers were given
    /// or the dimensions do not match the model.
    pub fn new<M: DensityModel>(model: &M, positions: Array2<f64>) -> Result<Self> {
        let (n_walkers, n_params) = positions.dim();

        if n_walkers < 2 {
            return Err(Error::TooFewWalkers(n_walkers));
        }
        if n_params != model.dim() {
            return Err(Error::ShapeMismatch {
                expected: format!("positions with {} columns", model.dim()),
                actual: format!("{} columns", n_params),
            });
        }

        let log_probs = positions
            .outer_iter()
            .map(|row| model.log_density(row))
            .collect::<Array1<f64>>();

        log::debug!(
            "initialized ensemble of {} walkers in {} dimensions",
            n_walkers,
            n_params
        );

        Ok(Self {
            positions,
            log_probs,
            n_accepted: Array1::zeros(n_walkers),
            n_proposed: Array1::zeros(n_walkers),
        })
    }

    /// Number of walkers in the ensemble.
    pub fn n_walkers(&self) -> usize {
        self.positions.nrows()
    }

    /// Number of parameters per walker.
    pub fn n_params(&self) -> usize {
        self.positions.ncols()
    }

    /// All walker positions, shape (n_walkers, n_params).
    pub fn positions(&self) -> ArrayView2<f64> {
        self.positions.view()
    }

    /// Log-densities at the walker positions.
    pub fn log_probs(&self) -> ArrayView1<f64> {
        self.log_probs.view()
    }

    /// Position of a single walker.
    pub fn position(&self, index: usize) -> ArrayView1<f64> {
        self.positions.row(index)
    }

    /// Log-density of a single walker.
    pub fn log_prob(&self, index: usize) -> f64 {
        self.log_probs[index]
    }

    /// Ratio of accepted to proposed moves for each walker.
    ///
    /// Walkers with no proposals yet report 0.0.
    pub fn acceptance_fraction(&self) -> Array1<f64> {
        let mut fractions = Array1::zeros(self.n_walkers());
        for i in 0..self.n_walkers() {
            if self.n_proposed[i] > 0 {
                fractions[i] = self.n_accepted[i] as f64 / self.n_proposed[i] as f64;
            }
        }
        fractions
    }

    /// Mean acceptance rate across all walkers.
    pub fn mean_acceptance_rate(&self) -> f64 {
        let total_accepted: usize = self.n_accepted.iter().sum();
        let total_proposed: usize = self.n_proposed.iter().sum();

        if total_proposed > 0 {
            total_accepted as f64 / total_proposed as f64
        } else {
            0.0
        }
    }
}

/// Strategy for producing the initial walker positions of a chain.
#[derive(Debug, Clone)]
pub enum WalkerInit {
    /// Scatter walkers uniformly in a box around a point.
    Ball {
        /// Center point for the ball
        center: Array1<f64>,
        /// Width of the uniform scatter in each dimension
        radius: f64,
    },

    /// Explicit walker positions.
    Explicit(Array2<f64>),
}

impl WalkerInit {
    /// Produce an (n_walkers, n_params) position matrix.
    ///
    /// # Arguments
    ///
    /// * `n_walkers` - Number of walkers to initialize
    /// * `n_params` - Dimension of each walker
    /// * `rng` - Random number generator (consumed only by `Ball`)
    pub fn initialize<R: Rng + ?Sized>(
        &self,
        n_walkers: usize,
        n_params: usize,
        rng: &mut R,
    ) -> Result<Array2<f64>> {
        match self {
            WalkerInit::Ball { center, radius } => {
                if center.len() != n_params {
                    return Err(Error::ShapeMismatch {
                        expected: format!("center of length {}", n_params),
                        actual: format!("length {}", center.len()),
                    });
                }

                let mut positions = Array2::zeros((n_walkers, n_params));
                for i in 0..n_walkers {
                    for j in 0..n_params {
                        let offset = rng.gen::<f64>() - 0.5;
                        positions[[i, j]] = center[j] + offset * radius;
                    }
                }
                Ok(positions)
            }
            WalkerInit::Explicit(positions) => {
                if positions.dim() != (n_walkers, n_params) {
                    return Err(Error::ShapeMismatch {
                        expected: format!("({}, {})", n_walkers, n_params),
                        actual: format!("{:?}", positions.dim()),
                    });
                }
                Ok(positions.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Quadratic {
        dim: usize,
    }

    impl DensityModel for Quadratic {
        fn dim(&self) -> usize {
            self.dim
        }

        fn log_density(&self, position: ArrayView1<f64>) -> f64 {
            -0.5 * position.iter().map(|x| x * x).sum::<f64>()
        }
    }

    #[test]
    fn test_walker_set_evaluates_model_on_creation() {
        let model = Quadratic { dim: 2 };
        let positions = array![[0.0, 0.0], [1.0, 1.0], [2.0, 0.0]];

        let walkers = WalkerSet::new(&model, positions).unwrap();

        assert_eq!(walkers.n_walkers(), 3);
        assert_eq!(walkers.n_params(), 2);
        assert_eq!(walkers.log_prob(0), 0.0);
        assert_eq!(walkers.log_prob(1), -1.0);
        assert_eq!(walkers.log_prob(2), -2.0);
        assert!(walkers.n_accepted.iter().all(|&n| n == 0));
        assert!(walkers.n_proposed.iter().all(|&n| n == 0));
    }

    #[test]
    fn test_walker_set_requires_two_walkers() {
        let model = Quadratic { dim: 2 };
        let result = WalkerSet::new(&model, array![[0.0, 1.0]]);
        assert!(matches!(result, Err(Error::TooFewWalkers(1))));
    }

    #[test]
    fn test_walker_set_rejects_dimension_mismatch() {
        let model = Quadratic { dim: 3 };
        let result = WalkerSet::new(&model, array![[0.0, 1.0], [2.0, 3.0]]);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_acceptance_tracking() {
        let model = Quadratic { dim: 2 };
        let positions = array![[0.0, 1.0], [2.0, 3.0], [4.0, 5.0]];
        let mut walkers = WalkerSet::new(&model, positions).unwrap();

        assert_eq!(walkers.mean_acceptance_rate(), 0.0);
        assert_eq!(walkers.acceptance_fraction(), array![0.0, 0.0, 0.0]);

        walkers.n_proposed[0] = 10;
        walkers.n_accepted[0] = 7;
        walkers.n_proposed[1] = 10;
        walkers.n_accepted[1] = 3;
        walkers.n_proposed[2] = 10;
        walkers.n_accepted[2] = 5;

        assert_eq!(walkers.mean_acceptance_rate(), 0.5);
        assert_eq!(walkers.acceptance_fraction(), array![0.7, 0.3, 0.5]);
    }

    #[test]
    fn test_walker_set_serde_roundtrip() {
        let model = Quadratic { dim: 2 };
        let walkers = WalkerSet::new(&model, array![[0.0, 1.0], [2.0, 3.0]]).unwrap();

        let serialized = serde_json::to_string(&walkers).unwrap();
        let deserialized: WalkerSet = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.positions, walkers.positions);
        assert_eq!(deserialized.log_probs, walkers.log_probs);
        assert_eq!(deserialized.n_accepted, walkers.n_accepted);
        assert_eq!(deserialized.n_proposed, walkers.n_proposed);
    }

    #[test]
    fn test_walker_init_ball() {
        let init = WalkerInit::Ball {
            center: array![5.0, -3.0],
            radius: 0.1,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let positions = init.initialize(10, 2, &mut rng).unwrap();

        assert_eq!(positions.dim(), (10, 2));
        for i in 0..10 {
            assert!((positions[[i, 0]] - 5.0).abs() < 0.1);
            assert!((positions[[i, 1]] + 3.0).abs() < 0.1);
        }
    }

    #[test]
    fn test_walker_init_ball_wrong_dimension() {
        let init = WalkerInit::Ball {
            center: array![0.5],
            radius: 0.1,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let result = init.initialize(4, 2, &mut rng);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_walker_init_explicit() {
        let explicit = array![[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]];
        let init = WalkerInit::Explicit(explicit.clone());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let positions = init.initialize(3, 2, &mut rng).unwrap();
        assert_eq!(positions, explicit);

        // Shape disagreement is rejected
        let result = init.initialize(4, 2, &mut rng);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }
}
