//! Sampling core for Bayesian inference: an affine-invariant ensemble
//! transition kernel together with the constrained-to-unconstrained
//! parameter transforms that map model parameters into the space the
//! sampler operates in.
//!
//! The crate provides two tightly coupled pieces:
//!
//! - [`sampler::WalkMove`], one full-ensemble Markov transition using the
//!   walk move of Goodman & Weare (2010): each walker proposes a step built
//!   from Gaussian-weighted displacements of a random subset of the other
//!   walkers about their centroid, accepted by a Metropolis criterion.
//! - [`writer::UnconstrainedWriter`], an append-only accumulator applying the
//!   one-way transforms (log, logit, atanh, stick-relative logs, partial
//!   correlation factorization) that serialize constrained values into the
//!   unconstrained buffers a companion reader inverts.
//!
//! Everything else (the probabilistic model, the entropy source, chain
//! storage, iteration control) is supplied by the caller through the
//! [`model::DensityModel`] trait and `rand::Rng`.
//!
//! # References
//!
//! Goodman, J., & Weare, J. (2010). Ensemble samplers with affine invariance.
//! Communications in Applied Mathematics and Computational Science, 5(1), 65-80.

pub mod ensemble;
pub mod errors;
pub mod model;
pub mod sampler;
pub mod utils;
pub mod writer;

pub use ensemble::{WalkerInit, WalkerSet};
pub use errors::{Error, Result};
pub use model::DensityModel;
pub use sampler::{choose_walkers, Transition, WalkMove};
pub use writer::{UnconstrainedWriter, CONSTRAINT_TOLERANCE};
