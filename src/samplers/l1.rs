//! Bayesian L1 trend filter.
//!
//! The observations are modelled as a latent trend plus Gaussian noise, with a
//! Laplace (total variation) prior on the `order`-th differences of the trend,
//! written as a scale mixture of normals:
//!
//! ```text
//! y | x, σ²            ~ N(x, σ² I)
//! D x | σ², ω          ~ N(0, σ² diag(ω))
//! 1/ω_j | λ²           ~ exponential mixing (Bayesian LASSO)
//! λ²                   ~ Gamma(α, ρ)
//! ```
//!
//! The Gibbs sweep draws, in order:
//! 1. x | ·   ~ N((I + E)⁻¹ y, σ² (I + E)⁻¹), with E = Dᵀ diag(ω)⁻¹ D
//! 2. σ² | ·  ~ InvGamma((2n − k)/2, ½‖y − x‖² + ½ xᵀ E x)
//! 3. λ² | ·  ~ Gamma((n − k) + α, ½‖D x‖₁ / σ² + ρ)
//! 4. 1/ω_j | · ~ InvGaussian(√(λ² σ² / d_j²), λ²), d = D x
//!
//! where n is the series length and k the total-variation order.

use crate::core::{FilterOptions, Parameter, ParameterError, ParameterSet, PosteriorFamily};
use crate::samplers::traits::{DistributionParameters, NumericalError, Sampler, SamplerError};
use crate::utils::{col_to_mat, derivative_matrix, difference_coefficients, mat_to_col, scalar_mat};
use faer::linalg::solvers::Solve;
use faer::linalg::triangular_solve::solve_upper_triangular_in_place;
use faer::{Col, Mat, Par, Side};
use rand::distributions::Distribution;
use rand::RngCore;
use rand_distr::{InverseGaussian, StandardNormal};
use statrs::distribution::{Gamma, InverseGamma};

/// Latent trend, (n, 1).
pub const TREND: &str = "trend";
/// Residual variance, (1, 1).
pub const SIGMA2: &str = "sigma2";
/// Global shrinkage, (1, 1).
pub const LAMBDA2: &str = "lambda2";
/// Local shrinkage of each difference, (n - order, 1).
pub const OMEGA: &str = "omega";

/// Differences smaller than this make the `omega` conditional degenerate.
const MIN_DIFFERENCE: f64 = 1e-12;

/// Gibbs sampler of the Bayesian L1 trend filter.
///
/// # Example
///
/// ```rust,ignore
/// use trendfilter::prelude::*;
///
/// let sampler = L1Sampler::new(&y, &FilterOptions::l1(2))?;
/// let mut mcmc = Mcmc::with_seed(sampler, 42);
/// mcmc.run(100, 5, Verbosity::Quiet)?;
/// let trend = mcmc.output(50, "trend")?;
/// ```
#[derive(Debug, Clone)]
pub struct L1Sampler {
    data: Col<f64>,
    derivative: Mat<f64>,
    coefficients: &'static [f64],
    order: usize,
    alpha: f64,
    rho: f64,
    parameters: ParameterSet,
}

impl L1Sampler {
    /// Create a sampler for the series `data` and define its four parameters.
    ///
    /// Fails if the model options are invalid, if the series has fewer than
    /// `order + 2` observations, or if an observation is not finite.
    pub fn new(data: &Col<f64>, options: &FilterOptions) -> Result<Self, SamplerError> {
        options.validate_model()?;
        let order = options.total_variation_order;
        let n = data.nrows();

        if n < order + 2 {
            return Err(SamplerError::InsufficientObservations {
                needed: order + 2,
                got: n,
            });
        }
        if let Some(i) = (0..n).find(|&i| !data[i].is_finite()) {
            return Err(SamplerError::NonFiniteData(i));
        }

        let mut sampler = Self {
            data: data.clone(),
            derivative: derivative_matrix(n, order)?,
            coefficients: difference_coefficients(order)?,
            order,
            alpha: options.alpha,
            rho: options.rho,
            parameters: ParameterSet::new(),
        };
        sampler.define_parameters()?;
        Ok(sampler)
    }

    /// The observed series.
    pub fn data(&self) -> &Col<f64> {
        &self.data
    }

    /// The difference operator D, (n - order) × n.
    pub fn derivative_matrix(&self) -> &Mat<f64> {
        &self.derivative
    }

    pub fn total_variation_order(&self) -> usize {
        self.order
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    /// Length of the series.
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Number of penalized differences, n - order.
    fn n_differences(&self) -> usize {
        self.len() - self.order
    }

    fn current_col(&self, name: &str) -> Result<Col<f64>, SamplerError> {
        Ok(mat_to_col(self.parameters.get(name)?.current()?))
    }

    fn current_scalar(&self, name: &str) -> Result<f64, SamplerError> {
        Ok(self.parameters.get(name)?.scalar()?)
    }

    /// Current value of a scale-like scalar, which must be positive and finite.
    fn positive_scalar(&self, name: &str) -> Result<f64, SamplerError> {
        let value = self.current_scalar(name)?;
        if !(value > 0.0 && value.is_finite()) {
            return Err(NumericalError::InvalidArgument {
                parameter: name.to_string(),
                argument: "current value",
                value,
            }
            .into());
        }
        Ok(value)
    }

    /// D x, using the band structure of D.
    pub fn differences(&self, trend: &Col<f64>) -> Col<f64> {
        Col::from_fn(self.n_differences(), |j| {
            self.coefficients
                .iter()
                .enumerate()
                .map(|(l, &c)| c * trend[j + l])
                .sum()
        })
    }

    /// Reciprocals of the local shrinkage weights.
    fn omega_reciprocals(&self, omega: &Col<f64>) -> Result<Col<f64>, SamplerError> {
        for j in 0..omega.nrows() {
            let w = omega[j];
            if !(w > 0.0 && w.is_finite()) {
                return Err(NumericalError::InvalidArgument {
                    parameter: OMEGA.to_string(),
                    argument: "weight",
                    value: w,
                }
                .into());
            }
        }
        Ok(Col::from_fn(omega.nrows(), |j| 1.0 / omega[j]))
    }

    /// E = Dᵀ diag(ω)⁻¹ D, accumulated row by row of D.
    pub fn penalty_matrix(&self, omega: &Col<f64>) -> Result<Mat<f64>, SamplerError> {
        let inv = self.omega_reciprocals(omega)?;
        let n = self.len();
        let mut e = Mat::<f64>::zeros(n, n);
        for j in 0..self.n_differences() {
            for (a, &ca) in self.coefficients.iter().enumerate() {
                for (b, &cb) in self.coefficients.iter().enumerate() {
                    e[(j + a, j + b)] += ca * cb * inv[j];
                }
            }
        }
        Ok(e)
    }

    /// xᵀ E x = Σ_j d_j² / ω_j.
    fn penalty(&self, differences: &Col<f64>, omega: &Col<f64>) -> Result<f64, SamplerError> {
        let inv = self.omega_reciprocals(omega)?;
        Ok((0..differences.nrows())
            .map(|j| differences[j] * differences[j] * inv[j])
            .sum())
    }

    fn trend_parameters(&self) -> Result<DistributionParameters, SamplerError> {
        let omega = self.current_col(OMEGA)?;
        let sigma2 = self.positive_scalar(SIGMA2)?;

        let mut precision = self.penalty_matrix(&omega)?;
        for i in 0..self.len() {
            precision[(i, i)] += 1.0;
        }
        let precision = precision
            .llt(Side::Lower)
            .map_err(|_| NumericalError::NotPositiveDefinite(TREND.to_string()))?;
        let mean = precision.solve(self.data.as_ref());

        Ok(DistributionParameters::MultivariateNormal {
            mean,
            precision,
            scale: sigma2,
        })
    }

    fn sigma2_parameters(&self) -> Result<DistributionParameters, SamplerError> {
        let trend = self.current_col(TREND)?;
        let omega = self.current_col(OMEGA)?;

        let residual = Col::from_fn(self.len(), |i| self.data[i] - trend[i]);
        let penalty = self.penalty(&self.differences(&trend), &omega)?;

        let shape = (2 * self.len() - self.order) as f64 / 2.0;
        let scale = 0.5 * residual.squared_norm_l2() + 0.5 * penalty;
        Ok(DistributionParameters::InverseGamma { shape, scale })
    }

    fn lambda2_parameters(&self) -> Result<DistributionParameters, SamplerError> {
        let trend = self.current_col(TREND)?;
        let sigma2 = self.positive_scalar(SIGMA2)?;

        let shape = self.n_differences() as f64 + self.alpha;
        let rate = 0.5 * self.differences(&trend).norm_l1() / sigma2 + self.rho;
        Ok(DistributionParameters::Gamma { shape, rate })
    }

    fn omega_parameters(&self) -> Result<DistributionParameters, SamplerError> {
        let trend = self.current_col(TREND)?;
        let sigma2 = self.positive_scalar(SIGMA2)?;
        let lambda2 = self.positive_scalar(LAMBDA2)?;

        let differences = self.differences(&trend);
        let numerator = (lambda2 * sigma2).sqrt();
        let mut means = Col::<f64>::zeros(differences.nrows());
        for j in 0..differences.nrows() {
            let d = differences[j].abs();
            if !(d >= MIN_DIFFERENCE) {
                return Err(NumericalError::DegenerateDifference {
                    index: j,
                    value: differences[j],
                }
                .into());
            }
            means[j] = numerator / d;
        }

        Ok(DistributionParameters::InverseGaussian {
            means,
            shape: lambda2,
        })
    }
}

/// Check a distribution argument is positive and finite.
fn positive(parameter: &str, argument: &'static str, value: f64) -> Result<f64, NumericalError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(NumericalError::InvalidArgument {
            parameter: parameter.to_string(),
            argument,
            value,
        })
    }
}

/// Check a scalar draw is positive and finite.
fn positive_draw(parameter: &str, value: f64) -> Result<f64, NumericalError> {
    if value > 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(NumericalError::NonFinite(parameter.to_string()))
    }
}

impl Sampler for L1Sampler {
    fn define_parameters(&mut self) -> Result<(), SamplerError> {
        let n = self.len();
        let mut parameters = ParameterSet::new();
        parameters.append(Parameter::new(
            TREND,
            PosteriorFamily::MultivariateNormal,
            (n, 1),
        ))?;
        parameters.append(Parameter::new(SIGMA2, PosteriorFamily::InverseGamma, (1, 1)))?;
        parameters.append(Parameter::new(LAMBDA2, PosteriorFamily::Gamma, (1, 1)))?;
        parameters.append(Parameter::new(
            OMEGA,
            PosteriorFamily::InverseGaussian,
            (self.n_differences(), 1),
        ))?;
        self.parameters = parameters;
        Ok(())
    }

    fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    fn initial_value(&self, name: &str) -> Result<Mat<f64>, SamplerError> {
        match name {
            TREND => Ok(Mat::from_fn(self.len(), 1, |i, _| {
                (4.0 * i as f64 + 10.0) / 20.0
            })),
            SIGMA2 => Ok(scalar_mat(0.8)),
            LAMBDA2 => Ok(scalar_mat(1.0)),
            OMEGA => Ok(Mat::from_fn(self.n_differences(), 1, |i, _| {
                let half = i as f64 / 2.0;
                0.8 * (30.0 * half + 3.0) / (2.0 * half + 35.0)
            })),
            _ => Err(ParameterError::UnknownName(name.to_string()).into()),
        }
    }

    fn distribution_parameters(
        &self,
        name: &str,
    ) -> Result<DistributionParameters, SamplerError> {
        match name {
            TREND => self.trend_parameters(),
            SIGMA2 => self.sigma2_parameters(),
            LAMBDA2 => self.lambda2_parameters(),
            OMEGA => self.omega_parameters(),
            _ => Err(ParameterError::UnknownName(name.to_string()).into()),
        }
    }

    fn generate(&self, name: &str, rng: &mut dyn RngCore) -> Result<Mat<f64>, SamplerError> {
        let (rows, cols) = self.parameters.get(name)?.shape();

        let draw = match self.distribution_parameters(name)? {
            DistributionParameters::MultivariateNormal {
                mean,
                precision,
                scale,
            } => {
                // x = μ + √s · L⁻ᵀ z has covariance s (L Lᵀ)⁻¹
                let mut z = Col::<f64>::zeros(mean.nrows());
                for i in 0..mean.nrows() {
                    let v: f64 = StandardNormal.sample(&mut *rng);
                    z[i] = v;
                }
                solve_upper_triangular_in_place(
                    precision.L().transpose(),
                    z.as_mat_mut(),
                    Par::Seq,
                );
                let sd = scale.sqrt();
                col_to_mat(&Col::from_fn(mean.nrows(), |i| mean[i] + sd * z[i]))
            }
            DistributionParameters::InverseGamma { shape, scale } => {
                let shape = positive(name, "shape", shape)?;
                let scale = positive(name, "scale", scale)?;
                let dist = InverseGamma::new(shape, scale).map_err(|_| {
                    NumericalError::InvalidArgument {
                        parameter: name.to_string(),
                        argument: "scale",
                        value: scale,
                    }
                })?;
                scalar_mat(positive_draw(name, dist.sample(&mut *rng))?)
            }
            DistributionParameters::Gamma { shape, rate } => {
                let shape = positive(name, "shape", shape)?;
                let rate = positive(name, "rate", rate)?;
                let dist = Gamma::new(shape, rate).map_err(|_| NumericalError::InvalidArgument {
                    parameter: name.to_string(),
                    argument: "rate",
                    value: rate,
                })?;
                scalar_mat(positive_draw(name, dist.sample(&mut *rng))?)
            }
            DistributionParameters::InverseGaussian { means, shape } => {
                let shape = positive(name, "shape", shape)?;
                let mut draw = Mat::<f64>::zeros(means.nrows(), 1);
                for j in 0..means.nrows() {
                    let mean = positive(name, "mean", means[j])?;
                    let dist = InverseGaussian::new(mean, shape).map_err(|_| {
                        NumericalError::InvalidArgument {
                            parameter: name.to_string(),
                            argument: "mean",
                            value: mean,
                        }
                    })?;
                    let w: f64 = dist.sample(&mut *rng);
                    draw[(j, 0)] = positive_draw(name, 1.0 / w)?;
                }
                draw
            }
        };

        if (draw.nrows(), draw.ncols()) != (rows, cols) || !draw.is_all_finite() {
            return Err(NumericalError::NonFinite(name.to_string()).into());
        }
        Ok(draw)
    }
}
