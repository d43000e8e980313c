//! Unknown quantities of a Gibbs sampler and their update order.

use std::collections::HashMap;
use std::fmt;

use faer::Mat;
use thiserror::Error;

/// Distribution family of a parameter's conditional posterior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PosteriorFamily {
    /// Joint multivariate normal draw.
    MultivariateNormal,
    /// Inverse-gamma (shape, scale).
    InverseGamma,
    /// Gamma (shape, rate).
    Gamma,
    /// Inverse-Gaussian (mean, shape), drawn component-wise.
    InverseGaussian,
}

impl fmt::Display for PosteriorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PosteriorFamily::MultivariateNormal => "multivariate normal",
            PosteriorFamily::InverseGamma => "inverse gamma",
            PosteriorFamily::Gamma => "gamma",
            PosteriorFamily::InverseGaussian => "inverse gaussian",
        };
        f.write_str(name)
    }
}

/// Errors raised by parameter lookups and updates.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    #[error("parameter `{0}` not found in parameter set")]
    UnknownName(String),

    #[error("parameter `{0}` is already in the parameter set")]
    DuplicateName(String),

    #[error("index out of bounds: {index} >= {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("value for `{name}` has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        name: String,
        expected: (usize, usize),
        got: (usize, usize),
    },

    #[error("parameter `{0}` has no current value")]
    Unset(String),
}

/// An unknown quantity estimated by the sampler.
///
/// The current value is unset until the driver seeds it; once set it always
/// has the declared `shape`.
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    family: PosteriorFamily,
    shape: (usize, usize),
    value: Option<Mat<f64>>,
}

impl Parameter {
    /// Create a parameter with no current value.
    pub fn new(name: impl Into<String>, family: PosteriorFamily, shape: (usize, usize)) -> Self {
        Self {
            name: name.into(),
            family,
            shape,
            value: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> PosteriorFamily {
        self.family
    }

    /// Declared (rows, cols) shape.
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// True unless the parameter is a 1×1 scalar.
    pub fn is_multivariate(&self) -> bool {
        self.shape != (1, 1)
    }

    /// Current value, if one has been set.
    pub fn value(&self) -> Option<&Mat<f64>> {
        self.value.as_ref()
    }

    /// Current value or an `Unset` error.
    pub fn current(&self) -> Result<&Mat<f64>, ParameterError> {
        self.value
            .as_ref()
            .ok_or_else(|| ParameterError::Unset(self.name.clone()))
    }

    /// Current value of a scalar parameter.
    pub fn scalar(&self) -> Result<f64, ParameterError> {
        let value = self.current()?;
        if (value.nrows(), value.ncols()) != (1, 1) {
            return Err(ParameterError::ShapeMismatch {
                name: self.name.clone(),
                expected: (1, 1),
                got: (value.nrows(), value.ncols()),
            });
        }
        Ok(value[(0, 0)])
    }

    /// Replace the current value, checking it against the declared shape.
    pub fn set_value(&mut self, value: Mat<f64>) -> Result<(), ParameterError> {
        let got = (value.nrows(), value.ncols());
        if got != self.shape {
            return Err(ParameterError::ShapeMismatch {
                name: self.name.clone(),
                expected: self.shape,
                got,
            });
        }
        self.value = Some(value);
        Ok(())
    }

    /// Forget the current value.
    pub fn reset(&mut self) {
        self.value = None;
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name: {}, distribution: {}, size: ({}, {})",
            self.name, self.family, self.shape.0, self.shape.1
        )
    }
}

/// Ordered collection of parameters.
///
/// Insertion order is the Gibbs update order (the hierarchy). Parameters can be
/// looked up by name or by their position in the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    parameters: Vec<Parameter>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter at the end of the hierarchy.
    pub fn append(&mut self, parameter: Parameter) -> Result<(), ParameterError> {
        if self.index.contains_key(parameter.name()) {
            return Err(ParameterError::DuplicateName(parameter.name().to_string()));
        }
        self.index
            .insert(parameter.name().to_string(), self.parameters.len());
        self.parameters.push(parameter);
        Ok(())
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Result<&Parameter, ParameterError> {
        self.index
            .get(name)
            .map(|&i| &self.parameters[i])
            .ok_or_else(|| ParameterError::UnknownName(name.to_string()))
    }

    /// Look up a parameter by name for mutation.
    pub fn get_mut(&mut self, name: &str) -> Result<&mut Parameter, ParameterError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.parameters[i]),
            None => Err(ParameterError::UnknownName(name.to_string())),
        }
    }

    /// Look up a parameter by its position in the hierarchy.
    pub fn get_index(&self, index: usize) -> Result<&Parameter, ParameterError> {
        self.parameters
            .get(index)
            .ok_or(ParameterError::IndexOutOfBounds {
                index,
                len: self.parameters.len(),
            })
    }

    /// Position of `name` in the hierarchy.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Parameter names in update order.
    pub fn hierarchy(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name()).collect()
    }

    /// Iterate over the parameters in update order.
    pub fn iter(&self) -> std::slice::Iter<'_, Parameter> {
        self.parameters.iter()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Remove every parameter and empty the hierarchy.
    pub fn clear(&mut self) {
        self.parameters.clear();
        self.index.clear();
    }

    /// Copy of every current value, in hierarchy order.
    pub fn snapshot(&self) -> Vec<Option<Mat<f64>>> {
        self.parameters.iter().map(|p| p.value.clone()).collect()
    }

    /// Restore values previously taken with [`ParameterSet::snapshot`].
    ///
    /// Extra or missing entries are ignored.
    pub fn restore(&mut self, snapshot: Vec<Option<Mat<f64>>>) {
        for (parameter, value) in self.parameters.iter_mut().zip(snapshot) {
            parameter.value = value;
        }
    }
}

impl fmt::Display for ParameterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "(parameters: -----------------------")?;
        for parameter in &self.parameters {
            writeln!(f, "{parameter}")?;
        }
        write!(f, "-----------------------)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_set() -> ParameterSet {
        let mut set = ParameterSet::new();
        set.append(Parameter::new(
            "trend",
            PosteriorFamily::MultivariateNormal,
            (5, 1),
        ))
        .unwrap();
        set.append(Parameter::new("sigma2", PosteriorFamily::InverseGamma, (1, 1)))
            .unwrap();
        set
    }

    #[test]
    fn test_is_multivariate() {
        let vector = Parameter::new("omega", PosteriorFamily::InverseGaussian, (3, 1));
        let scalar = Parameter::new("sigma2", PosteriorFamily::InverseGamma, (1, 1));
        assert!(vector.is_multivariate());
        assert!(!scalar.is_multivariate());
    }

    #[test]
    fn test_set_value_checks_shape() {
        let mut p = Parameter::new("omega", PosteriorFamily::InverseGaussian, (3, 1));
        assert!(p.value().is_none());

        let err = p.set_value(Mat::zeros(2, 1)).unwrap_err();
        assert!(matches!(err, ParameterError::ShapeMismatch { .. }));
        assert!(p.value().is_none());

        p.set_value(Mat::from_fn(3, 1, |i, _| i as f64)).unwrap();
        assert_eq!(p.current().unwrap()[(2, 0)], 2.0);
    }

    #[test]
    fn test_scalar() {
        let mut p = Parameter::new("lambda2", PosteriorFamily::Gamma, (1, 1));
        assert_eq!(p.scalar(), Err(ParameterError::Unset("lambda2".into())));
        p.set_value(Mat::from_fn(1, 1, |_, _| 2.5)).unwrap();
        assert!((p.scalar().unwrap() - 2.5).abs() < 1e-12);
        p.reset();
        assert!(p.value().is_none());
    }

    #[test]
    fn test_append_rejects_duplicates() {
        let mut set = sample_set();
        let err = set
            .append(Parameter::new("trend", PosteriorFamily::Gamma, (1, 1)))
            .unwrap_err();
        assert_eq!(err, ParameterError::DuplicateName("trend".into()));
        assert_eq!(set.len(), 2);
        assert_eq!(set.hierarchy(), vec!["trend", "sigma2"]);
    }

    #[test]
    fn test_lookup_by_name_and_index() {
        let set = sample_set();
        assert_eq!(set.get("sigma2").unwrap().shape(), (1, 1));
        assert_eq!(set.get_index(0).unwrap().name(), "trend");
        assert_eq!(set.position("sigma2"), Some(1));
        assert!(matches!(
            set.get("omega"),
            Err(ParameterError::UnknownName(_))
        ));
        assert_eq!(
            set.get_index(2).unwrap_err(),
            ParameterError::IndexOutOfBounds { index: 2, len: 2 }
        );
    }

    #[test]
    fn test_clear() {
        let mut set = sample_set();
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains("trend"));
        assert!(set.hierarchy().is_empty());
    }

    #[test]
    fn test_snapshot_restore() {
        let mut set = sample_set();
        set.get_mut("sigma2")
            .unwrap()
            .set_value(Mat::from_fn(1, 1, |_, _| 0.8))
            .unwrap();
        let snapshot = set.snapshot();

        set.get_mut("sigma2")
            .unwrap()
            .set_value(Mat::from_fn(1, 1, |_, _| 9.0))
            .unwrap();
        set.restore(snapshot);

        assert!((set.get("sigma2").unwrap().scalar().unwrap() - 0.8).abs() < 1e-12);
        assert!(set.get("trend").unwrap().value().is_none());
    }

    #[test]
    fn test_display() {
        let set = sample_set();
        let text = set.to_string();
        assert!(text.contains("name: trend, distribution: multivariate normal, size: (5, 1)"));
        assert!(text.contains("name: sigma2, distribution: inverse gamma"));
    }
}
