//! Selection of a sampler by identifier.

use std::fmt;
use std::str::FromStr;

use faer::Col;

use crate::core::FilterOptions;
use crate::samplers::l1::L1Sampler;
use crate::samplers::traits::{Sampler, SamplerError};

/// Constructor stored in a [`SamplerRegistry`].
pub type SamplerConstructor =
    fn(&Col<f64>, &FilterOptions) -> Result<Box<dyn Sampler>, SamplerError>;

/// Built-in trend filtering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamplerKind {
    /// Bayesian L1 (total variation) trend filter.
    #[default]
    L1,
}

impl SamplerKind {
    /// Every built-in strategy.
    pub const ALL: [SamplerKind; 1] = [SamplerKind::L1];

    /// Canonical identifier.
    pub fn as_str(&self) -> &'static str {
        self.identifiers()[0]
    }

    /// Identifiers this strategy is known by, canonical first.
    pub fn identifiers(&self) -> &'static [&'static str] {
        match self {
            SamplerKind::L1 => &["L1", "L1Filter"],
        }
    }

    pub fn constructor(&self) -> SamplerConstructor {
        match self {
            SamplerKind::L1 => create_l1,
        }
    }

    /// Build a sampler of this kind.
    pub fn create(
        &self,
        data: &Col<f64>,
        options: &FilterOptions,
    ) -> Result<Box<dyn Sampler>, SamplerError> {
        (self.constructor())(data, options)
    }
}

impl fmt::Display for SamplerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SamplerKind {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SamplerKind::ALL
            .into_iter()
            .find(|kind| kind.identifiers().contains(&s))
            .ok_or_else(|| SamplerError::UnknownStrategy(s.to_string()))
    }
}

fn create_l1(data: &Col<f64>, options: &FilterOptions) -> Result<Box<dyn Sampler>, SamplerError> {
    Ok(Box::new(L1Sampler::new(data, options)?))
}

/// Explicit map from identifier to sampler constructor.
///
/// `SamplerRegistry::default()` registers every [`SamplerKind`] under each of
/// its identifiers; more can be registered under new identifiers.
#[derive(Debug, Clone)]
pub struct SamplerRegistry {
    entries: Vec<(String, SamplerConstructor)>,
}

impl Default for SamplerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in SamplerKind::ALL {
            for id in kind.identifiers() {
                registry.register(*id, kind.constructor());
            }
        }
        registry
    }
}

impl SamplerRegistry {
    /// A registry with no strategies.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add or replace the constructor registered under `id`.
    pub fn register(&mut self, id: impl Into<String>, constructor: SamplerConstructor) {
        let id = id.into();
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some(entry) => entry.1 = constructor,
            None => self.entries.push((id, constructor)),
        }
    }

    /// Remove a strategy. Returns true if it was registered.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(key, _)| key != id);
        self.entries.len() != before
    }

    /// Remove every strategy.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|(key, _)| key == id)
    }

    /// Registered identifiers, in registration order.
    pub fn identifiers(&self) -> Vec<&str> {
        self.entries.iter().map(|(key, _)| key.as_str()).collect()
    }

    /// Build the sampler registered under `id`.
    pub fn create(
        &self,
        id: &str,
        data: &Col<f64>,
        options: &FilterOptions,
    ) -> Result<Box<dyn Sampler>, SamplerError> {
        let (_, constructor) = self
            .entries
            .iter()
            .find(|(key, _)| key == id)
            .ok_or_else(|| SamplerError::UnknownStrategy(id.to_string()))?;
        constructor(data, options)
    }
}
