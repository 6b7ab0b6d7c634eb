//! Similarity kernels assembled from filters and weighted components.
//!
//! A kernel decides whether a (reference, system) pair may be aligned and,
//! if so, how similar the two are. Filters veto pairs; components add
//! weighted terms to the score. Both share a per-pair [`ComponentMap`] so a
//! value computed by a filter is not recomputed by the matching component.

use std::collections::BTreeMap;
use std::sync::Arc;

pub use actev_models::ComponentMap;

use crate::error::{AlignError, AlignResult};

/// Outcome of evaluating a pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// At least one filter rejected the pair.
    Disallowed,
    /// The pair is admissible with this similarity.
    Score(f64),
}

impl Decision {
    pub fn score(&self) -> Option<f64> {
        match self {
            Decision::Disallowed => None,
            Decision::Score(s) => Some(*s),
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Score(_))
    }
}

/// Similarity model evaluated for every candidate pair.
pub trait Kernel<T: ?Sized>: Send + Sync {
    fn evaluate(&self, reference: &T, system: &T) -> AlignResult<(Decision, ComponentMap)>;
}

/// Admissibility predicate. May record partial results in `cache`.
pub trait Filter<T: ?Sized>: Send + Sync {
    fn name(&self) -> &str;

    fn admit(&self, reference: &T, system: &T, cache: &mut ComponentMap) -> AlignResult<bool>;
}

/// Named scoring term. May read values cached by filters and publish
/// auxiliary values of its own.
pub trait Component<T: ?Sized>: Send + Sync {
    fn name(&self) -> &str;

    fn compute(&self, reference: &T, system: &T, cache: &mut ComponentMap) -> AlignResult<f64>;
}

impl<T: ?Sized, F: Filter<T> + ?Sized> Filter<T> for Arc<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn admit(&self, reference: &T, system: &T, cache: &mut ComponentMap) -> AlignResult<bool> {
        (**self).admit(reference, system, cache)
    }
}

impl<T: ?Sized, C: Component<T> + ?Sized> Component<T> for Arc<C> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn compute(&self, reference: &T, system: &T, cache: &mut ComponentMap) -> AlignResult<f64> {
        (**self).compute(reference, system, cache)
    }
}

/// Return `cache[name]`, computing and storing it first if missing.
pub fn cached<F>(cache: &mut ComponentMap, name: &str, compute: F) -> AlignResult<f64>
where
    F: FnOnce() -> AlignResult<f64>,
{
    if let Some(value) = cache.get(name) {
        return Ok(*value);
    }
    let value = compute()?;
    cache.insert(name.to_string(), value);
    Ok(value)
}

/// `initial + Σ weight · component`, or [`Decision::Disallowed`] if any
/// filter rejects the pair.
pub struct LinearCombinationKernel<T: ?Sized> {
    filters: Vec<Box<dyn Filter<T>>>,
    components: Vec<(Box<dyn Component<T>>, f64)>,
    initial: f64,
}

impl<T: ?Sized> LinearCombinationKernel<T> {
    pub fn new(initial: f64) -> Self {
        Self {
            filters: Vec::new(),
            components: Vec::new(),
            initial,
        }
    }

    pub fn with_filter(mut self, filter: impl Filter<T> + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn with_component(mut self, component: impl Component<T> + 'static, weight: f64) -> Self {
        self.components.push((Box::new(component), weight));
        self
    }

    pub fn filter_names(&self) -> Vec<&str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn component_names(&self) -> Vec<&str> {
        self.components.iter().map(|(c, _)| c.name()).collect()
    }
}

impl<T: ?Sized> Kernel<T> for LinearCombinationKernel<T> {
    fn evaluate(&self, reference: &T, system: &T) -> AlignResult<(Decision, ComponentMap)> {
        let mut cache = ComponentMap::new();
        for filter in &self.filters {
            if !filter.admit(reference, system, &mut cache)? {
                return Ok((Decision::Disallowed, cache));
            }
        }

        let mut score = self.initial;
        for (component, weight) in &self.components {
            let name = component.name().to_string();
            let value = match cache.get(&name) {
                Some(v) => *v,
                None => component.compute(reference, system, &mut cache)?,
            };
            cache.insert(name, value);
            score += weight * value;
        }

        Ok((Decision::Score(score), cache))
    }
}

/// Build a kernel from filters, components and a weight per component name.
///
/// Every component must have a weight.
pub fn build_linear_combination_kernel<T: ?Sized>(
    filters: Vec<Box<dyn Filter<T>>>,
    components: Vec<Box<dyn Component<T>>>,
    weights: &BTreeMap<String, f64>,
    initial: f64,
) -> AlignResult<LinearCombinationKernel<T>> {
    let components = components
        .into_iter()
        .map(|c| {
            let weight = *weights
                .get(c.name())
                .ok_or_else(|| AlignError::MissingWeight(c.name().to_string()))?;
            Ok((c, weight))
        })
        .collect::<AlignResult<Vec<_>>>()?;

    Ok(LinearCombinationKernel {
        filters,
        components,
        initial,
    })
}

/// Kernel that rejects every pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisallowAll;

impl<T: ?Sized> Kernel<T> for DisallowAll {
    fn evaluate(&self, _reference: &T, _system: &T) -> AlignResult<(Decision, ComponentMap)> {
        Ok((Decision::Disallowed, ComponentMap::new()))
    }
}
