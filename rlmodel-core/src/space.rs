//! Observation and action spaces.
use serde::{Deserialize, Serialize};

/// Descriptor of an observation or action space.
///
/// Models receive spaces at construction and keep them for subclasses,
/// which typically use [`Space::flat_dim`] to size their input layer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum Space {
    /// `n` discrete values `0..n`.
    Discrete(usize),

    /// A box in `R^shape`, with elementwise bounds.
    Box {
        /// Shape of a single element.
        shape: Vec<usize>,
        /// Lower bound.
        low: f32,
        /// Upper bound.
        high: f32,
    },

    /// A product of spaces.
    Tuple(Vec<Space>),
}

impl Space {
    /// Creates an unbounded box space.
    pub fn unbounded(shape: &[usize]) -> Self {
        Self::Box {
            shape: shape.to_vec(),
            low: f32::NEG_INFINITY,
            high: f32::INFINITY,
        }
    }

    /// Returns the shape of a single element of the space.
    ///
    /// Discrete spaces are scalar; tuples have no single shape and return
    /// the flattened dimension.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Discrete(_) => vec![],
            Self::Box { shape, .. } => shape.clone(),
            Self::Tuple(_) => vec![self.flat_dim()],
        }
    }

    /// Returns the size of a flattened element.
    ///
    /// Discrete values are one-hot encoded when flattened.
    pub fn flat_dim(&self) -> usize {
        match self {
            Self::Discrete(n) => *n,
            Self::Box { shape, .. } => shape.iter().product(),
            Self::Tuple(spaces) => spaces.iter().map(Space::flat_dim).sum(),
        }
    }
}
