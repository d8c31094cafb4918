use rlmodel_core::NamedVariable;
use tch::{nn::VarStore, Tensor};

/// A named handle to a [`Tensor`] holding model parameters.
///
/// The variable is trainable iff its tensor requires gradients, so
/// variables created with `zeros_no_train` or frozen with
/// [`VarStore::freeze`] are not trainable.
#[derive(Debug)]
pub struct TchVariable {
    name: String,
    tensor: Tensor,
}

impl TchVariable {
    /// Creates a handle. The tensor is shared, not copied.
    pub fn new(name: impl Into<String>, tensor: Tensor) -> Self {
        Self {
            name: name.into(),
            tensor,
        }
    }

    /// The underlying tensor.
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// The number of elements.
    pub fn numel(&self) -> i64 {
        self.tensor.size().iter().product()
    }

    /// Collects the variables of a [`VarStore`], sorted by name.
    pub fn from_var_store(vs: &VarStore) -> Vec<Self> {
        let mut vars = vs
            .variables()
            .into_iter()
            .map(|(name, tensor)| Self::new(name, tensor))
            .collect::<Vec<_>>();
        vars.sort_by(|a, b| a.name.cmp(&b.name));
        vars
    }
}

impl Clone for TchVariable {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tensor: self.tensor.shallow_clone(),
        }
    }
}

impl NamedVariable for TchVariable {
    fn name(&self) -> &str {
        &self.name
    }

    fn trainable(&self) -> bool {
        self.tensor.requires_grad()
    }
}
