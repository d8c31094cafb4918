//! Registry of model variables.
use log::trace;
use std::collections::HashMap;

/// A handle to a learnable parameter owned by a training framework.
pub trait NamedVariable {
    /// Name of the variable. Names are not required to be unique.
    fn name(&self) -> &str;

    /// Whether an optimizer should update the variable.
    fn trainable(&self) -> bool;
}

/// An append-only, ordered list of variable handles.
///
/// Insertion order is the order of enumeration. No deduplication is done:
/// registering the same handle twice lists it twice, and in the by-name maps
/// a later handle shadows an earlier one with the same name.
#[derive(Debug, Clone)]
pub struct VarList<V> {
    vars: Vec<V>,
}

impl<V> Default for VarList<V> {
    fn default() -> Self {
        Self { vars: Vec::new() }
    }
}

impl<V: NamedVariable> VarList<V> {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the given variables to the end of the list.
    pub fn register(&mut self, variables: impl IntoIterator<Item = V>) {
        let n = self.vars.len();
        self.vars.extend(variables);
        trace!("Registered {} variables ({} total)", self.vars.len() - n, self.vars.len());
    }

    /// Returns all registered variables in insertion order.
    pub fn variables(&self) -> Vec<&V> {
        self.vars.iter().collect()
    }

    /// Returns all registered variables keyed by name.
    pub fn variables_as_dict(&self) -> HashMap<&str, &V> {
        // Later insertions overwrite earlier ones with the same name.
        self.vars.iter().map(|v| (v.name(), v)).collect()
    }

    /// Returns trainable variables in insertion order.
    pub fn trainable_variables(&self) -> Vec<&V> {
        self.variables()
            .into_iter()
            .filter(|v| v.trainable())
            .collect()
    }

    /// Returns trainable variables keyed by name.
    ///
    /// Filtering is applied after name collisions are resolved, so a name
    /// whose last registered handle is not trainable is absent.
    pub fn trainable_variables_as_dict(&self) -> HashMap<&str, &V> {
        self.variables_as_dict()
            .into_iter()
            .filter(|(_, v)| v.trainable())
            .collect()
    }

    /// Iterates over variables in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.vars.iter()
    }

    /// The number of registered variables, duplicates included.
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Returns `true` if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}
