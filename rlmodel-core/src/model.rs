//! Interface of models.
use crate::{error::ModelError, record::Record, space::Space, variable::NamedVariable, ModelConfig};
use anyhow::Result;
use std::collections::HashMap;

/// A scoped acquisition.
///
/// The scope is entered when the value is created and exited when it is
/// dropped, including during unwinding.
pub trait Scope {}

/// A scope with no effect.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScope;

impl Scope for NullScope {}

/// Inputs of [`ModelV2::forward`].
#[derive(Debug)]
pub struct InputDict<T> {
    /// Observations as given by the environment.
    pub obs: T,

    /// Observations flattened to `[batch, dim]`.
    ///
    /// Backends set this from `obs` in [`ModelV2::call`]; the default
    /// `call()` passes it through unchanged.
    pub obs_flat: Option<T>,

    /// Actions of the previous step.
    pub prev_actions: Option<T>,

    /// Rewards of the previous step.
    pub prev_rewards: Option<T>,

    /// `true` when the model is called for a training pass.
    pub is_training: bool,
}

impl<T> InputDict<T> {
    /// Creates inputs with observations only.
    pub fn new(obs: T) -> Self {
        Self {
            obs,
            obs_flat: None,
            prev_actions: None,
            prev_rewards: None,
            is_training: false,
        }
    }

    /// Sets flattened observations.
    pub fn obs_flat(mut self, v: T) -> Self {
        self.obs_flat = Some(v);
        self
    }

    /// Sets previous actions.
    pub fn prev_actions(mut self, v: T) -> Self {
        self.prev_actions = Some(v);
        self
    }

    /// Sets previous rewards.
    pub fn prev_rewards(mut self, v: T) -> Self {
        self.prev_rewards = Some(v);
        self
    }

    /// Sets the training flag.
    pub fn is_training(mut self, v: bool) -> Self {
        self.is_training = v;
        self
    }
}

/// Attributes common to all models.
///
/// Framework adapters own one of these and hand it out through
/// [`ModelV2::base`].
#[derive(Debug, Clone)]
pub struct ModelV2Base {
    obs_space: Space,
    action_space: Space,
    num_outputs: i64,
    model_config: ModelConfig,
    name: String,
    framework: &'static str,
}

impl ModelV2Base {
    /// Creates the base of a model.
    pub fn new(
        obs_space: Space,
        action_space: Space,
        num_outputs: i64,
        model_config: ModelConfig,
        name: impl Into<String>,
        framework: &'static str,
    ) -> Self {
        Self {
            obs_space,
            action_space,
            num_outputs,
            model_config,
            name: name.into(),
            framework,
        }
    }

    /// Observation space.
    pub fn obs_space(&self) -> &Space {
        &self.obs_space
    }

    /// Action space.
    pub fn action_space(&self) -> &Space {
        &self.action_space
    }

    /// Size of the output of `forward()` along the last dimension.
    pub fn num_outputs(&self) -> i64 {
        self.num_outputs
    }

    /// Model configuration.
    pub fn model_config(&self) -> &ModelConfig {
        &self.model_config
    }

    /// Name of the model.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the framework the model is built on.
    pub fn framework(&self) -> &'static str {
        self.framework
    }

    /// The default context of models: no effect.
    pub fn context(&self) -> NullScope {
        NullScope
    }

    /// Whether sequence inputs are `[time, batch, ...]`.
    pub fn is_time_major(&self) -> bool {
        self.model_config.time_major
    }
}

/// A model used by a policy.
///
/// A model maps observations and recurrent state to an output of size
/// `num_outputs`, typically the parameters of an action distribution.
/// The orchestration layer calls [`ModelV2::call`], which runs
/// [`ModelV2::forward`] within [`ModelV2::context`].
pub trait ModelV2 {
    /// Tensor type of the underlying framework.
    type Tensor;

    /// Variable handle type of the underlying framework.
    type Variable: NamedVariable;

    /// Returns the attributes given at construction.
    fn base(&self) -> &ModelV2Base;

    /// Enters the context in which the model runs.
    fn context(&self) -> Box<dyn Scope> {
        Box::new(self.base().context())
    }

    /// Computes the output and the next state of the model.
    ///
    /// `state` holds one tensor per entry of [`ModelV2::get_initial_state`],
    /// with a batch dimension added. `seq_lens` holds the length of each
    /// sequence in the batch for recurrent models.
    fn forward(
        &mut self,
        input_dict: &InputDict<Self::Tensor>,
        state: Vec<Self::Tensor>,
        seq_lens: Option<&Self::Tensor>,
    ) -> Result<(Self::Tensor, Vec<Self::Tensor>)>;

    /// Calls [`ModelV2::forward`] within [`ModelV2::context`].
    ///
    /// Fails if the returned state does not have as many tensors as the
    /// initial state.
    fn call(
        &mut self,
        input_dict: InputDict<Self::Tensor>,
        state: Vec<Self::Tensor>,
        seq_lens: Option<&Self::Tensor>,
    ) -> Result<(Self::Tensor, Vec<Self::Tensor>)> {
        let _scope = self.context();
        let expected = self.get_initial_state().len();
        let (out, state) = self.forward(&input_dict, state, seq_lens)?;
        check_state_len(expected, state.len())?;
        Ok((out, state))
    }

    /// Returns the initial recurrent state, without batch dimension.
    fn get_initial_state(&self) -> Vec<Self::Tensor> {
        vec![]
    }

    /// Returns the value estimate of the last `forward()` call.
    fn value_function(&self) -> Result<Self::Tensor> {
        Err(ModelError::NotImplemented("value_function").into())
    }

    /// Adds model-specific terms to the policy loss.
    fn custom_loss(
        &mut self,
        policy_loss: Self::Tensor,
        _loss_inputs: &HashMap<String, Self::Tensor>,
    ) -> Self::Tensor {
        policy_loss
    }

    /// Returns model-specific metrics.
    fn metrics(&self) -> Record {
        Record::empty()
    }

    /// Operations to run alongside each forward pass, e.g. updates of
    /// normalization statistics.
    fn update_ops(&self) -> Vec<Self::Tensor> {
        vec![]
    }

    /// Returns registered variables in registration order.
    fn variables(&self) -> Vec<&Self::Variable>;

    /// Returns registered variables keyed by name. Later registrations win.
    fn variables_as_dict(&self) -> HashMap<&str, &Self::Variable>;

    /// Returns trainable variables in registration order.
    fn trainable_variables(&self) -> Vec<&Self::Variable>;

    /// Returns trainable variables keyed by name.
    fn trainable_variables_as_dict(&self) -> HashMap<&str, &Self::Variable>;

    /// Whether sequence inputs are `[time, batch, ...]`.
    fn is_time_major(&self) -> bool {
        self.base().is_time_major()
    }
}

/// Fails with [`ModelError::StateLength`] unless the lengths match.
///
/// Models without recurrent state (`expected == 0`) may return any state.
pub fn check_state_len(expected: usize, actual: usize) -> Result<()> {
    if expected > 0 && expected != actual {
        return Err(ModelError::StateLength { expected, actual }.into());
    }
    Ok(())
}
