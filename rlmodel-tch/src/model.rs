//! Model adapter.
use crate::{
    graph::{ExecutionMode, Graph},
    TchVariable,
};
use anyhow::Result;
use log::{info, trace};
use rlmodel_core::{
    check_state_len,
    error::ModelError,
    record::{Record, RecordValue},
    InputDict, ModelConfig, ModelV2, ModelV2Base, NamedVariable, Scope, Space, VarList,
};
use std::{collections::HashMap, convert::TryFrom};
use tch::{nn::VarStore, Kind, Tensor};

/// Computation of a model.
///
/// Every method has a default, so an implementation overrides only what it
/// needs. [`Network::forward`] fails unless overridden.
pub trait Network {
    /// Computes the output and the next state. See [`ModelV2::forward`].
    fn forward(
        &mut self,
        _input_dict: &InputDict<Tensor>,
        _state: Vec<Tensor>,
        _seq_lens: Option<&Tensor>,
    ) -> Result<(Tensor, Vec<Tensor>)> {
        Err(ModelError::NotImplemented("forward").into())
    }

    /// Returns the initial recurrent state.
    fn get_initial_state(&self) -> Vec<Tensor> {
        vec![]
    }

    /// Returns the value estimate of the last forward pass.
    fn value_function(&self) -> Result<Tensor> {
        Err(ModelError::NotImplemented("value_function").into())
    }

    /// Operations to run alongside each forward pass.
    fn update_ops(&self) -> Vec<Tensor> {
        vec![]
    }

    /// Adds terms to the policy loss.
    fn custom_loss(
        &mut self,
        policy_loss: Tensor,
        _loss_inputs: &HashMap<String, Tensor>,
    ) -> Tensor {
        policy_loss
    }

    /// Returns metrics of the network.
    fn metrics(&self) -> Record {
        Record::empty()
    }
}

/// A model without computation. Its `forward()` always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNetwork;

impl Network for NoNetwork {}

/// Adapts a [`Network`] on `tch` tensors to [`ModelV2`].
///
/// The adapter tracks the variables registered by the network and runs
/// forward passes in the execution mode given at construction. In graph
/// mode, [`TchModelV2::context`] makes the model's graph the default graph.
///
/// ```no_run
/// use rlmodel_core::{ModelConfig, Space};
/// use rlmodel_tch::{ExecutionMode, TchModelV2};
/// use tch::{nn, Device};
///
/// let vs = nn::VarStore::new(Device::Cpu);
/// let _ = nn::linear(&vs.root() / "fc", 4, 2, Default::default());
///
/// let mut model = TchModelV2::new(
///     Space::unbounded(&[4]),
///     Space::Discrete(2),
///     2,
///     ModelConfig::default(),
///     "fc",
///     ExecutionMode::Eager,
/// );
/// model.register_var_store(&vs);
/// assert_eq!(model.variables().len(), 2);
/// ```
pub struct TchModelV2<N = NoNetwork> {
    base: ModelV2Base,
    var_list: VarList<TchVariable>,
    mode: ExecutionMode,
    network: N,
    last_output: Option<Tensor>,
}

impl TchModelV2 {
    /// Creates a model without network.
    pub fn new(
        obs_space: Space,
        action_space: Space,
        num_outputs: i64,
        model_config: ModelConfig,
        name: impl Into<String>,
        mode: ExecutionMode,
    ) -> Self {
        let base = ModelV2Base::new(
            obs_space,
            action_space,
            num_outputs,
            model_config,
            name,
            "tch",
        );
        info!("Construct model {} in {} mode", base.name(), mode);

        Self {
            base,
            var_list: VarList::new(),
            mode,
            network: NoNetwork,
            last_output: None,
        }
    }

    /// Creates a model in the execution mode currently in effect.
    ///
    /// The mode is read once; later changes of the global mode do not
    /// affect the model.
    pub fn from_current_mode(
        obs_space: Space,
        action_space: Space,
        num_outputs: i64,
        model_config: ModelConfig,
        name: impl Into<String>,
    ) -> Self {
        Self::new(
            obs_space,
            action_space,
            num_outputs,
            model_config,
            name,
            ExecutionMode::current(),
        )
    }

    /// Sets the network, keeping registered variables.
    pub fn with_network<N: Network>(self, network: N) -> TchModelV2<N> {
        TchModelV2 {
            base: self.base,
            var_list: self.var_list,
            mode: self.mode,
            network,
            last_output: self.last_output,
        }
    }
}

impl<N: Network> TchModelV2<N> {
    /// Attributes given at construction.
    pub fn base(&self) -> &ModelV2Base {
        &self.base
    }

    /// The execution mode resolved at construction.
    pub fn execution_mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// The graph of the model in graph mode.
    pub fn graph(&self) -> Option<&Graph> {
        self.mode.graph()
    }

    /// The network.
    pub fn network(&self) -> &N {
        &self.network
    }

    /// The network as mutable reference.
    pub fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    /// Enters the context of the model.
    ///
    /// In graph mode the model's graph is the default graph while the
    /// returned scope is alive. In eager mode the scope has no effect.
    pub fn context(&self) -> Box<dyn Scope> {
        match &self.mode {
            ExecutionMode::Graph(graph) => Box::new(graph.as_default()),
            ExecutionMode::Eager => Box::new(self.base.context()),
        }
    }

    /// Appends variables to the model's variable list.
    pub fn register_variables(&mut self, variables: impl IntoIterator<Item = TchVariable>) {
        self.var_list.register(variables);
    }

    /// Registers all variables of a [`VarStore`], in order of their names.
    pub fn register_var_store(&mut self, vs: &VarStore) {
        trace!("Register variables of VarStore in {}", self.base.name());
        self.var_list.register(TchVariable::from_var_store(vs));
    }

    /// Registered variables in registration order.
    pub fn variables(&self) -> Vec<&TchVariable> {
        self.var_list.variables()
    }

    /// Registered variables keyed by name.
    pub fn variables_as_dict(&self) -> HashMap<&str, &TchVariable> {
        self.var_list.variables_as_dict()
    }

    /// Trainable variables in registration order.
    pub fn trainable_variables(&self) -> Vec<&TchVariable> {
        self.var_list.trainable_variables()
    }

    /// Trainable variables keyed by name.
    pub fn trainable_variables_as_dict(&self) -> HashMap<&str, &TchVariable> {
        self.var_list.trainable_variables_as_dict()
    }

    /// Total number of elements of registered variables.
    pub fn num_params(&self) -> i64 {
        self.var_list.iter().map(TchVariable::numel).sum()
    }

    /// The output of the last [`ModelV2::call`].
    pub fn last_output(&self) -> Option<&Tensor> {
        self.last_output.as_ref()
    }

    /// Returns the mean and standard deviation of each registered variable.
    pub fn param_stats(&self) -> Result<Record> {
        let mut record = Record::empty();

        for v in self.var_list.iter() {
            let t = v.tensor().detach();
            let m = f32::try_from(t.mean(Kind::Float))?;
            record.insert(format!("{}_mean", v.name()), RecordValue::Scalar(m));
            let s = f32::try_from(t.to_kind(Kind::Float).std(false))?;
            record.insert(format!("{}_std", v.name()), RecordValue::Scalar(s));
        }

        Ok(record)
    }
}

/// Flattens all dimensions but the batch dimension.
///
/// Observations of at most two dimensions are returned as they are.
fn flatten_obs(obs: &Tensor) -> Tensor {
    if obs.dim() > 2 {
        obs.flatten(1, -1)
    } else {
        obs.shallow_clone()
    }
}

impl<N: Network> ModelV2 for TchModelV2<N> {
    type Tensor = Tensor;
    type Variable = TchVariable;

    fn base(&self) -> &ModelV2Base {
        &self.base
    }

    fn context(&self) -> Box<dyn Scope> {
        TchModelV2::context(self)
    }

    fn forward(
        &mut self,
        input_dict: &InputDict<Tensor>,
        state: Vec<Tensor>,
        seq_lens: Option<&Tensor>,
    ) -> Result<(Tensor, Vec<Tensor>)> {
        self.network.forward(input_dict, state, seq_lens)
    }

    /// Calls `forward()` within the context of the model.
    ///
    /// `obs_flat` is always recomputed from `obs`, replacing any value given
    /// by the caller. The output must have shape `[batch, num_outputs]` and
    /// is kept as [`TchModelV2::last_output`].
    fn call(
        &mut self,
        mut input_dict: InputDict<Tensor>,
        state: Vec<Tensor>,
        seq_lens: Option<&Tensor>,
    ) -> Result<(Tensor, Vec<Tensor>)> {
        input_dict.obs_flat = Some(flatten_obs(&input_dict.obs));
        let n_state = self.network.get_initial_state().len();

        let (out, state) = {
            let _scope = TchModelV2::context(self);
            self.network.forward(&input_dict, state, seq_lens)?
        };

        let shape = out.size();
        if shape.len() != 2 || shape[1] != self.base.num_outputs() {
            return Err(ModelError::OutputShape {
                expected: self.base.num_outputs(),
                actual: shape,
            }
            .into());
        }
        check_state_len(n_state, state.len())?;

        self.last_output = Some(out.shallow_clone());
        Ok((out, state))
    }

    fn get_initial_state(&self) -> Vec<Tensor> {
        self.network.get_initial_state()
    }

    fn value_function(&self) -> Result<Tensor> {
        self.network.value_function()
    }

    fn custom_loss(&mut self, policy_loss: Tensor, loss_inputs: &HashMap<String, Tensor>) -> Tensor {
        self.network.custom_loss(policy_loss, loss_inputs)
    }

    fn metrics(&self) -> Record {
        self.network.metrics()
    }

    fn update_ops(&self) -> Vec<Tensor> {
        self.network.update_ops()
    }

    fn variables(&self) -> Vec<&TchVariable> {
        TchModelV2::variables(self)
    }

    fn variables_as_dict(&self) -> HashMap<&str, &TchVariable> {
        TchModelV2::variables_as_dict(self)
    }

    fn trainable_variables(&self) -> Vec<&TchVariable> {
        TchModelV2::trainable_variables(self)
    }

    fn trainable_variables_as_dict(&self) -> HashMap<&str, &TchVariable> {
        TchModelV2::trainable_variables_as_dict(self)
    }
}
