//! Configuration of models.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration passed to a model at construction.
///
/// The built-in fields are the options commonly shared by fully connected,
/// convolutional and recurrent models. Anything model-specific goes to
/// `custom_model_config`.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// Hidden layer sizes of the fully connected network.
    pub fcnet_hiddens: Vec<i64>,

    /// Activation of the fully connected network, e.g. `tanh` or `relu`.
    pub fcnet_activation: String,

    /// Convolution filters as `[out_channels, kernel, stride]`.
    pub conv_filters: Vec<[i64; 3]>,

    /// Wraps the model with an LSTM cell.
    pub use_lstm: bool,

    /// Size of the LSTM cell.
    pub lstm_cell_size: i64,

    /// Maximum length of sequences fed to recurrent models.
    pub max_seq_len: usize,

    /// Shares layers between the policy and the value function.
    pub vf_share_layers: bool,

    /// Makes the standard deviation of a Gaussian policy state independent.
    pub free_log_std: bool,

    /// Inputs of recurrent models are `[time, batch, ...]` instead of `[batch, time, ...]`.
    pub time_major: bool,

    /// Name of a custom model.
    pub custom_model: Option<String>,

    /// Options passed to a custom model.
    pub custom_model_config: BTreeMap<String, serde_yaml::Value>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            fcnet_hiddens: vec![256, 256],
            fcnet_activation: "tanh".to_string(),
            conv_filters: vec![],
            use_lstm: false,
            lstm_cell_size: 256,
            max_seq_len: 20,
            vf_share_layers: true,
            free_log_std: false,
            time_major: false,
            custom_model: None,
            custom_model_config: BTreeMap::new(),
        }
    }
}

impl ModelConfig {
    /// Sets hidden layer sizes.
    pub fn fcnet_hiddens(mut self, v: Vec<i64>) -> Self {
        self.fcnet_hiddens = v;
        self
    }

    /// Sets the activation function of hidden layers.
    pub fn fcnet_activation(mut self, v: impl Into<String>) -> Self {
        self.fcnet_activation = v.into();
        self
    }

    /// Sets convolution filters.
    pub fn conv_filters(mut self, v: Vec<[i64; 3]>) -> Self {
        self.conv_filters = v;
        self
    }

    /// Enables or disables the LSTM wrapper.
    pub fn use_lstm(mut self, v: bool) -> Self {
        self.use_lstm = v;
        self
    }

    /// Sets the size of the LSTM cell.
    pub fn lstm_cell_size(mut self, v: i64) -> Self {
        self.lstm_cell_size = v;
        self
    }

    /// Sets the maximum sequence length.
    pub fn max_seq_len(mut self, v: usize) -> Self {
        self.max_seq_len = v;
        self
    }

    /// Sets whether the value function shares layers with the policy.
    pub fn vf_share_layers(mut self, v: bool) -> Self {
        self.vf_share_layers = v;
        self
    }

    /// Sets whether the log standard deviation is a free parameter.
    pub fn free_log_std(mut self, v: bool) -> Self {
        self.free_log_std = v;
        self
    }

    /// Sets the time-major flag.
    pub fn time_major(mut self, v: bool) -> Self {
        self.time_major = v;
        self
    }

    /// Sets the name of a custom model.
    pub fn custom_model(mut self, v: impl Into<String>) -> Self {
        self.custom_model = Some(v.into());
        self
    }

    /// Adds an option for a custom model.
    pub fn custom_option(mut self, k: impl Into<String>, v: serde_yaml::Value) -> Self {
        self.custom_model_config.insert(k.into(), v);
        self
    }

    /// Constructs [`ModelConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`ModelConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_model_config() -> Result<()> {
        let config = ModelConfig::default()
            .fcnet_hiddens(vec![64, 64])
            .fcnet_activation("relu")
            .use_lstm(true)
            .max_seq_len(8)
            .custom_model("my_model")
            .custom_option("scale", serde_yaml::Value::from(0.5));

        let dir = TempDir::new("model_config")?;
        let path = dir.path().join("model_config.yaml");

        config.save(&path)?;
        let config_ = ModelConfig::load(&path)?;
        assert_eq!(config, config_);

        Ok(())
    }

    #[test]
    fn test_missing_fields_use_defaults() -> Result<()> {
        let config: ModelConfig = serde_yaml::from_str("use_lstm: true\n")?;
        assert!(config.use_lstm);
        assert_eq!(config.fcnet_hiddens, vec![256, 256]);
        assert_eq!(config.max_seq_len, 20);
        assert!(config.custom_model.is_none());
        Ok(())
    }
}
