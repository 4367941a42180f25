//! Construction-time configuration of a GRU cell.

use crate::{
    error::{GruError, Result},
    nn::{activations::ActivationKind, init::Initializer, layers::dropout::DROPOUT_EPSILON},
};
use std::str::FromStr;
use tracing::debug;

/// How biases are attached to the gate pre-activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BiasMode {
    /// No bias at all.
    Disabled,
    /// One `bias_h[3U]` vector combining the input and hidden contributions.
    Integrated,
    /// Separate `bias_ih[3U]` and `bias_hh[3U]` vectors.
    #[default]
    Separate,
}

/// Where the reset gate meets the hidden-to-hidden candidate projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetMode {
    /// `G = act(x·W_ih_g + (R ⊙ h_prev)·W_hh_g + b)`
    BeforeCandidate,
    /// `G = act(x·W_ih_g + R ⊙ (h_prev·W_hh_g + b_hh_g) + b)`
    #[default]
    AfterCandidate,
}

/// Dimensions resolved from the input once the configuration is finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDims {
    pub batch: usize,
    pub feature: usize,
    pub unit: usize,
}

impl CellDims {
    /// Output dims `[batch, unit]`.
    pub fn output_dims(&self) -> [usize; 2] {
        [self.batch, self.unit]
    }
}

/// GRU cell configuration.
///
/// All fields are fixed at cell construction and stay immutable for the
/// cell's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GruCellConfig {
    /// Output width `U`
    pub unit: usize,
    /// Activation for the candidate gate (default `tanh`)
    pub hidden_state_activation: ActivationKind,
    /// Activation for the update and reset gates (default `sigmoid`)
    pub recurrent_activation: ActivationKind,
    /// Probability of dropping an element of the produced hidden state
    pub dropout_rate: f32,
    /// Drop every bias vector; takes precedence over `integrate_bias`
    pub disable_bias: bool,
    /// Use one `bias_h` vector instead of `bias_ih` and `bias_hh`
    pub integrate_bias: bool,
    pub reset: ResetMode,
    /// Number of timesteps the hidden-state ring can hold
    pub max_timestep: usize,
    pub weight_initializer: Initializer,
    pub bias_initializer: Initializer,
    /// Seed for parameter initialization and dropout masks
    pub seed: Option<u64>,
}

impl Default for GruCellConfig {
    fn default() -> Self {
        Self {
            unit: 0,
            hidden_state_activation: ActivationKind::Tanh,
            recurrent_activation: ActivationKind::Sigmoid,
            dropout_rate: 0.0,
            disable_bias: false,
            integrate_bias: false,
            reset: ResetMode::default(),
            max_timestep: 1,
            weight_initializer: Initializer::XavierUniform,
            bias_initializer: Initializer::Zeros,
            seed: None,
        }
    }
}

impl GruCellConfig {
    /// Creates a configuration with the given unit size and defaults elsewhere.
    pub fn new(unit: usize) -> Self {
        Self {
            unit,
            ..Self::default()
        }
    }

    pub fn with_hidden_state_activation(mut self, kind: ActivationKind) -> Self {
        self.hidden_state_activation = kind;
        self
    }

    pub fn with_recurrent_activation(mut self, kind: ActivationKind) -> Self {
        self.recurrent_activation = kind;
        self
    }

    pub fn with_dropout(mut self, rate: f32) -> Self {
        self.dropout_rate = rate;
        self
    }

    pub fn with_bias(mut self, bias: BiasMode) -> Self {
        self.disable_bias = bias == BiasMode::Disabled;
        self.integrate_bias = bias == BiasMode::Integrated;
        self
    }

    pub fn with_reset(mut self, reset: ResetMode) -> Self {
        self.reset = reset;
        self
    }

    pub fn with_max_timestep(mut self, max_timestep: usize) -> Self {
        self.max_timestep = max_timestep;
        self
    }

    pub fn with_weight_initializer(mut self, init: Initializer) -> Self {
        self.weight_initializer = init;
        self
    }

    pub fn with_bias_initializer(mut self, init: Initializer) -> Self {
        self.bias_initializer = init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Bias layout resolved from the two bias flags.
    pub fn bias(&self) -> BiasMode {
        if self.disable_bias {
            BiasMode::Disabled
        } else if self.integrate_bias {
            BiasMode::Integrated
        } else {
            BiasMode::Separate
        }
    }

    /// Whether the forward pass samples a dropout mask in training mode.
    pub fn dropout_active(&self) -> bool {
        self.dropout_rate > DROPOUT_EPSILON
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.unit == 0 {
            return Err(GruError::InvalidConfig("unit must be greater than 0".into()));
        }
        if self.max_timestep == 0 {
            return Err(GruError::InvalidConfig("max_timestep must be greater than 0".into()));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(GruError::InvalidConfig(format!(
                "dropout must be in range [0, 1), got {}",
                self.dropout_rate
            )));
        }
        Ok(())
    }

    /// Validates the configuration against the cell inputs.
    ///
    /// The cell takes exactly one input of shape `[batch, feature]` or
    /// `[batch, 1, 1, feature]` (a single timestep of a single channel).
    ///
    /// # Errors
    ///
    /// Returns a configuration error for any other input count or shape.
    pub fn finalize(&self, input_dims: &[Vec<usize>]) -> Result<CellDims> {
        self.validate()?;
        if input_dims.len() != 1 {
            return Err(GruError::InvalidConfig(format!(
                "GRU cell takes only one input, got {}",
                input_dims.len()
            )));
        }
        let (batch, feature) = match input_dims[0].as_slice() {
            &[batch, feature] => (batch, feature),
            &[batch, 1, 1, feature] => (batch, feature),
            other => {
                return Err(GruError::InvalidShape(format!(
                    "input must be a single time dimension, got {other:?}"
                )))
            }
        };
        if batch == 0 || feature == 0 {
            return Err(GruError::InvalidShape(format!(
                "input dimensions must be non-zero, got {:?}",
                input_dims[0]
            )));
        }
        debug!(batch, feature, unit = self.unit, max_timestep = self.max_timestep, "finalized GRU cell");
        Ok(CellDims {
            batch,
            feature,
            unit: self.unit,
        })
    }

    /// Applies a single `key=value` property.
    pub fn set_property(&mut self, property: &str) -> Result<()> {
        let (key, value) = property
            .split_once('=')
            .ok_or_else(|| GruError::invalid_property(property, ""))?;
        let (key, value) = (key.trim(), value.trim());
        if value.is_empty() {
            return Err(GruError::invalid_property(key, value));
        }
        match key.to_ascii_lowercase().as_str() {
            "unit" => self.unit = parse(key, value)?,
            "hidden_state_activation" => self.hidden_state_activation = parse(key, value)?,
            "recurrent_activation" => self.recurrent_activation = parse(key, value)?,
            "dropout" => self.dropout_rate = parse(key, value)?,
            "max_timestep" => self.max_timestep = parse(key, value)?,
            "weight_initializer" => self.weight_initializer = parse(key, value)?,
            "bias_initializer" => self.bias_initializer = parse(key, value)?,
            "disable_bias" => self.disable_bias = parse_bool(key, value)?,
            "integrate_bias" => self.integrate_bias = parse_bool(key, value)?,
            "reset_after" => {
                self.reset = if parse_bool(key, value)? {
                    ResetMode::AfterCandidate
                } else {
                    ResetMode::BeforeCandidate
                };
            }
            _ => return Err(GruError::UnknownProperty(key.to_string())),
        }
        Ok(())
    }

    /// Builds a configuration from `key=value` properties applied over the defaults.
    pub fn from_properties<S: AsRef<str>>(properties: &[S]) -> Result<Self> {
        let mut config = Self::default();
        for property in properties {
            config.set_property(property.as_ref())?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Exports the configuration as `key=value` properties.
    ///
    /// The seed is not a property and is not exported.
    pub fn to_properties(&self) -> Vec<String> {
        vec![
            format!("unit={}", self.unit),
            format!("hidden_state_activation={}", self.hidden_state_activation),
            format!("recurrent_activation={}", self.recurrent_activation),
            format!("dropout={}", self.dropout_rate),
            format!("disable_bias={}", self.disable_bias),
            format!("integrate_bias={}", self.integrate_bias),
            format!("reset_after={}", self.reset == ResetMode::AfterCandidate),
            format!("max_timestep={}", self.max_timestep),
            format!("weight_initializer={}", self.weight_initializer),
            format!("bias_initializer={}", self.bias_initializer),
        ]
    }
}

fn parse<V: FromStr>(key: &str, value: &str) -> Result<V> {
    value.parse().map_err(|_| GruError::invalid_property(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(GruError::invalid_property(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GruCellConfig::new(4);
        assert_eq!(config.hidden_state_activation, ActivationKind::Tanh);
        assert_eq!(config.recurrent_activation, ActivationKind::Sigmoid);
        assert_eq!(config.bias(), BiasMode::Separate);
        assert_eq!(config.reset, ResetMode::AfterCandidate);
        assert!(!config.dropout_active());
        assert!(config.validate().is_ok());
        assert!(GruCellConfig::default().validate().is_err());
    }

    #[test]
    fn test_dropout_epsilon() {
        assert!(!GruCellConfig::new(2).with_dropout(0.001).dropout_active());
        assert!(GruCellConfig::new(2).with_dropout(0.0011).dropout_active());
    }

    #[test]
    fn test_finalize_accepts_single_timestep_input() -> Result<()> {
        let config = GruCellConfig::new(3).with_max_timestep(5);
        let dims = config.finalize(&[vec![2, 7]])?;
        assert_eq!(dims, CellDims { batch: 2, feature: 7, unit: 3 });
        assert_eq!(dims.output_dims(), [2, 3]);

        let dims = config.finalize(&[vec![4, 1, 1, 6]])?;
        assert_eq!((dims.batch, dims.feature), (4, 6));
        Ok(())
    }

    #[test]
    fn test_finalize_rejects_bad_inputs() {
        let config = GruCellConfig::new(3);
        assert!(matches!(
            config.finalize(&[vec![2, 7], vec![2, 7]]),
            Err(GruError::InvalidConfig(_))
        ));
        assert!(matches!(config.finalize(&[]), Err(GruError::InvalidConfig(_))));
        assert!(matches!(config.finalize(&[vec![2, 3, 1, 7]]), Err(GruError::InvalidShape(_))));
        assert!(matches!(config.finalize(&[vec![2, 1, 2, 7]]), Err(GruError::InvalidShape(_))));
        assert!(matches!(config.finalize(&[vec![7]]), Err(GruError::InvalidShape(_))));
    }

    #[test]
    fn test_properties() -> Result<()> {
        let config = GruCellConfig::from_properties(&[
            "unit=8",
            "reset_after=false",
            "integrate_bias=true",
            "dropout=0.25",
            "max_timestep=10",
            "hidden_state_activation=relu",
        ])?;
        assert_eq!(config.unit, 8);
        assert_eq!(config.reset, ResetMode::BeforeCandidate);
        assert_eq!(config.bias(), BiasMode::Integrated);
        assert_eq!(config.dropout_rate, 0.25);
        assert_eq!(config.max_timestep, 10);
        assert_eq!(config.hidden_state_activation, ActivationKind::Relu);
        Ok(())
    }

    #[test]
    fn test_disable_bias_wins() -> Result<()> {
        let a = GruCellConfig::from_properties(&["unit=2", "disable_bias=true", "integrate_bias=true"])?;
        let b = GruCellConfig::from_properties(&["unit=2", "integrate_bias=true", "disable_bias=true"])?;
        assert_eq!(a.bias(), BiasMode::Disabled);
        assert_eq!(b.bias(), BiasMode::Disabled);
        Ok(())
    }

    #[test]
    fn test_bias_flags_are_independent() -> Result<()> {
        let config = GruCellConfig::from_properties(&[
            "unit=2",
            "integrate_bias=true",
            "disable_bias=true",
            "disable_bias=false",
        ])?;
        assert_eq!(config.bias(), BiasMode::Integrated);

        let mut config = GruCellConfig::new(2);
        config.set_property("disable_bias=true")?;
        config.set_property("integrate_bias=true")?;
        assert_eq!(config.bias(), BiasMode::Disabled);
        config.set_property("disable_bias=false")?;
        assert_eq!(config.bias(), BiasMode::Integrated);
        config.set_property("integrate_bias=false")?;
        assert_eq!(config.bias(), BiasMode::Separate);
        Ok(())
    }

    #[test]
    fn test_with_bias_sets_both_flags() {
        for mode in [BiasMode::Disabled, BiasMode::Integrated, BiasMode::Separate] {
            assert_eq!(GruCellConfig::new(1).with_bias(mode).bias(), mode);
        }
    }

    #[test]
    fn test_property_errors() {
        let mut config = GruCellConfig::new(2);
        assert!(matches!(config.set_property("unit"), Err(GruError::InvalidProperty { .. })));
        assert!(matches!(config.set_property("unit="), Err(GruError::InvalidProperty { .. })));
        assert!(matches!(config.set_property("unit=abc"), Err(GruError::InvalidProperty { .. })));
        assert!(matches!(config.set_property("reset_after=maybe"), Err(GruError::InvalidProperty { .. })));
        assert!(matches!(config.set_property("flatten=true"), Err(GruError::UnknownProperty(_))));
        assert!(GruCellConfig::from_properties(&["unit=2", "dropout=1.5"]).is_err());
    }

    #[test]
    fn test_export_round_trip() -> Result<()> {
        let config = GruCellConfig::new(5)
            .with_bias(BiasMode::Integrated)
            .with_reset(ResetMode::BeforeCandidate)
            .with_dropout(0.2)
            .with_max_timestep(3)
            .with_recurrent_activation(ActivationKind::Identity)
            .with_weight_initializer(Initializer::HeNormal);
        let restored = GruCellConfig::from_properties(&config.to_properties())?;
        assert_eq!(restored, config);
        Ok(())
    }
}
