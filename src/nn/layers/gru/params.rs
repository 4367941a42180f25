//! Tied GRU parameters and their gradient mirrors.
//!
//! One `GruParameters` value is shared by every timestep of a sequence. The
//! gradient mirror has exactly the same layout, so the same type serves both.

use super::{
    config::{BiasMode, CellDims, GruCellConfig},
    layout::GateLayout,
};
use crate::{
    error::{GruError, Result},
    tensor::Tensor,
};
use num_traits::Float;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Bias vectors, each `[1, 3U]` in `[Z | R | G]` order.
#[derive(Debug, Clone, PartialEq)]
pub enum GruBias<T> {
    Disabled,
    Integrated { bias_h: Tensor<T> },
    Separate { bias_ih: Tensor<T>, bias_hh: Tensor<T> },
}

impl<T: Float> GruBias<T> {
    fn zeros(mode: BiasMode, layout: &GateLayout) -> Self {
        let width = layout.packed_width();
        match mode {
            BiasMode::Disabled => Self::Disabled,
            BiasMode::Integrated => Self::Integrated {
                bias_h: Tensor::zeros(1, width),
            },
            BiasMode::Separate => Self::Separate {
                bias_ih: Tensor::zeros(1, width),
                bias_hh: Tensor::zeros(1, width),
            },
        }
    }

    pub fn mode(&self) -> BiasMode {
        match self {
            Self::Disabled => BiasMode::Disabled,
            Self::Integrated { .. } => BiasMode::Integrated,
            Self::Separate { .. } => BiasMode::Separate,
        }
    }
}

/// Input-to-hidden weight, hidden-to-hidden weight, and bias.
#[derive(Debug, Clone, PartialEq)]
pub struct GruParameters<T> {
    /// `[feature, 3U]`
    pub weight_ih: Tensor<T>,
    /// `[U, 3U]`
    pub weight_hh: Tensor<T>,
    pub bias: GruBias<T>,
}

impl<T: Float> GruParameters<T> {
    /// All-zero parameters for the given layout.
    pub fn zeros(feature: usize, unit: usize, bias: BiasMode) -> Self {
        let layout = GateLayout::new(unit);
        Self {
            weight_ih: Tensor::zeros(feature, layout.packed_width()),
            weight_hh: Tensor::zeros(unit, layout.packed_width()),
            bias: GruBias::zeros(bias, &layout),
        }
    }

    /// Allocates and initializes parameters using the configured initializers.
    ///
    /// The generator is seeded from `config.seed` when present.
    pub fn new(config: &GruCellConfig, dims: &CellDims) -> Result<Self> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::with_rng(config, dims, &mut rng)
    }

    pub fn with_rng<R: Rng + ?Sized>(config: &GruCellConfig, dims: &CellDims, rng: &mut R) -> Result<Self> {
        let mut params = Self::zeros(dims.feature, dims.unit, config.bias());
        config.weight_initializer.initialize(&mut params.weight_ih, rng)?;
        config.weight_initializer.initialize(&mut params.weight_hh, rng)?;
        match &mut params.bias {
            GruBias::Disabled => {}
            GruBias::Integrated { bias_h } => config.bias_initializer.initialize(bias_h, rng)?,
            GruBias::Separate { bias_ih, bias_hh } => {
                config.bias_initializer.initialize(bias_ih, rng)?;
                config.bias_initializer.initialize(bias_hh, rng)?;
            }
        }
        Ok(params)
    }

    /// Builds parameters from existing tensors, checking their shapes.
    pub fn from_tensors(weight_ih: Tensor<T>, weight_hh: Tensor<T>, bias: GruBias<T>) -> Result<Self> {
        let params = Self {
            weight_ih,
            weight_hh,
            bias,
        };
        params.check(params.weight_hh.rows(), params.weight_ih.rows())?;
        Ok(params)
    }

    /// A zeroed mirror with the same layout, used for gradients.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.feature(), self.unit(), self.bias.mode())
    }

    pub fn unit(&self) -> usize {
        self.weight_hh.rows()
    }

    pub fn feature(&self) -> usize {
        self.weight_ih.rows()
    }

    pub fn layout(&self) -> GateLayout {
        GateLayout::new(self.unit())
    }

    /// Checks every tensor against the expected `unit` and `feature`.
    pub fn check(&self, unit: usize, feature: usize) -> Result<()> {
        let width = GateLayout::new(unit).packed_width();
        let expect = |t: &Tensor<T>, rows: usize| {
            if t.shape() != [rows, width] {
                Err(GruError::shape_mismatch(vec![rows, width], t.shape()))
            } else {
                Ok(())
            }
        };
        expect(&self.weight_ih, feature)?;
        expect(&self.weight_hh, unit)?;
        match &self.bias {
            GruBias::Disabled => {}
            GruBias::Integrated { bias_h } => expect(bias_h, 1)?,
            GruBias::Separate { bias_ih, bias_hh } => {
                expect(bias_ih, 1)?;
                expect(bias_hh, 1)?;
            }
        }
        Ok(())
    }

    pub fn set_zero(&mut self) {
        for (_, tensor) in self.named_mut() {
            tensor.set_zero();
        }
    }

    /// Every tensor with its conventional name.
    pub fn named(&self) -> Vec<(&'static str, &Tensor<T>)> {
        let mut out = vec![("weight_ih", &self.weight_ih), ("weight_hh", &self.weight_hh)];
        match &self.bias {
            GruBias::Disabled => {}
            GruBias::Integrated { bias_h } => out.push(("bias_h", bias_h)),
            GruBias::Separate { bias_ih, bias_hh } => {
                out.push(("bias_ih", bias_ih));
                out.push(("bias_hh", bias_hh));
            }
        }
        out
    }

    pub fn named_mut(&mut self) -> Vec<(&'static str, &mut Tensor<T>)> {
        let mut out = vec![("weight_ih", &mut self.weight_ih), ("weight_hh", &mut self.weight_hh)];
        match &mut self.bias {
            GruBias::Disabled => {}
            GruBias::Integrated { bias_h } => out.push(("bias_h", bias_h)),
            GruBias::Separate { bias_ih, bias_hh } => {
                out.push(("bias_ih", bias_ih));
                out.push(("bias_hh", bias_hh));
            }
        }
        out
    }

    /// Looks up a tensor by name.
    pub fn get(&self, name: &str) -> Option<&Tensor<T>> {
        self.named().into_iter().find(|(n, _)| *n == name).map(|(_, t)| t)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Tensor<T>> {
        self.named_mut().into_iter().find(|(n, _)| *n == name).map(|(_, t)| t)
    }
}

/// Parameter values and their accumulated gradients for one sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct TiedParameters<T> {
    pub value: GruParameters<T>,
    pub grad: GruParameters<T>,
}

impl<T: Float> TiedParameters<T> {
    pub fn new(value: GruParameters<T>) -> Self {
        let grad = value.zeros_like();
        Self { value, grad }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_per_bias_mode() -> Result<()> {
        let config = GruCellConfig::new(3).with_bias(BiasMode::Integrated).with_seed(1);
        let dims = config.finalize(&[vec![2, 5]])?;
        let params = GruParameters::<f32>::new(&config, &dims)?;
        assert_eq!(params.weight_ih.shape(), [5, 9]);
        assert_eq!(params.weight_hh.shape(), [3, 9]);
        let names: Vec<_> = params.named().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["weight_ih", "weight_hh", "bias_h"]);

        let separate = GruParameters::<f32>::zeros(5, 3, BiasMode::Separate);
        let names: Vec<_> = separate.named().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["weight_ih", "weight_hh", "bias_ih", "bias_hh"]);

        let disabled = GruParameters::<f32>::zeros(5, 3, BiasMode::Disabled);
        assert_eq!(disabled.named().len(), 2);
        Ok(())
    }

    #[test]
    fn test_seeded_parameters_are_reproducible() -> Result<()> {
        let config = GruCellConfig::new(2).with_seed(11);
        let dims = config.finalize(&[vec![1, 3]])?;
        let a = GruParameters::<f64>::new(&config, &dims)?;
        let b = GruParameters::<f64>::new(&config, &dims)?;
        assert_eq!(a, b);
        assert!(a.weight_ih.as_slice().iter().any(|&x| x != 0.0));
        Ok(())
    }

    #[test]
    fn test_from_tensors_checks_shapes() {
        let ok = GruParameters::from_tensors(
            Tensor::<f32>::zeros(4, 6),
            Tensor::zeros(2, 6),
            GruBias::Integrated { bias_h: Tensor::zeros(1, 6) },
        );
        assert!(ok.is_ok());

        let bad = GruParameters::from_tensors(
            Tensor::<f32>::zeros(4, 6),
            Tensor::zeros(2, 6),
            GruBias::Integrated { bias_h: Tensor::zeros(1, 5) },
        );
        assert!(bad.is_err());

        let bad = GruParameters::<f32>::from_tensors(Tensor::zeros(4, 9), Tensor::zeros(2, 6), GruBias::Disabled);
        assert!(bad.is_err());
    }

    #[test]
    fn test_zeros_like_and_lookup() {
        let mut params = GruParameters::<f32>::zeros(2, 2, BiasMode::Separate);
        params.get_mut("bias_hh").unwrap().fill(1.0);
        let grads = params.zeros_like();
        assert_eq!(grads.bias.mode(), BiasMode::Separate);
        assert!(grads.get("bias_hh").unwrap().as_slice().iter().all(|&x| x == 0.0));
        assert!(params.get("bias_h").is_none());

        params.set_zero();
        assert_eq!(params, grads);
    }
}
