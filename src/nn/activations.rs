//! Activation functions for recurrent cells.
//!
//! Activations run in place over gate windows. Their derivatives are
//! expressed in terms of the forward *output*, which is what a cell keeps in
//! its gate scratch buffer after the forward pass.

use crate::{
    error::{GruError, Result},
    ops::map_inplace,
    view::{TensorView, TensorViewMut},
};
use num_traits::Float;
use std::{fmt, str::FromStr};

/// Slope used by [`ActivationKind::LeakyRelu`] for negative inputs.
pub const LEAKY_RELU_SLOPE: f64 = 0.01;

/// Supported element-wise activations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationKind {
    /// Formula: `f(x) = tanh(x)`
    Tanh,
    /// Formula: `f(x) = 1 / (1 + exp(-x))`
    Sigmoid,
    /// Formula: `f(x) = max(0, x)`
    Relu,
    /// Formula: `f(x) = x if x >= 0 else 0.01 * x`
    LeakyRelu,
    /// Formula: `f(x) = x`
    Identity,
}

impl ActivationKind {
    /// Evaluates the activation for a single value.
    #[inline]
    pub fn apply<T: Float>(self, x: T) -> T {
        match self {
            Self::Tanh => x.tanh(),
            Self::Sigmoid => sigmoid(x),
            Self::Relu => x.max(T::zero()),
            Self::LeakyRelu => {
                if x >= T::zero() {
                    x
                } else {
                    x * leaky_slope()
                }
            }
            Self::Identity => x,
        }
    }

    /// Derivative evaluated at the forward output `y = f(x)`.
    #[inline]
    pub fn derivative_from_output<T: Float>(self, y: T) -> T {
        let one = T::one();
        match self {
            Self::Tanh => one - y * y,
            Self::Sigmoid => y * (one - y),
            Self::Relu => {
                if y > T::zero() {
                    one
                } else {
                    T::zero()
                }
            }
            Self::LeakyRelu => {
                if y > T::zero() {
                    one
                } else {
                    leaky_slope()
                }
            }
            Self::Identity => one,
        }
    }

    /// Applies the activation in place.
    pub fn run_fn<T: Float>(self, x: &mut TensorViewMut<'_, T>) {
        map_inplace(x, |v| self.apply(v));
    }

    /// Multiplies `grad` in place by the activation derivative at `output`.
    ///
    /// # Arguments
    /// * `output` - Forward output of this activation
    /// * `grad` - Gradient with respect to the output; becomes the gradient
    ///   with respect to the pre-activation
    pub fn run_prime_fn<T: Float>(self, output: &TensorView<'_, T>, grad: &mut TensorViewMut<'_, T>) -> Result<()> {
        if output.shape() != grad.shape() {
            return Err(GruError::shape_mismatch(grad.shape(), output.shape()));
        }
        for r in 0..grad.rows() {
            let out_row = output.row(r);
            grad.row_mut(r)
                .iter_mut()
                .zip(out_row)
                .for_each(|(g, &y)| *g = *g * self.derivative_from_output(y));
        }
        Ok(())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Tanh => "tanh",
            Self::Sigmoid => "sigmoid",
            Self::Relu => "relu",
            Self::LeakyRelu => "leaky_relu",
            Self::Identity => "none",
        }
    }
}

#[inline]
fn sigmoid<T: Float>(x: T) -> T {
    T::one() / (T::one() + (-x).exp())
}

#[inline]
fn leaky_slope<T: Float>() -> T {
    T::from(LEAKY_RELU_SLOPE).unwrap_or_else(T::zero)
}

impl fmt::Display for ActivationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActivationKind {
    type Err = GruError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tanh" => Ok(Self::Tanh),
            "sigmoid" => Ok(Self::Sigmoid),
            "relu" => Ok(Self::Relu),
            "leaky_relu" => Ok(Self::LeakyRelu),
            "none" | "identity" | "linear" => Ok(Self::Identity),
            other => Err(GruError::InvalidConfig(format!("unknown activation {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Tensor;
    use approx::assert_relative_eq;

    const ALL: [ActivationKind; 5] = [
        ActivationKind::Tanh,
        ActivationKind::Sigmoid,
        ActivationKind::Relu,
        ActivationKind::LeakyRelu,
        ActivationKind::Identity,
    ];

    #[test]
    fn test_known_values() {
        assert_relative_eq!(ActivationKind::Sigmoid.apply(0.0f64), 0.5);
        assert_relative_eq!(ActivationKind::Tanh.apply(0.0f64), 0.0);
        assert_relative_eq!(ActivationKind::Relu.apply(-3.0f64), 0.0);
        assert_relative_eq!(ActivationKind::LeakyRelu.apply(-2.0f64), -0.02);
        assert_relative_eq!(ActivationKind::Identity.apply(1.25f64), 1.25);
    }

    #[test]
    fn test_derivative_from_output_matches_finite_difference() {
        let h = 1e-6;
        for kind in ALL {
            for &x in &[-1.3f64, -0.2, 0.4, 2.1] {
                let numeric = (kind.apply(x + h) - kind.apply(x - h)) / (2.0 * h);
                let analytic = kind.derivative_from_output(kind.apply(x));
                assert_relative_eq!(numeric, analytic, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_run_prime_fn_in_place() -> Result<()> {
        let mut x = Tensor::from_vec(vec![0.0f32, 1.0], 1, 2)?;
        ActivationKind::Sigmoid.run_fn(&mut x.view_mut());
        let mut grad = Tensor::full(1, 2, 2.0f32);
        ActivationKind::Sigmoid.run_prime_fn(&x.view(), &mut grad.view_mut())?;
        assert_relative_eq!(grad[[0, 0]], 0.5);
        assert_relative_eq!(grad[[0, 1]], 2.0 * 0.731_058_6 * (1.0 - 0.731_058_6), epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn test_parse_round_trip() {
        for kind in ALL {
            assert_eq!(kind.to_string().parse::<ActivationKind>().unwrap(), kind);
        }
        assert!("swishy".parse::<ActivationKind>().is_err());
    }
}
