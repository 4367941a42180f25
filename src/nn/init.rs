//! Weight initialization for recurrent cell parameters.
//!
//! # Available Initialization Strategies
//! - `zeros` / `ones`: constant fill (biases default to `zeros`)
//! - `xavier_uniform` / `xavier_normal`: Glorot initialization (good for tanh/sigmoid networks)
//! - `he_uniform` / `he_normal`: Kaiming initialization
//! - `lecun_uniform` / `lecun_normal`: LeCun initialization
//!
//! Fan-in is the number of rows of the weight matrix, fan-out the number of
//! columns, matching the `[in, out]` layout of the cell weights.

use crate::{
    error::{GruError, Result},
    tensor::Tensor,
};
use num_traits::Float;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use std::{fmt, str::FromStr};

/// Initialization strategy for a parameter tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Initializer {
    #[default]
    Zeros,
    Ones,
    XavierUniform,
    XavierNormal,
    HeUniform,
    HeNormal,
    LecunUniform,
    LecunNormal,
}

enum Sampling {
    Constant(f64),
    Uniform(f64),
    Normal(f64),
}

impl Initializer {
    fn sampling(self, fan_in: usize, fan_out: usize) -> Sampling {
        let fan_in = fan_in.max(1) as f64;
        let fan_avg = (fan_in + fan_out.max(1) as f64) / 2.0;
        match self {
            Self::Zeros => Sampling::Constant(0.0),
            Self::Ones => Sampling::Constant(1.0),
            Self::XavierUniform => Sampling::Uniform((3.0 / fan_avg).sqrt()),
            Self::XavierNormal => Sampling::Normal((1.0 / fan_avg).sqrt()),
            Self::HeUniform => Sampling::Uniform((6.0 / fan_in).sqrt()),
            Self::HeNormal => Sampling::Normal((2.0 / fan_in).sqrt()),
            Self::LecunUniform => Sampling::Uniform((3.0 / fan_in).sqrt()),
            Self::LecunNormal => Sampling::Normal((1.0 / fan_in).sqrt()),
        }
    }

    /// Fills `tensor` in place.
    ///
    /// # Arguments
    ///
    /// * `tensor` - The tensor to initialize, laid out `[fan_in, fan_out]`.
    /// * `rng` - Source of randomness; ignored by the constant strategies.
    ///
    /// # Errors
    ///
    /// Returns an error if the distribution parameters are invalid.
    pub fn initialize<T, R>(self, tensor: &mut Tensor<T>, rng: &mut R) -> Result<()>
    where
        T: Float,
        R: Rng + ?Sized,
    {
        let to_t = |v: f64| T::from(v).unwrap_or_else(T::nan);
        match self.sampling(tensor.rows(), tensor.cols()) {
            Sampling::Constant(v) => tensor.fill(to_t(v)),
            Sampling::Uniform(limit) => {
                let dist = Uniform::new_inclusive(-limit, limit);
                tensor
                    .as_mut_slice()
                    .iter_mut()
                    .for_each(|x| *x = to_t(dist.sample(rng)));
            }
            Sampling::Normal(std) => {
                let dist = Normal::new(0.0, std)
                    .map_err(|e| GruError::InvalidConfig(format!("{self}: {e}")))?;
                tensor
                    .as_mut_slice()
                    .iter_mut()
                    .for_each(|x| *x = to_t(dist.sample(rng)));
            }
        }
        Ok(())
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Zeros => "zeros",
            Self::Ones => "ones",
            Self::XavierUniform => "xavier_uniform",
            Self::XavierNormal => "xavier_normal",
            Self::HeUniform => "he_uniform",
            Self::HeNormal => "he_normal",
            Self::LecunUniform => "lecun_uniform",
            Self::LecunNormal => "lecun_normal",
        }
    }
}

impl fmt::Display for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Initializer {
    type Err = GruError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zeros" => Ok(Self::Zeros),
            "ones" => Ok(Self::Ones),
            "xavier_uniform" => Ok(Self::XavierUniform),
            "xavier_normal" => Ok(Self::XavierNormal),
            "he_uniform" => Ok(Self::HeUniform),
            "he_normal" => Ok(Self::HeNormal),
            "lecun_uniform" => Ok(Self::LecunUniform),
            "lecun_normal" => Ok(Self::LecunNormal),
            other => Err(GruError::InvalidConfig(format!("unknown initializer {other:?}"))),
        }
    }
}
