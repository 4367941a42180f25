//! A sequence driver over tied GRU cells.
//!
//! [`UnrolledGru`] owns one parameter bundle, one hidden-state ring and one
//! cell per timestep position. It runs the forward pass in increasing
//! timestep order and the backward pass as a single reverse sweep.

use super::{
    cell::GruCell,
    config::{CellDims, GruCellConfig},
    params::{GruParameters, TiedParameters},
    state::HiddenStateRing,
    sweep::BackwardSweep,
};
use crate::{
    error::{GruError, Result},
    tensor::Tensor,
};
use num_traits::Float;
use tracing::debug;

#[derive(Debug)]
pub struct UnrolledGru<T> {
    config: GruCellConfig,
    dims: CellDims,
    params: TiedParameters<T>,
    ring: HiddenStateRing<T>,
    cells: Vec<GruCell<T>>,
}

impl<T: Float> UnrolledGru<T> {
    /// Finalizes `config` against `input_dims` and initializes fresh parameters.
    pub fn new(config: GruCellConfig, input_dims: &[Vec<usize>]) -> Result<Self> {
        let dims = config.finalize(input_dims)?;
        let params = GruParameters::new(&config, &dims)?;
        Self::with_parameters(config, input_dims, params)
    }

    /// Like [`UnrolledGru::new`] but with caller-provided parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter shapes or bias mode disagree with the
    /// finalized configuration.
    pub fn with_parameters(config: GruCellConfig, input_dims: &[Vec<usize>], params: GruParameters<T>) -> Result<Self> {
        let dims = config.finalize(input_dims)?;
        params.check(dims.unit, dims.feature)?;
        if params.bias.mode() != config.bias() {
            return Err(GruError::InvalidConfig(format!(
                "parameters carry {:?} bias, config asks for {:?}",
                params.bias.mode(),
                config.bias()
            )));
        }
        let cells = (0..config.max_timestep)
            .map(|t| GruCell::new(config, dims, t))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            config,
            dims,
            params: TiedParameters::new(params),
            ring: HiddenStateRing::new(config.max_timestep, dims.batch, dims.unit),
            cells,
        })
    }

    pub fn config(&self) -> &GruCellConfig {
        &self.config
    }

    pub fn dims(&self) -> CellDims {
        self.dims
    }

    pub fn params(&self) -> &GruParameters<T> {
        &self.params.value
    }

    pub fn params_mut(&mut self) -> &mut GruParameters<T> {
        &mut self.params.value
    }

    /// Gradients accumulated by the last backward sweep.
    pub fn grads(&self) -> &GruParameters<T> {
        &self.params.grad
    }

    pub fn ring(&self) -> &HiddenStateRing<T> {
        &self.ring
    }

    pub fn cell(&self, timestep: usize) -> Option<&GruCell<T>> {
        self.cells.get(timestep)
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len == 0 {
            return Err(GruError::InvalidInput("sequence must not be empty".to_string()));
        }
        if len > self.config.max_timestep {
            return Err(GruError::TimestepOutOfRange {
                timestep: len - 1,
                max_timestep: self.config.max_timestep,
            });
        }
        Ok(())
    }

    /// Runs the cells over `inputs` in order, returning every hidden state.
    pub fn forward_sequence(&mut self, inputs: &[Tensor<T>], training: bool) -> Result<Vec<Tensor<T>>> {
        self.check_len(inputs.len())?;
        let params = &self.params.value;
        let ring = &mut self.ring;
        self.cells
            .iter_mut()
            .zip(inputs)
            .map(|(cell, x)| cell.forward(params, ring, x, training))
            .collect()
    }

    /// Runs one reverse sweep over the last forward sequence.
    ///
    /// `incoming[t]` is the external gradient on hidden state `t`. Parameter
    /// gradients are reset and then accumulated, see [`UnrolledGru::grads`].
    /// Returns the input gradients in forward order.
    pub fn backward_sequence(&mut self, inputs: &[Tensor<T>], incoming: &[Tensor<T>]) -> Result<Vec<Tensor<T>>> {
        self.check_len(inputs.len())?;
        if incoming.len() != inputs.len() {
            return Err(GruError::InvalidInput(format!(
                "{} inputs but {} incoming gradients",
                inputs.len(),
                incoming.len()
            )));
        }
        let params = &self.params.value;
        let mut sweep = BackwardSweep::new(&mut self.params.grad, &mut self.ring);
        let mut d_inputs = Vec::with_capacity(inputs.len());
        for t in (0..inputs.len()).rev() {
            d_inputs.push(self.cells[t].backward(params, &mut sweep, &inputs[t], &incoming[t])?);
        }
        let visited = sweep.finish();
        debug!(visited, "backward sweep finished");
        d_inputs.reverse();
        Ok(d_inputs)
    }

    /// Reallocates the ring and every cell's scratch for a new batch size.
    pub fn set_batch(&mut self, batch: usize) {
        self.dims.batch = batch;
        self.ring.set_batch(batch);
        for cell in &mut self.cells {
            cell.set_batch(batch);
        }
    }
}
