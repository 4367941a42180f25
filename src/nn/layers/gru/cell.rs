//! One timestep of a GRU.
//!
//! A [`GruCell`] is bound to a fixed timestep index. It owns the gate scratch
//! buffer `ZRG` that its forward pass fills and its backward pass reads, the
//! matching gradient scratch `dZRG`, and (when dropout is enabled) the mask
//! sampled during its last training forward call. Parameters and the
//! hidden-state ring are shared by all cells of a sequence and are passed in.

use super::{
    candidate::CandidateGrad,
    config::{CellDims, GruCellConfig},
    layout::{Gate, GateLayout},
    params::{GruBias, GruParameters},
    state::HiddenStateRing,
    sweep::BackwardSweep,
};
use crate::{
    error::{GruError, Result},
    linalg::gemm,
    nn::layers::dropout::DropoutMask,
    ops::{add_row_broadcast, sum_rows_into},
    tensor::Tensor,
};
use num_traits::Float;
use tracing::trace;

#[derive(Debug)]
pub struct GruCell<T> {
    config: GruCellConfig,
    layout: GateLayout,
    dims: CellDims,
    timestep: usize,
    /// Gate activations `[batch, 3U]` from the last forward call
    zrg: Tensor<T>,
    /// Gate pre-activation gradients `[batch, 3U]` from the last backward call
    d_zrg: Tensor<T>,
    dropout: Option<DropoutMask<T>>,
    /// Whether the current mask was applied during the last forward call
    dropout_applied: bool,
}

impl<T: Float> GruCell<T> {
    /// Creates the cell for `timestep`.
    ///
    /// A configured seed is offset by the timestep so every cell of a
    /// sequence draws a different mask stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, `dims.unit` disagrees
    /// with it, or `timestep` does not fit in `max_timestep`.
    pub fn new(config: GruCellConfig, dims: CellDims, timestep: usize) -> Result<Self> {
        config.validate()?;
        if dims.unit != config.unit {
            return Err(GruError::InvalidConfig(format!(
                "cell dims have unit {}, config has {}",
                dims.unit, config.unit
            )));
        }
        if timestep >= config.max_timestep {
            return Err(GruError::TimestepOutOfRange {
                timestep,
                max_timestep: config.max_timestep,
            });
        }
        let layout = GateLayout::new(config.unit);
        let dropout = config.dropout_active().then(|| {
            let seed = config.seed.map(|s| s.wrapping_add(timestep as u64));
            DropoutMask::new(dims.batch, dims.unit, seed)
        });
        Ok(Self {
            config,
            layout,
            dims,
            timestep,
            zrg: Tensor::zeros(dims.batch, layout.packed_width()),
            d_zrg: Tensor::zeros(dims.batch, layout.packed_width()),
            dropout,
            dropout_applied: false,
        })
    }

    pub fn config(&self) -> &GruCellConfig {
        &self.config
    }

    pub fn dims(&self) -> CellDims {
        self.dims
    }

    pub fn timestep(&self) -> usize {
        self.timestep
    }

    /// Gate activations `[Z | R | G]` of the last forward call.
    pub fn zrg(&self) -> &Tensor<T> {
        &self.zrg
    }

    /// Gate pre-activation gradients of the last backward call.
    pub fn d_zrg(&self) -> &Tensor<T> {
        &self.d_zrg
    }

    /// The dropout mask, if dropout is enabled.
    pub fn dropout_mask(&self) -> Option<&Tensor<T>> {
        self.dropout.as_ref().map(DropoutMask::mask)
    }

    fn check_shape(&self, tensor: &Tensor<T>, cols: usize) -> Result<()> {
        let expected = [self.dims.batch, cols];
        if tensor.shape() != expected {
            return Err(GruError::shape_mismatch(expected, tensor.shape()));
        }
        Ok(())
    }

    fn check_buffers(&self, params: &GruParameters<T>, ring: &HiddenStateRing<T>) -> Result<()> {
        params.check(self.dims.unit, self.dims.feature)?;
        if ring.batch() != self.dims.batch || ring.unit() != self.dims.unit {
            return Err(GruError::shape_mismatch(
                [self.dims.batch, self.dims.unit],
                [ring.batch(), ring.unit()],
            ));
        }
        Ok(())
    }

    /// Advances the hidden state by one timestep.
    ///
    /// Reads `h_prev` from ring slot `timestep - 1` (zeros at timestep 0),
    /// fills `ZRG`, writes the new hidden state to ring slot `timestep` and
    /// returns a copy of it.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `input` is not `[batch, feature]` or the
    /// parameters or ring disagree with the cell dimensions.
    pub fn forward(
        &mut self,
        params: &GruParameters<T>,
        ring: &mut HiddenStateRing<T>,
        input: &Tensor<T>,
        training: bool,
    ) -> Result<Tensor<T>> {
        self.check_shape(input, self.dims.feature)?;
        self.check_buffers(params, ring)?;
        trace!(timestep = self.timestep, batch = self.dims.batch, training, "GRU forward");

        let layout = self.layout;
        let prev = ring.prev_hidden(self.timestep)?;

        gemm(
            T::one(),
            &input.view(),
            false,
            &params.weight_ih.view(),
            false,
            T::zero(),
            &mut self.zrg.view_mut(),
        )?;

        {
            let mut update_reset = layout.update_reset_mut(self.zrg.view_mut())?;
            gemm(
                T::one(),
                &prev.view(),
                false,
                &layout.update_reset(params.weight_hh.view())?,
                false,
                T::one(),
                &mut update_reset,
            )?;
            match &params.bias {
                GruBias::Disabled => {}
                GruBias::Integrated { bias_h } => {
                    add_row_broadcast(&mut update_reset, &layout.update_reset(bias_h.view())?)?;
                }
                GruBias::Separate { bias_ih, bias_hh } => {
                    add_row_broadcast(&mut update_reset, &layout.update_reset(bias_ih.view())?)?;
                    add_row_broadcast(&mut update_reset, &layout.update_reset(bias_hh.view())?)?;
                }
            }
            self.config.recurrent_activation.run_fn(&mut update_reset);
        }

        self.config.reset.forward_candidate(&layout, params, &prev, &mut self.zrg)?;

        {
            let mut memory = layout.gate_mut(self.zrg.view_mut(), Gate::Memory)?;
            match &params.bias {
                GruBias::Disabled => {}
                GruBias::Integrated { bias_h } => {
                    add_row_broadcast(&mut memory, &layout.gate(bias_h.view(), Gate::Memory)?)?;
                }
                GruBias::Separate { bias_ih, .. } => {
                    add_row_broadcast(&mut memory, &layout.gate(bias_ih.view(), Gate::Memory)?)?;
                }
            }
            self.config.hidden_state_activation.run_fn(&mut memory);
        }

        // h = Z ⊙ h_prev + (1 - Z) ⊙ G
        let update = layout.gate(self.zrg.view(), Gate::Update)?;
        let memory = layout.gate(self.zrg.view(), Gate::Memory)?;
        let mut hidden = Tensor::from_fn(self.dims.batch, self.dims.unit, |r, c| {
            let z = update.get(r, c);
            z * prev[[r, c]] + (T::one() - z) * memory.get(r, c)
        });

        self.dropout_applied = false;
        if training {
            if let Some(mask) = self.dropout.as_mut() {
                mask.resample(self.config.dropout_rate)?;
                mask.apply(&mut hidden.view_mut())?;
                self.dropout_applied = true;
            }
        }

        ring.store(self.timestep, &hidden.view())?;
        Ok(hidden)
    }

    /// Propagates the gradient of this timestep's hidden state backward.
    ///
    /// `incoming` is the gradient arriving from outside the recurrence (for
    /// example a loss on this timestep's output); it is added into ring
    /// gradient slot `timestep`, which already holds whatever later timesteps
    /// pushed into it. Parameter gradients are accumulated into the sweep's
    /// buffers, the `h_prev` gradient is added into slot `timestep - 1`, and
    /// the input gradient is returned.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` on badly shaped input or incoming gradient, and
    /// a sweep error if this timestep is entered out of order.
    pub fn backward(
        &mut self,
        params: &GruParameters<T>,
        sweep: &mut BackwardSweep<'_, T>,
        input: &Tensor<T>,
        incoming: &Tensor<T>,
    ) -> Result<Tensor<T>> {
        self.check_shape(input, self.dims.feature)?;
        self.check_shape(incoming, self.dims.unit)?;
        self.check_buffers(params, sweep.ring())?;
        sweep.grads().check(self.dims.unit, self.dims.feature)?;
        trace!(timestep = self.timestep, batch = self.dims.batch, "GRU backward");

        let layout = self.layout;
        let timestep = self.timestep;
        sweep.enter(timestep)?;

        sweep.ring_mut().accumulate_grad(timestep, &incoming.view())?;
        let mut d_hidden = sweep.ring().grad(timestep)?.to_tensor();
        if self.dropout_applied {
            if let Some(mask) = &self.dropout {
                mask.apply(&mut d_hidden.view_mut())?;
            }
        }
        let prev = sweep.ring().prev_hidden(timestep)?;

        let mut d_prev = Tensor::zeros(self.dims.batch, self.dims.unit);
        {
            let update = layout.gate(self.zrg.view(), Gate::Update)?;
            let memory = layout.gate(self.zrg.view(), Gate::Memory)?;
            for r in 0..self.dims.batch {
                for c in 0..self.dims.unit {
                    let dh = d_hidden[[r, c]];
                    let z = update.get(r, c);
                    let g = memory.get(r, c);
                    d_prev[[r, c]] = dh * z;
                    self.d_zrg[[r, layout.offset(Gate::Update) + c]] = dh * (prev[[r, c]] - g);
                    self.d_zrg[[r, layout.offset(Gate::Memory) + c]] = dh * (T::one() - z);
                }
            }
        }

        self.config.recurrent_activation.run_prime_fn(
            &layout.gate(self.zrg.view(), Gate::Update)?,
            &mut layout.gate_mut(self.d_zrg.view_mut(), Gate::Update)?,
        )?;
        self.config.hidden_state_activation.run_prime_fn(
            &layout.gate(self.zrg.view(), Gate::Memory)?,
            &mut layout.gate_mut(self.d_zrg.view_mut(), Gate::Memory)?,
        )?;

        let d_memory = layout.gate(self.d_zrg.view(), Gate::Memory)?.to_tensor();
        self.config.reset.backward_candidate(
            &layout,
            params,
            &prev,
            &self.zrg,
            CandidateGrad {
                d_memory: &d_memory,
                d_zrg: &mut self.d_zrg,
                d_prev: &mut d_prev,
                grads: sweep.grads_mut(),
            },
        )?;

        self.config.recurrent_activation.run_prime_fn(
            &layout.gate(self.zrg.view(), Gate::Reset)?,
            &mut layout.gate_mut(self.d_zrg.view_mut(), Gate::Reset)?,
        )?;

        let grads = sweep.grads_mut();
        match &mut grads.bias {
            GruBias::Disabled => {}
            GruBias::Integrated { bias_h } => sum_rows_into(&self.d_zrg.view(), &mut bias_h.view_mut())?,
            GruBias::Separate { bias_ih, bias_hh } => {
                sum_rows_into(&self.d_zrg.view(), &mut bias_ih.view_mut())?;
                sum_rows_into(
                    &layout.update_reset(self.d_zrg.view())?,
                    &mut layout.update_reset_mut(bias_hh.view_mut())?,
                )?;
            }
        }

        let d_update_reset = layout.update_reset(self.d_zrg.view())?;
        gemm(
            T::one(),
            &prev.view(),
            true,
            &d_update_reset,
            false,
            T::one(),
            &mut layout.update_reset_mut(grads.weight_hh.view_mut())?,
        )?;
        gemm(
            T::one(),
            &input.view(),
            true,
            &self.d_zrg.view(),
            false,
            T::one(),
            &mut grads.weight_ih.view_mut(),
        )?;

        let mut d_input = Tensor::zeros(self.dims.batch, self.dims.feature);
        gemm(
            T::one(),
            &self.d_zrg.view(),
            false,
            &params.weight_ih.view(),
            true,
            T::zero(),
            &mut d_input.view_mut(),
        )?;
        gemm(
            T::one(),
            &d_update_reset,
            false,
            &layout.update_reset(params.weight_hh.view())?,
            true,
            T::one(),
            &mut d_prev.view_mut(),
        )?;

        sweep.accumulate_prev_hidden(timestep, &d_prev.view())?;
        Ok(d_input)
    }

    /// Reallocates the per-batch buffers; contents are not kept.
    pub fn set_batch(&mut self, batch: usize) {
        self.dims.batch = batch;
        self.zrg.resize_rows(batch);
        self.d_zrg.resize_rows(batch);
        if let Some(mask) = self.dropout.as_mut() {
            mask.resize(batch);
        }
        self.dropout_applied = false;
    }
}
