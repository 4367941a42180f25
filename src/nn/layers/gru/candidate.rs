//! Candidate-gate paths for the two reset placements.
//!
//! Each [`ResetMode`] variant owns a matching forward/backward pair. The
//! forward functions add the hidden-to-hidden contribution into the `[G]`
//! slice of the gate scratch buffer (which already holds `x·W_ih_g`); the
//! backward functions produce `dR` (before the recurrent activation prime),
//! the `W_hh_g` / `bias_hh_g` gradients, and the candidate share of `d h_prev`.

use super::{
    config::ResetMode,
    layout::{Gate, GateLayout},
    params::{GruBias, GruParameters},
};
use crate::{
    error::Result,
    linalg::gemm,
    ops::{add_assign, add_row_broadcast, mul_assign, sum_rows_into},
    tensor::Tensor,
};
use num_traits::Float;

/// Buffers read and written by a candidate backward pass.
pub(crate) struct CandidateGrad<'a, T> {
    /// Gradient of the candidate pre-activation, `[batch, U]`
    pub d_memory: &'a Tensor<T>,
    /// Packed gate gradient; the `[R]` slice is overwritten
    pub d_zrg: &'a mut Tensor<T>,
    /// Gradient of the previous hidden state; accumulated into
    pub d_prev: &'a mut Tensor<T>,
    /// Parameter gradients; accumulated into
    pub grads: &'a mut GruParameters<T>,
}

impl ResetMode {
    pub(crate) fn forward_candidate<T: Float>(
        self,
        layout: &GateLayout,
        params: &GruParameters<T>,
        prev: &Tensor<T>,
        zrg: &mut Tensor<T>,
    ) -> Result<()> {
        match self {
            ResetMode::AfterCandidate => reset_after_forward(layout, params, prev, zrg),
            ResetMode::BeforeCandidate => reset_before_forward(layout, params, prev, zrg),
        }
    }

    pub(crate) fn backward_candidate<T: Float>(
        self,
        layout: &GateLayout,
        params: &GruParameters<T>,
        prev: &Tensor<T>,
        zrg: &Tensor<T>,
        out: CandidateGrad<'_, T>,
    ) -> Result<()> {
        match self {
            ResetMode::AfterCandidate => reset_after_backward(layout, params, prev, zrg, out),
            ResetMode::BeforeCandidate => reset_before_backward(layout, params, prev, zrg, out),
        }
    }
}

/// `h_prev·W_hh_g + bias_hh_g`, the hidden projection gated by `R` when the
/// reset is applied after it.
fn hidden_projection<T: Float>(layout: &GateLayout, params: &GruParameters<T>, prev: &Tensor<T>) -> Result<Tensor<T>> {
    let mut projection = Tensor::zeros(prev.rows(), layout.unit());
    let w_hh_g = layout.gate(params.weight_hh.view(), Gate::Memory)?;
    gemm(T::one(), &prev.view(), false, &w_hh_g, false, T::zero(), &mut projection.view_mut())?;
    if let GruBias::Separate { bias_hh, .. } = &params.bias {
        add_row_broadcast(&mut projection.view_mut(), &layout.gate(bias_hh.view(), Gate::Memory)?)?;
    }
    Ok(projection)
}

fn reset_after_forward<T: Float>(
    layout: &GateLayout,
    params: &GruParameters<T>,
    prev: &Tensor<T>,
    zrg: &mut Tensor<T>,
) -> Result<()> {
    let mut gated = hidden_projection(layout, params, prev)?;
    mul_assign(&mut gated.view_mut(), &layout.gate(zrg.view(), Gate::Reset)?)?;
    add_assign(&mut layout.gate_mut(zrg.view_mut(), Gate::Memory)?, &gated.view())
}

fn reset_before_forward<T: Float>(
    layout: &GateLayout,
    params: &GruParameters<T>,
    prev: &Tensor<T>,
    zrg: &mut Tensor<T>,
) -> Result<()> {
    let mut gated_prev = prev.clone();
    mul_assign(&mut gated_prev.view_mut(), &layout.gate(zrg.view(), Gate::Reset)?)?;

    let w_hh_g = layout.gate(params.weight_hh.view(), Gate::Memory)?;
    let mut memory = layout.gate_mut(zrg.view_mut(), Gate::Memory)?;
    gemm(T::one(), &gated_prev.view(), false, &w_hh_g, false, T::one(), &mut memory)?;
    // the hidden bias is added after the gated product, outside the reset
    if let GruBias::Separate { bias_hh, .. } = &params.bias {
        add_row_broadcast(&mut memory, &layout.gate(bias_hh.view(), Gate::Memory)?)?;
    }
    Ok(())
}

fn reset_after_backward<T: Float>(
    layout: &GateLayout,
    params: &GruParameters<T>,
    prev: &Tensor<T>,
    zrg: &Tensor<T>,
    out: CandidateGrad<'_, T>,
) -> Result<()> {
    let reset = layout.gate(zrg.view(), Gate::Reset)?;
    let w_hh_g = layout.gate(params.weight_hh.view(), Gate::Memory)?;

    // dR = dG ⊙ (h_prev·W_hh_g + b_hh_g)
    let projection = hidden_projection(layout, params, prev)?;
    {
        let mut d_reset = layout.gate_mut(out.d_zrg.view_mut(), Gate::Reset)?;
        d_reset.assign(&out.d_memory.view())?;
        mul_assign(&mut d_reset, &projection.view())?;
    }

    // gradient reaching the hidden projection: dG ⊙ R
    let mut d_projection = out.d_memory.clone();
    mul_assign(&mut d_projection.view_mut(), &reset)?;

    if let GruBias::Separate { bias_hh, .. } = &mut out.grads.bias {
        sum_rows_into(&d_projection.view(), &mut layout.gate_mut(bias_hh.view_mut(), Gate::Memory)?)?;
    }
    gemm(T::one(), &d_projection.view(), false, &w_hh_g, true, T::one(), &mut out.d_prev.view_mut())?;
    let mut d_w_hh_g = layout.gate_mut(out.grads.weight_hh.view_mut(), Gate::Memory)?;
    gemm(T::one(), &prev.view(), true, &d_projection.view(), false, T::one(), &mut d_w_hh_g)
}

fn reset_before_backward<T: Float>(
    layout: &GateLayout,
    params: &GruParameters<T>,
    prev: &Tensor<T>,
    zrg: &Tensor<T>,
    out: CandidateGrad<'_, T>,
) -> Result<()> {
    let reset = layout.gate(zrg.view(), Gate::Reset)?;
    let w_hh_g = layout.gate(params.weight_hh.view(), Gate::Memory)?;

    if let GruBias::Separate { bias_hh, .. } = &mut out.grads.bias {
        sum_rows_into(&out.d_memory.view(), &mut layout.gate_mut(bias_hh.view_mut(), Gate::Memory)?)?;
    }

    // gradient reaching R ⊙ h_prev
    let mut d_gated_prev = Tensor::zeros(prev.rows(), layout.unit());
    gemm(T::one(), &out.d_memory.view(), false, &w_hh_g, true, T::zero(), &mut d_gated_prev.view_mut())?;

    {
        let mut d_reset = layout.gate_mut(out.d_zrg.view_mut(), Gate::Reset)?;
        d_reset.assign(&d_gated_prev.view())?;
        mul_assign(&mut d_reset, &prev.view())?;
    }

    mul_assign(&mut d_gated_prev.view_mut(), &reset)?;
    add_assign(&mut out.d_prev.view_mut(), &d_gated_prev.view())?;

    let mut gated_prev = prev.clone();
    mul_assign(&mut gated_prev.view_mut(), &reset)?;
    let mut d_w_hh_g = layout.gate_mut(out.grads.weight_hh.view_mut(), Gate::Memory)?;
    gemm(T::one(), &gated_prev.view(), true, &out.d_memory.view(), false, T::one(), &mut d_w_hh_g)
}
