//! Second-order IIR section with an explicit delay line

use serde::{Deserialize, Serialize};

/// Coefficients of one section.
///
/// `a1` and `a2` are subtracted from the input, so a stable section has
/// its poles at the roots of `z^2 + a1*z + a2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    pub a1: f32,
    pub a2: f32,
}

impl BiquadCoeffs {
    pub const fn new(b0: f32, b1: f32, b2: f32, a1: f32, a2: f32) -> Self {
        Self { b0, b1, b2, a1, a2 }
    }

    /// Section that passes its input through unchanged
    pub const IDENTITY: BiquadCoeffs = BiquadCoeffs::new(1.0, 0.0, 0.0, 0.0, 0.0);
}

/// Delay registers of one section on one channel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadState {
    z1: f32,
    z2: f32,
}

impl BiquadState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one sample through the section.
    #[inline]
    pub fn process(&mut self, coeffs: &BiquadCoeffs, input: f32) -> f32 {
        let x = input - coeffs.a1 * self.z1 - coeffs.a2 * self.z2;
        let output = coeffs.b0 * x + coeffs.b1 * self.z1 + coeffs.b2 * self.z2;
        self.z2 = self.z1;
        self.z1 = x;
        output
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// NaN or infinity in the delay line; only a reset recovers.
    pub fn is_poisoned(&self) -> bool {
        !(self.z1.is_finite() && self.z2.is_finite())
    }

    pub fn registers(&self) -> (f32, f32) {
        (self.z1, self.z2)
    }
}
