//! Frequency response and stability of coefficient sets

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::biquad::BiquadCoeffs;
use crate::coefficients::CoeffSet;

/// Complex response of one section at normalized angular frequency `omega`.
pub fn section_response(coeffs: &BiquadCoeffs, omega: f64) -> Complex64 {
    let z1 = Complex64::from_polar(1.0, -omega);
    let z2 = z1 * z1;
    let num = f64::from(coeffs.b0) + f64::from(coeffs.b1) * z1 + f64::from(coeffs.b2) * z2;
    let den = 1.0 + f64::from(coeffs.a1) * z1 + f64::from(coeffs.a2) * z2;
    num / den
}

/// |H| of a cascade at `freq_hz`, sampled at `rate_hz`.
pub fn magnitude(set: &CoeffSet, freq_hz: f32, rate_hz: f32) -> f32 {
    let omega = 2.0 * PI * f64::from(freq_hz) / f64::from(rate_hz);
    let response = set
        .sections
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, section| {
            acc * section_response(section, omega)
        });
    response.norm() as f32
}

/// Gain in decibels.
pub fn magnitude_db(set: &CoeffSet, freq_hz: f32, rate_hz: f32) -> f32 {
    20.0 * magnitude(set, freq_hz, rate_hz).max(1e-12).log10()
}

/// Largest pole radius of one section: roots of `z^2 + a1*z + a2`.
pub fn pole_radius(coeffs: &BiquadCoeffs) -> f64 {
    let a1 = f64::from(coeffs.a1);
    let a2 = f64::from(coeffs.a2);
    let disc = Complex64::new(a1 * a1 - 4.0 * a2, 0.0).sqrt();
    let p1 = (-a1 + disc) / 2.0;
    let p2 = (-a1 - disc) / 2.0;
    p1.norm().max(p2.norm())
}

/// Largest pole radius across the cascade; below 1.0 means stable.
pub fn max_pole_radius(set: &CoeffSet) -> f64 {
    set.sections.iter().map(pole_radius).fold(0.0, f64::max)
}
