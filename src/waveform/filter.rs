use rustfft::{num_complex::Complex64, FftPlanner};

use crate::drivers::ExplorerError;

/// Ideal zero-phase low-pass: zero every spectral bin above `cutoff_hz` and
/// transform back. Ringing near sharp edges is inherent to the brick-wall response.
pub fn low_pass_filter(
    data: &[f64],
    cutoff_hz: f64,
    sample_rate_hz: f64,
) -> Result<Vec<f64>, ExplorerError> {
    validate_low_pass(cutoff_hz, sample_rate_hz)?;
    let n = data.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut spectrum: Vec<Complex64> = data.iter().map(|&v| Complex64::new(v, 0.0)).collect();
    forward.process(&mut spectrum);

    for (bin, value) in spectrum.iter_mut().enumerate() {
        if bin_frequency(bin, n, sample_rate_hz).abs() > cutoff_hz {
            *value = Complex64::new(0.0, 0.0);
        }
    }

    inverse.process(&mut spectrum);
    // rustfft leaves the inverse unnormalized.
    let scale = 1.0 / n as f64;
    Ok(spectrum.iter().map(|c| c.re * scale).collect())
}

pub fn validate_low_pass(cutoff_hz: f64, sample_rate_hz: f64) -> Result<(), ExplorerError> {
    if !sample_rate_hz.is_finite() || sample_rate_hz <= 0.0 {
        return Err(ExplorerError::InvalidParameter(format!(
            "sample rate must be a positive number of Hz, got {sample_rate_hz}"
        )));
    }
    if !cutoff_hz.is_finite() || cutoff_hz < 0.0 {
        return Err(ExplorerError::InvalidParameter(format!(
            "cutoff frequency must be zero or a positive number of Hz, got {cutoff_hz}"
        )));
    }
    Ok(())
}

/// Signed frequency of FFT bin `k`, laid out like numpy's `fftfreq`.
fn bin_frequency(k: usize, n: usize, sample_rate_hz: f64) -> f64 {
    let signed = if k <= (n - 1) / 2 {
        k as f64
    } else {
        k as f64 - n as f64
    };
    signed * sample_rate_hz / n as f64
}
