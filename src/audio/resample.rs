//! Deterministic linear-interpolation resampler.
//!
//! Good enough for speech-recognition preprocessing, where latency matters
//! more than phase accuracy. No anti-aliasing filter is applied.

/// Resamples mono PCM from `source_rate` to `target_rate`.
///
/// Takes the buffer by value: when the rates already match the input is
/// returned unchanged without copying. Output length is exactly
/// `round(input_len / (source_rate / target_rate))`, and interpolation
/// clamps at the final input sample instead of reading past the end.
pub fn resample(input: Vec<f32>, source_rate: u32, target_rate: u32) -> Vec<f32> {
    // Guard rails
    if source_rate == target_rate || source_rate == 0 || target_rate == 0 {
        return input;
    }
    if input.is_empty() {
        return input;
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (input.len() as f64 / ratio).round() as usize;
    let last = input.len() - 1;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let idx = (src_pos.floor() as usize).min(last);
        let frac = (src_pos - idx as f64) as f32;

        let v0 = input[idx];
        let v1 = if idx < last { input[idx + 1] } else { v0 };
        output.push(v0 + (v1 - v0) * frac);
    }

    output
}
