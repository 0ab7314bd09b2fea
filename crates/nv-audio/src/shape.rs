/// Total power below which the spectrum is treated as silent.
const SILENCE_POWER: f32 = 1e-12;

/// Raw spectral shape of a power spectrum, in Hz.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpectralShape {
    /// Power-weighted mean frequency.
    pub centroid_hz: f32,
    /// Power-weighted RMS spread around the centroid.
    pub bandwidth_hz: f32,
}

/// Centroid and bandwidth of `power` (bin `i` at `i * bin_hz`).
///
/// Returns `None` when the spectrum carries no energy.
///
/// # Example
/// ```
/// use nv_audio::shape::spectral_shape;
/// let mut power = vec![0.0f32; 64];
/// power[10] = 1.0;
/// let shape = spectral_shape(&power, 10.0).unwrap();
/// assert!((shape.centroid_hz - 100.0).abs() < 1e-3);
/// assert!(shape.bandwidth_hz < 1e-3);
/// assert!(spectral_shape(&[0.0; 64], 10.0).is_none());
/// ```
#[must_use]
pub fn spectral_shape(power: &[f32], bin_hz: f32) -> Option<SpectralShape> {
    let total: f32 = power.iter().sum();
    if !total.is_finite() || total <= SILENCE_POWER {
        return None;
    }

    let centroid: f32 = power
        .iter()
        .enumerate()
        .map(|(i, &p)| i as f32 * bin_hz * p)
        .sum::<f32>()
        / total;

    let variance: f32 = power
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let d = i as f32 * bin_hz - centroid;
            d * d * p
        })
        .sum::<f32>()
        / total;

    if !(centroid.is_finite() && variance.is_finite()) {
        return None;
    }

    Some(SpectralShape {
        centroid_hz: centroid,
        bandwidth_hz: variance.max(0.0).sqrt(),
    })
}

/// `log10(max(centroid, min_hz)) / log10(max_hz)`, clamped to [0.0, 1.0].
///
/// # Example
/// ```
/// use nv_audio::shape::normalize_centroid;
/// assert!((normalize_centroid(20000.0, 20.0, 20000.0) - 1.0).abs() < 1e-6);
/// assert!(normalize_centroid(1.0, 20.0, 20000.0) > 0.3);
/// ```
#[must_use]
pub fn normalize_centroid(centroid_hz: f32, min_hz: f32, max_hz: f32) -> f32 {
    log_ratio(centroid_hz.max(min_hz), max_hz)
}

/// `log10(max(bandwidth, 1)) / log10(reference_hz)`, clamped to [0.0, 1.0].
#[must_use]
pub fn normalize_bandwidth(bandwidth_hz: f32, reference_hz: f32) -> f32 {
    log_ratio(bandwidth_hz.max(1.0), reference_hz)
}

fn log_ratio(value: f32, reference: f32) -> f32 {
    let denom = reference.log10();
    if !(denom.is_finite() && denom > 0.0) {
        return 0.0;
    }
    let v = value.log10() / denom;
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_equal_peaks_centroid_between() {
        let mut power = vec![0.0f32; 100];
        power[10] = 1.0;
        power[30] = 1.0;
        let shape = spectral_shape(&power, 10.0).expect("energy present");
        assert!((shape.centroid_hz - 200.0).abs() < 1e-3);
        assert!((shape.bandwidth_hz - 100.0).abs() < 1e-3);
    }

    #[test]
    fn silence_has_no_shape() {
        assert!(spectral_shape(&[], 10.0).is_none());
        assert!(spectral_shape(&[0.0; 8], 10.0).is_none());
    }

    #[test]
    fn normalized_values_stay_in_unit_range() {
        for hz in [0.0, 1.0, 19.0, 440.0, 19999.0, 1e9] {
            let c = normalize_centroid(hz, 20.0, 20000.0);
            let b = normalize_bandwidth(hz, 5000.0);
            assert!((0.0..=1.0).contains(&c));
            assert!((0.0..=1.0).contains(&b));
        }
        assert_eq!(normalize_bandwidth(0.0, 5000.0), 0.0);
    }

    #[test]
    fn higher_centroid_maps_higher() {
        assert!(normalize_centroid(2000.0, 20.0, 20000.0) > normalize_centroid(200.0, 20.0, 20000.0));
    }
}
