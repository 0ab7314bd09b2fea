use nv_core::frame::FeatureFrame;

/// Hue span used for the frequency axis: red (low) to magenta (high).
const HUE_SPAN: f32 = 300.0;
/// Brightness of a silent frame.
const MIN_VALUE: f32 = 0.25;

/// RGB color of a frame.
///
/// Hue follows the dominant band's position in the spectrum when the frame is tonal
/// enough (`tonalness >= tonal_threshold`), otherwise the spectral centroid. Saturation
/// grows with tonalness, brightness with the envelope.
///
/// # Example
/// ```
/// use nv_core::frame::{DominantBand, FeatureFrame};
/// use nv_render::color::frame_color;
///
/// let frame = FeatureFrame {
///     spectrum: vec![0.0; 32],
///     dominant: Some(DominantBand { index: 0, freq_hz: 21.0 }),
///     tonalness: 1.0,
///     envelope: 1.0,
///     ..FeatureFrame::default()
/// };
/// assert_eq!(frame_color(&frame, 0.4), (255, 0, 0));
/// ```
#[must_use]
pub fn frame_color(frame: &FeatureFrame, tonal_threshold: f32) -> (u8, u8, u8) {
    let position = match frame.trusted_dominant(tonal_threshold) {
        Some(d) if frame.spectrum.len() > 1 => d.index as f32 / (frame.spectrum.len() - 1) as f32,
        Some(_) => 0.0,
        None => frame.centroid,
    };
    let hue = unit(position) * HUE_SPAN;
    let saturation = 0.4 + 0.6 * unit(frame.tonalness);
    let value = MIN_VALUE + (1.0 - MIN_VALUE) * unit(frame.envelope);
    hsv_to_rgb(hue, saturation, value)
}

/// HSV (hue in degrees, s and v in [0.0, 1.0]) to 8-bit RGB.
///
/// # Example
/// ```
/// use nv_render::color::hsv_to_rgb;
/// assert_eq!(hsv_to_rgb(120.0, 1.0, 1.0), (0, 255, 0));
/// assert_eq!(hsv_to_rgb(0.0, 0.0, 0.5), (128, 128, 128));
/// ```
#[must_use]
pub fn hsv_to_rgb(hue: f32, saturation: f32, value: f32) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = unit(saturation);
    let v = unit(value);
    let c = v * s;
    let x = c * (1.0 - (h % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match h as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let to_u8 = |channel: f32| ((channel + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    (to_u8(r), to_u8(g), to_u8(b))
}

fn unit(v: f32) -> f32 {
    if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 }
}
