/// Envelope values below this snap to exactly 0.
const ENVELOPE_EPSILON: f32 = 1e-6;

/// Relative rise of total energy between consecutive chunks.
///
/// `transient = max(0, total - previous) / max(total, floor)`, clamped to [0.0, 1.0].
/// Being relative, it scales with the current loudness instead of firing on level alone.
///
/// # Example
/// ```
/// use nv_audio::dynamics::TransientDetector;
/// let mut t = TransientDetector::new(1e-6);
/// assert_eq!(t.process(1.0), 1.0);   // from silence
/// assert_eq!(t.process(1.0), 0.0);   // steady
/// assert_eq!(t.process(2.0), 0.5);   // doubled
/// assert_eq!(t.process(0.5), 0.0);   // falling never fires
/// ```
#[derive(Clone, Debug)]
pub struct TransientDetector {
    prev_total: f32,
    floor: f32,
}

impl TransientDetector {
    /// Create a detector whose denominator never drops below `floor`.
    #[must_use]
    pub fn new(floor: f32) -> Self {
        Self {
            prev_total: 0.0,
            floor: floor.max(f32::MIN_POSITIVE),
        }
    }

    /// Feed this chunk's total energy. Always updates the stored total.
    pub fn process(&mut self, total: f32) -> f32 {
        let total = if total.is_finite() { total.max(0.0) } else { 0.0 };
        let rise = (total - self.prev_total).max(0.0);
        self.prev_total = total;
        let t = rise / total.max(self.floor);
        if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 }
    }
}

/// Instant-attack, exponential-decay follower.
///
/// Two transitions only: a target above the current value snaps the envelope to it;
/// anything else (including an equal target) multiplies it by the per-chunk decay
/// factor `1 - chunk_duration / decay_time`.
///
/// # Example
/// ```
/// use nv_audio::dynamics::EnvelopeFollower;
/// let mut env = EnvelopeFollower::new(0.1, 1.0);
/// assert_eq!(env.process(0.8), 0.8);
/// assert!((env.process(0.0) - 0.72).abs() < 1e-6);
/// ```
#[derive(Clone, Debug)]
pub struct EnvelopeFollower {
    value: f32,
    decay: f32,
}

impl EnvelopeFollower {
    /// Follower stepping every `chunk_duration` seconds with a `decay_time` constant.
    #[must_use]
    pub fn new(chunk_duration: f32, decay_time: f32) -> Self {
        let decay = if decay_time > 0.0 {
            1.0 - chunk_duration / decay_time
        } else {
            0.0
        };
        Self {
            value: 0.0,
            decay: if decay.is_finite() { decay.clamp(0.0, 1.0) } else { 0.0 },
        }
    }

    /// Step once toward `target` and return the new value [0.0, 1.0].
    pub fn process(&mut self, target: f32) -> f32 {
        let target = if target.is_finite() { target.clamp(0.0, 1.0) } else { 0.0 };
        if target > self.value {
            self.value = target;
        } else {
            self.value *= self.decay;
            if self.value < ENVELOPE_EPSILON {
                self.value = 0.0;
            }
        }
        self.value = self.value.clamp(0.0, 1.0);
        self.value
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Per-chunk decay multiplier.
    #[must_use]
    pub fn decay_factor(&self) -> f32 {
        self.decay
    }
}
