//! Emission gate — decides whether a frame's dominant expression is reported.

use std::time::Duration;

use tokio::time::Instant;

/// Minimum confidence for a label to be reported.
pub const SCORE_THRESHOLD: f32 = 0.72;

/// How long the same label stays quiet after being reported.
pub const EMIT_COOLDOWN: Duration = Duration::from_millis(1500);

/// Last reported label and when it was reported. Fresh for every camera session.
#[derive(Debug, Default)]
pub struct EmissionGate {
    last_label: Option<String>,
    last_emit: Option<Instant>,
}

impl EmissionGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a label seen at `now`. Returns true if it should be emitted, in which
    /// case it becomes the last reported label.
    pub fn offer(&mut self, label: &str, score: f32, now: Instant) -> bool {
        // NaN never passes
        if !(score >= SCORE_THRESHOLD) {
            return false;
        }

        let changed = self.last_label.as_deref() != Some(label);
        let cooled = self
            .last_emit
            .map_or(true, |t| now.saturating_duration_since(t) >= EMIT_COOLDOWN);

        if changed || cooled {
            self.last_label = Some(label.to_string());
            self.last_emit = Some(now);
            true
        } else {
            false
        }
    }

    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    pub fn reset(&mut self) {
        self.last_label = None;
        self.last_emit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_emission_sequence() {
        let t0 = Instant::now();
        let mut gate = EmissionGate::new();

        // (label, score, offset ms, expected)
        let steps = [
            ("happy", 0.90, 0, true),
            ("happy", 0.95, 100, false),
            ("happy", 0.99, 1400, false),
            ("sad", 0.80, 1450, true),
            ("happy", 0.71, 1500, false),
            ("happy", 0.72, 1550, true),
            ("happy", 0.90, 3049, false),
            ("happy", 0.90, 3050, true),
        ];

        for (label, score, offset, expected) in steps {
            assert_eq!(
                gate.offer(label, score, t0 + ms(offset)),
                expected,
                "{} {} at {}ms",
                label,
                score,
                offset
            );
        }
        assert_eq!(gate.last_label(), Some("happy"));
    }

    #[test]
    fn test_below_threshold_never_emits() {
        let t0 = Instant::now();
        let mut gate = EmissionGate::new();
        assert!(!gate.offer("happy", 0.5, t0));
        assert!(!gate.offer("sad", 0.7199, t0 + ms(5000)));
        assert!(!gate.offer("sad", f32::NAN, t0 + ms(6000)));
        assert_eq!(gate.last_label(), None);
    }

    #[test]
    fn test_reset_clears_cooldown() {
        let t0 = Instant::now();
        let mut gate = EmissionGate::new();
        assert!(gate.offer("neutral", 0.9, t0));
        gate.reset();
        assert_eq!(gate.last_label(), None);
        assert!(gate.offer("neutral", 0.9, t0 + ms(10)));
    }
}
