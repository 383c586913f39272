//! Mood slider mapping — slider value to mood label and circle colour.

use crate::types::MoodLevel;

pub const SLIDER_MIN: f64 = 1.0;
pub const SLIDER_MAX: f64 = 5.0;
pub const DEFAULT_SLIDER: f64 = 3.0;

/// Circle colour shown before anything is recorded for the day.
pub const DEFAULT_COLOR: &str = "#F2F2F2";

pub const MOOD_POOR: &str = "不調";
pub const MOOD_NORMAL: &str = "普通";
pub const MOOD_GOOD: &str = "良好";

const GRADIENT_START: [f64; 3] = [138.0, 159.0, 238.0];
const GRADIENT_MID: [f64; 3] = [242.0, 242.0, 242.0];
const GRADIENT_END: [f64; 3] = [247.0, 119.0, 166.0];

/// Raw mood label for a slider position.
pub fn mood_label(slider: f64) -> &'static str {
    if slider <= 1.5 {
        MOOD_POOR
    } else if slider <= 3.0 {
        MOOD_NORMAL
    } else {
        MOOD_GOOD
    }
}

impl MoodLevel {
    /// Bucket a raw mood label. Unrecognised labels land in `Mid`.
    pub fn classify(raw: &str) -> Self {
        match raw {
            MOOD_POOR => MoodLevel::Low,
            MOOD_GOOD => MoodLevel::High,
            _ => MoodLevel::Mid,
        }
    }

    pub fn from_slider(slider: f64) -> Self {
        Self::classify(mood_label(slider))
    }
}

/// Colour for the mood circle: blue at the low end, grey in the middle, pink at
/// the high end.
pub fn circle_color(slider: f64) -> String {
    let ratio = ((slider - SLIDER_MIN) / (SLIDER_MAX - SLIDER_MIN)).clamp(0.0, 1.0);

    let (from, to, t) = if ratio <= 0.5 {
        (GRADIENT_START, GRADIENT_MID, ratio / 0.5)
    } else {
        (GRADIENT_MID, GRADIENT_END, (ratio - 0.5) / 0.5)
    };

    let lerp = |a: f64, b: f64| (a + (b - a) * t + 0.5).floor() as u8;
    format!(
        "rgb({}, {}, {})",
        lerp(from[0], to[0]),
        lerp(from[1], to[1]),
        lerp(from[2], to[2])
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mood_label_thresholds() {
        assert_eq!(mood_label(1.0), "不調");
        assert_eq!(mood_label(1.5), "不調");
        assert_eq!(mood_label(1.51), "普通");
        assert_eq!(mood_label(3.0), "普通");
        assert_eq!(mood_label(3.01), "良好");
        assert_eq!(mood_label(5.0), "良好");
    }

    #[test]
    fn test_classify_unknown_is_mid() {
        assert_eq!(MoodLevel::classify("不調"), MoodLevel::Low);
        assert_eq!(MoodLevel::classify("良好"), MoodLevel::High);
        assert_eq!(MoodLevel::classify("普通"), MoodLevel::Mid);
        assert_eq!(MoodLevel::classify("whatever"), MoodLevel::Mid);
        assert_eq!(MoodLevel::classify(""), MoodLevel::Mid);
    }

    #[test]
    fn test_circle_color_endpoints() {
        assert_eq!(circle_color(1.0), "rgb(138, 159, 238)");
        assert_eq!(circle_color(3.0), "rgb(242, 242, 242)");
        assert_eq!(circle_color(5.0), "rgb(247, 119, 166)");
    }

    #[test]
    fn test_circle_color_clamps_out_of_range() {
        assert_eq!(circle_color(-4.0), circle_color(1.0));
        assert_eq!(circle_color(9.0), circle_color(5.0));
    }

    #[test]
    fn test_circle_color_midpoint_of_lower_half() {
        // ratio 0.25 -> halfway between start and mid
        assert_eq!(circle_color(2.0), "rgb(190, 201, 240)");
    }
}
