//! Advice engine — turns a day's mood, expression, weather, tags and memo into a
//! short piece of advice.
//!
//! Mismatches between the self-reported mood and the observed expression are
//! checked first and answered with a dedicated message. Otherwise every signal
//! that applies contributes one line, in a fixed order.

use crate::mood::{MOOD_GOOD, MOOD_NORMAL, MOOD_POOR};
use crate::types::{AdviceInput, EmotionTone, MoodLevel};

pub const HOT_CELSIUS: f64 = 28.0;
pub const COLD_CELSIUS: f64 = 10.0;
pub const LOW_PRESSURE_HPA: f64 = 1005.0;
pub const MEMO_MIN_CHARS: usize = 10;

pub const TAG_SLEEP: &str = "#睡眠";
pub const TAG_STRESS: &str = "#ストレス";
pub const TAG_WEATHER: &str = "#天候";

const BAD_WEATHER: &[&str] = &["Rain", "Drizzle", "Thunderstorm", "Snow"];

const POSITIVE_EXPRESSIONS: &[&str] = &["happy", "surprised"];
const NEGATIVE_EXPRESSIONS: &[&str] = &["sad", "angry", "disgusted", "fearful"];
const NEUTRAL_EXPRESSIONS: &[&str] = &["neutral"];

pub const DEFAULT_ADVICE: &str = "今日も良い1日になりますように。";

// ── Mismatch templates ──

const LOW_POSITIVE: [&str; 2] = [
    "表情は明るいのに、気分は沈み気味のようですね。",
    "無理に元気を出そうとせず、まずは深呼吸して一度休憩してみましょう。",
];
const LOW_POSITIVE_WEATHER: &str = "天候の影響で気分が落ちているだけかもしれません。";
const LOW_POSITIVE_HIDDEN: &str = "周りには元気に見えても、心は疲れていることもあります。";

const HIGH_NEGATIVE: [&str; 2] = [
    "気分は良いのに、表情には少し疲れが見えます。",
    "集中しすぎて休憩を忘れていないか、いま一度チェックしてみてください。",
];
const HIGH_NEGATIVE_HEAT: &str = "暑さで体が先に疲れている可能性もあります。";
const HIGH_NEGATIVE_REST: &str = "体は正直なので、少し休むだけでも回復しやすいです。";

const MID_NEGATIVE: [&str; 2] = [
    "気分は普通でも、表情からは少し疲れが見えます。",
    "今日は“やることを減らす日”にして、負荷を軽くしてみましょう。",
];

// ── Checklist lines ──

const LINE_MOOD_POOR: &str = "今日は少し気分が優れないようですね。";
const LINE_MOOD_NORMAL: &str = "今日は落ち着いた1日になりそうです。";
const LINE_MOOD_GOOD: &str = "良い調子ですね！この調子でいきましょう。";
const LINE_TONE_NEGATIVE: &str = "表情から少し疲れやストレスが見えるようです。無理は禁物ですよ。";
const LINE_TONE_POSITIVE: &str = "良い表情です！前向きな気持ちが伝わってきます。";
const LINE_TAG_SLEEP: &str = "睡眠を整えることは体調管理にとても効果的です。";
const LINE_TAG_STRESS: &str = "ストレスを感じやすい日かもしれません。少し休む時間も意識しましょう。";
const LINE_TAG_WEATHER: &str =
    "天気の影響は意外と大きいです。今日は無理せず、調子を整える日にしましょう。";
const LINE_BAD_WEATHER: &str =
    "天候が悪い日は気分が沈みやすい傾向があります。できる範囲で気分転換してみましょう。";
const LINE_HOT: &str = "気温が高めです。水分補給と休憩をこまめに。";
const LINE_COLD: &str = "冷え込みそうです。体を冷やさないようにしましょう。";
const LINE_LOW_PRESSURE: &str = "気圧が低めで体調が崩れやすい日です。無理せず過ごしてくださいね。";
const LINE_MEMO: &str = "メモに書いた内容を優先して、今日は自分にやさしく過ごしましょう。";

impl EmotionTone {
    /// Bucket a raw expression label (case-insensitive).
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return EmotionTone::Unknown;
        };
        let e = raw.to_lowercase();
        if POSITIVE_EXPRESSIONS.contains(&e.as_str()) {
            EmotionTone::Positive
        } else if NEGATIVE_EXPRESSIONS.contains(&e.as_str()) {
            EmotionTone::Negative
        } else if NEUTRAL_EXPRESSIONS.contains(&e.as_str()) {
            EmotionTone::Neutral
        } else {
            EmotionTone::Unknown
        }
    }
}

/// Exact, case-sensitive match against the OpenWeather categories that tend to
/// pull mood down.
pub fn is_bad_weather(condition: &str) -> bool {
    BAD_WEATHER.contains(&condition)
}

fn is_low_pressure(pressure: Option<f64>) -> bool {
    pressure.is_some_and(|p| p <= LOW_PRESSURE_HPA)
}

fn is_hot(temperature: Option<f64>) -> bool {
    temperature.is_some_and(|t| t >= HOT_CELSIUS)
}

fn is_cold(temperature: Option<f64>) -> bool {
    temperature.is_some_and(|t| t <= COLD_CELSIUS)
}

fn has_tag(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| t == tag)
}

/// Mood/expression combinations that get a dedicated message instead of the
/// checklist.
fn mismatch(input: &AdviceInput, mood: MoodLevel, tone: EmotionTone) -> Option<Vec<&'static str>> {
    let weather = &input.weather;
    match (mood, tone) {
        (MoodLevel::Low, EmotionTone::Positive) => {
            let extra = if is_bad_weather(&weather.condition) || is_low_pressure(weather.pressure) {
                LOW_POSITIVE_WEATHER
            } else {
                LOW_POSITIVE_HIDDEN
            };
            Some(vec![LOW_POSITIVE[0], LOW_POSITIVE[1], extra])
        }
        (MoodLevel::High, EmotionTone::Negative) => {
            let extra = if is_hot(weather.temperature) {
                HIGH_NEGATIVE_HEAT
            } else {
                HIGH_NEGATIVE_REST
            };
            Some(vec![HIGH_NEGATIVE[0], HIGH_NEGATIVE[1], extra])
        }
        (MoodLevel::Mid, EmotionTone::Negative) => Some(MID_NEGATIVE.to_vec()),
        _ => None,
    }
}

fn checklist(input: &AdviceInput, tone: EmotionTone) -> Vec<&'static str> {
    let weather = &input.weather;
    let mut lines = Vec::new();

    match input.mood_raw.as_str() {
        MOOD_POOR => lines.push(LINE_MOOD_POOR),
        MOOD_NORMAL => lines.push(LINE_MOOD_NORMAL),
        MOOD_GOOD => lines.push(LINE_MOOD_GOOD),
        _ => {}
    }

    match tone {
        EmotionTone::Negative => lines.push(LINE_TONE_NEGATIVE),
        EmotionTone::Positive => lines.push(LINE_TONE_POSITIVE),
        _ => {}
    }

    if has_tag(&input.activity_tags, TAG_SLEEP) {
        lines.push(LINE_TAG_SLEEP);
    }
    if has_tag(&input.activity_tags, TAG_STRESS) {
        lines.push(LINE_TAG_STRESS);
    }
    if has_tag(&input.activity_tags, TAG_WEATHER) {
        lines.push(LINE_TAG_WEATHER);
    }

    if is_bad_weather(&weather.condition) {
        lines.push(LINE_BAD_WEATHER);
    }
    if is_hot(weather.temperature) {
        lines.push(LINE_HOT);
    }
    if is_cold(weather.temperature) {
        lines.push(LINE_COLD);
    }
    if is_low_pressure(weather.pressure) {
        lines.push(LINE_LOW_PRESSURE);
    }

    if input.memo.trim().chars().count() >= MEMO_MIN_CHARS {
        lines.push(LINE_MEMO);
    }

    lines
}

/// Build the day's advice. Always returns non-empty text.
pub fn generate_advice(input: &AdviceInput) -> String {
    let mood = MoodLevel::classify(&input.mood_raw);
    let tone = EmotionTone::classify(input.emotion_raw.as_deref());

    if let Some(lines) = mismatch(input, mood, tone) {
        return lines.join(" ");
    }

    let lines = checklist(input, tone);
    if lines.is_empty() {
        DEFAULT_ADVICE.to_string()
    } else {
        lines.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WeatherSnapshot;

    fn input(mood: &str, emotion: Option<&str>) -> AdviceInput {
        AdviceInput {
            mood_raw: mood.to_string(),
            emotion_raw: emotion.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_total_on_empty_input() {
        let advice = generate_advice(&AdviceInput::default());
        assert_eq!(advice, DEFAULT_ADVICE);
    }

    #[test]
    fn test_total_on_odd_strings() {
        let odd = AdviceInput {
            mood_raw: "\u{0}???".into(),
            activity_tags: vec!["".into(), "#".into()],
            emotion_raw: Some("".into()),
            memo: "   ".into(),
            weather: WeatherSnapshot {
                temperature: Some(f64::NAN),
                pressure: Some(f64::INFINITY),
                condition: "rain".into(),
            },
        };
        assert!(!generate_advice(&odd).is_empty());
    }

    #[test]
    fn test_emotion_tone_classify() {
        assert_eq!(EmotionTone::classify(None), EmotionTone::Unknown);
        assert_eq!(EmotionTone::classify(Some("HAPPY")), EmotionTone::Positive);
        assert_eq!(EmotionTone::classify(Some("Surprised")), EmotionTone::Positive);
        assert_eq!(EmotionTone::classify(Some("fearful")), EmotionTone::Negative);
        assert_eq!(EmotionTone::classify(Some("Neutral")), EmotionTone::Neutral);
        assert_eq!(EmotionTone::classify(Some("confused")), EmotionTone::Unknown);
    }

    #[test]
    fn test_bad_weather_exact_match() {
        assert!(is_bad_weather("Rain"));
        assert!(is_bad_weather("Drizzle"));
        assert!(is_bad_weather("Thunderstorm"));
        assert!(is_bad_weather("Snow"));
        assert!(!is_bad_weather("rain"));
        assert!(!is_bad_weather("RAIN"));
        assert!(!is_bad_weather("Rai"));
        assert!(!is_bad_weather("Rainy"));
        assert!(!is_bad_weather(" Rain"));
        assert!(!is_bad_weather("Clear"));
        assert!(!is_bad_weather(""));
    }

    #[test]
    fn test_low_positive_ignores_tags_and_memo() {
        let mut data = input("不調", Some("happy"));
        data.activity_tags = vec![TAG_SLEEP.into(), TAG_STRESS.into()];
        data.memo = "とても長いメモを書きました。今日は色々ありました。".into();
        data.weather.temperature = Some(35.0);

        let expected = [LOW_POSITIVE[0], LOW_POSITIVE[1], LOW_POSITIVE_HIDDEN].join(" ");
        assert_eq!(generate_advice(&data), expected);
    }

    #[test]
    fn test_low_positive_blames_weather() {
        let mut data = input("不調", Some("surprised"));
        data.weather.condition = "Drizzle".into();
        assert!(generate_advice(&data).ends_with(LOW_POSITIVE_WEATHER));

        let mut data = input("不調", Some("happy"));
        data.weather.pressure = Some(1005.0);
        assert!(generate_advice(&data).ends_with(LOW_POSITIVE_WEATHER));

        data.weather.pressure = Some(1005.1);
        assert!(generate_advice(&data).ends_with(LOW_POSITIVE_HIDDEN));
    }

    #[test]
    fn test_high_negative_heat() {
        let mut data = input("良好", Some("sad"));
        data.weather.temperature = Some(28.0);
        let expected = [HIGH_NEGATIVE[0], HIGH_NEGATIVE[1], HIGH_NEGATIVE_HEAT].join(" ");
        assert_eq!(generate_advice(&data), expected);

        data.weather.temperature = Some(27.9);
        assert!(generate_advice(&data).ends_with(HIGH_NEGATIVE_REST));

        data.weather.temperature = None;
        assert!(generate_advice(&data).ends_with(HIGH_NEGATIVE_REST));
    }

    #[test]
    fn test_mid_negative_fixed() {
        let mut data = input("普通", Some("angry"));
        data.activity_tags = vec![TAG_WEATHER.into()];
        assert_eq!(generate_advice(&data), MID_NEGATIVE.join(" "));

        // Unknown mood labels are mid too
        let data = input("so-so", Some("disgusted"));
        assert_eq!(generate_advice(&data), MID_NEGATIVE.join(" "));
    }

    #[test]
    fn test_checklist_ordering() {
        let data = AdviceInput {
            mood_raw: "普通".into(),
            activity_tags: vec![TAG_SLEEP.into()],
            emotion_raw: None,
            memo: "0123456789ab".into(),
            weather: WeatherSnapshot {
                temperature: Some(30.0),
                pressure: Some(1000.0),
                condition: String::new(),
            },
        };
        assert_eq!(data.memo.chars().count(), 12);

        let advice = generate_advice(&data);
        let expected = [
            LINE_MOOD_NORMAL,
            LINE_TAG_SLEEP,
            LINE_HOT,
            LINE_LOW_PRESSURE,
            LINE_MEMO,
        ]
        .join(" ");
        assert_eq!(advice, expected);
        assert!(!advice.contains(LINE_COLD));
        assert!(!advice.contains(MID_NEGATIVE[0]));
        assert!(!advice.contains(LOW_POSITIVE[0]));
        assert!(!advice.contains(HIGH_NEGATIVE[0]));
    }

    #[test]
    fn test_default_sentence() {
        let mut data = input("普通", None);
        data.memo = "短いメモ".into();
        // 普通 always contributes its mood line, so the checklist is never empty
        assert_eq!(generate_advice(&data), LINE_MOOD_NORMAL);

        let mut data = input("", Some("neutral"));
        data.memo = "short".into();
        assert_eq!(generate_advice(&data), DEFAULT_ADVICE);
    }

    #[test]
    fn test_positive_tone_line_with_good_mood() {
        let data = input("良好", Some("happy"));
        assert_eq!(
            generate_advice(&data),
            [LINE_MOOD_GOOD, LINE_TONE_POSITIVE].join(" ")
        );
    }

    #[test]
    fn test_weather_lines() {
        let mut data = input("", None);
        data.weather = WeatherSnapshot {
            temperature: Some(10.0),
            pressure: Some(1013.0),
            condition: "Snow".into(),
        };
        assert_eq!(
            generate_advice(&data),
            [LINE_BAD_WEATHER, LINE_COLD].join(" ")
        );
    }

    #[test]
    fn test_memo_is_trimmed_before_counting() {
        let mut data = input("", None);
        data.memo = "   123456789   ".into();
        assert_eq!(generate_advice(&data), DEFAULT_ADVICE);
        data.memo = "  1234567890 ".into();
        assert_eq!(generate_advice(&data), LINE_MEMO);
    }
}
