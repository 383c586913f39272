//! Self-check questionnaires — two yes/no checklists scored by how many items
//! were ticked.

use serde::{Deserialize, Serialize};

use crate::types::{DiagnosisEntry, UserDocument};

/// Entries kept per questionnaire, newest first.
pub const HISTORY_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosisKind {
    Mental,
    Action,
}

impl DiagnosisKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mental" => Some(DiagnosisKind::Mental),
            "action" => Some(DiagnosisKind::Action),
            _ => None,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            DiagnosisKind::Mental => "メンタル編",
            DiagnosisKind::Action => "行動編",
        }
    }

    pub fn questions(&self) -> &'static [&'static str] {
        match self {
            DiagnosisKind::Mental => &MENTAL_QUESTIONS,
            DiagnosisKind::Action => &ACTION_QUESTIONS,
        }
    }

    pub fn history<'a>(&self, doc: &'a UserDocument) -> &'a [DiagnosisEntry] {
        match self {
            DiagnosisKind::Mental => &doc.diagnosis_mental,
            DiagnosisKind::Action => &doc.diagnosis_action,
        }
    }

    pub fn history_mut<'a>(&self, doc: &'a mut UserDocument) -> &'a mut Vec<DiagnosisEntry> {
        match self {
            DiagnosisKind::Mental => &mut doc.diagnosis_mental,
            DiagnosisKind::Action => &mut doc.diagnosis_action,
        }
    }
}

impl std::fmt::Display for DiagnosisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosisKind::Mental => write!(f, "mental"),
            DiagnosisKind::Action => write!(f, "action"),
        }
    }
}

pub const MENTAL_QUESTIONS: [&str; 20] = [
    "寝つきが良くない",
    "ちょっとしたことでも気になる",
    "何かよくないことが起こりそうな予感がする",
    "人混みの中で気分が悪くなることがある",
    "緊張すると、手に汗をかいたり、震えたりする",
    "イライラしやすい",
    "職場で緊張することが多い",
    "じっとしていられないくらい落ち着かないときがある",
    "自分は社会から遊離しているように感じる",
    "孤独を感じるときがある",
    "憂鬱になることがある",
    "何もかもがおっくうになる",
    "わけもなく不安になることがある",
    "言いたいことがうまくいえない",
    "自分が自分でないように感じる",
    "電話のベルやドアのノックの音にびくっとすることがある",
    "夜中に目が覚める",
    "外で食事することが苦になる",
    "朝起きると気分が悪い",
    "人前にでると緊張しやすい",
];

pub const ACTION_QUESTIONS: [&str; 20] = [
    "早口で話す",
    "最近アルコールの量が増えた",
    "約束の時間に遅れることが多い",
    "のんびりと時間を過ごすことがない",
    "コーヒーをよく飲む",
    "食事は刺激物を好む",
    "つい食べ過ぎる傾向にある",
    "服装に気を配ることがない",
    "イライラするとたばこを吸う",
    "エスカレーターでじっとしないで歩いてしまう",
    "いつも時間に追われている",
    "近い距離でもタクシーを利用することが多い",
    "毎日、くつろぐ余裕がない",
    "大きな声で話す",
    "昼食の時間が短い",
    "ひとりでお酒を飲むことが増えた",
    "最近たばこの本数が増えた",
    "人の話をさえぎることが多い",
    "駆け込み乗車をすることが多い",
    "2つ以上の仕事を同時に抱えている",
];

const RESULT_MINOR: &str =
    "小さな疲れはあるものの、社会生活のうえでは影響がない程度です。現在の状態を維持するよう心がけましょう。";
const RESULT_AVERAGE: &str =
    "現代人の疲労度としては平均的です。これ以上の疲れをためないよう、リフレッシュしながら、キープしてください。";
const RESULT_ACCUMULATING: &str =
    "このままの状態で疲れをためていくと、身体的な病気を引き起こす可能性があります。生活を見直して本格的な休養を。";
const RESULT_SEVERE: &str =
    "そうとう心が疲れています。すでに日常生活に支障があるのでは。体調がすぐれないようなら、早めに病院で診断を。";

/// Result text for `checked` ticked items. Both questionnaires share the scale.
pub fn diagnose(checked: usize) -> &'static str {
    match checked {
        0..=2 => RESULT_MINOR,
        3..=6 => RESULT_AVERAGE,
        7..=12 => RESULT_ACCUMULATING,
        _ => RESULT_SEVERE,
    }
}

/// Prepend `entry` and drop everything past [`HISTORY_LIMIT`].
pub fn push_history(history: &mut Vec<DiagnosisEntry>, entry: DiagnosisEntry) {
    history.insert(0, entry);
    history.truncate(HISTORY_LIMIT);
}

/// Timestamp stored with each result, local time.
pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y/%m/%d %H:%M:%S").to_string()
}
