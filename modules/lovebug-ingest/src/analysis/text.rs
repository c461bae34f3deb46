use std::sync::LazyLock;

use regex::Regex;

use lovebug_common::Severity;

/// Search keywords driving the ingest runs. Also matched verbatim when
/// extracting keywords from post content.
pub const LOVEBUG_KEYWORDS: &[&str] = &[
    "러브버그",
    "붉은등우단털파리",
    "서울 벌레",
    "빨간벌레",
    "차에 붙은 벌레",
    "파리 떼",
    "벌레 많아",
    "벌레 지옥",
    "플레인 파리",
    "러브버그 습격",
    "벌레 떼거리",
];

// Sentiment lexicons. Lovebug posts skew negative, so the neutral baseline
// sits slightly below zero and positive hits are dampened.
const POSITIVE_WORDS: &[&str] = &["좋다", "괜찮다", "재미있다", "신기하다", "놀랍다"];
const NEGATIVE_WORDS: &[&str] =
    &["싫다", "짜증", "혐오", "더럽다", "역겹다", "끔찍하다", "최악", "지옥"];

// Intensity tiers.
const INTENSITY_HIGH: &[&str] = &["엄청", "완전", "진짜", "대박", "미친", "떼거리", "지옥"];
const INTENSITY_MEDIUM: &[&str] = &["많이", "꽤", "제법", "좀", "조금"];
const INTENSITY_LOW: &[&str] = &["약간", "살짝", "가끔"];

// Severity tiers, checked most severe first.
const SEVERITY_CRITICAL: &[&str] = &["지옥", "떼거리", "엄청", "미친", "완전"];
const SEVERITY_HIGH: &[&str] = &["많아", "진짜", "심해", "대박"];
const SEVERITY_MEDIUM: &[&str] = &["좀", "꽤", "조금"];

// Confidence signals.
const CONFIDENCE_KEYWORDS: &[&str] = &["러브버그", "붉은등우단털파리", "빨간벌레", "차에 붙은"];
const TIME_WORDS: &[&str] = &["지금", "오늘", "방금", "현재", "지금껏"];

// Relevance tiers.
const RELEVANCE_DIRECT: &[&str] = &["러브버그", "붉은등우단털파리"];
const RELEVANCE_INDIRECT: &[&str] = &["빨간벌레", "파리", "벌레", "차에 붙은"];
const RELEVANCE_CONTEXT: &[&str] = &["떼", "많아", "붙어", "달라붙"];

// Bare place-name suffixes (역/구/동/로/거리) used for keyword extraction.
static KEYWORD_PLACE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"([가-힣]+역)",
        r"([가-힣]+구)",
        r"([가-힣]+동)",
        r"([가-힣]+로)",
        r"([가-힣]+거리)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// How strongly the post describes the outbreak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

/// Combined heuristic analysis of one post's text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAnalysis {
    /// -1.0 (negative) to 1.0 (positive).
    pub sentiment: f64,
    pub intensity: Intensity,
    /// How much to trust the extraction, 0.0-1.0.
    pub confidence: f64,
    /// How likely the post is actually about lovebugs, 0.0-1.0.
    pub relevance: f64,
}

/// Run all text heuristics over one post.
pub fn analyze_text(text: &str) -> TextAnalysis {
    TextAnalysis {
        sentiment: sentiment_score(text),
        intensity: intensity_of(text),
        confidence: confidence_score(text),
        relevance: relevance_score(text),
    }
}

fn count_hits(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

fn sentiment_score(text: &str) -> f64 {
    let positive = count_hits(text, POSITIVE_WORDS);
    let negative = count_hits(text, NEGATIVE_WORDS);
    let total_words = text.split_whitespace().count();

    if total_words == 0 {
        return 0.0;
    }

    if negative > positive {
        -(negative as f64 / total_words as f64 * 5.0).min(0.8)
    } else if positive > negative {
        // Positive words rarely mean the bugs are welcome; cap low.
        (positive as f64 / total_words as f64 * 3.0).min(0.3)
    } else {
        -0.2
    }
}

fn intensity_of(text: &str) -> Intensity {
    if count_hits(text, INTENSITY_HIGH) > 0 {
        Intensity::High
    } else if count_hits(text, INTENSITY_MEDIUM) > 0 {
        Intensity::Medium
    } else if count_hits(text, INTENSITY_LOW) > 0 {
        Intensity::Low
    } else {
        Intensity::Medium
    }
}

fn confidence_score(text: &str) -> f64 {
    let mut confidence = 0.5;
    confidence += count_hits(text, CONFIDENCE_KEYWORDS) as f64 * 0.2;
    if crate::analysis::location::has_place_reference(text) {
        confidence += 0.2;
    }
    if count_hits(text, TIME_WORDS) > 0 {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

fn relevance_score(text: &str) -> f64 {
    let relevance = count_hits(text, RELEVANCE_DIRECT) as f64 * 0.4
        + count_hits(text, RELEVANCE_INDIRECT) as f64 * 0.2
        + count_hits(text, RELEVANCE_CONTEXT) as f64 * 0.1;
    relevance.min(1.0)
}

/// Map post text to a severity level via keyword tiers.
///
/// The intensity fallback only fires when no tier keyword is present; the
/// high-intensity lexicon currently overlaps the critical/high tiers, so it
/// matters only if the lexicons drift apart.
pub fn classify_severity(text: &str, analysis: &TextAnalysis) -> Severity {
    if count_hits(text, SEVERITY_CRITICAL) > 0 {
        Severity::Critical
    } else if count_hits(text, SEVERITY_HIGH) > 0 {
        Severity::High
    } else if count_hits(text, SEVERITY_MEDIUM) > 0 {
        Severity::Medium
    } else if analysis.intensity == Intensity::High {
        Severity::High
    } else {
        Severity::Low
    }
}

/// Lovebug keyword hits plus place names, deduplicated, input order preserved.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();

    for keyword in LOVEBUG_KEYWORDS {
        if text.contains(keyword) && !keywords.iter().any(|k| k == keyword) {
            keywords.push(keyword.to_string());
        }
    }

    for re in KEYWORD_PLACE_RES.iter() {
        for cap in re.captures_iter(text) {
            let name = cap[1].to_string();
            if !keywords.contains(&name) {
                keywords.push(name);
            }
        }
    }

    keywords
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_keyword_tiers() {
        let a = analyze_text("강남역에 벌레 지옥이에요");
        assert_eq!(classify_severity("강남역에 벌레 지옥이에요", &a), Severity::Critical);

        let a = analyze_text("벌레 진짜 심해요");
        assert_eq!(classify_severity("벌레 진짜 심해요", &a), Severity::High);

        let a = analyze_text("벌레가 좀 있네요");
        assert_eq!(classify_severity("벌레가 좀 있네요", &a), Severity::Medium);

        let a = analyze_text("벌레 보임");
        assert_eq!(classify_severity("벌레 보임", &a), Severity::Low);
    }

    #[test]
    fn sentiment_skews_negative() {
        let negative = sentiment_score("러브버그 짜증 혐오 최악");
        assert!(negative < 0.0, "expected negative: {negative}");
        assert!(negative >= -0.8);

        let positive = sentiment_score("러브버그 신기하다");
        assert!(positive > 0.0, "expected positive: {positive}");
        assert!(positive <= 0.3);

        // No sentiment words at all: slightly negative baseline.
        assert_eq!(sentiment_score("벌레 있음"), -0.2);
        // Empty text is neutral.
        assert_eq!(sentiment_score(""), 0.0);
    }

    #[test]
    fn intensity_tiers() {
        assert_eq!(intensity_of("벌레 엄청 많아"), Intensity::High);
        assert_eq!(intensity_of("벌레 많이 있음"), Intensity::Medium);
        assert_eq!(intensity_of("벌레 약간 있음"), Intensity::Low);
        assert_eq!(intensity_of("벌레"), Intensity::Medium);
    }

    #[test]
    fn confidence_accumulates_signals() {
        // Base only.
        assert!((confidence_score("아무 내용") - 0.5).abs() < 1e-9);
        // Keyword + location + time, capped at 1.0.
        let c = confidence_score("지금 강남역에서 러브버그 봤어요");
        assert!(c > 0.9, "expected high confidence: {c}");
        assert!(c <= 1.0);
    }

    #[test]
    fn relevance_tiers() {
        assert!(relevance_score("러브버그 붉은등우단털파리") >= 0.8);
        assert!(relevance_score("파리 떼 달라붙") > 0.0);
        assert_eq!(relevance_score("날씨 좋네요"), 0.0);
    }

    #[test]
    fn keywords_deduplicated_in_order() {
        let kws = extract_keywords("강남역에서 러브버그, 또 강남역에서 러브버그");
        assert_eq!(kws.iter().filter(|k| *k == "러브버그").count(), 1);
        assert_eq!(kws.iter().filter(|k| *k == "강남역").count(), 1);
        assert_eq!(kws[0], "러브버그");
    }
}
