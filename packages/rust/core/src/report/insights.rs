//! Key-insight extraction from a free-form competitor report.

use std::sync::LazyLock;

use regex::Regex;

const INSIGHT_KEYWORDS: [&str; 7] = [
    "strength",
    "weakness",
    "opportunity",
    "threat",
    "advantage",
    "gap",
    "recommendation",
];

const MAX_INSIGHTS: usize = 5;
const MIN_INSIGHTS: usize = 3;

/// Pull up to five keyword-bearing lines out of `report`.
///
/// Lines are lower-cased and trimmed, kept when they mention a keyword and
/// are between 21 and 149 characters, then stripped of bullet markers and
/// capitalised. Fewer than three hits falls back to a fixed list built from
/// the analysis inputs.
pub fn extract_key_insights(
    report: &str,
    company: &str,
    industry: &str,
    competitor: &str,
) -> Vec<String> {
    let mut insights: Vec<String> = Vec::new();

    for line in report.lines() {
        let line = line.trim().to_lowercase();
        let len = line.chars().count();
        if len <= 20 || len >= 150 {
            continue;
        }
        if !INSIGHT_KEYWORDS.iter().any(|k| line.contains(k)) {
            continue;
        }

        let cleaned = strip_bullets(&line);
        if cleaned.is_empty() {
            continue;
        }
        let insight = capitalize(&cleaned);
        if !insights.contains(&insight) {
            insights.push(insight);
        }
        if insights.len() >= MAX_INSIGHTS {
            break;
        }
    }

    if insights.len() < MIN_INSIGHTS {
        return fallback_insights(company, industry, competitor);
    }
    insights
}

fn strip_bullets(line: &str) -> String {
    static EDGE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[-•*+\s]+|[-•*+\s]+$").expect("valid regex"));
    EDGE_RE.replace_all(line, "").trim().to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn fallback_insights(company: &str, industry: &str, competitor: &str) -> Vec<String> {
    vec![
        format!("Comprehensive social media analysis of {competitor} completed"),
        format!("Platform presence and content strategy evaluated for {industry} industry"),
        format!("Strategic recommendations developed for {company}'s competitive positioning"),
        "Engagement metrics and community building approaches analyzed".to_string(),
        "Monitoring framework established for ongoing competitive intelligence".to_string(),
    ]
}
