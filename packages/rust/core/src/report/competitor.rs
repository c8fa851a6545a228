//! Social media competitor analysis: one generator call, one log row.

use serde::{Deserialize, Serialize};
use socialsync_shared::{Result, SocialSyncError};
use socialsync_storage::{CompetitorLog, Storage};
use tracing::{info, instrument, warn};

use super::insights::extract_key_insights;
use super::{ReportGenerator, ReportRequest};

const SYSTEM_PROMPT: &str = "You are an expert social media competitive intelligence analyst \
with deep knowledge of platform strategies, content marketing, and digital engagement across \
industries. Provide comprehensive, data-driven analysis with specific actionable recommendations.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorInput {
    pub company: String,
    pub industry: String,
    pub competitor: String,
}

impl CompetitorInput {
    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("company", &self.company),
            ("industry", &self.industry),
            ("competitor", &self.competitor),
        ] {
            if value.trim().is_empty() {
                return Err(SocialSyncError::validation(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompetitorOutput {
    pub report: String,
    pub analysis_summary: String,
    pub key_insights: Vec<String>,
}

/// Generate a competitor report and append it to the competitor log.
///
/// A missing store or a failed insert is logged and does not fail the call;
/// the report is still returned.
#[instrument(skip_all, fields(company = %input.company, competitor = %input.competitor))]
pub async fn run_competitor_analysis(
    generator: &dyn ReportGenerator,
    store: Option<&Storage>,
    input: &CompetitorInput,
    model: &str,
    max_tokens: u32,
) -> Result<CompetitorOutput> {
    input.validate()?;

    let request = ReportRequest {
        model: model.to_string(),
        system: SYSTEM_PROMPT.to_string(),
        prompt: competitor_prompt(input),
        max_tokens,
    };
    let report = generator.generate(&request).await?;

    let key_insights =
        extract_key_insights(&report, &input.company, &input.industry, &input.competitor);
    let analysis_summary = format!(
        "Completed comprehensive social media competitive analysis of {} in the {} industry \
         for {}. Analysis covered platform presence, content strategy, engagement metrics, \
         competitive positioning, and strategic recommendations with actionable timelines.",
        input.competitor, input.industry, input.company
    );

    match store {
        Some(store) => {
            let log = CompetitorLog {
                company: input.company.clone(),
                industry: input.industry.clone(),
                competitor: input.competitor.clone(),
                report: report.clone(),
            };
            match store.insert_competitor_log(&log).await {
                Ok(id) => info!(id, "competitor analysis report stored"),
                Err(e) => warn!(error = %e, "failed to insert competitor analysis report"),
            }
        }
        None => warn!("no store available, competitor report not persisted"),
    }

    Ok(CompetitorOutput {
        report,
        analysis_summary,
        key_insights,
    })
}

fn competitor_prompt(input: &CompetitorInput) -> String {
    let CompetitorInput {
        company,
        industry,
        competitor,
    } = input;
    format!(
        "Conduct a comprehensive social media competitor analysis of {competitor} for {company} \
in the {industry} industry.

Provide a detailed analysis covering ALL of the following areas:

## 1. PLATFORM IDENTIFICATION & PRESENCE
- Identify the most relevant social media platforms for this industry
- Analyze {competitor}'s presence on each platform (followers, posting frequency, verification status)
- Rank platform importance and effectiveness for this competitor

## 2. SOCIAL MEDIA PRESENCE ANALYSIS
- Account sizes and growth trends across platforms
- Posting frequency and timing patterns
- Visual identity and brand consistency
- Content formats and types used

## 3. CONTENT STRATEGY ANALYSIS
- Main content pillars and themes
- Brand voice, tone, and storytelling approach
- Balance of promotional vs. value-based content
- Top-performing content types and examples

## 4. ENGAGEMENT METRICS & COMMUNITY
- Average engagement rates by platform and content type
- Audience response patterns and sentiment
- Community management and customer service on social platforms

## 5. COMPETITIVE POSITIONING
- {competitor}'s social media strengths and weaknesses
- How {company} can differentiate on social platforms
- Content gaps and underserved audience segments
- Platform-specific opportunities for {company}

## 6. STRATEGIC RECOMMENDATIONS
Provide actionable recommendations organized by timeline:
- Quick wins (implementable within days)
- Short-term tactics (1-3 months)
- Medium-term initiatives (3-6 months)
- Long-term strategic positioning (6+ months)

## 7. MONITORING FRAMEWORK
- Key metrics to track for ongoing competitive intelligence
- Social listening priorities and keywords
- Frequency and methods for monitoring competitor activities

Format your response as a comprehensive report with clear headings, bullet points, and \
specific actionable insights. Include numerical data and metrics wherever possible."
    )
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::report::testing::ScriptedGenerator;

    fn input() -> CompetitorInput {
        CompetitorInput {
            company: "Acme".into(),
            industry: "Outdoor gear".into(),
            competitor: "Globex".into(),
        }
    }

    async fn temp_store() -> Storage {
        let path = std::env::temp_dir().join(format!("ss_competitor_{}.db", Uuid::now_v7()));
        Storage::open(&path).await.unwrap()
    }

    #[tokio::test]
    async fn report_is_returned_and_logged() {
        let store = temp_store().await;
        let generator = ScriptedGenerator::ok(
            "## Positioning\n\
             - Strength: Globex has a loyal hiking community on Instagram\n\
             - Weakness: Globex rarely answers product questions in comments\n\
             - Opportunity: Acme can publish weekly trail guides on Facebook\n",
        );

        let out = run_competitor_analysis(
            &generator,
            Some(&store),
            &input(),
            "perplexity/sonar-reasoning",
            6000,
        )
        .await
        .expect("analysis");

        assert!(out.report.starts_with("## Positioning"));
        assert_eq!(out.key_insights.len(), 3);
        assert!(out.key_insights[0].starts_with("Strength: globex"));
        assert!(out.analysis_summary.contains("Globex"));
        assert!(out.analysis_summary.contains("Outdoor gear"));

        let logs = store.list_competitor_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].entry.report, out.report);

        let calls = generator.calls.lock().unwrap();
        assert_eq!(calls[0].model, "perplexity/sonar-reasoning");
        assert!(calls[0].prompt.contains("Globex's social media strengths"));
    }

    #[tokio::test]
    async fn sparse_report_uses_fallback_insights() {
        let generator = ScriptedGenerator::ok("Nothing notable.");
        let out = run_competitor_analysis(&generator, None, &input(), "m", 100)
            .await
            .expect("analysis");
        assert_eq!(out.key_insights.len(), 5);
        assert!(out.key_insights[2].contains("Acme"));
    }

    #[tokio::test]
    async fn generator_failure_propagates() {
        let generator = ScriptedGenerator::failing("quota exceeded");
        let err = run_competitor_analysis(&generator, None, &input(), "m", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, SocialSyncError::Report(_)));
    }

    #[tokio::test]
    async fn blank_input_is_rejected_before_generation() {
        let generator = ScriptedGenerator::ok("unused");
        let mut bad = input();
        bad.industry = "  ".into();
        let err = run_competitor_analysis(&generator, None, &bad, "m", 100)
            .await
            .unwrap_err();
        assert!(matches!(err, SocialSyncError::Validation { .. }));
        assert_eq!(generator.call_count(), 0);
    }
}
