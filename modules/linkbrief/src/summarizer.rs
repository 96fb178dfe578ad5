use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use openrouter_client::{ChatRequest, OpenRouter, WireMessage};

use crate::cache::{cache_key, CacheStore};
use crate::retry::{with_backoff, BackoffPolicy};
use crate::types::JudgmentResult;

/// What the model returns for one page.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Judgment {
    /// Whether the page contains substantial real content (as opposed to
    /// navigation boilerplate, error pages, or anti-bot walls).
    pub is_meaningful: bool,
    /// Exactly three sentences when `is_meaningful`, otherwise empty.
    pub summary: String,
}

/// Judgment collaborator seam (mockable in tests).
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    async fn judge(&self, text: &str, label: &str) -> Result<Judgment>;
}

const JUDGE_SYSTEM_PROMPT: &str = r#"You will receive text scraped from a web page. Sometimes it is mostly boilerplate (navigation menus, login prompts, error messages, CAPTCHAs, or "unusual traffic" messages). Other times it includes real content (articles, tables, transcripts, etc.).

Your task:
1. Decide if the text contains meaningful page content.
   - If it is mostly boilerplate, navigation, or an error/anti-bot page, treat it as content missing.
   - If it contains substantial real content (even partial), treat it as content present.
2. If content is missing, set is_meaningful to false and summary to an empty string.
3. If content is present, set is_meaningful to true and summary to exactly three sentences summarizing the content.

Rules for the summary:
- Exactly three sentences, no bullet points.
- Do not introduce it with "The text" or "The scraped text" or equivalent. Instead of "The text is a detailed product listing" just say "A detailed product listing"."#;

/// OpenRouter-backed judge.
pub struct OpenRouterJudge {
    client: OpenRouter,
    model: String,
}

impl OpenRouterJudge {
    pub fn new(client: OpenRouter, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl RelevanceJudge for OpenRouterJudge {
    async fn judge(&self, text: &str, label: &str) -> Result<Judgment> {
        let mut user_prompt = String::new();
        if !label.is_empty() {
            user_prompt.push_str(&format!("Page note from the requester: {label}\n\n"));
        }
        user_prompt.push_str(&format!(
            "Here is the scraped text. Analyze it according to the instructions.\n\n\
             SCRAPED TEXT START\n{text}\nSCRAPED TEXT END"
        ));

        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(JUDGE_SYSTEM_PROMPT))
            .message(WireMessage::user(user_prompt))
            .max_tokens(300)
            .temperature(0.0);

        Ok(self.client.extract::<Judgment>(request).await?)
    }
}

fn transient_judge_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<openrouter_client::OpenRouterError>()
        .is_some_and(openrouter_client::OpenRouterError::is_transient)
}

fn is_malformed_response(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<openrouter_client::OpenRouterError>(),
        Some(openrouter_client::OpenRouterError::Malformed(_))
    )
}

/// Cache-first relevance judgment.
///
/// Only well-formed judgments are cached, so a malformed or failed judgment
/// stage retries automatically on the next run (unlike fetch errors, which
/// are cached and need operator intervention).
pub struct RelevanceSummarizer {
    judge: Arc<dyn RelevanceJudge>,
    cache: Arc<dyn CacheStore>,
    policy: BackoffPolicy,
}

impl RelevanceSummarizer {
    pub fn new(judge: Arc<dyn RelevanceJudge>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            judge,
            cache,
            policy: BackoffPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn judge(&self, url: &str, raw_text: &str, label: &str) -> Result<JudgmentResult> {
        let key = cache_key(url);
        if let Some(raw) = self.cache.get(&key).await? {
            match serde_json::from_str::<JudgmentResult>(&raw) {
                Ok(cached) => {
                    debug!(url, "Judgment cache hit");
                    return Ok(cached);
                }
                Err(e) => {
                    warn!(url, error = %e, "Discarding unreadable judgment cache entry");
                }
            }
        }

        // Malformed output gets one retry with the same input; transient
        // transport errors are handled inside the backoff helper.
        let mut judgment = None;
        for attempt in 0..2 {
            match with_backoff(self.policy, "judge", transient_judge_error, || {
                self.judge.judge(raw_text, label)
            })
            .await
            {
                Ok(j) if j.is_meaningful && !is_three_sentences(&j.summary) => {
                    warn!(
                        url,
                        attempt = attempt + 1,
                        summary = %j.summary,
                        "Summary is not exactly three sentences"
                    );
                }
                Ok(j) => {
                    judgment = Some(j);
                    break;
                }
                Err(e) if attempt == 0 && is_malformed_response(&e) => {
                    warn!(url, error = %e, "Malformed judgment response, retrying once");
                }
                Err(e) => return Err(e),
            }
        }

        let Some(judgment) = judgment else {
            bail!("judgment for {url} was malformed after retry");
        };

        let result = JudgmentResult {
            url: url.to_string(),
            is_meaningful: judgment.is_meaningful,
            // Models occasionally emit a stray summary for missing content.
            summary: if judgment.is_meaningful {
                judgment.summary
            } else {
                String::new()
            },
            judged_at: Utc::now(),
        };

        let entry = serde_json::to_string(&result)?;
        self.cache.put(&key, &entry).await?;
        info!(url, is_meaningful = result.is_meaningful, "Page judged");
        Ok(result)
    }
}

/// Whether `text` splits into exactly three sentence-terminated segments.
pub fn is_three_sentences(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let terminated = trimmed
        .trim_end_matches(['"', '\'', ')', ']'])
        .ends_with(['.', '!', '?']);
    terminated && sentence_count(trimmed) == 3
}

/// Count sentence-terminated segments. A run of terminators (`...`, `?!`)
/// counts once, and a `.` inside a number ("4.1") does not terminate.
pub fn sentence_count(text: &str) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut count = 0;
    let mut in_sentence = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if matches!(c, '.' | '!' | '?') && in_sentence {
            let mut j = i + 1;
            while j < chars.len() && matches!(chars[j], '.' | '!' | '?' | '"' | '\'' | ')' | ']') {
                j += 1;
            }
            if j >= chars.len() || chars[j].is_whitespace() {
                count += 1;
                in_sentence = false;
            }
            i = j;
            continue;
        }
        if !c.is_whitespace() {
            in_sentence = true;
        }
        i += 1;
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_plain_sentences() {
        assert_eq!(sentence_count("One. Two. Three."), 3);
        assert_eq!(sentence_count("Only one sentence."), 1);
        assert_eq!(sentence_count(""), 0);
    }

    #[test]
    fn ellipsis_and_double_punctuation_count_once() {
        assert_eq!(sentence_count("Wait... Really?! Yes."), 3);
    }

    #[test]
    fn decimal_numbers_do_not_terminate() {
        assert_eq!(sentence_count("Revenue grew 4.5 percent. Costs fell."), 2);
    }

    #[test]
    fn trailing_quote_is_tolerated() {
        assert!(is_three_sentences(
            "He arrived. She asked why. He said \"because.\""
        ));
    }

    #[test]
    fn three_sentence_validation() {
        assert!(is_three_sentences("One. Two. Three."));
        assert!(!is_three_sentences("One. Two."));
        assert!(!is_three_sentences("One. Two. Three. Four."));
        assert!(!is_three_sentences("One. Two. Three. And a fragment"));
        assert!(!is_three_sentences(""));
    }
}
