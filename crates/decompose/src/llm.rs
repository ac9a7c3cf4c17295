use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{normalize_queries, DecomposeConfig, DecomposeError, QueryDecomposer};

/// LLM-backed decomposition over an OpenAI-compatible chat endpoint.
///
/// All failure handling lives here: transport errors, non-2xx statuses, and
/// unusable completions all downgrade to the identity split inside
/// [`decompose`](QueryDecomposer::decompose), logged but never propagated.
pub struct LlmDecomposer {
    http: reqwest::Client,
    cfg: DecomposeConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

const SYSTEM_PROMPT: &str = "You are a certified ICD-10 coding specialist. \
From clinical narrative you extract only the distinct diagnostic entities \
that would be coded, phrased in official ICD-10 terminology.";

impl LlmDecomposer {
    /// Build the LLM strategy. Fails only on inconsistent configuration;
    /// the endpoint is not contacted here.
    pub fn new(cfg: DecomposeConfig) -> Result<Self, DecomposeError> {
        cfg.validate()?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| DecomposeError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { http, cfg })
    }

    async fn refine(&self, text: &str) -> Result<Vec<String>, DecomposeError> {
        let prompt = build_prompt(text);
        let request = ChatRequest {
            model: &self.cfg.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.0,
            max_tokens: 256,
        };

        let base = self
            .cfg
            .api_url
            .as_deref()
            .ok_or_else(|| DecomposeError::InvalidConfig("api_url missing".into()))?;
        let url = format!("{}/v1/chat/completions", base.trim_end_matches('/'));

        let mut req = self.http.post(&url).json(&request);
        if let Some(key) = self.cfg.api_key.as_deref() {
            req = req.header("Authorization", format!("Bearer {key}"));
        }

        let response = req
            .send()
            .await
            .map_err(|e| DecomposeError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DecomposeError::Request(format!("HTTP {status}: {body}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| DecomposeError::Response(format!("invalid JSON: {e}")))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| DecomposeError::Response("completion had no choices".into()))?;

        Ok(parse_phrases(content))
    }
}

#[async_trait]
impl QueryDecomposer for LlmDecomposer {
    async fn decompose(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        match self.refine(trimmed).await {
            Ok(queries) if !queries.is_empty() => {
                tracing::debug!(count = queries.len(), "clinical text decomposed");
                queries
            }
            Ok(_) => {
                tracing::debug!("completion yielded no phrases; using whole text");
                vec![trimmed.to_string()]
            }
            Err(err) => {
                tracing::warn!(error = %err, "query decomposition failed; using whole text");
                vec![trimmed.to_string()]
            }
        }
    }

    fn strategy(&self) -> &'static str {
        "llm"
    }
}

fn build_prompt(clinical_text: &str) -> String {
    format!(
        "From the clinical interpretation below, extract the distinct diagnostic \
entities that would each receive an ICD-10 code.\n\
\n\
Rules:\n\
1. Use official ICD-10 phrasing (e.g., \"Calculus of gallbladder\", \"Fatty liver\").\n\
2. Merge findings that describe a single condition into one canonical phrase.\n\
3. Skip organ descriptions, qualifiers, and incidental findings that are not \
billable diagnoses on their own.\n\
4. Output one phrase per line. No numbering, no bullets, no commentary.\n\
\n\
Clinical interpretation:\n\
{clinical_text}\n\
\n\
Output:"
    )
}

/// Turn completion text into candidate phrases: one per line, bullets and
/// trailing periods stripped, then the shared trim/dedup/cap pass.
fn parse_phrases(content: &str) -> Vec<String> {
    normalize_queries(content.lines().map(|line| {
        line.trim_matches(|c: char| c == '-' || c == '•' || c == '*' || c.is_whitespace())
            .trim_end_matches('.')
            .to_string()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_SUB_QUERIES;

    #[test]
    fn parses_one_phrase_per_line() {
        let phrases = parse_phrases("Calculus of gallbladder\nFatty liver\n");
        assert_eq!(phrases, vec!["Calculus of gallbladder", "Fatty liver"]);
    }

    #[test]
    fn strips_bullets_and_trailing_periods() {
        let phrases = parse_phrases("- Acute cholecystitis.\n• Hydronephrosis\n* Fatty liver.");
        assert_eq!(
            phrases,
            vec!["Acute cholecystitis", "Hydronephrosis", "Fatty liver"]
        );
    }

    #[test]
    fn drops_blank_lines_and_duplicates() {
        let phrases = parse_phrases("Cough\n\n   \ncough\nFever");
        assert_eq!(phrases, vec!["Cough", "Fever"]);
    }

    #[test]
    fn caps_the_number_of_phrases() {
        let content = (0..12)
            .map(|i| format!("Condition number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_phrases(&content).len(), MAX_SUB_QUERIES);
    }

    #[test]
    fn prompt_embeds_the_clinical_text() {
        let prompt = build_prompt("gallstones with wall thickening");
        assert!(prompt.contains("gallstones with wall thickening"));
        assert!(prompt.contains("one phrase per line"));
    }

    #[test]
    fn construction_requires_a_url() {
        let result = LlmDecomposer::new(DecomposeConfig::default());
        assert!(matches!(result, Err(DecomposeError::InvalidConfig(_))));
    }
}
