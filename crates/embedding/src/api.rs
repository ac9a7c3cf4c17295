use serde_json::{json, Value};

use crate::retry::{execute_with_retry_async, is_retryable_error, RetryConfig};
use crate::{EmbedError, EmbeddingConfig};

#[derive(Clone, Copy)]
enum ProviderKind {
    HuggingFace,
    OpenAi,
    Custom,
}

fn provider_kind(cfg: &EmbeddingConfig) -> ProviderKind {
    let provider = cfg
        .api_provider
        .as_deref()
        .unwrap_or("custom")
        .to_ascii_lowercase();
    match provider.as_str() {
        "hf" | "huggingface" => ProviderKind::HuggingFace,
        "openai" => ProviderKind::OpenAi,
        _ => ProviderKind::Custom,
    }
}

/// Fetch embeddings for `texts` from the configured endpoint, retrying
/// transient failures per the configured policy. Returns one vector per
/// input text, in order.
pub(crate) async fn fetch_embeddings(
    http: &reqwest::Client,
    cfg: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbedError> {
    let url = cfg
        .api_url
        .as_deref()
        .ok_or_else(|| EmbedError::InvalidConfig("api_url is required for api mode".into()))?;

    let payload = build_payload(provider_kind(cfg), texts, cfg);
    let retry_cfg = cfg.retry.unwrap_or_else(RetryConfig::default);

    let outcome = execute_with_retry_async(&retry_cfg, |attempt| {
        let payload = payload.clone();
        async move {
            if attempt > 0 {
                tracing::debug!(attempt, "retrying embedding request");
            }
            match send_request(http, url, cfg, payload).await {
                Ok(response) => Ok(response),
                Err(e) => {
                    let message = e.to_string();
                    if is_retryable_error(&message) {
                        Err(message)
                    } else {
                        Err(format!("non-retryable: {message}"))
                    }
                }
            }
        }
    })
    .await;

    let response = outcome.into_result().map_err(EmbedError::Request)?;
    let vectors = parse_embeddings(response)?;

    if vectors.len() != texts.len() {
        return Err(EmbedError::Inference(format!(
            "endpoint returned {} embeddings for {} inputs",
            vectors.len(),
            texts.len()
        )));
    }
    Ok(vectors)
}

fn build_payload(provider: ProviderKind, texts: &[String], cfg: &EmbeddingConfig) -> Value {
    match provider {
        ProviderKind::HuggingFace => json!({ "inputs": texts }),
        ProviderKind::OpenAi => json!({ "input": texts, "model": cfg.model_name }),
        ProviderKind::Custom => json!({ "texts": texts }),
    }
}

async fn send_request(
    http: &reqwest::Client,
    url: &str,
    cfg: &EmbeddingConfig,
    payload: Value,
) -> Result<Value, EmbedError> {
    let mut request = http.post(url).header("Content-Type", "application/json");
    if let Some(header) = cfg.api_auth_header.as_deref() {
        request = request.header("Authorization", header);
    }

    let response = request
        .json(&payload)
        .send()
        .await
        .map_err(|e| EmbedError::Request(format!("HTTP request failed: {e}")))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(EmbedError::Request(format!("HTTP error {status}: {body}")));
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| EmbedError::Inference(format!("invalid JSON response: {e}")))
}

/// Accepts the response shapes the supported providers actually emit:
/// `{"embeddings": [[..]]}`, OpenAI's `{"data": [{"embedding": [..]}]}`,
/// a bare `[[..], [..]]`, or a single bare vector.
fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_collection(embeddings);
            }
            if let Some(Value::Array(items)) = map.remove("data") {
                let mut vectors = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(mut obj) => match obj.remove("embedding") {
                            Some(embedding) => vectors.push(parse_vector(embedding)?),
                            None => {
                                return Err(EmbedError::Inference(
                                    "missing `embedding` field in data item".into(),
                                ))
                            }
                        },
                        _ => {
                            return Err(EmbedError::Inference(
                                "unexpected entry inside `data` array".into(),
                            ))
                        }
                    }
                }
                return Ok(vectors);
            }
            Err(EmbedError::Inference("unsupported response shape".into()))
        }
        other => parse_collection(other),
    }
}

fn parse_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Array(items) => {
            if items.is_empty() {
                Ok(Vec::new())
            } else if items.iter().all(|item| matches!(item, Value::Array(_))) {
                items.into_iter().map(parse_vector).collect()
            } else {
                parse_vector(Value::Array(items)).map(|v| vec![v])
            }
        }
        other => parse_vector(other).map(|v| vec![v]),
    }
}

fn parse_vector(value: Value) -> Result<Vec<f32>, EmbedError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbedError::Inference("non-finite embedding value".into())),
                other => Err(EmbedError::Inference(format!(
                    "embedding entries must be numbers, got {other:?}"
                ))),
            })
            .collect(),
        other => Err(EmbedError::Inference(format!(
            "embedding vector must be an array, got {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_huggingface_shape() {
        let vectors =
            parse_embeddings(json!([[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]])).unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0], vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn parses_openai_shape() {
        let vectors = parse_embeddings(json!({
            "data": [
                { "embedding": [0.5, 0.25] },
                { "embedding": [0.1, 0.9] }
            ]
        }))
        .unwrap();
        assert_eq!(vectors, vec![vec![0.5, 0.25], vec![0.1, 0.9]]);
    }

    #[test]
    fn parses_wrapped_embeddings_field() {
        let vectors = parse_embeddings(json!({ "embeddings": [[1.0, 0.0]] })).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn parses_single_bare_vector() {
        let vectors = parse_embeddings(json!([0.1, 0.2, 0.3])).unwrap();
        assert_eq!(vectors.len(), 1);
        assert_eq!(vectors[0].len(), 3);
    }

    #[test]
    fn rejects_non_numeric_entries() {
        let result = parse_embeddings(json!([["a", "b"]]));
        assert!(matches!(result, Err(EmbedError::Inference(_))));
    }

    #[test]
    fn rejects_unknown_object_shape() {
        let result = parse_embeddings(json!({ "vectors": [[1.0]] }));
        assert!(matches!(result, Err(EmbedError::Inference(_))));
    }

    #[test]
    fn payload_shapes_per_provider() {
        let cfg = EmbeddingConfig {
            model_name: "m1".into(),
            ..Default::default()
        };
        let texts = vec!["cough".to_string()];

        let hf = build_payload(ProviderKind::HuggingFace, &texts, &cfg);
        assert!(hf.get("inputs").is_some());

        let openai = build_payload(ProviderKind::OpenAi, &texts, &cfg);
        assert_eq!(openai["model"], "m1");
        assert!(openai.get("input").is_some());

        let custom = build_payload(ProviderKind::Custom, &texts, &cfg);
        assert!(custom.get("texts").is_some());
    }
}
