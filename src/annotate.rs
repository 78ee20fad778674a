//! Annotation service abstraction and implementations.
//!
//! Snippets found by [`crate::extract`] are sent, numbered from 1, to a
//! language model that returns a translation and the keyword's meaning
//! in context for each one. Results are joined back onto the snippets by
//! that number.
//!
//! Defines the [`Annotator`] trait and concrete implementations:
//! - **[`DisabledAnnotator`]**: always fails; used when annotation is off.
//! - **[`GeminiAnnotator`]**: Gemini `generateContent` with a JSON response schema.
//! - **[`OpenAIAnnotator`]**: OpenAI chat completions in JSON mode.
//!
//! An annotator is an explicit handle built by [`create_annotator`] and
//! passed to [`analyze_vocabulary`]; nothing here is global, so tests can
//! inject their own implementation.
//!
//! # Retry Strategy
//!
//! Both HTTP providers use exponential backoff for transient errors:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AnnotationConfig;
use crate::models::{AnalysisRecord, Annotation, Snippet};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Failures of the annotation step. Any of these fails the whole batch.
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("annotation is disabled; set [annotation] provider in config")]
    Disabled,

    #[error("{0} environment variable not set")]
    MissingApiKey(String),

    #[error("annotation service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request to annotation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("no data returned from annotation service")]
    EmptyResponse,

    #[error("could not parse annotation response: {0}")]
    MalformedResponse(String),

    #[error("annotation refers to example {index}, but only {count} were sent")]
    IndexOutOfRange { index: i64, count: usize },
}

/// A service that annotates numbered snippets for a keyword.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Returns the model identifier (e.g. `"gemini-2.5-flash"`).
    fn model_name(&self) -> &str;

    /// Annotate `snippets`, which the service sees numbered from 1.
    ///
    /// The response may cover only some of the snippets and may come
    /// back in any order.
    async fn annotate(
        &self,
        keyword: &str,
        snippets: &[Snippet],
    ) -> Result<Vec<Annotation>, AnnotateError>;
}

/// Annotate snippets and merge the results into display records.
///
/// An empty snippet list returns immediately without contacting the
/// service. Snippets are only borrowed, so a failed call leaves the
/// caller's list exactly as it was.
pub async fn analyze_vocabulary(
    annotator: &dyn Annotator,
    keyword: &str,
    snippets: &[Snippet],
) -> Result<Vec<AnalysisRecord>, AnnotateError> {
    if snippets.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        model = annotator.model_name(),
        keyword,
        count = snippets.len(),
        "requesting annotations"
    );
    let annotations = annotator.annotate(keyword, snippets).await?;
    merge_annotations(snippets, &annotations)
}

/// Join annotations to snippets by their 1-based `example_index`.
///
/// Records come out in snippet order, not in the order the service
/// answered in. A repeated index yields one record built from its first
/// annotation; later ones are dropped. Snippets without an annotation are
/// left out. An index that
/// does not name a sent snippet fails the whole batch, since the
/// response no longer lines up with what was sent.
pub fn merge_annotations(
    snippets: &[Snippet],
    annotations: &[Annotation],
) -> Result<Vec<AnalysisRecord>, AnnotateError> {
    let mut slots: Vec<Option<&Annotation>> = vec![None; snippets.len()];

    for ann in annotations {
        let idx = ann.example_index;
        if idx < 1 || idx as usize > snippets.len() {
            return Err(AnnotateError::IndexOutOfRange {
                index: idx,
                count: snippets.len(),
            });
        }
        let slot = &mut slots[(idx - 1) as usize];
        if slot.is_some() {
            warn!(index = idx, "duplicate annotation ignored");
            continue;
        }
        *slot = Some(ann);
    }

    let records: Vec<AnalysisRecord> = snippets
        .iter()
        .zip(slots)
        .filter_map(|(snippet, ann)| {
            ann.map(|a| AnalysisRecord {
                original_sentence: snippet.text.clone(),
                translation: a.translation.clone(),
                meaning_in_context: a.meaning.clone(),
                source_doc_id: snippet.document_id.clone(),
                source_doc_name: snippet.document_name.clone(),
            })
        })
        .collect();

    if records.len() < snippets.len() {
        debug!(
            sent = snippets.len(),
            returned = records.len(),
            "partial annotation response"
        );
    }

    Ok(records)
}

/// Build the user prompt listing each snippet as `Example N: ...`.
pub fn build_prompt(keyword: &str, snippets: &[Snippet], target_language: &str) -> String {
    let examples = snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("Example {}: {}", i + 1, s.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "I am a language learner. I have found the word \"{keyword}\" in my reading materials.\n\
         \n\
         Here are the text excerpts where I found it:\n\
         {examples}\n\
         \n\
         For each example, please provide:\n\
         1. The {target_language} translation of the text excerpt (focusing on the sentence containing the keyword).\n\
         2. The specific meaning of \"{keyword}\" as it is used in this specific context (part of speech and shade of meaning).\n\
         \n\
         Return the result as a strict JSON array. Each item must have \"exampleIndex\" \
         (the 1-based example number), \"translation\", and \"wordMeaningInContext\"."
    )
}

/// Parse the model's JSON text into annotations.
///
/// Accepts a top-level array, or an object holding the array under
/// `"annotations"`. A surrounding markdown code fence is tolerated.
pub fn parse_annotations(text: &str) -> Result<Vec<Annotation>, AnnotateError> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(AnnotateError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| AnnotateError::MalformedResponse(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("annotations") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(AnnotateError::MalformedResponse(
                    "expected a JSON array of annotations".to_string(),
                ))
            }
        },
        _ => {
            return Err(AnnotateError::MalformedResponse(
                "expected a JSON array of annotations".to_string(),
            ))
        }
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<Annotation>(item)
                .map_err(|e| AnnotateError::MalformedResponse(e.to_string()))
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. "json") on the opening line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Instantiate the annotator named by `config.provider`.
///
/// # Errors
///
/// Returns [`AnnotateError::MissingApiKey`] if the provider needs an API
/// key and its environment variable is unset.
pub fn create_annotator(config: &AnnotationConfig) -> Result<Box<dyn Annotator>, AnnotateError> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiAnnotator::new(config)?)),
        "openai" => Ok(Box::new(OpenAIAnnotator::new(config)?)),
        _ => Ok(Box::new(DisabledAnnotator)),
    }
}

// ============ Disabled ============

/// An annotator that always fails.
pub struct DisabledAnnotator;

#[async_trait]
impl Annotator for DisabledAnnotator {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn annotate(
        &self,
        _keyword: &str,
        _snippets: &[Snippet],
    ) -> Result<Vec<Annotation>, AnnotateError> {
        Err(AnnotateError::Disabled)
    }
}

// ============ Shared HTTP plumbing ============

struct HttpSettings {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    target_language: String,
    max_retries: u32,
}

impl HttpSettings {
    fn from_config(config: &AnnotationConfig, default_base: &str) -> Result<Self, AnnotateError> {
        let var = config.api_key_var();
        let api_key = std::env::var(var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AnnotateError::MissingApiKey(var.to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            target_language: config.target_language.clone(),
            max_retries: config.max_retries,
        })
    }
}

/// Send a JSON request, retrying transient failures, and return the
/// parsed response body.
async fn send_with_retry<F>(max_retries: u32, build: F) -> Result<Value, AnnotateError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            // Exponential backoff: 1s, 2s, 4s, 8s, ...
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            warn!(attempt, delay_secs = delay.as_secs(), "retrying annotation request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let text = response.text().await?;
                    return serde_json::from_str(&text)
                        .map_err(|e| AnnotateError::MalformedResponse(e.to_string()));
                }

                let body = response.text().await.unwrap_or_default();
                let err = AnnotateError::Http {
                    status: status.as_u16(),
                    body,
                };

                // Rate limited or server error, retry
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(err);
                    continue;
                }

                return Err(err);
            }
            Err(e) => {
                last_err = Some(e.into());
            }
        }
    }

    Err(last_err.unwrap_or(AnnotateError::EmptyResponse))
}

// ============ Gemini ============

/// Annotator backed by the Gemini `generateContent` API.
///
/// Asks for `application/json` output constrained by a response schema
/// matching [`Annotation`].
pub struct GeminiAnnotator {
    http: HttpSettings,
}

impl GeminiAnnotator {
    pub fn new(config: &AnnotationConfig) -> Result<Self, AnnotateError> {
        Ok(Self {
            http: HttpSettings::from_config(config, GEMINI_BASE_URL)?,
        })
    }
}

fn gemini_request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "exampleIndex": {
                            "type": "INTEGER",
                            "description": "The index of the example provided (1-based)"
                        },
                        "translation": {
                            "type": "STRING",
                            "description": "Natural translation of the text snippet."
                        },
                        "wordMeaningInContext": {
                            "type": "STRING",
                            "description": "The keyword's meaning and usage in this specific context."
                        }
                    },
                    "required": ["exampleIndex", "translation", "wordMeaningInContext"]
                }
            }
        }
    })
}

/// Concatenate the text parts of the first candidate.
fn gemini_response_text(json: &Value) -> Result<String, AnnotateError> {
    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(|p| p.as_array())
        .ok_or(AnnotateError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.trim().is_empty() {
        return Err(AnnotateError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl Annotator for GeminiAnnotator {
    fn model_name(&self) -> &str {
        &self.http.model
    }

    async fn annotate(
        &self,
        keyword: &str,
        snippets: &[Snippet],
    ) -> Result<Vec<Annotation>, AnnotateError> {
        let prompt = build_prompt(keyword, snippets, &self.http.target_language);
        let body = gemini_request_body(&prompt);
        let url = format!(
            "{}/models/{}:generateContent",
            self.http.base_url, self.http.model
        );

        let json = send_with_retry(self.http.max_retries, || {
            self.http
                .client
                .post(url.as_str())
                .header("x-goog-api-key", &self.http.api_key)
                .json(&body)
        })
        .await?;

        parse_annotations(&gemini_response_text(&json)?)
    }
}

// ============ OpenAI ============

/// Annotator backed by the OpenAI chat completions API in JSON mode.
///
/// JSON mode only produces objects, so the model is asked to wrap the
/// array under an `"annotations"` key.
pub struct OpenAIAnnotator {
    http: HttpSettings,
}

impl OpenAIAnnotator {
    pub fn new(config: &AnnotationConfig) -> Result<Self, AnnotateError> {
        Ok(Self {
            http: HttpSettings::from_config(config, OPENAI_BASE_URL)?,
        })
    }
}

fn openai_request_body(model: &str, prompt: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            {
                "role": "system",
                "content": "You annotate vocabulary examples. Respond with a JSON object of the form {\"annotations\": [...]} where the array holds one item per example."
            },
            { "role": "user", "content": prompt }
        ],
        "response_format": { "type": "json_object" }
    })
}

fn openai_response_text(json: &Value) -> Result<String, AnnotateError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.to_string())
        .ok_or(AnnotateError::EmptyResponse)
}

#[async_trait]
impl Annotator for OpenAIAnnotator {
    fn model_name(&self) -> &str {
        &self.http.model
    }

    async fn annotate(
        &self,
        keyword: &str,
        snippets: &[Snippet],
    ) -> Result<Vec<Annotation>, AnnotateError> {
        let prompt = build_prompt(keyword, snippets, &self.http.target_language);
        let body = openai_request_body(&self.http.model, &prompt);
        let url = format!("{}/chat/completions", self.http.base_url);

        let json = send_with_retry(self.http.max_retries, || {
            self.http
                .client
                .post(url.as_str())
                .header("Authorization", format!("Bearer {}", self.http.api_key))
                .json(&body)
        })
        .await?;

        parse_annotations(&openai_response_text(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snippet(text: &str, doc: &str) -> Snippet {
        Snippet {
            text: text.to_string(),
            document_id: doc.to_string(),
            document_name: format!("{}.md", doc),
            sentence_index: 0,
        }
    }

    fn ann(index: i64, translation: &str) -> Annotation {
        Annotation {
            example_index: index,
            translation: translation.to_string(),
            meaning: format!("meaning {}", index),
        }
    }

    struct CountingAnnotator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Annotator for CountingAnnotator {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn annotate(
            &self,
            _keyword: &str,
            snippets: &[Snippet],
        ) -> Result<Vec<Annotation>, AnnotateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((1..=snippets.len() as i64).map(|i| ann(i, "t")).collect())
        }
    }

    #[test]
    fn test_prompt_numbers_examples_from_one() {
        let snippets = vec![snippet("First one.", "a"), snippet("Second one.", "b")];
        let prompt = build_prompt("one", &snippets, "Chinese");
        assert!(prompt.contains("the word \"one\""));
        assert!(prompt.contains("Example 1: First one.\n\nExample 2: Second one."));
        assert!(prompt.contains("The Chinese translation"));
        assert!(prompt.contains("\"exampleIndex\""));
    }

    #[test]
    fn test_parse_array() {
        let text = r#"[{"exampleIndex": 1, "translation": "a", "wordMeaningInContext": "b"}]"#;
        let parsed = parse_annotations(text).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].example_index, 1);
    }

    #[test]
    fn test_parse_wrapped_object_and_fence() {
        let text = "```json\n{\"annotations\": [{\"exampleIndex\": 2, \"translation\": \"x\", \"wordMeaningInContext\": \"y\"}]}\n```";
        let parsed = parse_annotations(text).unwrap();
        assert_eq!(parsed[0].example_index, 2);
        assert_eq!(parsed[0].meaning, "y");
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            parse_annotations("   "),
            Err(AnnotateError::EmptyResponse)
        ));
        assert!(matches!(
            parse_annotations("not json"),
            Err(AnnotateError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_annotations(r#"{"result": "ok"}"#),
            Err(AnnotateError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_annotations(r#"[{"exampleIndex": 1}]"#),
            Err(AnnotateError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_annotations("42"),
            Err(AnnotateError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_merge_full() {
        let snippets = vec![snippet("One.", "a"), snippet("Two.", "b")];
        let records = merge_annotations(&snippets, &[ann(1, "uno"), ann(2, "dos")]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original_sentence, "One.");
        assert_eq!(records[0].translation, "uno");
        assert_eq!(records[0].meaning_in_context, "meaning 1");
        assert_eq!(records[0].source_doc_id, "a");
        assert_eq!(records[1].source_doc_name, "b.md");
    }

    #[test]
    fn test_merge_partial_and_reordered() {
        let snippets = vec![
            snippet("One.", "a"),
            snippet("Two.", "b"),
            snippet("Three.", "c"),
        ];
        let records = merge_annotations(&snippets, &[ann(3, "tres"), ann(1, "uno")]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].original_sentence, "One.");
        assert_eq!(records[0].translation, "uno");
        assert_eq!(records[1].original_sentence, "Three.");
        assert_eq!(records[1].translation, "tres");
    }

    #[test]
    fn test_merge_duplicate_keeps_first() {
        let snippets = vec![snippet("One.", "a")];
        let records = merge_annotations(&snippets, &[ann(1, "first"), ann(1, "second")]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].translation, "first");
    }

    #[test]
    fn test_merge_out_of_range_fails() {
        let snippets = vec![snippet("One.", "a")];
        let err = merge_annotations(&snippets, &[ann(1, "ok"), ann(2, "bad")]).unwrap_err();
        assert!(matches!(
            err,
            AnnotateError::IndexOutOfRange { index: 2, count: 1 }
        ));
        assert!(merge_annotations(&snippets, &[ann(0, "zero")]).is_err());
    }

    #[test]
    fn test_gemini_body_shape() {
        let body = gemini_request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["items"]["required"][0],
            "exampleIndex"
        );
    }

    #[test]
    fn test_gemini_response_text() {
        let json = json!({
            "candidates": [{ "content": { "parts": [{ "text": "[{\"a\":" }, { "text": "1}]" }] } }]
        });
        assert_eq!(gemini_response_text(&json).unwrap(), "[{\"a\":1}]");
        assert!(matches!(
            gemini_response_text(&json!({ "candidates": [] })),
            Err(AnnotateError::EmptyResponse)
        ));
    }

    #[test]
    fn test_openai_response_text() {
        let json = json!({ "choices": [{ "message": { "content": "{\"annotations\": []}" } }] });
        assert_eq!(openai_response_text(&json).unwrap(), "{\"annotations\": []}");
        let empty = json!({ "choices": [{ "message": { "content": "" } }] });
        assert!(matches!(
            openai_response_text(&empty),
            Err(AnnotateError::EmptyResponse)
        ));
    }

    #[test]
    fn test_openai_body_uses_json_mode() {
        let body = openai_request_body("gpt-4o-mini", "prompt");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][1]["content"], "prompt");
    }

    #[test]
    fn test_create_annotator_missing_key() {
        let config = AnnotationConfig {
            api_key_env: Some("VCTX_TEST_KEY_THAT_IS_NEVER_SET".to_string()),
            ..AnnotationConfig::default()
        };
        match create_annotator(&config) {
            Err(AnnotateError::MissingApiKey(var)) => {
                assert_eq!(var, "VCTX_TEST_KEY_THAT_IS_NEVER_SET")
            }
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected missing key error"),
        }
    }

    #[test]
    fn test_create_disabled_annotator() {
        let config = AnnotationConfig {
            provider: "disabled".to_string(),
            ..AnnotationConfig::default()
        };
        let annotator = create_annotator(&config).unwrap();
        assert_eq!(annotator.model_name(), "disabled");
    }

    #[tokio::test]
    async fn test_disabled_annotator_errors() {
        let result = DisabledAnnotator.annotate("x", &[snippet("x.", "a")]).await;
        assert!(matches!(result, Err(AnnotateError::Disabled)));
    }

    #[tokio::test]
    async fn test_analyze_empty_skips_service() {
        let annotator = CountingAnnotator {
            calls: AtomicUsize::new(0),
        };
        let records = analyze_vocabulary(&annotator, "word", &[]).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(annotator.calls.load(Ordering::SeqCst), 0);

        let snippets = vec![snippet("A word.", "a")];
        let records = analyze_vocabulary(&annotator, "word", &snippets)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(annotator.calls.load(Ordering::SeqCst), 1);
    }
}
