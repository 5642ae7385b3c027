use serde_json::Value;

use crate::error::Error;

/// A text-prompt + JSON-schema completion service. Implementations must
/// surface parse errors (`Error::SchemaMismatch`) distinctly from transport
/// errors (`Error::Transport`/`Error::Status`), per spec.md §6.
pub trait LlmClient: std::fmt::Debug + Send + Sync + 'static {
    fn complete_json<'s>(
        &'s self,
        prompt: &'s str,
        schema: &'s Value,
    ) -> impl std::future::Future<Output = Result<Value, Error>> + Send + 's;
}

/// `reqwest`-backed client targeting a configurable HTTP endpoint
/// (`LLM_ENDPOINT`). The wire contract is intentionally generic — a JSON
/// body of `{prompt, schema}` and a JSON body response — so any vendor's
/// completion API can sit behind it via a small shim.
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpLlmClient {
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    schema: &'a Value,
}

impl LlmClient for HttpLlmClient {
    async fn complete_json(&self, prompt: &str, schema: &Value) -> Result<Value, Error> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&CompletionRequest { prompt, schema })
            .send()
            .await
            .map_err(|source| Error::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(|source| Error::Transport {
            endpoint: self.endpoint.clone(),
            source,
        })?;

        if !json_matches_schema_shape(&body, schema) {
            return Err(Error::SchemaMismatch {
                endpoint: self.endpoint.clone(),
                reason: "response shape did not match the requested schema".to_string(),
            });
        }

        Ok(body)
    }
}

/// A shallow shape check: every schema-declared required object key is
/// present in the response. The schema's own server-side validation is the
/// authority; this is a cheap client-side sanity check before the caller
/// deserializes into a typed model.
fn json_matches_schema_shape(body: &Value, schema: &Value) -> bool {
    let (Some(required), Some(obj)) = (
        schema.get("required").and_then(Value::as_array),
        body.as_object(),
    ) else {
        return true;
    };
    required
        .iter()
        .filter_map(Value::as_str)
        .all(|key| obj.contains_key(key))
}
