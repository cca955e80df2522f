use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionHandle, ExecutionRequest, ExecutionResult, Language, StatusCode};
use crate::engine::traits::{EngineError, JudgeEngine};

/// RapidAPI credentials for the hosted Judge0 deployment. A self-hosted
/// instance needs none.
#[derive(Clone, Debug)]
pub struct RapidApiAuth {
    pub key: String,
    pub host: String,
}

/// Token-batch style adapter: one POST submits the whole batch and yields
/// one token per item, one GET with the joined tokens fetches the whole
/// batch back.
#[derive(Clone, Debug)]
pub struct Judge0Engine {
    http: reqwest::Client,
    base_url: String,
    auth: Option<RapidApiAuth>,
}

#[derive(Serialize)]
struct WireSubmission<'a> {
    source_code: &'a str,
    language_id: u32,
    stdin: &'a str,
}

#[derive(Serialize)]
struct WireBatch<'a> {
    submissions: Vec<WireSubmission<'a>>,
}

#[derive(Deserialize)]
struct WireToken {
    token: String,
}

#[derive(Deserialize)]
struct WireBatchResults {
    submissions: Option<Vec<WireResult>>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    status: Option<WireStatus>,
    memory: Option<f64>,
    // Judge0 reports run time as a decimal string, e.g. "0.045".
    time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    id: i64,
}

impl Judge0Engine {
    pub fn new(base_url: impl Into<String>, auth: Option<RapidApiAuth>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            auth,
        }
    }

    fn language_id(language: Language) -> u32 {
        match language {
            Language::Python => 71,
            Language::Java => 62,
            Language::C => 50,
            Language::Cpp => 54,
        }
    }

    fn map_status(id: i64) -> StatusCode {
        match id {
            1 => StatusCode::InQueue,
            2 => StatusCode::Running,
            3 => StatusCode::Accepted,
            4 => StatusCode::WrongAnswer,
            5 => StatusCode::TimeLimitExceeded,
            6 => StatusCode::CompileError,
            7..=12 => StatusCode::RuntimeError,
            13 | 14 => StatusCode::InternalError,
            _ => StatusCode::Unknown,
        }
    }

    fn normalize(raw: WireResult, payload: &str) -> Result<ExecutionResult, EngineError> {
        // A result envelope without a status id cannot drive the poll
        // loop's terminality check.
        let status = raw
            .status
            .map(|s| Self::map_status(s.id))
            .ok_or_else(|| EngineError::Protocol {
                detail: "result envelope is missing 'status'".to_string(),
                payload: payload.to_string(),
            })?;

        Ok(ExecutionResult {
            stdout: raw.stdout,
            stderr: raw.stderr,
            compile_output: raw.compile_output,
            status,
            memory_kb: raw.memory,
            time_seconds: raw.time.as_deref().and_then(|t| t.parse().ok()),
        })
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(auth) => request
                .header("X-RapidAPI-Key", &auth.key)
                .header("X-RapidAPI-Host", &auth.host),
            None => request,
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, EngineError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::Http {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| EngineError::Protocol {
            detail: e.to_string(),
            payload: body,
        })
    }
}

#[async_trait::async_trait]
impl JudgeEngine for Judge0Engine {
    async fn submit_one(&self, request: ExecutionRequest) -> Result<ExecutionHandle, EngineError> {
        let mut handles = self.submit_many(vec![request]).await?;
        handles.pop().ok_or_else(|| EngineError::Protocol {
            detail: "batch submit returned no token".to_string(),
            payload: String::new(),
        })
    }

    async fn fetch_result(&self, handle: ExecutionHandle) -> Result<ExecutionResult, EngineError> {
        let mut results = self.fetch_many(vec![handle]).await?;
        results.pop().ok_or_else(|| EngineError::Protocol {
            detail: "batch fetch returned no result".to_string(),
            payload: String::new(),
        })
    }

    async fn submit_many(
        &self,
        requests: Vec<ExecutionRequest>,
    ) -> Result<Vec<ExecutionHandle>, EngineError> {
        let body = WireBatch {
            submissions: requests
                .iter()
                .map(|r| WireSubmission {
                    source_code: &r.source_code,
                    language_id: Self::language_id(r.language),
                    stdin: &r.stdin,
                })
                .collect(),
        };

        tracing::debug!("Submitting batch of {} to Judge0", requests.len());
        let response = self
            .apply_auth(self.http.post(format!("{}/submissions/batch", self.base_url)))
            .query(&[("base64_encoded", "false")])
            .json(&body)
            .send()
            .await?;

        let tokens: Vec<WireToken> = Self::read_json(response).await?;
        if tokens.len() != requests.len() {
            return Err(EngineError::Protocol {
                detail: format!(
                    "submitted {} items but received {} tokens",
                    requests.len(),
                    tokens.len()
                ),
                payload: String::new(),
            });
        }

        Ok(tokens
            .into_iter()
            .map(|t| ExecutionHandle::Pending { token: t.token })
            .collect())
    }

    async fn fetch_many(
        &self,
        handles: Vec<ExecutionHandle>,
    ) -> Result<Vec<ExecutionResult>, EngineError> {
        let mut slots: Vec<Option<ExecutionResult>> = vec![None; handles.len()];
        let mut tokens = Vec::new();
        let mut token_slots = Vec::new();

        for (idx, handle) in handles.iter().enumerate() {
            match handle {
                ExecutionHandle::Ready(result) => slots[idx] = Some((**result).clone()),
                ExecutionHandle::Pending { token } => {
                    tokens.push(token.clone());
                    token_slots.push(idx);
                }
            }
        }

        if !tokens.is_empty() {
            let response = self
                .apply_auth(self.http.get(format!("{}/submissions/batch", self.base_url)))
                .query(&[
                    ("tokens", tokens.join(",").as_str()),
                    ("base64_encoded", "false"),
                ])
                .send()
                .await?;

            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(EngineError::Http {
                    status: status.as_u16(),
                    body,
                });
            }

            let batch: WireBatchResults =
                serde_json::from_str(&body).map_err(|e| EngineError::Protocol {
                    detail: e.to_string(),
                    payload: body.clone(),
                })?;
            let results = batch.submissions.ok_or_else(|| EngineError::Protocol {
                detail: "batch response is missing 'submissions'".to_string(),
                payload: body.clone(),
            })?;
            if results.len() != tokens.len() {
                return Err(EngineError::Protocol {
                    detail: format!(
                        "requested {} tokens but received {} results",
                        tokens.len(),
                        results.len()
                    ),
                    payload: body,
                });
            }

            for (slot, raw) in token_slots.into_iter().zip(results) {
                slots[slot] = Some(Self::normalize(raw, &body)?);
            }
        }

        Ok(slots
            .into_iter()
            .map(|s| s.expect("every handle resolved to a result"))
            .collect())
    }
}
