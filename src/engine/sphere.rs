use serde::{Deserialize, Serialize};

use crate::domain::{ExecutionHandle, ExecutionRequest, ExecutionResult, Language, StatusCode};
use crate::engine::traits::{EngineError, JudgeEngine};

/// Per-item wait/poll style adapter. With `wait` enabled the engine blocks
/// until the job finishes and the submit response already carries the
/// result, so `submit_one` returns a `Ready` handle and the poll loop is
/// skipped. With `wait` disabled it returns an id to poll.
#[derive(Clone, Debug)]
pub struct SphereEngine {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    wait: bool,
}

#[derive(Serialize)]
struct WireSubmission<'a> {
    source: &'a str,
    #[serde(rename = "compilerId")]
    compiler_id: u32,
    input: &'a str,
}

#[derive(Deserialize)]
struct WireSubmitResponse {
    id: Option<serde_json::Value>,
    result: Option<WireResult>,
}

#[derive(Deserialize)]
struct WirePollResponse {
    result: Option<WireResult>,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    status: Option<WireStatus>,
    // Reported in bytes; normalized to KB.
    memory: Option<f64>,
    time: Option<f64>,
    streams: Option<WireStreams>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    code: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct WireStreams {
    output: Option<WireStream>,
    stderr: Option<WireStream>,
    cmpinfo: Option<WireStream>,
}

/// The engine delivers each stream either as a single object or as an
/// array of objects, and the content either inline or behind a URI that
/// has to be fetched separately.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireStream {
    One(WireStreamContent),
    Many(Vec<WireStreamContent>),
}

#[derive(Debug, Deserialize)]
struct WireStreamContent {
    content: Option<String>,
    uri: Option<String>,
}

enum StreamSource {
    Inline(String),
    Remote(String),
    Absent,
}

impl WireStream {
    fn into_source(self) -> StreamSource {
        let first = match self {
            WireStream::One(content) => Some(content),
            WireStream::Many(contents) => contents.into_iter().next(),
        };
        match first {
            Some(WireStreamContent {
                content: Some(content),
                ..
            }) => StreamSource::Inline(content),
            Some(WireStreamContent { uri: Some(uri), .. }) => StreamSource::Remote(uri),
            _ => StreamSource::Absent,
        }
    }
}

impl SphereEngine {
    pub fn new(endpoint: impl Into<String>, token: impl Into<String>, wait: bool) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            token: token.into(),
            wait,
        }
    }

    fn compiler_id(language: Language) -> u32 {
        match language {
            Language::Python => 116,
            Language::Java => 10,
            Language::C => 1,
            Language::Cpp => 41,
        }
    }

    fn map_status(code: Option<i64>) -> StatusCode {
        match code {
            Some(0) => StatusCode::InQueue,
            Some(1) => StatusCode::Compiling,
            Some(2) => StatusCode::Running,
            Some(11) => StatusCode::CompileError,
            Some(12) => StatusCode::RuntimeError,
            Some(13) => StatusCode::TimeLimitExceeded,
            Some(14) => StatusCode::WrongAnswer,
            Some(15) => StatusCode::Accepted,
            Some(17) => StatusCode::MemoryLimitExceeded,
            Some(19) => StatusCode::IllegalSystemCall,
            Some(20) => StatusCode::InternalError,
            _ => StatusCode::Unknown,
        }
    }

    async fn stream_content(
        &self,
        stream: Option<WireStream>,
    ) -> Result<Option<String>, EngineError> {
        match stream.map(WireStream::into_source) {
            Some(StreamSource::Inline(content)) => Ok(Some(content)),
            Some(StreamSource::Remote(uri)) => {
                let response = self.http.get(&uri).bearer_auth(&self.token).send().await?;
                let status = response.status();
                let body = response.text().await?;
                if !status.is_success() {
                    return Err(EngineError::Http {
                        status: status.as_u16(),
                        body,
                    });
                }
                Ok(Some(body))
            }
            Some(StreamSource::Absent) | None => Ok(None),
        }
    }

    async fn normalize(&self, raw: WireResult) -> Result<ExecutionResult, EngineError> {
        let status = Self::map_status(raw.status.and_then(|s| s.code));
        let (output, stderr, cmpinfo) = match raw.streams {
            Some(streams) => (streams.output, streams.stderr, streams.cmpinfo),
            None => (None, None, None),
        };

        Ok(ExecutionResult {
            stdout: self.stream_content(output).await?,
            stderr: self.stream_content(stderr).await?,
            compile_output: self.stream_content(cmpinfo).await?,
            status,
            memory_kb: raw.memory.map(|bytes| bytes / 1024.0),
            time_seconds: raw.time,
        })
    }

    fn token_of(value: serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[async_trait::async_trait]
impl JudgeEngine for SphereEngine {
    async fn submit_one(&self, request: ExecutionRequest) -> Result<ExecutionHandle, EngineError> {
        let body = WireSubmission {
            source: &request.source_code,
            compiler_id: Self::compiler_id(request.language),
            input: &request.stdin,
        };

        tracing::debug!(wait = self.wait, "Submitting to Sphere Engine");
        let response = self
            .http
            .post(format!("{}/submissions", self.endpoint))
            .query(&[("wait", if self.wait { "true" } else { "false" })])
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: WireSubmitResponse =
            serde_json::from_str(&text).map_err(|e| EngineError::Protocol {
                detail: e.to_string(),
                payload: text.clone(),
            })?;

        if self.wait {
            let raw = parsed.result.ok_or_else(|| EngineError::Protocol {
                detail: "wait=true submit response is missing 'result'".to_string(),
                payload: text,
            })?;
            let result = self.normalize(raw).await?;
            Ok(ExecutionHandle::Ready(Box::new(result)))
        } else {
            let token = parsed
                .id
                .and_then(Self::token_of)
                .ok_or_else(|| EngineError::Protocol {
                    detail: "submit response is missing 'id'".to_string(),
                    payload: text,
                })?;
            Ok(ExecutionHandle::Pending { token })
        }
    }

    async fn fetch_result(&self, handle: ExecutionHandle) -> Result<ExecutionResult, EngineError> {
        let token = match handle {
            ExecutionHandle::Ready(result) => return Ok(*result),
            ExecutionHandle::Pending { token } => token,
        };

        let response = self
            .http
            .get(format!("{}/submissions/{}", self.endpoint, token))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EngineError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: WirePollResponse =
            serde_json::from_str(&text).map_err(|e| EngineError::Protocol {
                detail: e.to_string(),
                payload: text.clone(),
            })?;
        let raw = parsed.result.ok_or_else(|| EngineError::Protocol {
            detail: "poll response is missing 'result'".to_string(),
            payload: text,
        })?;

        self.normalize(raw).await
    }
}
