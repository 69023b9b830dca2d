//! Text-generation backends for post drafting.
//!
//! Every backend returns `Result<String, GenerationError>`; the post generator
//! turns any error into a fallback to the next strategy. Nothing here retries.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::DraftingConfig;
use crate::error::GenerationError;
use crate::ingest::quota::DailyQuota;

/// Fixed system prompt for every AI draft.
pub const POST_SYSTEM_PROMPT: &str = "You are a social media writer for a publication covering the meat and poultry industry.

Write a brief, factual LinkedIn post announcing an executive career move. Keep the tone straightforward and professional, not celebratory. Simply state:
- Who the person is
- Their new title
- The company

Keep it to 1-2 short sentences. Include 2-3 relevant hashtags at the end.
Do not use exclamation points. Do not say \"congratulations\" or \"excited\" or similar language.
Do not make up details not provided in the input.";

const ANTHROPIC_MESSAGES: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_CHAT: &str = "https://api.openai.com/v1/chat/completions";

pub type BackendFuture<'a> = Pin<Box<dyn Future<Output = Result<String, GenerationError>> + Send + 'a>>;

pub trait TextBackend: Send + Sync {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BackendFuture<'a>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynBackend = Arc<dyn TextBackend>;

/// Factory: build a backend according to config and environment variables.
///
/// * If `AI_TEST_MODE=mock`, returns a deterministic mock backend.
/// * Else if the strategy list has no AI step, returns a disabled backend.
/// * Else builds the configured provider wrapped with the daily limit.
pub fn build_backend(cfg: &DraftingConfig) -> DynBackend {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    if std::env::var("AI_TEST_MODE").is_ok_and(|v| v == "mock") {
        return Arc::new(LimitedBackend::new(MockBackend::echo(), cfg.daily_limit));
    }
    if !cfg.strategies.contains(&crate::model::GeneratorKind::Ai) {
        return Arc::new(DisabledBackend);
    }

    let key = cfg.resolved_api_key();
    if key.is_none() {
        tracing::info!(
            provider = %cfg.provider,
            env = cfg.api_key_env(),
            "no AI credential; drafts will use templates"
        );
    }
    match cfg.provider.as_str() {
        "anthropic" => Arc::new(LimitedBackend::new(
            AnthropicBackend::new(key, &cfg.model, cfg.max_tokens, timeout),
            cfg.daily_limit,
        )),
        "openai" => Arc::new(LimitedBackend::new(
            OpenAiBackend::new(key, &cfg.model, cfg.max_tokens, timeout),
            cfg.daily_limit,
        )),
        other => {
            tracing::warn!(provider = other, "unsupported AI provider; AI drafting disabled");
            Arc::new(DisabledBackend)
        }
    }
}

fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Anthropic Messages API.
pub struct AnthropicBackend {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    pub fn new(api_key: Option<String>, model: &str, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            api_key,
            model: model.to_string(),
            max_tokens,
        }
    }
}

impl TextBackend for AnthropicBackend {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BackendFuture<'a> {
        Box::pin(async move {
            let key = self
                .api_key
                .as_deref()
                .ok_or(GenerationError::MissingCredential("ANTHROPIC_API_KEY"))?;

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                max_tokens: u32,
                system: &'a str,
                messages: Vec<Msg<'a>>,
            }
            #[derive(Deserialize)]
            struct Resp {
                #[serde(default)]
                content: Vec<Block>,
            }
            #[derive(Deserialize)]
            struct Block {
                #[serde(rename = "type")]
                kind: String,
                #[serde(default)]
                text: String,
            }

            let req = Req {
                model: &self.model,
                max_tokens: self.max_tokens,
                system,
                messages: vec![Msg {
                    role: "user",
                    content: user,
                }],
            };
            let resp = self
                .http
                .post(ANTHROPIC_MESSAGES)
                .header("x-api-key", key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&req)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(GenerationError::Status(resp.status().as_u16()));
            }
            let body: Resp = resp.json().await?;
            let text: String = body
                .content
                .iter()
                .filter(|b| b.kind == "text")
                .map(|b| b.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            non_empty(text)
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}

/// OpenAI Chat Completions API.
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
}

impl OpenAiBackend {
    pub fn new(api_key: Option<String>, model: &str, max_tokens: u32, timeout: Duration) -> Self {
        Self {
            http: http_client(timeout),
            api_key,
            model: model.to_string(),
            max_tokens,
        }
    }
}

impl TextBackend for OpenAiBackend {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BackendFuture<'a> {
        Box::pin(async move {
            let key = self
                .api_key
                .as_deref()
                .ok_or(GenerationError::MissingCredential("OPENAI_API_KEY"))?;

            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
                max_tokens: u32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                #[serde(default)]
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![
                    Msg {
                        role: "system",
                        content: system,
                    },
                    Msg {
                        role: "user",
                        content: user,
                    },
                ],
                temperature: 0.3,
                max_tokens: self.max_tokens,
            };
            let resp = self.http.post(OPENAI_CHAT).bearer_auth(key).json(&req).send().await?;
            if !resp.status().is_success() {
                return Err(GenerationError::Status(resp.status().as_u16()));
            }
            let body: Resp = resp.json().await?;
            let text = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
            non_empty(text)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn non_empty(text: String) -> Result<String, GenerationError> {
    if text.trim().is_empty() {
        Err(GenerationError::EmptyResponse)
    } else {
        Ok(text)
    }
}

/// Always fails; used when AI drafting is off.
pub struct DisabledBackend;

impl TextBackend for DisabledBackend {
    fn complete<'a>(&'a self, _system: &'a str, _user: &'a str) -> BackendFuture<'a> {
        Box::pin(async { Err(GenerationError::Disabled) })
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

#[derive(Debug, Clone)]
pub enum MockReply {
    /// Build a short post from the request fields.
    Echo,
    Fixed(String),
    /// Fail as if the backend answered with this HTTP status.
    Fail(u16),
}

/// Deterministic backend for tests and `AI_TEST_MODE=mock`.
pub struct MockBackend {
    reply: MockReply,
    calls: AtomicUsize,
}

impl MockBackend {
    pub fn echo() -> Self {
        Self::new(MockReply::Echo)
    }

    pub fn failing(status: u16) -> Self {
        Self::new(MockReply::Fail(status))
    }

    pub fn new(reply: MockReply) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextBackend for MockBackend {
    fn complete<'a>(&'a self, _system: &'a str, user: &'a str) -> BackendFuture<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let out = match &self.reply {
            MockReply::Echo => {
                let field = |name: &str| {
                    user.lines()
                        .find_map(|l| l.strip_prefix(name))
                        .map(str::trim)
                        .unwrap_or_default()
                        .to_string()
                };
                non_empty(format!(
                    "{} is now {} at {}. #PeopleOnTheMove",
                    field("Person:"),
                    field("New title:"),
                    field("Company:")
                ))
            }
            MockReply::Fixed(s) => non_empty(s.clone()),
            MockReply::Fail(code) => Err(GenerationError::Status(*code)),
        };
        Box::pin(async move { out })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

impl<T: TextBackend + ?Sized> TextBackend for Arc<T> {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BackendFuture<'a> {
        (**self).complete(system, user)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Per-day call budget in front of a real backend.
pub struct LimitedBackend<B: TextBackend> {
    inner: B,
    quota: DailyQuota,
}

impl<B: TextBackend> LimitedBackend<B> {
    pub fn new(inner: B, daily_limit: u32) -> Self {
        Self {
            inner,
            quota: DailyQuota::new(daily_limit),
        }
    }
}

impl<B: TextBackend> TextBackend for LimitedBackend<B> {
    fn complete<'a>(&'a self, system: &'a str, user: &'a str) -> BackendFuture<'a> {
        if !self.quota.try_acquire() {
            return Box::pin(async { Err(GenerationError::DailyLimit) });
        }
        self.inner.complete(system, user)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
