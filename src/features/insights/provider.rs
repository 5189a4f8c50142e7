use crate::shared::config::GeminiConfig;
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// APIキー未設定時に返すメッセージ
pub const NOT_CONFIGURED_MESSAGE: &str =
    "AIアドバイスは現在利用できません。管理者がAPIキーを設定する必要があります。";

/// 生成に失敗した場合に返すメッセージ
pub const UNAVAILABLE_MESSAGE: &str =
    "現在、家計の分析を行うことができません。しばらくしてから再度お試しください。";

/// 取引データからアドバイス文を生成するプロバイダー
#[async_trait]
pub trait InsightProvider: Send + Sync {
    /// プロンプトからアドバイス文を生成する
    async fn generate(&self, prompt: &str) -> AppResult<String>;
}

/// プロバイダーの失敗をユーザー向けの説明文に変換する
pub fn fallback_message(error: &AppError) -> &'static str {
    match error {
        AppError::Configuration(_) => NOT_CONFIGURED_MESSAGE,
        _ => UNAVAILABLE_MESSAGE,
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// 最初の候補のテキストを連結する
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Gemini の generateContent API を使うプロバイダー
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// 設定を指定してプロバイダーを作成する
    pub fn new(config: GeminiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("HTTPクライアント初期化失敗: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl InsightProvider for GeminiProvider {
    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::configuration("GEMINI_API_KEY が設定されていません"))?;

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        log::info!("Gemini APIにリクエスト送信: model={}", self.config.model);

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::external_service("Gemini", format!("リクエスト失敗: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            log::warn!("Gemini APIエラーレスポンス: status={status}, body={detail}");

            // 認証系のエラーはAPIキーの設定不備として扱う
            let invalid_key = (status.as_u16() == 400 && detail.contains("API key"))
                || status.as_u16() == 401
                || status.as_u16() == 403;
            if invalid_key {
                return Err(AppError::configuration(format!(
                    "Gemini APIキーが無効です: status={status}"
                )));
            }
            return Err(AppError::external_service("Gemini", format!("status={status}")));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::external_service("Gemini", format!("レスポンス解析失敗: {e}")))?;

        parsed
            .into_text()
            .ok_or_else(|| AppError::external_service("Gemini", "応答にテキストが含まれていません"))
    }
}
