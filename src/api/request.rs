use crate::features::auth::middleware::extract_bearer_token;
use crate::shared::currency::Currency;
use crate::shared::errors::{AppError, AppResult};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes, Incoming};
use hyper::{Method, Request};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// リクエスト本文の上限（1MB）
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// ルーティング用に正規化したAPIリクエスト
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub token: Option<String>,
    pub body: Bytes,
}

impl ApiRequest {
    /// メソッドとパス（クエリ文字列を含んでもよい）からリクエストを作成する
    pub fn new(method: Method, path_and_query: &str) -> Self {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (path_and_query, HashMap::new()),
        };

        Self {
            method,
            path: path.to_string(),
            query,
            token: None,
            body: Bytes::new(),
        }
    }

    /// Bearerトークンを設定する
    pub fn with_token<S: Into<String>>(mut self, token: S) -> Self {
        self.token = Some(token.into());
        self
    }

    /// JSON本文を設定する
    pub fn with_json(mut self, body: &serde_json::Value) -> Self {
        self.body = Bytes::from(body.to_string());
        self
    }

    /// hyperのリクエストから作成する（本文を読み込む）
    pub async fn from_hyper(request: Request<Incoming>) -> AppResult<Self> {
        let (parts, body) = request.into_parts();

        let token = parts
            .headers
            .get(hyper::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| extract_bearer_token(Some(value)))
            .map(str::to_string);

        let body = read_body(body, MAX_BODY_BYTES).await?;

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut request = Self::new(parts.method, path_and_query);
        request.token = token;
        request.body = body;
        Ok(request)
    }

    /// クエリパラメータを取得する（空文字列は未指定として扱う）
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    /// 真偽値のクエリパラメータ（"true" / "false" 以外は未指定）
    pub fn query_bool(&self, key: &str) -> Option<bool> {
        match self.query(key) {
            Some("true") => Some(true),
            Some("false") => Some(false),
            _ => None,
        }
    }

    /// 通貨コードのクエリパラメータ
    pub fn query_currency(&self, key: &str) -> AppResult<Option<Currency>> {
        self.query(key)
            .map(|value| value.parse::<Currency>().map_err(AppError::Validation))
            .transpose()
    }

    /// パスをセグメントに分割する
    pub fn segments(&self) -> Vec<&str> {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    /// JSON本文を解析する（本文が空の場合は既定値）
    pub fn json<T>(&self) -> AppResult<T>
    where
        T: DeserializeOwned + Default,
    {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(T::default());
        }

        serde_json::from_slice(&self.body).map_err(|e| {
            AppError::validation(format!("リクエスト本文の形式が正しくありません: {e}"))
        })
    }
}

/// 上限を超えた時点で読み込みを打ち切り、本文をすべて読み込む
async fn read_body<B>(body: B, limit: usize) -> AppResult<Bytes>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(AppError::validation("リクエスト本文が大きすぎます"))
        }
        Err(e) => Err(AppError::validation(format!(
            "リクエスト本文の読み込みに失敗しました: {e}"
        ))),
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
