use crate::shared::errors::{AppError, AppResult, ErrorSeverity};
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::{Map, Value};

/// レスポンス本文
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `{"success": ..., "data": ...}` 形式のJSON
    Json(Map<String, Value>),
    /// プレーンテキスト
    Text(String),
    /// 本文なし
    Empty,
}

/// APIレスポンス
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: ResponseBody,
}

impl ApiResponse {
    /// 成功レスポンス（200）
    pub fn ok<T: Serialize>(data: &T) -> AppResult<Self> {
        Self::success(StatusCode::OK, data)
    }

    /// 作成成功レスポンス（201）
    pub fn created<T: Serialize>(data: &T) -> AppResult<Self> {
        Self::success(StatusCode::CREATED, data)
    }

    /// 一覧レスポンス（件数付き）
    pub fn list<T: Serialize>(items: &[T]) -> AppResult<Self> {
        Ok(Self::success(StatusCode::OK, &items)?.with_field("count", items.len()))
    }

    /// 削除成功レスポンス（`data` は空オブジェクト）
    pub fn deleted() -> Self {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        body.insert("data".to_string(), Value::Object(Map::new()));
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Json(body),
        }
    }

    /// テキストレスポンス
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            status: StatusCode::OK,
            body: ResponseBody::Text(text.into()),
        }
    }

    /// 本文なしのレスポンス（CORSプリフライト用）
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: ResponseBody::Empty,
        }
    }

    /// エラーレスポンス
    ///
    /// サーバー側のエラーは詳細をログに出力し、クライアントには汎用メッセージのみ返す。
    pub fn error(error: &AppError) -> Self {
        let status = error.status_code();

        if status.is_server_error() {
            match error.severity() {
                ErrorSeverity::Critical | ErrorSeverity::High => {
                    log::error!("リクエスト処理エラー: {}", error.details())
                }
                _ => log::warn!("リクエスト処理エラー: {}", error.details()),
            }
        } else {
            log::debug!("クライアントエラー: status={status}, {}", error.details());
        }

        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert(
            "message".to_string(),
            Value::String(error.user_message().to_string()),
        );

        Self {
            status,
            body: ResponseBody::Json(body),
        }
    }

    /// エンベロープにフィールドを追加する（`count`、`token`、`month` など）
    pub fn with_field<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        if let ResponseBody::Json(body) = &mut self.body {
            body.insert(key.to_string(), value.into());
        }
        self
    }

    /// ステータスコードを変更する
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// JSON本文を取得する（テスト・ログ用）
    pub fn json(&self) -> Option<&Map<String, Value>> {
        match &self.body {
            ResponseBody::Json(body) => Some(body),
            _ => None,
        }
    }

    fn success<T: Serialize>(status: StatusCode, data: &T) -> AppResult<Self> {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(true));
        body.insert("data".to_string(), serde_json::to_value(data)?);
        Ok(Self {
            status,
            body: ResponseBody::Json(body),
        })
    }

    /// hyperのレスポンスに変換する（CORSヘッダー付き）
    pub fn into_hyper(self) -> Response<Full<Bytes>> {
        let (content_type, bytes) = match self.body {
            ResponseBody::Json(body) => match serde_json::to_vec(&Value::Object(body)) {
                Ok(bytes) => ("application/json; charset=utf-8", Bytes::from(bytes)),
                Err(e) => {
                    log::error!("レスポンスのシリアライズに失敗: {e}");
                    return fallback_response();
                }
            },
            ResponseBody::Text(text) => ("text/plain; charset=utf-8", Bytes::from(text)),
            ResponseBody::Empty => ("text/plain; charset=utf-8", Bytes::new()),
        };

        Response::builder()
            .status(self.status)
            .header("Content-Type", content_type)
            .header("Access-Control-Allow-Origin", "*")
            .header(
                "Access-Control-Allow-Methods",
                "GET, POST, PUT, DELETE, OPTIONS",
            )
            .header("Access-Control-Allow-Headers", "Authorization, Content-Type")
            .body(Full::new(bytes))
            .unwrap_or_else(|e| {
                log::error!("レスポンスの構築に失敗: {e}");
                fallback_response()
            })
    }
}

fn fallback_response() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(
        br#"{"success":false,"message":"server error"}"#,
    )));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}
