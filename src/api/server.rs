use crate::api::router::dispatch;
use crate::api::{ApiRequest, ApiResponse};
use crate::shared::errors::AppResult;
use crate::AppState;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// 待ち受けソケットを作成する
pub async fn bind(addr: SocketAddr) -> AppResult<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("APIサーバーを開始しました: http://{}", listener.local_addr()?);
    Ok(listener)
}

/// 接続を受け付け、停止シグナルを受けるまでリクエストを処理する
///
/// # 引数
/// * `listener` - 待ち受けソケット
/// * `state` - アプリケーション状態
/// * `shutdown` - 停止シグナル
pub async fn serve(listener: TcpListener, state: Arc<AppState>, shutdown: CancellationToken) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                log::info!("APIサーバーを停止します");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        handle_connection(stream, peer, state).await;
                    });
                }
                Err(e) => {
                    // 受け入れエラーではループを抜けない
                    log::error!("接続受け入れエラー: {e}");
                }
            }
        }
    }
}

/// TCP接続を処理する
async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<AppState>) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| handle_request(req, Arc::clone(&state)));

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        log::error!("HTTP接続処理エラー: peer={peer}, error={err}");
    }
}

/// HTTPリクエストを処理する
async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    log::debug!("リクエストを受信: {} {}", req.method(), req.uri());

    let response = match ApiRequest::from_hyper(req).await {
        Ok(request) => {
            let response = dispatch(&state, &request).await;
            log::info!(
                "{} {} -> {}",
                request.method,
                request.path,
                response.status.as_u16()
            );
            response
        }
        Err(e) => ApiResponse::error(&e),
    };

    Ok(response.into_hyper())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::insights::provider::InsightProvider;
    use crate::repositories::Storage;
    use crate::shared::config::ServerConfig;
    use crate::shared::errors::AppError;
    use async_trait::async_trait;
    use serde_json::{json, Value};

    struct NoProvider;

    #[async_trait]
    impl InsightProvider for NoProvider {
        async fn generate(&self, _prompt: &str) -> AppResult<String> {
            Err(AppError::configuration("未設定"))
        }
    }

    async fn start() -> (String, CancellationToken, tokio::task::JoinHandle<()>) {
        let state = Arc::new(AppState::new(
            ServerConfig::for_tests(),
            Storage::in_memory().unwrap(),
            Arc::new(NoProvider),
        ));
        let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, state, shutdown.clone()));
        (base, shutdown, handle)
    }

    #[tokio::test]
    async fn test_serves_requests_over_http() {
        let (base, shutdown, handle) = start().await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(health.status(), 200);
        assert_eq!(health.headers()["access-control-allow-origin"], "*");

        let registered: Value = client
            .post(format!("{base}/api/auth/register"))
            .json(&json!({"name": "HTTP", "email": "http@example.com", "password": "secret123"}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let token = registered["token"].as_str().unwrap();

        let created = client
            .post(format!("{base}/api/transactions"))
            .bearer_auth(token)
            .json(&json!({
                "type": "expense",
                "category": "Dining Out",
                "amount": 8.5,
                "currency": "EUR"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), 201);

        let list: Value = client
            .get(format!("{base}/api/transactions?category=Dining%20Out"))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(list["count"], 1);

        let unauthorized = client
            .get(format!("{base}/api/budgets"))
            .send()
            .await
            .unwrap();
        assert_eq!(unauthorized.status(), 401);

        shutdown.cancel();
        handle.await.unwrap();
    }
}
