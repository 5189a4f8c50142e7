/// HTTP API層（リクエスト解析・ルーティング・レスポンス）
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use request::ApiRequest;
pub use response::ApiResponse;
pub use router::dispatch;
