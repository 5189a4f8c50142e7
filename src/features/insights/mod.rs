/// AIアドバイス機能モジュール
///
/// 直近の取引を既定通貨に換算してプロンプトを作り、`InsightProvider` でアドバイス文を生成する。
pub mod categories;
pub mod handlers;
pub mod prompt;
pub mod provider;

pub use provider::{GeminiProvider, InsightProvider};
