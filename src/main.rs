#[tokio::main]
async fn main() {
    if let Err(e) = kakeibo_server::run().await {
        log::error!("サーバーの実行中にエラーが発生しました: {e}");
        std::process::exit(1);
    }
}
