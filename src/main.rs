#[tokio::main]
async fn main() {
    if let Err(e) = subscription_tracker_lib::run().await {
        log::error!("アプリケーションの実行中にエラーが発生しました: {e}");
        eprintln!("アプリケーションの実行中にエラーが発生しました: {e}");
        std::process::exit(1);
    }
}
