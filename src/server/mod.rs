//! JSON over HTTP/1.1 のAPIサーバー

/// リクエスト単位の構造化ログ
pub mod logger;

/// JSONレスポンスとエラー変換
pub mod response;

/// ルーティング
pub mod router;

use crate::shared::errors::AppResult;
use crate::AppState;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

pub use logger::{LogEntry, RequestLogger};
pub use router::handle_request;

/// APIサーバー
pub struct HttpServer {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl HttpServer {
    /// 指定アドレスで待ち受けを開始する
    ///
    /// # 引数
    /// * `addr` - 待ち受けアドレス（ポート0で空きポートを自動選択）
    /// * `state` - 共有するアプリケーション状態
    pub async fn bind(addr: SocketAddr, state: Arc<AppState>) -> AppResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    /// 実際に待ち受けているアドレス
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// キャンセルされるまで接続を受け付ける
    ///
    /// キャンセル後は新しい接続を受け付けず、処理中の接続は
    /// それぞれのタスクで完了させる。
    ///
    /// # 戻り値
    /// 正常停止時は `Ok(())`、接続受け入れに失敗した場合はエラー
    pub async fn serve(self, shutdown: CancellationToken) -> AppResult<()> {
        let addr = self.local_addr()?;
        log::info!("APIサーバーを開始しました: http://{addr}");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("停止要求を受信したため、APIサーバーを停止します");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        log::debug!("接続を受け付けました: {peer}");
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            handle_connection(stream, state).await;
                        });
                    }
                    Err(e) => {
                        log::error!("接続受け入れエラー: {e}");
                        shutdown.cancel();
                        return Err(e.into());
                    }
                }
            }
        }
    }
}

/// TCP接続を処理する
async fn handle_connection(stream: TcpStream, state: Arc<AppState>) {
    let io = TokioIo::new(stream);

    let service = service_fn(move |req| {
        let state = Arc::clone(&state);
        async move { Ok::<_, Infallible>(handle_request(req, state).await) }
    });

    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
        log::error!("HTTP接続処理エラー: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::db::SqliteStore;
    use crate::features::reports::aggregator::CostAggregator;
    use crate::features::subscriptions::service::SubscriptionService;
    use crate::features::subscriptions::validation::RequestValidator;
    use rusqlite::Connection;
    use serde_json::{json, Value};

    fn create_state() -> Arc<AppState> {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let store = Arc::new(SqliteStore::new(conn));
        let service = SubscriptionService::new(store.clone(), store, CostAggregator::new());
        Arc::new(AppState::new(
            service,
            RequestValidator::new(),
            RequestLogger::new(),
        ))
    }

    #[tokio::test]
    async fn test_end_to_end_over_socket() {
        let server = HttpServer::bind(SocketAddr::from(([127, 0, 0, 1], 0)), create_state())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.serve(shutdown.clone()));

        let base = format!("http://{addr}");
        let client = reqwest::Client::new();
        let user = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

        let health = client.get(format!("{base}/health")).send().await.unwrap();
        assert_eq!(health.status(), reqwest::StatusCode::OK);

        for (name, price, start, end) in [
            ("First", 100, "01-2024", Some("03-2024")),
            ("Second", 200, "02-2024", None),
        ] {
            let mut body = json!({
                "service": {"name": name, "price": price},
                "user_id": user,
                "start_date": start,
            });
            if let Some(end) = end {
                body["end_date"] = json!(end);
            }
            let response = client
                .post(format!("{base}/api/v1/subscriptions"))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        }

        let total: Value = client
            .get(format!("{base}/api/v1/subscriptions/total-cost"))
            .query(&[
                ("user_id", user),
                ("start_date", "01-2024"),
                ("end_date", "04-2024"),
            ])
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(total, json!({"total": 500}));

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_serve_stops_when_cancelled() {
        let server = HttpServer::bind(SocketAddr::from(([127, 0, 0, 1], 0)), create_state())
            .await
            .unwrap();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        assert!(server.serve(shutdown).await.is_ok());
    }
}
