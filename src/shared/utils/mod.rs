use sha2::{Digest, Sha256};
use std::fmt::Display;
use std::time::Duration;

/// 処理が成功するまで指定回数まで再試行する
///
/// # 引数
/// * `operation` - 実行する処理
/// * `attempts` - 最大試行回数（0の場合も1回は実行する）
/// * `delay` - 失敗後の待機時間
///
/// # 戻り値
/// 最初に成功した結果、またはすべて失敗した場合は最後のエラー
pub fn connect_with_tries<T, E, F>(mut operation: F, attempts: u32, delay: Duration) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                log::warn!("接続に失敗しました（{attempt}/{attempts}回目）: {e}");
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// ログ出力用に識別子をハッシュ化する
///
/// ユーザーIDなどをそのままログに残さないために使う。
pub fn hash_identifier(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}
