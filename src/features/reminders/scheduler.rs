use crate::features::reminders::engine::ReminderEngine;
use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// リマインダーの定期巡回を開始する（バックグラウンドで実行）
///
/// 各巡回の完了を待ってから次のtickを待つため、巡回が重なることはない。
///
/// # 引数
/// * `engine` - リマインダーエンジン
/// * `interval` - 巡回間隔
/// * `shutdown` - キャンセルされるとループを終了する
pub fn start_reminder_scheduler(
    engine: ReminderEngine,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "リマインダースケジューラーを開始しました: interval_secs={}",
            interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    log::info!("リマインダースケジューラーを停止しました");
                    break;
                }
                _ = interval_timer.tick() => {
                    if let Err(e) = engine.run_cycle(Utc::now()) {
                        log::error!("リマインダー巡回エラー: {}", e.details());
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::engine::LogNotifier;
    use crate::features::reminders::models::{Frequency, Reminder, ReminderType};
    use crate::features::reminders::repository::{ReminderRepository, SqliteReminderRepository};
    use crate::shared::database::create_in_memory_connection;
    use crate::shared::utils::dates::current_timestamp;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_scheduler_fires_and_stops_on_cancel() {
        let conn = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        let repo = Arc::new(SqliteReminderRepository::new(conn));
        let now = current_timestamp();
        repo.create(&Reminder {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            kind: ReminderType::Custom,
            message: "テスト".to_string(),
            date_time: now - chrono::Duration::minutes(1),
            frequency: Frequency::Once,
            is_active: true,
            created_at: now,
        })
        .unwrap();

        let engine = ReminderEngine::new(repo.clone(), Arc::new(LogNotifier), chrono_tz::UTC);
        let shutdown = CancellationToken::new();
        let handle = start_reminder_scheduler(engine, Duration::from_millis(20), shutdown.clone());

        // 最初のtickは即時に発火する
        let mut fired = false;
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            if !repo.find_by_id("r1").unwrap().unwrap().is_active {
                fired = true;
                break;
            }
        }
        assert!(fired, "リマインダーが処理されていません");

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("スケジューラーが停止しません")
            .unwrap();
    }
}
