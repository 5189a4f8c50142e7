use crate::shared::errors::{AppError, AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// IDを持つ保存対象のレコード
pub trait Record {
    fn record_id(&self) -> &str;
}

/// JSONファイル1つに保存されるコレクション
///
/// 起動時に全件をメモリへ読み込み、変更のたびに一時ファイル経由でファイル全体を書き直す。
pub struct JsonCollection<T> {
    /// 保存先ファイル
    path: PathBuf,
    /// メモリ上のレコード
    records: Mutex<Vec<T>>,
}

impl<T> JsonCollection<T>
where
    T: Record + Clone + Serialize + DeserializeOwned,
{
    /// コレクションを開く（ファイルがなければ空で作成）
    ///
    /// # 引数
    /// * `data_dir` - データディレクトリ
    /// * `name` - コレクション名（ファイル名は `{name}.json`）
    ///
    /// # 戻り値
    /// コレクション、または読み込み失敗時はエラー
    pub fn open(data_dir: &Path, name: &str) -> AppResult<Self> {
        if !data_dir.exists() {
            std::fs::create_dir_all(data_dir)?;
            log::info!("データディレクトリを作成: {data_dir:?}");
        }

        let path = data_dir.join(format!("{name}.json"));
        let records: Vec<T> = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };

        log::debug!(
            "JSONコレクションを読み込みました: name={name}, count={}",
            records.len()
        );

        let collection = Self {
            path,
            records: Mutex::new(records),
        };

        if !collection.path.exists() {
            collection.persist(&[])?;
        }

        Ok(collection)
    }

    /// 条件に一致するレコードを取得する
    pub fn filter<F>(&self, predicate: F) -> AppResult<Vec<T>>
    where
        F: Fn(&T) -> bool,
    {
        let records = self.lock()?;
        Ok(records.iter().filter(|r| predicate(r)).cloned().collect())
    }

    /// 条件に一致する最初のレコードを取得する
    pub fn find<F>(&self, predicate: F) -> AppResult<Option<T>>
    where
        F: Fn(&T) -> bool,
    {
        let records = self.lock()?;
        Ok(records.iter().find(|r| predicate(r)).cloned())
    }

    /// IDでレコードを取得する
    pub fn get(&self, id: &str) -> AppResult<Option<T>> {
        self.find(|r| r.record_id() == id)
    }

    /// レコードを追加する
    ///
    /// # 引数
    /// * `record` - 追加するレコード
    /// * `conflicts` - 既存レコードとの重複判定（重複があればエラーメッセージを返す）
    pub fn insert<F>(&self, record: T, conflicts: F) -> AppResult<()>
    where
        F: Fn(&T) -> Option<String>,
    {
        let mut records = self.lock()?;

        if records.iter().any(|r| r.record_id() == record.record_id()) {
            return Err(AppError::Database(format!(
                "IDが重複しています: {}",
                record.record_id()
            )));
        }
        if let Some(message) = records.iter().find_map(|r| conflicts(r)) {
            return Err(AppError::validation(message));
        }

        let mut next = records.clone();
        next.push(record);
        self.commit(&mut records, next)
    }

    /// レコードを置き換える
    ///
    /// # 戻り値
    /// 置き換えた場合はtrue、IDが存在しない場合はfalse
    pub fn replace<F>(&self, record: T, conflicts: F) -> AppResult<bool>
    where
        F: Fn(&T) -> Option<String>,
    {
        let mut records = self.lock()?;

        if let Some(message) = records
            .iter()
            .filter(|r| r.record_id() != record.record_id())
            .find_map(|r| conflicts(r))
        {
            return Err(AppError::validation(message));
        }

        let Some(index) = records
            .iter()
            .position(|r| r.record_id() == record.record_id())
        else {
            return Ok(false);
        };

        let mut next = records.clone();
        next[index] = record;
        self.commit(&mut records, next)?;
        Ok(true)
    }

    /// レコードを削除する
    ///
    /// # 戻り値
    /// 削除した場合はtrue、IDが存在しない場合はfalse
    pub fn remove(&self, id: &str) -> AppResult<bool> {
        let mut records = self.lock()?;

        if !records.iter().any(|r| r.record_id() == id) {
            return Ok(false);
        }

        let next: Vec<T> = records
            .iter()
            .filter(|r| r.record_id() != id)
            .cloned()
            .collect();
        self.commit(&mut records, next)?;
        Ok(true)
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Vec<T>>> {
        self.records
            .lock()
            .map_err(|e| AppError::concurrency(format!("コレクションのロック取得失敗: {e}")))
    }

    /// 書き込みに成功した場合のみメモリ上のレコードを差し替える
    fn commit(&self, records: &mut Vec<T>, next: Vec<T>) -> AppResult<()> {
        self.persist(&next)?;
        *records = next;
        Ok(())
    }

    /// ファイル全体を書き直す（一時ファイルに書いてからリネーム）
    fn persist(&self, records: &[T]) -> AppResult<()> {
        let data = serde_json::to_vec_pretty(records)?;
        let temp_path = self.path.with_extension("json.tmp");

        std::fs::write(&temp_path, &data)?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }
}
