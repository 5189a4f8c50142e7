use crate::shared::errors::{AppError, AppResult};

/// ユーザーが所有するリソース
pub trait Owned {
    fn owner_id(&self) -> &str;
}

/// リソースの存在と所有者を確認する
///
/// # 引数
/// * `resource` - 取得したリソース（存在しない場合は None）
/// * `user_id` - リクエストしたユーザーのID
/// * `label` - エラーメッセージ用のリソース名
///
/// # 戻り値
/// 所有者が一致する場合はリソース、存在しない場合は NotFound、他ユーザーの場合は Forbidden
pub fn ensure_owned<T: Owned>(resource: Option<T>, user_id: &str, label: &str) -> AppResult<T> {
    let resource = resource.ok_or_else(|| AppError::not_found(label))?;

    if resource.owner_id() != user_id {
        log::warn!("他ユーザーのリソースへのアクセスを拒否しました: resource={label}, user_id={user_id}");
        return Err(AppError::forbidden(label));
    }

    Ok(resource)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item(&'static str);

    impl Owned for Item {
        fn owner_id(&self) -> &str {
            self.0
        }
    }

    #[test]
    fn test_ensure_owned() {
        assert!(ensure_owned(Some(Item("u1")), "u1", "予算").is_ok());
        assert!(matches!(
            ensure_owned(Some(Item("u2")), "u1", "予算"),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            ensure_owned::<Item>(None, "u1", "予算"),
            Err(AppError::NotFound(_))
        ));
    }
}
