use crate::features::auth::models::{
    AuthError, AuthSession, Claims, LoginDto, RegisterDto, UpdateDetailsDto, UpdatePasswordDto,
    User, UserRecord,
};
use crate::features::auth::repository::UserRepository;
use crate::shared::config::ServerConfig;
use crate::shared::currency::Currency;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::current_timestamp;
use crate::shared::utils::validation::{trimmed, Validator};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;

const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_NAME_LENGTH: usize = 50;

/// 認証サービス（パスワード認証とJWT発行）
#[derive(Clone)]
pub struct AuthService {
    /// ユーザーリポジトリ
    users: Arc<dyn UserRepository>,
    /// JWT署名用シークレット
    jwt_secret: String,
    /// JWTの有効日数
    jwt_expire_days: i64,
    /// bcryptのコスト
    bcrypt_cost: u32,
}

impl AuthService {
    /// 新しいAuthServiceを作成する
    ///
    /// # 引数
    /// * `users` - ユーザーリポジトリ
    /// * `config` - サーバー設定
    ///
    /// # 戻り値
    /// AuthServiceインスタンス
    pub fn new(users: Arc<dyn UserRepository>, config: &ServerConfig) -> Self {
        log::info!(
            "AuthServiceを初期化しました: jwt_expire_days={}",
            config.jwt_expire_days
        );

        Self {
            users,
            jwt_secret: config.jwt_secret.clone(),
            jwt_expire_days: config.jwt_expire_days,
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// ユーザーを登録する
    ///
    /// # 引数
    /// * `dto` - 登録リクエスト
    ///
    /// # 戻り値
    /// 発行されたトークンとユーザー情報
    pub fn register(&self, dto: RegisterDto) -> AppResult<AuthSession> {
        let mut validator = Validator::new();
        validator.required_text(dto.name.as_deref(), "名前を入力してください");
        validator.max_chars(
            dto.name.as_deref(),
            MAX_NAME_LENGTH,
            "名前は50文字以内で入力してください",
        );
        validator.required_text(dto.email.as_deref(), "メールアドレスを入力してください");
        validator.email(dto.email.as_deref());
        validate_password(&mut validator, dto.password.as_deref());
        let currency = validator.currency(dto.default_currency.as_deref());
        validator.finish()?;

        let email = normalize_email(dto.email.as_deref().unwrap_or_default());
        if self.users.find_by_email(&email)?.is_some() {
            log::warn!("既に登録済みのメールアドレスで登録が試行されました");
            return Err(AuthError::EmailTaken.into());
        }

        let record = UserRecord {
            user: User {
                id: uuid::Uuid::new_v4().to_string(),
                name: trimmed(dto.name).unwrap_or_default(),
                email,
                default_currency: currency.unwrap_or(Currency::Usd),
                created_at: current_timestamp(),
            },
            password_hash: self.hash_password(dto.password.as_deref().unwrap_or_default())?,
        };

        self.users.create(&record)?;
        log::info!("ユーザーを登録しました: user_id={}", record.user.id);

        self.session_for(record.user)
    }

    /// メールアドレスとパスワードでログインする
    pub fn login(&self, dto: LoginDto) -> AppResult<AuthSession> {
        let (email, password) = match (trimmed(dto.email), dto.password) {
            (Some(email), Some(password)) if !password.is_empty() => (email, password),
            _ => {
                return Err(AppError::validation(
                    "メールアドレスとパスワードを入力してください",
                ))
            }
        };

        let record = self
            .users
            .find_by_email(&normalize_email(&email))?
            .ok_or(AuthError::InvalidCredentials)?;

        if !bcrypt::verify(&password, &record.password_hash)? {
            log::warn!("ログインに失敗しました: user_id={}", record.user.id);
            return Err(AuthError::InvalidCredentials.into());
        }

        log::info!("ログインしました: user_id={}", record.user.id);
        self.session_for(record.user)
    }

    /// ユーザー情報を取得する
    pub fn get_user(&self, user_id: &str) -> AppResult<User> {
        self.users
            .find_by_id(user_id)?
            .map(|record| record.user)
            .ok_or_else(|| AppError::not_found("ユーザー"))
    }

    /// ユーザー情報（名前・メールアドレス・既定通貨）を更新する
    pub fn update_details(&self, user_id: &str, dto: UpdateDetailsDto) -> AppResult<User> {
        let mut validator = Validator::new();
        if dto.name.is_some() {
            validator.required_text(dto.name.as_deref(), "名前を入力してください");
            validator.max_chars(
                dto.name.as_deref(),
                MAX_NAME_LENGTH,
                "名前は50文字以内で入力してください",
            );
        }
        validator.email(dto.email.as_deref());
        let currency = validator.currency(dto.default_currency.as_deref());
        validator.finish()?;

        let mut record = self
            .users
            .find_by_id(user_id)?
            .ok_or_else(|| AppError::not_found("ユーザー"))?;

        if let Some(name) = trimmed(dto.name) {
            record.user.name = name;
        }
        if let Some(email) = dto.email {
            record.user.email = normalize_email(&email);
        }
        if let Some(currency) = currency {
            record.user.default_currency = currency;
        }

        self.users.update(&record)?;
        log::info!("ユーザー情報を更新しました: user_id={user_id}");

        Ok(record.user)
    }

    /// パスワードを更新し、新しいトークンを発行する
    pub fn update_password(&self, user_id: &str, dto: UpdatePasswordDto) -> AppResult<AuthSession> {
        let mut validator = Validator::new();
        validator.required_text(
            dto.current_password.as_deref(),
            "現在のパスワードを入力してください",
        );
        validate_password(&mut validator, dto.new_password.as_deref());
        validator.finish()?;

        let mut record = self
            .users
            .find_by_id(user_id)?
            .ok_or_else(|| AppError::not_found("ユーザー"))?;

        let current = dto.current_password.unwrap_or_default();
        if !bcrypt::verify(&current, &record.password_hash)? {
            log::warn!("パスワード更新で現在のパスワードが一致しません: user_id={user_id}");
            return Err(AuthError::IncorrectPassword.into());
        }

        record.password_hash = self.hash_password(&dto.new_password.unwrap_or_default())?;
        self.users.update(&record)?;
        log::info!("パスワードを更新しました: user_id={user_id}");

        self.session_for(record.user)
    }

    /// トークンを検証し、ユーザーIDを返す
    ///
    /// # 引数
    /// * `token` - JWT
    ///
    /// # 戻り値
    /// トークンのクレーム、または無効・期限切れの場合はエラー
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
    }

    /// トークンからユーザーを取得する
    pub fn validate_session(&self, token: &str) -> AppResult<User> {
        let claims = self.verify_token(token)?;
        self.users
            .find_by_id(&claims.sub)?
            .map(|record| record.user)
            .ok_or_else(|| AuthError::UserNotFound.into())
    }

    /// ユーザーIDに対してトークンを発行する
    pub fn issue_token(&self, user_id: &str) -> AppResult<String> {
        self.issue_token_at(user_id, Utc::now())
    }

    fn issue_token_at(&self, user_id: &str, issued_at: DateTime<Utc>) -> AppResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::days(self.jwt_expire_days)).timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    fn session_for(&self, user: User) -> AppResult<AuthSession> {
        let token = self.issue_token(&user.id)?;
        Ok(AuthSession { token, user })
    }

    fn hash_password(&self, password: &str) -> AppResult<String> {
        Ok(bcrypt::hash(password, self.bcrypt_cost)?)
    }
}

fn validate_password(validator: &mut Validator, password: Option<&str>) {
    match password {
        Some(password) if password.chars().count() >= MIN_PASSWORD_LENGTH => {}
        Some(_) => validator.push("パスワードは6文字以上で入力してください"),
        None => validator.push("パスワードを入力してください"),
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::repository::SqliteUserRepository;
    use crate::shared::config::ServerConfig;
    use crate::shared::database::create_in_memory_connection;
    use std::sync::Mutex;

    fn setup_test_auth_service() -> AuthService {
        let conn = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        let users: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(conn));
        AuthService::new(users, &ServerConfig::for_tests())
    }

    fn register_dto(email: &str) -> RegisterDto {
        RegisterDto {
            name: Some("山田花子".to_string()),
            email: Some(email.to_string()),
            password: Some("secret123".to_string()),
            default_currency: Some("EUR".to_string()),
        }
    }

    #[test]
    fn test_register_and_login() {
        let service = setup_test_auth_service();

        let registered = service.register(register_dto("Hanako@Example.com")).unwrap();
        assert_eq!(registered.user.email, "hanako@example.com");
        assert_eq!(registered.user.default_currency, Currency::Eur);
        assert!(!registered.token.is_empty());

        let logged_in = service
            .login(LoginDto {
                email: Some("hanako@example.com".to_string()),
                password: Some("secret123".to_string()),
            })
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
    }

    #[test]
    fn test_register_rejects_duplicate_email() {
        let service = setup_test_auth_service();
        service.register(register_dto("dup@example.com")).unwrap();

        let result = service.register(register_dto("DUP@example.com"));
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_register_validation_messages() {
        let service = setup_test_auth_service();
        let result = service.register(RegisterDto {
            name: None,
            email: Some("invalid".to_string()),
            password: Some("123".to_string()),
            default_currency: Some("JPY".to_string()),
        });

        match result {
            Err(AppError::Validation(message)) => {
                assert!(message.contains("名前を入力してください"));
                assert!(message.contains("有効なメールアドレス"));
                assert!(message.contains("6文字以上"));
                assert!(message.contains("JPY"));
            }
            other => panic!("バリデーションエラーが期待されます: {other:?}"),
        }
    }

    #[test]
    fn test_login_with_wrong_password() {
        let service = setup_test_auth_service();
        service.register(register_dto("taro@example.com")).unwrap();

        let result = service.login(LoginDto {
            email: Some("taro@example.com".to_string()),
            password: Some("wrong-password".to_string()),
        });
        assert!(matches!(result, Err(AppError::Unauthorized(_))));

        let unknown = service.login(LoginDto {
            email: Some("nobody@example.com".to_string()),
            password: Some("secret123".to_string()),
        });
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_token_round_trip() {
        let service = setup_test_auth_service();
        let session = service.register(register_dto("jwt@example.com")).unwrap();

        let user = service.validate_session(&session.token).unwrap();
        assert_eq!(user.id, session.user.id);
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = setup_test_auth_service();
        let token = service
            .issue_token_at("user-1", Utc::now() - Duration::days(31))
            .unwrap();

        assert!(matches!(
            service.verify_token(&token),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = setup_test_auth_service();
        let token = service.issue_token("user-1").unwrap();

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            service.verify_token(&tampered),
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service.verify_token("not-a-jwt"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_for_deleted_user_is_unauthorized() {
        let service = setup_test_auth_service();
        let token = service.issue_token("ghost").unwrap();

        let result = service.validate_session(&token);
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_update_details_and_password() {
        let service = setup_test_auth_service();
        let session = service.register(register_dto("old@example.com")).unwrap();
        let user_id = session.user.id.clone();

        let updated = service
            .update_details(
                &user_id,
                UpdateDetailsDto {
                    name: None,
                    email: Some("new@example.com".to_string()),
                    default_currency: Some("INR".to_string()),
                },
            )
            .unwrap();
        assert_eq!(updated.email, "new@example.com");
        assert_eq!(updated.default_currency, Currency::Inr);
        assert_eq!(updated.name, "山田花子");

        let wrong = service.update_password(
            &user_id,
            UpdatePasswordDto {
                current_password: Some("nope".to_string()),
                new_password: Some("newsecret".to_string()),
            },
        );
        assert!(matches!(wrong, Err(AppError::Unauthorized(_))));

        service
            .update_password(
                &user_id,
                UpdatePasswordDto {
                    current_password: Some("secret123".to_string()),
                    new_password: Some("newsecret".to_string()),
                },
            )
            .unwrap();

        let relogin = service.login(LoginDto {
            email: Some("new@example.com".to_string()),
            password: Some("newsecret".to_string()),
        });
        assert!(relogin.is_ok());
    }
}
