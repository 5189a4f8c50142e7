use crate::api::{ApiRequest, ApiResponse};
use crate::features::auth::models::{
    AuthSession, LoginDto, RegisterDto, UpdateDetailsDto, UpdatePasswordDto, User,
};
use crate::shared::errors::AppResult;
use crate::AppState;
use hyper::StatusCode;

/// ユーザー登録（201、トークン付き）
pub fn register(state: &AppState, req: &ApiRequest) -> AppResult<ApiResponse> {
    let dto: RegisterDto = req.json()?;
    let session = state.auth_service.register(dto)?;
    session_response(session, StatusCode::CREATED)
}

/// ログイン
pub fn login(state: &AppState, req: &ApiRequest) -> AppResult<ApiResponse> {
    let dto: LoginDto = req.json()?;
    let session = state.auth_service.login(dto)?;
    session_response(session, StatusCode::OK)
}

/// ログイン中のユーザー情報を取得する
pub fn me(state: &AppState, user: &User) -> AppResult<ApiResponse> {
    let user = state.auth_service.get_user(&user.id)?;
    ApiResponse::ok(&user)
}

/// ユーザー情報を更新する
pub fn update_details(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let dto: UpdateDetailsDto = req.json()?;
    let updated = state.auth_service.update_details(&user.id, dto)?;
    ApiResponse::ok(&updated)
}

/// パスワードを更新する（新しいトークンを返す）
pub fn update_password(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let dto: UpdatePasswordDto = req.json()?;
    let session = state.auth_service.update_password(&user.id, dto)?;
    session_response(session, StatusCode::OK)
}

fn session_response(session: AuthSession, status: StatusCode) -> AppResult<ApiResponse> {
    Ok(ApiResponse::ok(&session.user)?
        .with_status(status)
        .with_field("token", session.token))
}
