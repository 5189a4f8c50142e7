use crate::api::{ApiRequest, ApiResponse};
use crate::features::auth::handlers as auth;
use crate::features::budgets::handlers as budgets;
use crate::features::goals::handlers as goals;
use crate::features::insights::handlers as insights;
use crate::features::reminders::handlers as reminders;
use crate::features::transactions::handlers as transactions;
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use hyper::Method;

/// ヘルスチェックの応答文
pub const HEALTH_MESSAGE: &str = "Kakeibo API is running";

/// 解決済みのルート
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Health,
    Preflight,
    Register,
    Login,
    Me,
    UpdateDetails,
    UpdatePassword,
    ListTransactions,
    CreateTransaction,
    TransactionSummary,
    GetTransaction(&'a str),
    UpdateTransaction(&'a str),
    DeleteTransaction(&'a str),
    ListBudgets,
    CreateBudget,
    BudgetStatus,
    GetBudget(&'a str),
    UpdateBudget(&'a str),
    DeleteBudget(&'a str),
    ListGoals,
    CreateGoal,
    GetGoal(&'a str),
    UpdateGoal(&'a str),
    DeleteGoal(&'a str),
    GoalProgress(&'a str),
    ListReminders,
    CreateReminder,
    DefaultReminders,
    GetReminder(&'a str),
    UpdateReminder(&'a str),
    DeleteReminder(&'a str),
    Advice,
    Categories,
}

impl Route<'_> {
    /// 認証なしでアクセスできるルートかどうか
    fn is_public(&self) -> bool {
        matches!(
            self,
            Route::Health | Route::Preflight | Route::Register | Route::Login
        )
    }
}

/// メソッドとパスセグメントからルートを解決する
fn resolve<'a>(method: &Method, segments: &[&'a str]) -> Option<Route<'a>> {
    if *method == Method::OPTIONS {
        return Some(Route::Preflight);
    }

    let route = match (method.as_str(), segments) {
        ("GET", &[]) => Route::Health,

        ("POST", &["api", "auth", "register"]) => Route::Register,
        ("POST", &["api", "auth", "login"]) => Route::Login,
        ("GET", &["api", "auth", "me"]) => Route::Me,
        ("PUT", &["api", "auth", "updatedetails"]) => Route::UpdateDetails,
        ("PUT", &["api", "auth", "updatepassword"]) => Route::UpdatePassword,

        ("GET", &["api", "transactions"]) => Route::ListTransactions,
        ("POST", &["api", "transactions"]) => Route::CreateTransaction,
        ("GET", &["api", "transactions", "summary"]) => Route::TransactionSummary,
        ("GET", &["api", "transactions", id]) => Route::GetTransaction(id),
        ("PUT", &["api", "transactions", id]) => Route::UpdateTransaction(id),
        ("DELETE", &["api", "transactions", id]) => Route::DeleteTransaction(id),

        ("GET", &["api", "budgets"]) => Route::ListBudgets,
        ("POST", &["api", "budgets"]) => Route::CreateBudget,
        ("GET", &["api", "budgets", "status"]) => Route::BudgetStatus,
        ("GET", &["api", "budgets", id]) => Route::GetBudget(id),
        ("PUT", &["api", "budgets", id]) => Route::UpdateBudget(id),
        ("DELETE", &["api", "budgets", id]) => Route::DeleteBudget(id),

        ("GET", &["api", "goals"]) => Route::ListGoals,
        ("POST", &["api", "goals"]) => Route::CreateGoal,
        ("GET", &["api", "goals", id]) => Route::GetGoal(id),
        ("PUT", &["api", "goals", id]) => Route::UpdateGoal(id),
        ("DELETE", &["api", "goals", id]) => Route::DeleteGoal(id),
        ("PUT", &["api", "goals", id, "progress"]) => Route::GoalProgress(id),

        ("GET", &["api", "reminders"]) => Route::ListReminders,
        ("POST", &["api", "reminders"]) => Route::CreateReminder,
        ("POST", &["api", "reminders", "defaults"]) => Route::DefaultReminders,
        ("GET", &["api", "reminders", id]) => Route::GetReminder(id),
        ("PUT", &["api", "reminders", id]) => Route::UpdateReminder(id),
        ("DELETE", &["api", "reminders", id]) => Route::DeleteReminder(id),

        ("POST", &["api", "ai", "advice"]) => Route::Advice,
        ("GET", &["api", "ai", "categories"]) => Route::Categories,

        _ => return None,
    };

    Some(route)
}

/// リクエストを処理し、レスポンスを返す
///
/// ハンドラーのエラーはここでエラーレスポンスに変換される。
pub async fn dispatch(state: &AppState, req: &ApiRequest) -> ApiResponse {
    match handle(state, req).await {
        Ok(response) => response,
        Err(e) => ApiResponse::error(&e),
    }
}

async fn handle(state: &AppState, req: &ApiRequest) -> AppResult<ApiResponse> {
    let segments = req.segments();
    let route = resolve(&req.method, &segments).ok_or_else(|| {
        log::debug!("未対応のリクエスト: {} {}", req.method, req.path);
        AppError::not_found("ルート")
    })?;

    if route.is_public() {
        return match route {
            Route::Health => Ok(ApiResponse::text(HEALTH_MESSAGE)),
            Route::Preflight => Ok(ApiResponse::no_content()),
            Route::Register => auth::register(state, req),
            Route::Login => auth::login(state, req),
            _ => Err(AppError::not_found("ルート")),
        };
    }

    let user = state
        .auth_middleware
        .authenticate_request(req.token.as_deref(), &req.path)?;
    let user = &user;

    match route {
        Route::Me => auth::me(state, user),
        Route::UpdateDetails => auth::update_details(state, user, req),
        Route::UpdatePassword => auth::update_password(state, user, req),

        Route::ListTransactions => transactions::list_transactions(state, user, req),
        Route::CreateTransaction => transactions::create_transaction(state, user, req),
        Route::TransactionSummary => transactions::transaction_summary(state, user, req),
        Route::GetTransaction(id) => transactions::get_transaction(state, user, id),
        Route::UpdateTransaction(id) => transactions::update_transaction(state, user, id, req),
        Route::DeleteTransaction(id) => transactions::delete_transaction(state, user, id),

        Route::ListBudgets => budgets::list_budgets(state, user, req),
        Route::CreateBudget => budgets::create_budget(state, user, req),
        Route::BudgetStatus => budgets::budget_status(state, user, req),
        Route::GetBudget(id) => budgets::get_budget(state, user, id),
        Route::UpdateBudget(id) => budgets::update_budget(state, user, id, req),
        Route::DeleteBudget(id) => budgets::delete_budget(state, user, id),

        Route::ListGoals => goals::list_goals(state, user, req),
        Route::CreateGoal => goals::create_goal(state, user, req),
        Route::GetGoal(id) => goals::get_goal(state, user, id),
        Route::UpdateGoal(id) => goals::update_goal(state, user, id, req),
        Route::DeleteGoal(id) => goals::delete_goal(state, user, id),
        Route::GoalProgress(id) => goals::add_goal_progress(state, user, id, req),

        Route::ListReminders => reminders::list_reminders(state, user, req),
        Route::CreateReminder => reminders::create_reminder(state, user, req),
        Route::DefaultReminders => reminders::create_default_reminders(state, user),
        Route::GetReminder(id) => reminders::get_reminder(state, user, id),
        Route::UpdateReminder(id) => reminders::update_reminder(state, user, id, req),
        Route::DeleteReminder(id) => reminders::delete_reminder(state, user, id),

        Route::Advice => insights::financial_advice(state, user).await,
        Route::Categories => insights::categories(),

        Route::Health | Route::Preflight | Route::Register | Route::Login => {
            Err(AppError::not_found("ルート"))
        }
    }
}
