use serde::Serialize;

/// 推奨カテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SuggestedCategory {
    pub name: &'static str,
    pub description: &'static str,
}

const fn category(name: &'static str, description: &'static str) -> SuggestedCategory {
    SuggestedCategory { name, description }
}

/// 支出カテゴリ
pub const EXPENSE_CATEGORIES: [SuggestedCategory; 20] = [
    category("Housing", "家賃、住宅ローン、固定資産税、火災保険"),
    category("Utilities", "電気、水道、ガス、インターネット、電話"),
    category("Groceries", "スーパーでの食料品・日用品"),
    category("Transportation", "燃料、公共交通機関、車の整備、駐車場"),
    category("Healthcare", "医療費、薬代、医療保険"),
    category("Insurance", "生命保険、自動車保険などの保険料"),
    category("Dining Out", "外食、カフェ、フードデリバリー"),
    category("Entertainment", "映画、コンサート、動画配信、趣味"),
    category("Shopping", "衣類、家電、身の回り品"),
    category("Education", "学費、書籍、講座、奨学金の返済"),
    category("Travel", "旅行、航空券、ホテル、ツアー"),
    category("Debt Payments", "クレジットカードの支払い、ローン返済"),
    category("Gifts & Donations", "贈り物、寄付"),
    category("Subscriptions", "デジタルサービス、会員費、ソフトウェア"),
    category("Personal Care", "美容院、ジム、スパ、身だしなみ用品"),
    category("Childcare", "保育、ベビーシッター、学校関連の費用"),
    category("Pet Care", "ペットフード、動物病院、ペット用品"),
    category("Home Maintenance", "修理、清掃、家具、家電"),
    category("Taxes", "所得税、固定資産税、その他の税金"),
    category("Miscellaneous", "その他の支出"),
];

/// 収入カテゴリ
pub const INCOME_CATEGORIES: [SuggestedCategory; 9] = [
    category("Salary", "給与"),
    category("Freelance", "フリーランス・業務委託の収入"),
    category("Business", "事業収入"),
    category("Investments", "配当、利息、売却益"),
    category("Rental Income", "不動産の賃貸収入"),
    category("Gifts", "贈与として受け取ったお金"),
    category("Refunds", "返品・過払いによる返金"),
    category("Government Benefits", "年金、失業給付など"),
    category("Other Income", "その他の収入"),
];

/// 推奨カテゴリ一覧（支出・収入）
#[derive(Debug, Clone, Serialize)]
pub struct SuggestedCategories {
    pub expense: &'static [SuggestedCategory],
    pub income: &'static [SuggestedCategory],
}

pub fn suggested_categories() -> SuggestedCategories {
    SuggestedCategories {
        expense: &EXPENSE_CATEGORIES,
        income: &INCOME_CATEGORIES,
    }
}
