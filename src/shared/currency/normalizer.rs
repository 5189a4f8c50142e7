use super::{Currency, ExchangeRates};
use serde::Serialize;

/// 金額と通貨を持つレコード
pub trait Monetary {
    /// 記録された金額
    fn amount(&self) -> f64;
    /// 記録された通貨
    fn currency(&self) -> Currency;
}

/// 正規化済みのレコード（元のフィールドはそのまま保持）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalized<T> {
    #[serde(flatten)]
    pub record: T,
    pub normalized_amount: f64,
    pub normalized_currency: Currency,
}

/// レコードの金額を基準通貨に正規化する
///
/// # 引数
/// * `records` - 正規化するレコード
/// * `target` - 基準通貨
/// * `rates` - 為替レート表
///
/// # 戻り値
/// 正規化済みレコードのリスト。金額が数値でないレコードは除外される。
pub fn normalize_amounts<T>(
    records: &[T],
    target: Currency,
    rates: &ExchangeRates,
) -> Vec<Normalized<T>>
where
    T: Monetary + Clone,
{
    let mut normalized = Vec::with_capacity(records.len());

    for record in records {
        let amount = record.amount();
        if !amount.is_finite() {
            log::warn!("金額が不正なレコードを正規化対象から除外しました: amount={amount}");
            continue;
        }

        normalized.push(Normalized {
            record: record.clone(),
            normalized_amount: rates.convert(amount, record.currency(), target),
            normalized_currency: target,
        });
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize)]
    struct Entry {
        label: &'static str,
        amount: f64,
        currency: Currency,
    }

    impl Monetary for Entry {
        fn amount(&self) -> f64 {
            self.amount
        }

        fn currency(&self) -> Currency {
            self.currency
        }
    }

    fn entry(label: &'static str, amount: f64, currency: Currency) -> Entry {
        Entry {
            label,
            amount,
            currency,
        }
    }

    #[test]
    fn test_normalize_converts_and_keeps_fields() {
        let rates = ExchangeRates::default();
        let entries = vec![
            entry("lunch", 10.0, Currency::Usd),
            entry("rent", 100.0, Currency::Eur),
        ];

        let normalized = normalize_amounts(&entries, Currency::Usd, &rates);

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].record.label, "lunch");
        assert_eq!(normalized[0].normalized_amount, 10.0);
        assert!((normalized[1].normalized_amount - 109.0).abs() < 1e-9);
        assert_eq!(normalized[1].record.amount, 100.0);
        assert_eq!(normalized[1].normalized_currency, Currency::Usd);
    }

    #[test]
    fn test_normalize_skips_invalid_amounts() {
        let rates = ExchangeRates::default();
        let entries = vec![
            entry("ok", 5.0, Currency::Inr),
            entry("nan", f64::NAN, Currency::Usd),
            entry("inf", f64::INFINITY, Currency::Eur),
        ];

        let normalized = normalize_amounts(&entries, Currency::Inr, &rates);

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized[0].record.label, "ok");
    }

    #[test]
    fn test_normalized_serialization_flattens_record() {
        let rates = ExchangeRates::default();
        let records = [entry("coffee", 2.0, Currency::Usd)];
        let normalized = normalize_amounts(&records, Currency::Eur, &rates);

        let json = serde_json::to_value(&normalized[0]).unwrap();
        assert_eq!(json["label"], "coffee");
        assert_eq!(json["currency"], "USD");
        assert_eq!(json["normalizedCurrency"], "EUR");
        assert!(json["normalizedAmount"].as_f64().is_some());
    }
}
