/// 通貨と為替換算
///
/// - 対応通貨（USD / EUR / INR）の定義
/// - 固定レート表による換算
/// - 取引リストの基準通貨への正規化
pub mod normalizer;
pub mod rates;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use normalizer::{normalize_amounts, Monetary, Normalized};
pub use rates::{fallback_rate, ExchangeRates};

/// 対応している通貨
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "INR")]
    Inr,
}

impl Currency {
    /// すべての対応通貨
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Inr];

    /// ISO 4217 の通貨コード
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "INR" => Ok(Currency::Inr),
            other => Err(format!(
                "通貨は USD, EUR, INR のいずれかである必要があります: {other}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("eur".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!(" INR ".parse::<Currency>().unwrap(), Currency::Inr);
        assert!("JPY".parse::<Currency>().is_err());
    }

    #[test]
    fn test_currency_serialization() {
        let json = serde_json::to_string(&Currency::Inr).unwrap();
        assert_eq!(json, "\"INR\"");

        let parsed: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(parsed, Currency::Eur);
    }
}
