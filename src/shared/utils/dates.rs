use crate::shared::errors::{AppError, AppResult};
use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat,
    SubsecRound, TimeZone, Utc,
};
use chrono_tz::Tz;

/// 日時を保存用の文字列に変換する
///
/// ミリ秒精度・UTC固定のRFC 3339形式のため、文字列比較で時系列順になる。
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// 現在時刻（保存精度に合わせてミリ秒未満を切り捨てる）
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// 保存用文字列を日時に変換する（SQLiteの行マッピング用）
///
/// # 引数
/// * `value` - RFC 3339 形式の文字列
/// * `column` - カラム番号（エラー報告用）
pub fn parse_timestamp_column(value: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            let source = Box::new(e);
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, source)
        })
}

/// 日付範囲（開始は含む、終了は含まない）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// 日時が範囲内かどうかを判定する
    pub fn contains(&self, value: &DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| *value >= start)
            && self.end.map_or(true, |end| *value < end)
    }
}

/// YYYY-MM 形式の月文字列を解析する
///
/// # 戻り値
/// (年, 月) のタプル、または形式が不正な場合はバリデーションエラー
pub fn parse_month(month: &str) -> AppResult<(i32, u32)> {
    let invalid = || AppError::validation("月はYYYY-MM形式で指定してください");

    let (year, month_number) = month.trim().split_once('-').ok_or_else(invalid)?;
    let is_digits = |field: &str, len: usize| {
        field.len() == len && field.bytes().all(|b| b.is_ascii_digit())
    };
    if !is_digits(year, 4) || !is_digits(month_number, 2) {
        return Err(invalid());
    }

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month_number: u32 = month_number.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month_number) {
        return Err(invalid());
    }

    Ok((year, month_number))
}

/// 月文字列を正規形（YYYY-MM）にそろえる
pub fn canonical_month(month: &str) -> AppResult<String> {
    let (year, month_number) = parse_month(month)?;
    Ok(format!("{year:04}-{month_number:02}"))
}

/// 月の範囲を計算する（指定タイムゾーンでの月初から翌月初まで）
///
/// # 引数
/// * `month` - YYYY-MM 形式の月
/// * `timezone` - 月の境界を決めるタイムゾーン
///
/// # 戻り値
/// 月初（含む）から翌月初（含まない）までの範囲
pub fn month_range(month: &str, timezone: Tz) -> AppResult<DateRange> {
    let (year, month_number) = parse_month(month)?;

    let first_day = NaiveDate::from_ymd_opt(year, month_number, 1)
        .ok_or_else(|| AppError::validation("月はYYYY-MM形式で指定してください"))?;
    let next_first_day = if month_number == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month_number + 1, 1)
    }
    .ok_or_else(|| AppError::validation("月の範囲が不正です"))?;

    Ok(DateRange {
        start: Some(start_of_day(first_day, timezone)),
        end: Some(start_of_day(next_first_day, timezone)),
    })
}

/// 開始日・終了日の文字列から範囲を作成する
///
/// 日付のみ（YYYY-MM-DD）の終了日はその日の終わりまでを含む。
pub fn date_range(start: Option<&str>, end: Option<&str>, timezone: Tz) -> AppResult<DateRange> {
    let start = start
        .map(|value| parse_datetime_input(value, timezone))
        .transpose()?;

    let end = match end {
        Some(value) => {
            let value = value.trim();
            match NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                Ok(date) => Some(start_of_day(date + Duration::days(1), timezone)),
                // 保存精度がミリ秒のため、1ミリ秒後を排他的な終端とする
                Err(_) => Some(parse_datetime_input(value, timezone)? + Duration::milliseconds(1)),
            }
        }
        None => None,
    };

    Ok(DateRange { start, end })
}

/// 入力された日時文字列を解析する
///
/// 受け付ける形式:
/// - RFC 3339（例: 2024-03-15T10:00:00Z）
/// - タイムゾーンなしの日時（例: 2024-03-15T10:00 / 2024-03-15 10:00:00）
/// - 日付のみ（例: 2024-03-15、その日の0時）
///
/// タイムゾーンを含まない形式は `timezone` の現地時刻として扱う。
pub fn parse_datetime_input(value: &str, timezone: Tz) -> AppResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(3));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(resolve_local(naive, timezone).trunc_subsecs(3));
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(start_of_day(date, timezone));
    }

    Err(AppError::validation(format!(
        "日時の形式が正しくありません: {value}"
    )))
}

/// 指定タイムゾーンでの日付の0時をUTCで返す
pub fn start_of_day(date: NaiveDate, timezone: Tz) -> DateTime<Utc> {
    resolve_local(date.and_time(NaiveTime::MIN), timezone)
}

/// 指定タイムゾーンでの日付・時刻をUTCで返す
pub fn local_time_on(date: NaiveDate, hour: u32, minute: u32, timezone: Tz) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN);
    resolve_local(date.and_time(time), timezone)
}

/// 現地時刻をUTCに変換する
///
/// 夏時間の切り替えで存在しない時刻は1時間後、重複する時刻は早い方を採用する。
pub fn resolve_local(naive: NaiveDateTime, timezone: Tz) -> DateTime<Utc> {
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => match timezone.from_local_datetime(&(naive + Duration::hours(1))) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
            LocalResult::None => Utc.from_utc_datetime(&naive),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_format_timestamp_is_sortable() {
        let earlier = utc("2024-03-01T09:05:00Z");
        let later = utc("2024-03-01T10:00:00.5Z");

        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);

        assert_eq!(a, "2024-03-01T09:05:00.000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp_column(&b, 0).unwrap(), later);
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-03").unwrap(), (2024, 3));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("2024-3").is_err());
        assert!(parse_month("March").is_err());
    }

    #[test]
    fn test_parse_month_rejects_signed_fields() {
        assert!(parse_month("2024-+3").is_err());
        assert!(parse_month("+024-03").is_err());
        assert!(parse_month("2024--3").is_err());
        assert_eq!(canonical_month(" 2024-03 ").unwrap(), "2024-03");
        assert!(canonical_month("2024-+3").is_err());
    }

    #[test]
    fn test_month_range_is_half_open() {
        let range = month_range("2024-02", chrono_tz::UTC).unwrap();

        assert_eq!(range.start, Some(utc("2024-02-01T00:00:00Z")));
        assert_eq!(range.end, Some(utc("2024-03-01T00:00:00Z")));
        assert!(range.contains(&utc("2024-02-29T23:59:59Z")));
        assert!(!range.contains(&utc("2024-03-01T00:00:00Z")));
    }

    #[test]
    fn test_month_range_december_rolls_over_year() {
        let range = month_range("2023-12", chrono_tz::UTC).unwrap();
        assert_eq!(range.end, Some(utc("2024-01-01T00:00:00Z")));
    }

    #[test]
    fn test_month_range_uses_timezone() {
        let range = month_range("2024-04", chrono_tz::Asia::Tokyo).unwrap();
        assert_eq!(range.start, Some(utc("2024-03-31T15:00:00Z")));
    }

    #[test]
    fn test_date_range_date_only_end_covers_whole_day() {
        let range = date_range(Some("2024-03-01"), Some("2024-03-31"), chrono_tz::UTC).unwrap();

        assert!(range.contains(&utc("2024-03-31T23:59:59Z")));
        assert!(!range.contains(&utc("2024-04-01T00:00:00Z")));
        assert!(!range.contains(&utc("2024-02-29T23:59:59Z")));
    }

    #[test]
    fn test_date_range_datetime_end_is_inclusive() {
        let range = date_range(None, Some("2024-03-31T12:00:00Z"), chrono_tz::UTC).unwrap();

        assert!(range.contains(&utc("2024-03-31T12:00:00Z")));
        assert!(!range.contains(&utc("2024-03-31T12:00:01Z")));
    }

    #[test]
    fn test_parse_datetime_input_formats() {
        let tz = chrono_tz::UTC;
        assert_eq!(
            parse_datetime_input("2024-03-15T10:00:00+09:00", tz).unwrap(),
            utc("2024-03-15T01:00:00Z")
        );
        assert_eq!(
            parse_datetime_input("2024-03-15T10:30", tz).unwrap(),
            utc("2024-03-15T10:30:00Z")
        );
        assert_eq!(
            parse_datetime_input("2024-03-15", tz).unwrap(),
            utc("2024-03-15T00:00:00Z")
        );
        assert!(parse_datetime_input("15/03/2024", tz).is_err());
    }
}
