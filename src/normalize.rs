use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use crate::models::{NormalizedRecord, RawRecord, StatusCode};

const NOT_REQUESTED: &str = "Não Solicitado";
const NOT_FOUND: &str = "Não encontrado";

fn day_month_year() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{2})/([0-9]{2})/([0-9]{4})$").expect("valid date pattern")
    })
}

fn fraction_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([0-9]+)/([0-9]+)$").expect("valid fraction pattern"))
}

/// Parses a sheet date. `DD/MM/YYYY` is tried first, then ISO 8601. Anything
/// else, including the "not requested" tokens and padded text, is `None`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    if text.is_empty() || text == NOT_REQUESTED || text == NOT_FOUND {
        return None;
    }

    if let Some(caps) = day_month_year().captures(text) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    parse_iso(text)
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(moment) = DateTime::parse_from_rfc3339(text) {
        return Some(moment.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|moment| moment.date())
}

pub fn normalize_status(text: &str) -> StatusCode {
    match text.trim().to_lowercase().as_str() {
        "ok" => StatusCode::Satisfied,
        "x" => StatusCode::Unsatisfied,
        _ => StatusCode::NotApplicable,
    }
}

/// Splits `"N/D"` into its two integers. The text must match exactly.
pub fn parse_fraction(text: &str) -> Option<(u64, u64)> {
    let caps = fraction_pattern().captures(text)?;
    let numerator = caps[1].parse().ok()?;
    let denominator = caps[2].parse().ok()?;
    Some((numerator, denominator))
}

/// `"N/D"` as a percentage. A zero denominator means no progress yet and
/// yields 0. Values above 100 are not clamped.
pub fn parse_percentage(text: &str) -> Option<f64> {
    let (numerator, denominator) = parse_fraction(text)?;
    if denominator == 0 {
        return Some(0.0);
    }
    Some(numerator as f64 / denominator as f64 * 100.0)
}

pub fn normalize_record(raw: RawRecord) -> NormalizedRecord {
    NormalizedRecord {
        start_date: parse_date(&raw.start_date),
        digital_cert_requested: parse_date(&raw.digital_cert_request_date),
        printed_cert_requested: parse_date(&raw.printed_cert_request_date),
        financial_status: normalize_status(&raw.financial),
        evaluation_status: normalize_status(&raw.evaluation),
        minimum_time_status: normalize_status(&raw.minimum_time),
        documents_status: normalize_status(&raw.documents),
        discipline_progress: parse_percentage(&raw.disciplines),
        payment_progress: parse_percentage(&raw.payments),
        raw,
    }
}

pub fn normalize_all(rows: Vec<RawRecord>) -> Vec<NormalizedRecord> {
    rows.into_iter().map(normalize_record).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_raw() -> RawRecord {
        RawRecord {
            name: "Ana Souza".to_string(),
            cpf: "123.456.789-00".to_string(),
            course: "Engenharia".to_string(),
            cohort: "T1".to_string(),
            enrollment_status: "Cursando".to_string(),
            start_date: "15/01/2024".to_string(),
            financial: "OK".to_string(),
            evaluation: "x".to_string(),
            minimum_time: "".to_string(),
            documents: " ok ".to_string(),
            disciplines: "6/12".to_string(),
            payments: "3/12".to_string(),
            digital_cert_request_date: "Não Solicitado".to_string(),
            digital_cert_type: "Não Solicitado".to_string(),
            digital_cert_status: "".to_string(),
            printed_cert_request_date: "2024-12-31".to_string(),
            printed_cert_type: "Diploma".to_string(),
            printed_cert_status: "Enviado".to_string(),
        }
    }

    #[test]
    fn parses_day_month_year_dates() {
        assert_eq!(parse_date("31/12/2024"), NaiveDate::from_ymd_opt(2024, 12, 31));
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_date("2024-12-31"), NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(
            parse_date("2024-12-31T10:30:00Z"),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
        assert_eq!(
            parse_date("2024-12-31T10:30:00"),
            NaiveDate::from_ymd_opt(2024, 12, 31)
        );
    }

    #[test]
    fn not_applicable_tokens_and_garbage_are_absent() {
        assert_eq!(parse_date("Não Solicitado"), None);
        assert_eq!(parse_date("Não encontrado"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("garbage"), None);
        assert_eq!(parse_date("1/2/2024"), None);
        assert_eq!(parse_date(" 31/12/2024 "), None);
        assert_eq!(parse_date("2024-12-31 "), None);
    }

    #[test]
    fn impossible_calendar_dates_are_absent() {
        assert_eq!(parse_date("31/02/2024"), None);
        assert_eq!(parse_date("2024-13-01"), None);
    }

    #[test]
    fn status_tokens_are_case_insensitive() {
        assert_eq!(normalize_status("OK"), StatusCode::Satisfied);
        assert_eq!(normalize_status(" ok "), StatusCode::Satisfied);
        assert_eq!(normalize_status("X"), StatusCode::Unsatisfied);
        assert_eq!(normalize_status(""), StatusCode::NotApplicable);
        assert_eq!(normalize_status("sim"), StatusCode::NotApplicable);
    }

    #[test]
    fn percentages_from_fractions() {
        assert_eq!(parse_percentage("6/12"), Some(50.0));
        assert_eq!(parse_percentage("15/10"), Some(150.0));
        assert_eq!(parse_percentage("0/0"), Some(0.0));
        assert_eq!(parse_percentage("7/0"), Some(0.0));
    }

    #[test]
    fn malformed_fractions_are_absent() {
        assert_eq!(parse_percentage(""), None);
        assert_eq!(parse_percentage(" 6/12"), None);
        assert_eq!(parse_percentage("6/12 "), None);
        assert_eq!(parse_percentage("6 de 12"), None);
        assert_eq!(parse_percentage("-1/12"), None);
        assert_eq!(parse_percentage("1.5/12"), None);
    }

    #[test]
    fn normalization_keeps_the_raw_row() {
        let raw = sample_raw();
        let normalized = normalize_record(raw.clone());

        assert_eq!(normalized.start_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(normalized.digital_cert_requested, None);
        assert_eq!(normalized.printed_cert_requested, NaiveDate::from_ymd_opt(2024, 12, 31));
        assert_eq!(normalized.financial_status, StatusCode::Satisfied);
        assert_eq!(normalized.evaluation_status, StatusCode::Unsatisfied);
        assert_eq!(normalized.minimum_time_status, StatusCode::NotApplicable);
        assert_eq!(normalized.documents_status, StatusCode::Satisfied);
        assert_eq!(normalized.discipline_progress, Some(50.0));
        assert_eq!(normalized.payment_progress, Some(25.0));
        assert_eq!(normalized.raw(), &raw);
    }

    #[test]
    fn empty_row_degrades_field_by_field() {
        let normalized = normalize_record(RawRecord::default());
        assert_eq!(normalized.start_date, None);
        assert_eq!(normalized.documents_status, StatusCode::NotApplicable);
        assert_eq!(normalized.discipline_progress, None);
        assert_eq!(normalized.payment_progress, None);
    }
}
