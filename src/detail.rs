use chrono::NaiveDate;
use serde::Serialize;

use crate::finance;
use crate::models::{FinancialSituation, NormalizedRecord, Pillar, StatusCode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarStatus {
    pub pillar: Pillar,
    pub status: StatusCode,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateDetail {
    pub kind: String,
    pub status: String,
    pub requested_on: String,
}

/// Everything the per-student panel shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentDetail {
    pub name: String,
    pub cpf: String,
    pub course: String,
    pub cohort: String,
    pub enrollment_status: String,
    pub start_date: String,
    pub pillars: Vec<PillarStatus>,
    pub discipline_progress: f64,
    pub payment_progress: f64,
    pub financial_situation: FinancialSituation,
    pub digital_certificate: CertificateDetail,
    pub printed_certificate: CertificateDetail,
    pub certification_eligible: bool,
}

pub fn format_date(date: Option<NaiveDate>, fallback: &str) -> String {
    match date {
        Some(date) => date.format("%d/%m/%Y").to_string(),
        None if fallback.is_empty() => "N/A".to_string(),
        None => fallback.to_string(),
    }
}

fn bar_value(progress: Option<f64>) -> f64 {
    progress
        .filter(|value| value.is_finite())
        .map(|value| value.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

pub fn student_detail(record: &NormalizedRecord, as_of: NaiveDate) -> StudentDetail {
    let raw = &record.raw;
    let pillars: Vec<PillarStatus> = Pillar::ALL
        .iter()
        .map(|&pillar| {
            let status = record.status(pillar);
            PillarStatus {
                pillar,
                status,
                label: status.label(),
            }
        })
        .collect();
    let certification_eligible = pillars
        .iter()
        .all(|pillar| pillar.status == StatusCode::Satisfied);

    StudentDetail {
        name: raw.name.clone(),
        cpf: raw.cpf.clone(),
        course: raw.course.clone(),
        cohort: raw.cohort.clone(),
        enrollment_status: raw.enrollment_status.clone(),
        start_date: format_date(record.start_date, &raw.start_date),
        pillars,
        discipline_progress: bar_value(record.discipline_progress),
        payment_progress: bar_value(record.payment_progress),
        financial_situation: finance::classify_record(record, as_of),
        digital_certificate: CertificateDetail {
            kind: raw.digital_cert_type.clone(),
            status: raw.digital_cert_status.clone(),
            requested_on: format_date(record.digital_cert_requested, &raw.digital_cert_request_date),
        },
        printed_certificate: CertificateDetail {
            kind: raw.printed_cert_type.clone(),
            status: raw.printed_cert_status.clone(),
            requested_on: format_date(record.printed_cert_requested, &raw.printed_cert_request_date),
        },
        certification_eligible,
    }
}

fn digits(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Looks a student up by CPF (punctuation ignored) or by part of the name.
pub fn find_student<'a>(records: &'a [NormalizedRecord], query: &str) -> Option<&'a NormalizedRecord> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }

    let query_digits = digits(query);
    if !query_digits.is_empty() {
        if let Some(record) = records
            .iter()
            .find(|record| digits(&record.raw.cpf) == query_digits)
        {
            return Some(record);
        }
    }

    let needle = query.to_lowercase();
    records
        .iter()
        .find(|record| record.raw.name.to_lowercase().contains(&needle))
}

/// Students whose name or CPF contains `term`, ignoring case. A blank term
/// keeps everyone.
pub fn search<'a>(records: &'a [NormalizedRecord], term: &str) -> Vec<&'a NormalizedRecord> {
    let needle = term.trim().to_lowercase();
    records
        .iter()
        .filter(|record| {
            needle.is_empty()
                || record.raw.name.to_lowercase().contains(&needle)
                || record.raw.cpf.to_lowercase().contains(&needle)
        })
        .collect()
}

/// Number of pages needed for `total` items, at least one.
pub fn page_count(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page.max(1)).max(1)
}

/// One-based page of `items`. Pages past the end are empty.
pub fn page<T>(items: &[T], page: usize, per_page: usize) -> &[T] {
    let per_page = per_page.max(1);
    let start = page.saturating_sub(1).saturating_mul(per_page);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(per_page).min(items.len());
    &items[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_record;
    use crate::normalize::tests::sample_raw;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 15).unwrap()
    }

    #[test]
    fn detail_labels_pillars_and_formats_dates() {
        let record = normalize_record(sample_raw());
        let detail = student_detail(&record, as_of());

        assert_eq!(detail.start_date, "15/01/2024");
        let labels: Vec<_> = detail.pillars.iter().map(|pillar| pillar.label).collect();
        assert_eq!(labels, vec!["OK", "Pendente", "N/A", "OK"]);
        assert!(!detail.certification_eligible);
        assert_eq!(detail.discipline_progress, 50.0);
        assert_eq!(detail.payment_progress, 25.0);
        assert_eq!(detail.financial_situation, FinancialSituation::Current);
        assert_eq!(detail.digital_certificate.requested_on, "Não Solicitado");
        assert_eq!(detail.printed_certificate.requested_on, "31/12/2024");
    }

    #[test]
    fn progress_bars_are_clamped_and_default_to_zero() {
        let mut raw = sample_raw();
        raw.disciplines = "15/10".into();
        raw.payments = "".into();
        let detail = student_detail(&normalize_record(raw), as_of());
        assert_eq!(detail.discipline_progress, 100.0);
        assert_eq!(detail.payment_progress, 0.0);
        assert_eq!(detail.financial_situation, FinancialSituation::NotApplicable);
    }

    #[test]
    fn all_pillars_ok_is_eligible() {
        let mut raw = sample_raw();
        raw.evaluation = "OK".into();
        raw.minimum_time = "ok".into();
        let detail = student_detail(&normalize_record(raw), as_of());
        assert!(detail.certification_eligible);
    }

    #[test]
    fn finds_students_by_cpf_or_name() {
        let mut other = sample_raw();
        other.name = "Bruno Lima".into();
        other.cpf = "987.654.321-00".into();
        let records = vec![normalize_record(sample_raw()), normalize_record(other)];

        assert_eq!(find_student(&records, "98765432100").map(|r| r.raw.name.as_str()), Some("Bruno Lima"));
        assert_eq!(find_student(&records, "ana souza").map(|r| r.raw.name.as_str()), Some("Ana Souza"));
        assert!(find_student(&records, "Carla").is_none());
        assert!(find_student(&records, "  ").is_none());
    }

    fn roster() -> Vec<NormalizedRecord> {
        [
            ("Ana Souza", "123.456.789-00"),
            ("Bruno Silva", "987.654.321-00"),
            ("Carla Silva", "111.222.333-44"),
        ]
        .into_iter()
        .map(|(name, cpf)| {
            let mut raw = sample_raw();
            raw.name = name.into();
            raw.cpf = cpf.into();
            normalize_record(raw)
        })
        .collect()
    }

    #[test]
    fn search_matches_every_name_containing_the_term() {
        let records = roster();
        let names: Vec<_> = search(&records, "SILVA").iter().map(|r| r.raw.name.as_str()).collect();
        assert_eq!(names, vec!["Bruno Silva", "Carla Silva"]);
        assert_eq!(search(&records, "").len(), 3);
        assert!(search(&records, "Diego").is_empty());
    }

    #[test]
    fn search_matches_partial_cpf_as_typed() {
        let records = roster();
        let found = search(&records, "456.7");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw.name, "Ana Souza");
        assert!(search(&records, "4567").is_empty());
    }

    #[test]
    fn pages_are_one_based_and_clipped() {
        let items: Vec<u32> = (1..=23).collect();
        assert_eq!(page(&items, 1, 10), &items[0..10]);
        assert_eq!(page(&items, 3, 10), &[21, 22, 23]);
        assert!(page(&items, 4, 10).is_empty());
        assert_eq!(page(&items, 0, 10), &items[0..10]);
        assert_eq!(page_count(items.len(), 10), 3);
        assert_eq!(page_count(0, 10), 1);
    }
}
