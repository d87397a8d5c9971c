use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::metrics;
use crate::models::{
    CertificateWindows, DisciplineProgress, EnrollmentSummary, FinancialDistribution, Kpis,
    NamedCount, NormalizedRecord, Pillar, StatusMetric,
};

pub fn compose_kpis(
    total_students: usize,
    financial: &FinancialDistribution,
    progress: &DisciplineProgress,
    documents: &StatusMetric,
    windows: &CertificateWindows,
) -> Kpis {
    let requests = windows.total();
    Kpis {
        total_students,
        percent_current: financial.percent_current,
        percent_delinquent: financial.percent_delinquent,
        avg_discipline_progress: progress.average,
        percent_docs_ok: documents.percentages.ok,
        cert_requests_7d: requests.last_7_days,
        cert_requests_30d: requests.last_30_days,
        cert_requests_90d: requests.last_90_days,
    }
}

pub fn compute_kpis(records: &[NormalizedRecord], as_of: NaiveDate) -> Kpis {
    compose_kpis(
        records.len(),
        &metrics::financial_distribution(records, as_of),
        &metrics::discipline_progress(records),
        &metrics::status_metrics(records, Pillar::Documents),
        &metrics::certificate_windows(records, as_of),
    )
}

fn distribution<'a>(values: impl Iterator<Item = &'a str>) -> Vec<NamedCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.filter(|value| !value.is_empty()) {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(name, count)| NamedCount {
            name: name.to_string(),
            count,
        })
        .collect()
}

pub fn enrollment_summary(records: &[NormalizedRecord]) -> EnrollmentSummary {
    let mut summary = EnrollmentSummary::default();

    for record in records {
        match record.raw.enrollment_status.as_str() {
            "Formado" => summary.graduated += 1,
            "Cursando" => summary.enrolled += 1,
            "Cancelada" => summary.cancelled += 1,
            "Bloqueada" => summary.blocked += 1,
            _ => summary.other += 1,
        }
    }

    summary.by_course = distribution(records.iter().map(|record| record.raw.course.as_str()));
    summary.by_cohort = distribution(records.iter().map(|record| record.raw.cohort.as_str()));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::record_with;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
    }

    #[test]
    fn empty_collection_has_zero_kpis() {
        assert_eq!(compute_kpis(&[], as_of()), Kpis::default());
        assert_eq!(enrollment_summary(&[]), EnrollmentSummary::default());
    }

    #[test]
    fn kpis_pick_fields_from_the_aggregates() {
        let records = vec![
            record_with(|raw| {
                raw.payments = "12/12".into();
                raw.start_date = "01/01/2024".into();
                raw.documents = "OK".into();
                raw.disciplines = "10/10".into();
                raw.digital_cert_request_date = "2025-06-29".into();
                raw.printed_cert_request_date = "2025-06-01".into();
            }),
            record_with(|raw| {
                raw.payments = "0/12".into();
                raw.start_date = "01/01/2025".into();
                raw.documents = "X".into();
                raw.disciplines = "0/10".into();
            }),
        ];

        let kpis = compute_kpis(&records, as_of());
        assert_eq!(kpis.total_students, 2);
        assert!((kpis.percent_current - 50.0).abs() < 1e-9);
        assert!((kpis.percent_delinquent - 50.0).abs() < 1e-9);
        assert!((kpis.avg_discipline_progress - 50.0).abs() < 1e-9);
        assert!((kpis.percent_docs_ok - 50.0).abs() < 1e-9);
        assert_eq!(kpis.cert_requests_7d, 1);
        assert_eq!(kpis.cert_requests_30d, 2);
        assert_eq!(kpis.cert_requests_90d, 2);
    }

    #[test]
    fn summary_buckets_known_statuses() {
        let records: Vec<_> = [
            ("Formado", "Direito", "T1"),
            ("Cursando", "Direito", "T2"),
            ("Cursando", "Engenharia", "T1"),
            ("Trancado", "", "T1"),
        ]
        .iter()
        .map(|(status, course, cohort)| {
            record_with(|raw| {
                raw.enrollment_status = status.to_string();
                raw.course = course.to_string();
                raw.cohort = cohort.to_string();
            })
        })
        .collect();

        let summary = enrollment_summary(&records);
        assert_eq!(summary.graduated, 1);
        assert_eq!(summary.enrolled, 2);
        assert_eq!(summary.cancelled, 0);
        assert_eq!(summary.other, 1);
        assert_eq!(
            summary.by_course,
            vec![
                NamedCount { name: "Direito".into(), count: 2 },
                NamedCount { name: "Engenharia".into(), count: 1 },
            ]
        );
        assert_eq!(summary.by_cohort[0], NamedCount { name: "T1".into(), count: 3 });
    }
}
