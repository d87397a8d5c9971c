use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::finance;
use crate::models::{
    CertificateWindows, CohortProgress, DisciplineProgress, FinancialCounts,
    FinancialDistribution, FinancialSituation, NormalizedRecord, Pillar, PillarMetric,
    StatusBreakdown, StatusCode, StatusMetric, WindowCounts,
};

pub fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Tallies one pillar. Percentages are over every record, not only the
/// applicable ones.
pub fn status_metrics(records: &[NormalizedRecord], pillar: Pillar) -> StatusMetric {
    let mut counts = StatusBreakdown::<usize>::default();

    for record in records {
        match record.status(pillar) {
            StatusCode::Satisfied => counts.ok += 1,
            StatusCode::Unsatisfied => counts.error += 1,
            StatusCode::NotApplicable => counts.na += 1,
        }
    }

    let total = records.len();
    StatusMetric {
        counts,
        percentages: StatusBreakdown {
            ok: percent(counts.ok, total),
            error: percent(counts.error, total),
            na: percent(counts.na, total),
        },
    }
}

pub fn pillar_metrics(records: &[NormalizedRecord]) -> Vec<PillarMetric> {
    Pillar::ALL
        .iter()
        .map(|&pillar| PillarMetric {
            pillar,
            metric: status_metrics(records, pillar),
        })
        .collect()
}

pub fn discipline_progress(records: &[NormalizedRecord]) -> DisciplineProgress {
    let mut groups: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
    let mut sum = 0.0;
    let mut count = 0usize;

    for record in records {
        let Some(progress) = record.discipline_progress.filter(|value| !value.is_nan()) else {
            continue;
        };
        sum += progress;
        count += 1;

        let entry = groups
            .entry((record.raw.course.clone(), record.raw.cohort.clone()))
            .or_insert((0.0, 0));
        entry.0 += progress;
        entry.1 += 1;
    }

    if count == 0 {
        return DisciplineProgress::default();
    }

    DisciplineProgress {
        average: sum / count as f64,
        by_course_cohort: groups
            .into_iter()
            .map(|((course, cohort), (group_sum, group_count))| CohortProgress {
                course,
                cohort,
                count: group_count,
                average: group_sum / group_count as f64,
            })
            .collect(),
    }
}

pub fn financial_distribution(records: &[NormalizedRecord], as_of: NaiveDate) -> FinancialDistribution {
    let mut counts = FinancialCounts::default();

    for record in records {
        match finance::classify_record(record, as_of) {
            FinancialSituation::Current => counts.current += 1,
            FinancialSituation::Delinquent => counts.delinquent += 1,
            FinancialSituation::PaidOff => counts.paid_off += 1,
            FinancialSituation::NotApplicable => counts.not_applicable += 1,
        }
    }

    let total_valid = counts.current + counts.delinquent + counts.paid_off;
    FinancialDistribution {
        counts,
        percent_current: percent(counts.current + counts.paid_off, total_valid),
        percent_delinquent: percent(counts.delinquent, total_valid),
        total_valid,
    }
}

fn tally_window(counts: &mut WindowCounts, requested: Option<NaiveDate>, as_of: NaiveDate) {
    let Some(date) = requested else {
        return;
    };
    if date >= as_of - Duration::days(7) {
        counts.last_7_days += 1;
    }
    if date >= as_of - Duration::days(30) {
        counts.last_30_days += 1;
    }
    if date >= as_of - Duration::days(90) {
        counts.last_90_days += 1;
    }
}

/// Digital and printed requests are counted independently.
pub fn certificate_windows(records: &[NormalizedRecord], as_of: NaiveDate) -> CertificateWindows {
    let mut windows = CertificateWindows::default();
    for record in records {
        tally_window(&mut windows.digital, record.digital_cert_requested, as_of);
        tally_window(&mut windows.printed, record.printed_cert_requested, as_of);
    }
    windows
}
