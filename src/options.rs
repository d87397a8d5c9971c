use std::collections::BTreeSet;

use crate::models::{FilterOptions, NormalizedRecord};

const NOT_REQUESTED: &str = "Não Solicitado";

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|value| !value.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Distinct selector values, built from the unfiltered collection.
pub fn filter_options(records: &[NormalizedRecord]) -> FilterOptions {
    let certificate_types = records
        .iter()
        .flat_map(|record| [record.raw.digital_cert_type.as_str(), record.raw.printed_cert_type.as_str()])
        .filter(|value| *value != NOT_REQUESTED);

    FilterOptions {
        courses: distinct(records.iter().map(|record| record.raw.course.as_str())),
        cohorts: distinct(records.iter().map(|record| record.raw.cohort.as_str())),
        enrollment_statuses: distinct(records.iter().map(|record| record.raw.enrollment_status.as_str())),
        certificate_types: distinct(certificate_types),
    }
}
