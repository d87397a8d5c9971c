use crate::models::{DateRange, FilterCriteria, NormalizedRecord};

type Predicate<'a> = Box<dyn Fn(&NormalizedRecord) -> bool + 'a>;

fn exact<'a>(target: &'a str, field: fn(&NormalizedRecord) -> &str) -> Predicate<'a> {
    Box::new(move |record| field(record) == target)
}

fn certificate_type(target: &str) -> Predicate<'_> {
    Box::new(move |record| {
        record.raw.digital_cert_type == target || record.raw.printed_cert_type == target
    })
}

fn start_within(range: DateRange) -> Option<Predicate<'static>> {
    let (Some(start), Some(end)) = (range.start, range.end) else {
        return None;
    };
    Some(Box::new(move |record| {
        record
            .start_date
            .is_some_and(|date| date >= start && date <= end)
    }))
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.course.is_none()
            && self.cohort.is_none()
            && self.enrollment_status.is_none()
            && self.certificate_type.is_none()
            && (self.start_range.start.is_none() || self.start_range.end.is_none())
    }

    /// One predicate per active criterion. "Any" selections and half-open date
    /// ranges contribute nothing.
    pub fn predicates(&self) -> Vec<Predicate<'_>> {
        let mut predicates: Vec<Predicate<'_>> = Vec::new();

        if let Some(course) = self.course.as_deref() {
            predicates.push(exact(course, |record| record.raw.course.as_str()));
        }
        if let Some(cohort) = self.cohort.as_deref() {
            predicates.push(exact(cohort, |record| record.raw.cohort.as_str()));
        }
        if let Some(status) = self.enrollment_status.as_deref() {
            predicates.push(exact(status, |record| record.raw.enrollment_status.as_str()));
        }
        if let Some(kind) = self.certificate_type.as_deref() {
            predicates.push(certificate_type(kind));
        }
        if let Some(range) = start_within(self.start_range) {
            predicates.push(range);
        }

        predicates
    }
}

/// Treats the selector values `"all"` and blank as "any".
pub fn selection(value: Option<String>) -> Option<String> {
    value.filter(|value| {
        let trimmed = value.trim();
        !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case("all")
    })
}

pub fn apply_filters(records: &[NormalizedRecord], criteria: &FilterCriteria) -> Vec<NormalizedRecord> {
    let predicates = criteria.predicates();
    records
        .iter()
        .filter(|record| predicates.iter().all(|predicate| predicate(record)))
        .cloned()
        .collect()
}
