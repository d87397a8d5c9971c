use chrono::{Datelike, NaiveDate};

use crate::models::{FinancialSituation, NormalizedRecord};
use crate::normalize::parse_fraction;

/// Whole calendar months from `start` to `as_of`. A month only counts once the
/// day of month has been reached again.
pub fn months_elapsed(start: NaiveDate, as_of: NaiveDate) -> u32 {
    if as_of <= start {
        return 0;
    }
    let mut months = (as_of.year() - start.year()) * 12 + as_of.month() as i32 - start.month() as i32;
    if as_of.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

/// Payment standing from the `paid/total` charge text and the enrollment
/// start. One payment is expected per elapsed month.
pub fn classify(payments: &str, start_date: Option<NaiveDate>, as_of: NaiveDate) -> FinancialSituation {
    let (Some((paid, total)), Some(start)) = (parse_fraction(payments), start_date) else {
        return FinancialSituation::NotApplicable;
    };

    if total > 0 && paid >= total {
        return FinancialSituation::PaidOff;
    }

    if start > as_of {
        return FinancialSituation::Current;
    }

    let expected = u64::from(months_elapsed(start, as_of));
    if paid >= expected {
        FinancialSituation::Current
    } else {
        FinancialSituation::Delinquent
    }
}

pub fn classify_record(record: &NormalizedRecord, as_of: NaiveDate) -> FinancialSituation {
    classify(&record.raw.payments, record.start_date, as_of)
}
