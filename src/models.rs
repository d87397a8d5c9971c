use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the enrollment sheet exactly as exported. Column names are the
/// sheet's own headers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawRecord {
    #[serde(rename = "Nome")]
    pub name: String,
    #[serde(rename = "CPF")]
    pub cpf: String,
    #[serde(rename = "Curso")]
    pub course: String,
    #[serde(rename = "Turma")]
    pub cohort: String,
    #[serde(rename = "Status Inscrição")]
    pub enrollment_status: String,
    #[serde(rename = "Data Início")]
    pub start_date: String,
    #[serde(rename = "Financeiro")]
    pub financial: String,
    #[serde(rename = "Avaliação")]
    pub evaluation: String,
    #[serde(rename = "Tempo mínimo")]
    pub minimum_time: String,
    #[serde(rename = "Documentos")]
    pub documents: String,
    #[serde(rename = "Disciplinas")]
    pub disciplines: String,
    #[serde(rename = "Cobranças")]
    pub payments: String,
    #[serde(rename = "Data Solic. Digital")]
    pub digital_cert_request_date: String,
    #[serde(rename = "Tipo Cert. Digital")]
    pub digital_cert_type: String,
    #[serde(rename = "Status Cert. Digital")]
    pub digital_cert_status: String,
    #[serde(rename = "Data Solic. Impresso")]
    pub printed_cert_request_date: String,
    #[serde(rename = "Tipo Cert. Impresso")]
    pub printed_cert_type: String,
    #[serde(rename = "Status Cert. Impresso")]
    pub printed_cert_status: String,
}

impl RawRecord {
    pub const COLUMNS: [&'static str; 18] = [
        "Nome",
        "CPF",
        "Curso",
        "Turma",
        "Status Inscrição",
        "Data Início",
        "Financeiro",
        "Avaliação",
        "Tempo mínimo",
        "Documentos",
        "Disciplinas",
        "Cobranças",
        "Data Solic. Digital",
        "Tipo Cert. Digital",
        "Status Cert. Digital",
        "Data Solic. Impresso",
        "Tipo Cert. Impresso",
        "Status Cert. Impresso",
    ];

    /// Builds a record from a header lookup. Unknown headers are ignored and
    /// missing ones stay empty.
    pub fn from_lookup<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut field = |name: &str| lookup(name).unwrap_or_default();
        RawRecord {
            name: field("Nome"),
            cpf: field("CPF"),
            course: field("Curso"),
            cohort: field("Turma"),
            enrollment_status: field("Status Inscrição"),
            start_date: field("Data Início"),
            financial: field("Financeiro"),
            evaluation: field("Avaliação"),
            minimum_time: field("Tempo mínimo"),
            documents: field("Documentos"),
            disciplines: field("Disciplinas"),
            payments: field("Cobranças"),
            digital_cert_request_date: field("Data Solic. Digital"),
            digital_cert_type: field("Tipo Cert. Digital"),
            digital_cert_status: field("Status Cert. Digital"),
            printed_cert_request_date: field("Data Solic. Impresso"),
            printed_cert_type: field("Tipo Cert. Impresso"),
            printed_cert_status: field("Status Cert. Impresso"),
        }
    }

    /// Field values in `COLUMNS` order.
    pub fn values(&self) -> [&str; 18] {
        [
            self.name.as_str(),
            self.cpf.as_str(),
            self.course.as_str(),
            self.cohort.as_str(),
            self.enrollment_status.as_str(),
            self.start_date.as_str(),
            self.financial.as_str(),
            self.evaluation.as_str(),
            self.minimum_time.as_str(),
            self.documents.as_str(),
            self.disciplines.as_str(),
            self.payments.as_str(),
            self.digital_cert_request_date.as_str(),
            self.digital_cert_type.as_str(),
            self.digital_cert_status.as_str(),
            self.printed_cert_request_date.as_str(),
            self.printed_cert_type.as_str(),
            self.printed_cert_status.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Satisfied,
    Unsatisfied,
    NotApplicable,
}

impl StatusCode {
    pub fn label(self) -> &'static str {
        match self {
            StatusCode::Satisfied => "OK",
            StatusCode::Unsatisfied => "Pendente",
            StatusCode::NotApplicable => "N/A",
        }
    }
}

/// The four binary gates for certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pillar {
    Financial,
    Evaluation,
    MinimumTime,
    Documents,
}

impl Pillar {
    pub const ALL: [Pillar; 4] = [
        Pillar::Financial,
        Pillar::Evaluation,
        Pillar::MinimumTime,
        Pillar::Documents,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Pillar::Financial => "Financeiro",
            Pillar::Evaluation => "Avaliação",
            Pillar::MinimumTime => "Tempo Mínimo",
            Pillar::Documents => "Documentos",
        }
    }
}

/// A raw row enriched with typed values. The raw row is kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    #[serde(flatten)]
    pub raw: RawRecord,
    pub start_date: Option<NaiveDate>,
    pub digital_cert_requested: Option<NaiveDate>,
    pub printed_cert_requested: Option<NaiveDate>,
    pub financial_status: StatusCode,
    pub evaluation_status: StatusCode,
    pub minimum_time_status: StatusCode,
    pub documents_status: StatusCode,
    pub discipline_progress: Option<f64>,
    pub payment_progress: Option<f64>,
}

impl NormalizedRecord {
    pub fn raw(&self) -> &RawRecord {
        &self.raw
    }

    pub fn status(&self, pillar: Pillar) -> StatusCode {
        match pillar {
            Pillar::Financial => self.financial_status,
            Pillar::Evaluation => self.evaluation_status,
            Pillar::MinimumTime => self.minimum_time_status,
            Pillar::Documents => self.documents_status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FinancialSituation {
    #[serde(rename = "Em dia")]
    Current,
    #[serde(rename = "Quitado")]
    PaidOff,
    #[serde(rename = "Inadimplente")]
    Delinquent,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl FinancialSituation {
    pub fn label(self) -> &'static str {
        match self {
            FinancialSituation::Current => "Em dia",
            FinancialSituation::PaidOff => "Quitado",
            FinancialSituation::Delinquent => "Inadimplente",
            FinancialSituation::NotApplicable => "N/A",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// `None` on any categorical field means "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub course: Option<String>,
    pub cohort: Option<String>,
    pub enrollment_status: Option<String>,
    pub certificate_type: Option<String>,
    pub start_range: DateRange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusBreakdown<T> {
    pub ok: T,
    pub error: T,
    pub na: T,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusMetric {
    pub counts: StatusBreakdown<usize>,
    pub percentages: StatusBreakdown<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarMetric {
    pub pillar: Pillar,
    pub metric: StatusMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortProgress {
    pub course: String,
    pub cohort: String,
    pub count: usize,
    pub average: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisciplineProgress {
    pub average: f64,
    pub by_course_cohort: Vec<CohortProgress>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FinancialCounts {
    pub current: usize,
    pub delinquent: usize,
    pub paid_off: usize,
    pub not_applicable: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FinancialDistribution {
    pub counts: FinancialCounts,
    pub percent_current: f64,
    pub percent_delinquent: f64,
    pub total_valid: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowCounts {
    pub last_7_days: usize,
    pub last_30_days: usize,
    pub last_90_days: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CertificateWindows {
    pub digital: WindowCounts,
    pub printed: WindowCounts,
}

impl CertificateWindows {
    pub fn total(&self) -> WindowCounts {
        WindowCounts {
            last_7_days: self.digital.last_7_days + self.printed.last_7_days,
            last_30_days: self.digital.last_30_days + self.printed.last_30_days,
            last_90_days: self.digital.last_90_days + self.printed.last_90_days,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Kpis {
    pub total_students: usize,
    pub percent_current: f64,
    pub percent_delinquent: f64,
    pub avg_discipline_progress: f64,
    pub percent_docs_ok: f64,
    pub cert_requests_7d: usize,
    pub cert_requests_30d: usize,
    pub cert_requests_90d: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub courses: Vec<String>,
    pub cohorts: Vec<String>,
    pub enrollment_statuses: Vec<String>,
    pub certificate_types: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrollmentSummary {
    pub graduated: usize,
    pub enrolled: usize,
    pub cancelled: usize,
    pub blocked: usize,
    pub other: usize,
    pub by_course: Vec<NamedCount>,
    pub by_cohort: Vec<NamedCount>,
}
