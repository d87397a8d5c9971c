use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod detail;
mod export;
mod filter;
mod finance;
mod kpi;
mod metrics;
mod models;
mod normalize;
mod options;
mod report;
mod source;

use config::Config;
use models::{DateRange, FilterCriteria, NormalizedRecord};

#[derive(Parser)]
#[command(name = "enrollment-dashboard")]
#[command(about = "Enrollment metrics over a published student sheet", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "dashboard.toml")]
    config: PathBuf,
    /// Read this file instead of the published sheet
    #[arg(long, global = true)]
    source: Option<PathBuf>,
    /// Evaluation date for time-relative metrics (defaults to today)
    #[arg(long, global = true, value_parser = parse_cli_date)]
    as_of: Option<NaiveDate>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct FilterArgs {
    #[arg(long)]
    course: Option<String>,
    #[arg(long)]
    cohort: Option<String>,
    #[arg(long)]
    status: Option<String>,
    #[arg(long)]
    certificate_type: Option<String>,
    #[arg(long, value_parser = parse_cli_date)]
    start_from: Option<NaiveDate>,
    #[arg(long, value_parser = parse_cli_date)]
    start_to: Option<NaiveDate>,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            course: filter::selection(self.course.clone()),
            cohort: filter::selection(self.cohort.clone()),
            enrollment_status: filter::selection(self.status.clone()),
            certificate_type: filter::selection(self.certificate_type.clone()),
            start_range: DateRange {
                start: self.start_from,
                end: self.start_to,
            },
        }
    }

    fn scope(&self) -> String {
        if self.criteria().is_empty() {
            return "todos os estudantes".to_string();
        }
        let parts: Vec<String> = [
            ("curso", &self.course),
            ("turma", &self.cohort),
            ("status", &self.status),
            ("certificado", &self.certificate_type),
        ]
        .iter()
        .filter_map(|(label, value)| {
            filter::selection((*value).clone()).map(|value| format!("{label} {value}"))
        })
        .collect();

        if parts.is_empty() {
            "filtro por data de início".to_string()
        } else {
            parts.join(", ")
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    InitConfig,
    /// Show KPIs and pillar status for the filtered view
    Summary {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List students in the filtered view, one page at a time
    Students {
        #[command(flatten)]
        filters: FilterArgs,
        /// Match part of the name or CPF
        #[arg(long)]
        search: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Students per page
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Inspect one student by CPF or name
    Student { query: String },
    /// List values available to the filters
    Options,
    /// Discipline progress overall and per course and cohort
    Progress {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Export the filtered view
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, value_enum, default_value_t = export::Format::Csv)]
        format: export::Format,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Reload the sheet periodically and print the summary
    Watch {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    normalize::parse_date(value).ok_or_else(|| format!("invalid date: {value}"))
}

struct Session {
    config: Config,
    source: Option<PathBuf>,
    client: reqwest::Client,
}

impl Session {
    async fn load(&self) -> anyhow::Result<Vec<NormalizedRecord>> {
        let rows = match &self.source {
            Some(path) => source::load_file(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => {
                source::load_records(
                    &self.client,
                    self.config.sheet_url.as_deref(),
                    &self.config.fallback_path,
                )
                .await?
            }
        };
        Ok(normalize::normalize_all(rows))
    }
}

fn print_summary(records: &[NormalizedRecord], as_of: NaiveDate) {
    let kpis = kpi::compute_kpis(records, as_of);
    println!("Students: {}", kpis.total_students);
    println!("Current on payments: {:.1}%", kpis.percent_current);
    println!("Delinquent: {:.1}%", kpis.percent_delinquent);
    println!("Average discipline progress: {:.1}%", kpis.avg_discipline_progress);
    println!("Documents OK: {:.1}%", kpis.percent_docs_ok);
    println!(
        "Certificate requests: {} (7d), {} (30d), {} (90d)",
        kpis.cert_requests_7d, kpis.cert_requests_30d, kpis.cert_requests_90d
    );

    println!("Pillars:");
    for entry in metrics::pillar_metrics(records) {
        println!(
            "- {}: {} ok ({:.1}%), {} pending ({:.1}%), {} n/a ({:.1}%)",
            entry.pillar.label(),
            entry.metric.counts.ok,
            entry.metric.percentages.ok,
            entry.metric.counts.error,
            entry.metric.percentages.error,
            entry.metric.counts.na,
            entry.metric.percentages.na
        );
    }
}

fn print_detail(record: &NormalizedRecord, as_of: NaiveDate) {
    let detail = detail::student_detail(record, as_of);
    println!("{} ({})", detail.name, detail.cpf);
    println!("Course: {} / cohort {}", detail.course, detail.cohort);
    println!("Status: {} since {}", detail.enrollment_status, detail.start_date);
    for pillar in detail.pillars.iter() {
        println!("- {}: {}", pillar.pillar.label(), pillar.label);
    }
    println!("Disciplines: {:.1}%", detail.discipline_progress);
    println!(
        "Payments: {:.1}% ({})",
        detail.payment_progress,
        detail.financial_situation.label()
    );
    for (label, certificate) in [
        ("Digital", &detail.digital_certificate),
        ("Printed", &detail.printed_certificate),
    ] {
        println!(
            "{} certificate: {} [{}] requested {}",
            label, certificate.kind, certificate.status, certificate.requested_on
        );
    }
    println!(
        "Eligible for certification: {}",
        if detail.certification_eligible { "yes" } else { "no" }
    );
}

fn print_list(label: &str, values: &[String]) {
    if values.is_empty() {
        println!("{label}: none");
    } else {
        println!("{label}: {}", values.join(", "));
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

async fn watch(session: &Session, filters: &FilterArgs) -> anyhow::Result<()> {
    let minutes = session.config.refresh_minutes.max(1);
    let mut ticker = tokio::time::interval(Duration::from_secs(minutes * 60));
    info!(minutes, "refreshing on an interval");

    loop {
        ticker.tick().await;
        match session.load().await {
            Ok(records) => {
                let filtered = filter::apply_filters(&records, &filters.criteria());
                println!("== {} ==", Utc::now().format("%d/%m/%Y %H:%M"));
                print_summary(&filtered, today());
            }
            Err(err) => tracing::error!("refresh failed: {err:#}"),
        }
    }
}

fn write_default_config(path: &Path) -> anyhow::Result<()> {
    Config::default().save_new(path)?;
    println!("Configuration written to {}.", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let session = Session {
        config: Config::load(&cli.config)?,
        source: cli.source.clone(),
        client: reqwest::Client::new(),
    };
    let as_of = cli.as_of.unwrap_or_else(today);

    match cli.command {
        Commands::InitConfig => write_default_config(&cli.config)?,
        Commands::Summary { filters } => {
            let records = session.load().await?;
            let filtered = filter::apply_filters(&records, &filters.criteria());
            print_summary(&filtered, as_of);
        }
        Commands::Students {
            filters,
            search,
            page,
            limit,
        } => {
            let records = session.load().await?;
            let filtered = filter::apply_filters(&records, &filters.criteria());
            let found = detail::search(&filtered, search.as_deref().unwrap_or_default());

            if found.is_empty() {
                println!("No students match these filters.");
                return Ok(());
            }

            let pages = detail::page_count(found.len(), limit);
            println!(
                "{} students ({}), page {} of {}:",
                found.len(),
                filters.scope(),
                page.clamp(1, pages),
                pages
            );
            for record in detail::page(&found, page.clamp(1, pages), limit) {
                println!(
                    "- {} ({}, {} {}) {} | {}",
                    record.raw.name,
                    record.raw.cpf,
                    record.raw.course,
                    record.raw.cohort,
                    record.raw.enrollment_status,
                    finance::classify_record(record, as_of).label()
                );
            }
        }
        Commands::Student { query } => {
            let records = session.load().await?;
            match detail::find_student(&records, &query) {
                Some(record) => print_detail(record, as_of),
                None => println!("No student matches {query:?}."),
            }
        }
        Commands::Options => {
            let records = session.load().await?;
            let options = options::filter_options(&records);
            print_list("Courses", &options.courses);
            print_list("Cohorts", &options.cohorts);
            print_list("Enrollment statuses", &options.enrollment_statuses);
            print_list("Certificate types", &options.certificate_types);
        }
        Commands::Progress { filters } => {
            let records = session.load().await?;
            let filtered = filter::apply_filters(&records, &filters.criteria());
            let progress = metrics::discipline_progress(&filtered);
            println!("Average discipline progress: {:.1}%", progress.average);
            for group in progress.by_course_cohort.iter() {
                println!(
                    "- {} - {}: {:.1}% across {} students",
                    group.course, group.cohort, group.average, group.count
                );
            }
        }
        Commands::Report { filters, out } => {
            let records = session.load().await?;
            let filtered = filter::apply_filters(&records, &filters.criteria());
            let report = report::build_report(&filters.scope(), as_of, &filtered);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export {
            filters,
            format,
            out,
        } => {
            let records = session.load().await?;
            let filtered = filter::apply_filters(&records, &filters.criteria());
            let generated_at = as_of.and_time(Utc::now().time());
            let path = export::export(
                format,
                &filtered,
                generated_at,
                out.as_deref(),
                &session.config.output_dir,
            )?;
            println!("Exported {} students to {}.", filtered.len(), path.display());
        }
        Commands::Watch { filters } => watch(&session, &filters).await?,
    }

    Ok(())
}
