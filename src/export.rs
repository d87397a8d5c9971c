use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::finance;
use crate::kpi;
use crate::metrics;
use crate::models::{Kpis, NormalizedRecord, PillarMetric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Csv,
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Json => "json",
        }
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    generated_at: String,
    kpis: Kpis,
    pillars: Vec<PillarMetric>,
    students: &'a [NormalizedRecord],
}

pub fn default_file_name(format: Format, generated_at: NaiveDateTime) -> String {
    format!(
        "relatorio_estudantes_{}.{}",
        generated_at.format("%Y%m%d_%H%M"),
        format.extension()
    )
}

fn one_decimal(progress: Option<f64>) -> String {
    progress
        .map(|value| format!("{value:.1}"))
        .unwrap_or_else(|| "N/A".to_string())
}

pub fn write_csv<W: std::io::Write>(
    writer: W,
    records: &[NormalizedRecord],
    as_of: NaiveDate,
) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header: Vec<&str> = crate::models::RawRecord::COLUMNS.to_vec();
    header.extend([
        "Progresso Disciplinas (%)",
        "Progresso Pagamentos (%)",
        "Situação Financeira",
    ]);
    writer.write_record(&header)?;

    for record in records {
        let discipline = one_decimal(record.discipline_progress);
        let payment = one_decimal(record.payment_progress);
        let mut row: Vec<&str> = record.raw().values().to_vec();
        row.extend([
            discipline.as_str(),
            payment.as_str(),
            finance::classify_record(record, as_of).label(),
        ]);
        writer.write_record(&row)?;
    }

    writer.flush()?;
    Ok(())
}

pub fn write_json<W: std::io::Write>(
    writer: W,
    records: &[NormalizedRecord],
    generated_at: NaiveDateTime,
) -> anyhow::Result<()> {
    let as_of = generated_at.date();
    let snapshot = Snapshot {
        generated_at: generated_at.format("%d/%m/%Y %H:%M").to_string(),
        kpis: kpi::compute_kpis(records, as_of),
        pillars: metrics::pillar_metrics(records),
        students: records,
    };
    serde_json::to_writer_pretty(writer, &snapshot)?;
    Ok(())
}

/// Writes the current view to `out`, or to a timestamped file under
/// `output_dir` when no path is given.
pub fn export(
    format: Format,
    records: &[NormalizedRecord],
    generated_at: NaiveDateTime,
    out: Option<&Path>,
    output_dir: &Path,
) -> anyhow::Result<PathBuf> {
    let path = match out {
        Some(path) => path.to_path_buf(),
        None => {
            std::fs::create_dir_all(output_dir)
                .with_context(|| format!("failed to create {}", output_dir.display()))?;
            output_dir.join(default_file_name(format, generated_at))
        }
    };

    let file = std::fs::File::create(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let writer = std::io::BufWriter::new(file);
    match format {
        Format::Csv => write_csv(writer, records, generated_at.date())?,
        Format::Json => write_json(writer, records, generated_at)?,
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_record;
    use crate::normalize::tests::sample_raw;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 4, 15)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap()
    }

    #[test]
    fn file_name_carries_timestamp() {
        assert_eq!(
            default_file_name(Format::Csv, generated_at()),
            "relatorio_estudantes_20240415_0905.csv"
        );
    }

    #[test]
    fn csv_keeps_original_columns_and_adds_derived_ones() {
        let mut blank = sample_raw();
        blank.disciplines = "?".into();
        let records = vec![normalize_record(sample_raw()), normalize_record(blank)];

        let mut buffer = Vec::new();
        write_csv(&mut buffer, &records, generated_at().date()).unwrap();

        let mut reader = csv::Reader::from_reader(buffer.as_slice());
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), 21);
        assert_eq!(&headers[0], "Nome");
        assert_eq!(&headers[20], "Situação Financeira");

        let rows: Vec<csv::StringRecord> = reader.records().map(|row| row.unwrap()).collect();
        assert_eq!(&rows[0][2], "Engenharia");
        assert_eq!(&rows[0][18], "50.0");
        assert_eq!(&rows[0][19], "25.0");
        assert_eq!(&rows[0][20], "Em dia");
        assert_eq!(&rows[1][18], "N/A");
    }

    #[test]
    fn json_snapshot_contains_kpis_and_students() {
        let records = vec![normalize_record(sample_raw())];
        let mut buffer = Vec::new();
        write_json(&mut buffer, &records, generated_at()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["generated_at"], "15/04/2024 09:05");
        assert_eq!(value["kpis"]["total_students"], 1);
        assert_eq!(value["pillars"].as_array().unwrap().len(), 4);
        assert_eq!(value["students"][0]["Curso"], "Engenharia");
        assert_eq!(value["students"][0]["financial_status"], "satisfied");
    }

    #[test]
    fn export_defaults_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().join("output");
        let records = vec![normalize_record(sample_raw())];

        let path = export(Format::Json, &records, generated_at(), None, &output_dir).unwrap();
        assert_eq!(path, output_dir.join("relatorio_estudantes_20240415_0905.json"));
        assert!(path.exists());
    }
}
