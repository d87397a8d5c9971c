use std::fmt::Write;

use chrono::NaiveDate;

use crate::finance;
use crate::kpi;
use crate::metrics;
use crate::models::NormalizedRecord;

const STUDENT_LIMIT: usize = 50;

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

pub fn build_report(scope: &str, as_of: NaiveDate, records: &[NormalizedRecord]) -> String {
    let kpis = kpi::compute_kpis(records, as_of);
    let pillars = metrics::pillar_metrics(records);
    let financial = metrics::financial_distribution(records, as_of);
    let progress = metrics::discipline_progress(records);
    let summary = kpi::enrollment_summary(records);

    let mut output = String::new();

    let _ = writeln!(output, "# Relatório de Estudantes");
    let _ = writeln!(output, "Gerado para {} em {}", scope, as_of.format("%d/%m/%Y"));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Indicadores Principais");
    let _ = writeln!(output, "- Total de Estudantes: {}", kpis.total_students);
    let _ = writeln!(output, "- % Em Dia: {:.1}%", kpis.percent_current);
    let _ = writeln!(output, "- % Inadimplentes: {:.1}%", kpis.percent_delinquent);
    let _ = writeln!(output, "- Progresso Médio: {:.1}%", kpis.avg_discipline_progress);
    let _ = writeln!(output, "- Docs Completos: {:.1}%", kpis.percent_docs_ok);
    let _ = writeln!(
        output,
        "- Certificados solicitados: {} (7d), {} (30d), {} (90d)",
        kpis.cert_requests_7d, kpis.cert_requests_30d, kpis.cert_requests_90d
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status dos Pilares");
    for entry in pillars.iter() {
        let metric = &entry.metric;
        let _ = writeln!(
            output,
            "- {}: {} OK ({:.1}%), {} pendentes ({:.1}%), {} N/A ({:.1}%)",
            entry.pillar.label(),
            metric.counts.ok,
            metric.percentages.ok,
            metric.counts.error,
            metric.percentages.error,
            metric.counts.na,
            metric.percentages.na
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Situação Financeira");
    let _ = writeln!(
        output,
        "- Em dia: {}, Quitado: {}, Inadimplente: {}, N/A: {}",
        financial.counts.current,
        financial.counts.paid_off,
        financial.counts.delinquent,
        financial.counts.not_applicable
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Inscrições");
    let _ = writeln!(
        output,
        "- Formado: {}, Cursando: {}, Cancelada: {}, Bloqueada: {}, Outros: {}",
        summary.graduated, summary.enrolled, summary.cancelled, summary.blocked, summary.other
    );
    for course in summary.by_course.iter() {
        let _ = writeln!(output, "- Curso {}: {}", course.name, course.count);
    }
    for cohort in summary.by_cohort.iter() {
        let _ = writeln!(output, "- Turma {}: {}", cohort.name, cohort.count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Progresso por Curso e Turma");
    if progress.by_course_cohort.is_empty() {
        let _ = writeln!(output, "Nenhum progresso de disciplinas registrado.");
    } else {
        for group in progress.by_course_cohort.iter() {
            let _ = writeln!(
                output,
                "- {} - {}: {:.1}% ({} estudantes)",
                group.course, group.cohort, group.average, group.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Lista de Estudantes");
    if records.is_empty() {
        let _ = writeln!(output, "Nenhum estudante encontrado.");
        return output;
    }

    let _ = writeln!(output, "| Nome | CPF | Curso | Status | Financeiro |");
    let _ = writeln!(output, "|---|---|---|---|---|");
    for record in records.iter().take(STUDENT_LIMIT) {
        let raw = &record.raw;
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} |",
            truncate(&raw.name, 25),
            raw.cpf,
            truncate(&raw.course, 15),
            truncate(&raw.enrollment_status, 12),
            finance::classify_record(record, as_of).label()
        );
    }
    if records.len() > STUDENT_LIMIT {
        let _ = writeln!(output);
        let _ = writeln!(output, "... e mais {} estudantes", records.len() - STUDENT_LIMIT);
    }

    output
}
