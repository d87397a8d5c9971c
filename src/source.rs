use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::models::RawRecord;

fn lossy_fields(record: &csv::ByteRecord) -> (Vec<String>, bool) {
    let mut replaced = false;
    let fields = record
        .iter()
        .map(|field| match std::str::from_utf8(field) {
            Ok(text) => text.to_string(),
            Err(_) => {
                replaced = true;
                String::from_utf8_lossy(field).into_owned()
            }
        })
        .collect();
    (fields, replaced)
}

/// Parses a CSV export. Blank lines are ignored; rows carrying fewer than half
/// of the header's columns are skipped. Bytes that are not UTF-8 are replaced
/// instead of failing the row.
pub fn parse_csv<R: std::io::Read>(input: R) -> anyhow::Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    let (headers, _) = lossy_fields(reader.byte_headers().context("CSV export has no header row")?);
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    let mut record = csv::ByteRecord::new();
    let mut index = 0usize;

    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("malformed CSV row {}", index + 1))?
    {
        index += 1;
        if record.len() * 2 < headers.len() {
            debug!(row = index, columns = record.len(), "skipping short row");
            skipped += 1;
            continue;
        }

        let (fields, replaced) = lossy_fields(&record);
        if replaced {
            warn!(row = index, "row contains invalid UTF-8, replacing bad bytes");
        }
        rows.push(RawRecord::from_lookup(|name| {
            headers
                .iter()
                .position(|header| header == name)
                .and_then(|position| fields.get(position))
                .cloned()
        }));
    }

    info!(rows = rows.len(), skipped, "parsed CSV export");
    Ok(rows)
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Parses the fallback JSON file: an array of objects keyed by column name.
pub fn parse_json(input: &str) -> anyhow::Result<Vec<RawRecord>> {
    let objects: Vec<BTreeMap<String, serde_json::Value>> =
        serde_json::from_str(input).context("fallback JSON must be an array of objects")?;

    Ok(objects
        .iter()
        .map(|object| RawRecord::from_lookup(|name| object.get(name).map(json_text)))
        .collect())
}

pub fn load_file(path: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        parse_csv(file)
    } else {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse_json(&content)
    }
}

pub async fn fetch_remote(client: &reqwest::Client, url: &str) -> anyhow::Result<Vec<RawRecord>> {
    let stamp = Utc::now().timestamp_millis().to_string();
    let response = client
        .get(url)
        .query(&[("t", stamp.as_str())])
        .header(reqwest::header::CACHE_CONTROL, "no-cache")
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;

    if !response.status().is_success() {
        bail!("{url} answered with status {}", response.status());
    }

    let body = response.text().await.context("failed to read CSV body")?;
    let rows = parse_csv(body.as_bytes())?;
    if rows.is_empty() {
        bail!("{url} returned no rows");
    }
    Ok(rows)
}

/// Remote sheet first, local file second.
pub async fn load_records(
    client: &reqwest::Client,
    sheet_url: Option<&str>,
    fallback: &Path,
) -> anyhow::Result<Vec<RawRecord>> {
    if let Some(url) = sheet_url {
        match fetch_remote(client, url).await {
            Ok(rows) => {
                info!(rows = rows.len(), "loaded records from published sheet");
                return Ok(rows);
            }
            Err(err) => warn!("published sheet unavailable, using fallback: {err:#}"),
        }
    }

    let rows = load_file(fallback)
        .with_context(|| format!("failed to load fallback data from {}", fallback.display()))?;
    info!(rows = rows.len(), path = %fallback.display(), "loaded records from local file");
    Ok(rows)
}
