use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const RECORDS_ENTRY: &str = "records.json";
pub const SNAPSHOT_FORMAT_V1: &str = "saathi-records-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub snapshot_format: String,
    pub record_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportedSnapshot {
    pub snapshot_format: String,
    pub records: BTreeMap<String, String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Writes every stored record (key -> raw JSON blob) into a zip bundle.
pub fn export_snapshot(
    records: &BTreeMap<String, String>,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let records_bytes =
        serde_json::to_vec_pretty(records).context("failed to serialize records")?;
    let checksum = sha256_hex(&records_bytes);

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": SNAPSHOT_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "recordCount": records.len(),
        "sha256": checksum,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(RECORDS_ENTRY, opts)
        .context("failed to start records entry")?;
    zip.write_all(&records_bytes)
        .context("failed to write records entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        snapshot_format: SNAPSHOT_FORMAT_V1.to_string(),
        record_count: records.len(),
        sha256: checksum,
    })
}

pub fn import_snapshot(in_path: &Path) -> anyhow::Result<ImportedSnapshot> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != SNAPSHOT_FORMAT_V1 {
        return Err(anyhow!("unsupported snapshot format: {}", format));
    }

    let mut records_bytes: Vec<u8> = Vec::new();
    archive
        .by_name(RECORDS_ENTRY)
        .context("bundle missing records.json")?
        .read_to_end(&mut records_bytes)
        .context("failed to read records.json")?;

    let expected = manifest.get("sha256").and_then(|v| v.as_str()).unwrap_or("");
    let actual = sha256_hex(&records_bytes);
    if expected != actual {
        return Err(anyhow!(
            "records checksum mismatch (manifest {}, bundle {})",
            expected,
            actual
        ));
    }

    let records: BTreeMap<String, String> =
        serde_json::from_slice(&records_bytes).context("records.json is invalid")?;
    Ok(ImportedSnapshot {
        snapshot_format: SNAPSHOT_FORMAT_V1.to_string(),
        records,
    })
}
