use crate::db;
use anyhow::Context;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/school.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "schoold-workspace-v1";
pub const LEGACY_FORMAT: &str = "sqlite3";

/// The input was readable but is not something we can restore from.
#[derive(Debug, Error)]
#[error("invalid bundle: {0}")]
pub struct InvalidBundle(pub String);

impl InvalidBundle {
    /// Whether `e` (or anything in its context chain) is an [`InvalidBundle`].
    pub fn is_cause_of(e: &anyhow::Error) -> bool {
        e.chain().any(|c| c.is::<InvalidBundle>())
    }
}

fn invalid(message: impl Into<String>) -> anyhow::Error {
    InvalidBundle(message.into()).into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    format: String,
    app_version: String,
    exported_at: u64,
    db_sha256: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub bundle_format: String,
    pub db_sha256: String,
    pub db_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub tables: Vec<String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Zips the workspace database together with a manifest carrying its checksum.
pub fn export_workspace_bundle(workspace: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let db_file = db::db_path(workspace);
    let db_bytes = std::fs::read(&db_file)
        .with_context(|| format!("failed to read database {}", db_file.to_string_lossy()))?;
    let digest = sha256_hex(&db_bytes);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.to_string_lossy()))?;
    let mut zip = ZipWriter::new(out);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        db_sha256: digest.clone(),
    };
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(&serde_json::to_vec_pretty(&manifest).context("failed to serialize manifest")?)
        .context("failed to write manifest entry")?;

    zip.start_file(DB_ENTRY, opts)
        .context("failed to start database entry")?;
    zip.write_all(&db_bytes)
        .context("failed to write database entry")?;
    zip.finish().context("failed to finalize bundle")?;

    info!(path = %out_path.display(), sha256 = %digest, "workspace exported");
    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        db_sha256: digest,
        db_bytes: db_bytes.len(),
    })
}

/// Replaces the workspace database with the one in `in_path`.
///
/// Accepts a bundle written by [`export_workspace_bundle`] (checksum verified)
/// or a bare SQLite file. The incoming database is staged next to the live one
/// and only swapped in once it opens and its schema is in place.
pub fn import_workspace_bundle(in_path: &Path, workspace: &Path) -> anyhow::Result<ImportSummary> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;

    let (format, db_bytes) = if is_zip_file(in_path)? {
        (BUNDLE_FORMAT_V1, read_bundle(in_path)?)
    } else {
        let bytes = std::fs::read(in_path)
            .with_context(|| format!("failed to read backup {}", in_path.to_string_lossy()))?;
        (LEGACY_FORMAT, bytes)
    };

    let dst = db::db_path(workspace);
    let staged = dst.with_extension("sqlite3.importing");
    std::fs::write(&staged, &db_bytes)
        .with_context(|| format!("failed to stage database {}", staged.to_string_lossy()))?;

    let tables = match check_staged(&staged) {
        Ok(t) => t,
        Err(e) => {
            warn!(path = %in_path.display(), "import rejected: {e:#}");
            let _ = std::fs::remove_file(&staged);
            return Err(e);
        }
    };

    std::fs::rename(&staged, &dst)
        .with_context(|| format!("failed to move staged database to {}", dst.to_string_lossy()))?;

    info!(path = %in_path.display(), format, "workspace imported");
    Ok(ImportSummary {
        bundle_format_detected: format.to_string(),
        tables,
    })
}

fn read_bundle(in_path: &Path) -> anyhow::Result<Vec<u8>> {
    let file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive =
        ZipArchive::new(file).map_err(|e| invalid(format!("not a zip archive: {e}")))?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .map_err(|_| invalid(format!("missing {}", MANIFEST_ENTRY)))?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: Manifest = serde_json::from_str(&manifest_text)
        .map_err(|e| invalid(format!("{} is malformed: {e}", MANIFEST_ENTRY)))?;
    if manifest.format != BUNDLE_FORMAT_V1 {
        return Err(invalid(format!("unsupported format {:?}", manifest.format)));
    }

    let mut db_bytes = Vec::new();
    archive
        .by_name(DB_ENTRY)
        .map_err(|_| invalid(format!("missing {}", DB_ENTRY)))?
        .read_to_end(&mut db_bytes)
        .context("failed to extract database entry")?;

    let actual = sha256_hex(&db_bytes);
    if actual != manifest.db_sha256 {
        return Err(invalid(format!(
            "database checksum mismatch: manifest {}, bundle {}",
            manifest.db_sha256, actual
        )));
    }
    Ok(db_bytes)
}

/// The staged file must open as SQLite and carry exactly our columns, or the
/// rename would put an unusable database in place of the live one.
fn check_staged(path: &Path) -> anyhow::Result<Vec<String>> {
    let conn = Connection::open(path).context("failed to open staged database")?;
    db::ensure_schema(&conn).map_err(|e| invalid(format!("not a usable database: {e}")))?;
    let mismatched =
        db::schema_mismatches(&conn).context("failed to read staged table layout")?;
    if !mismatched.is_empty() {
        return Err(invalid(format!(
            "tables do not match the school schema: {}",
            mismatched.join(", ")
        )));
    }
    Ok(db::list_tables(&conn)?)
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    Ok(read == 4 && sig == [0x50, 0x4B, 0x03, 0x04])
}
