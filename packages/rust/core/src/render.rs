//! Deterministic JSON rendering and artifact writing.

use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use jsondocgen_shared::{ArtifactMeta, DocGenError, MANIFEST_FILE_NAME, Result, RunManifest};

/// Pretty-print `value` as JSON with a trailing newline.
///
/// Fields come out in declaration order, non-ASCII text is written as is and
/// markup characters are not escaped, so identical values give identical bytes.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Write one artifact atomically and record its checksum.
#[instrument(skip_all, fields(dir = %dir.display(), file = %filename))]
pub fn write_artifact(dir: &Path, filename: &str, content: &str) -> Result<ArtifactMeta> {
    write_atomic(dir, filename, content)?;

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    debug!(size = content.len(), "wrote artifact");

    Ok(ArtifactMeta {
        filename: filename.to_string(),
        sha256: hash,
        size_bytes: content.len(),
    })
}

/// Write `manifest.json` into `dir`.
pub fn write_manifest(dir: &Path, manifest: &RunManifest) -> Result<()> {
    let json = to_pretty_json(manifest)?;
    write_atomic(dir, MANIFEST_FILE_NAME, &json)?;
    debug!(path = %dir.join(MANIFEST_FILE_NAME).display(), "wrote run manifest");
    Ok(())
}

/// Read a previously written manifest back.
pub fn read_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join(MANIFEST_FILE_NAME);
    let content = std::fs::read_to_string(&path).map_err(|e| DocGenError::io(&path, e))?;
    serde_json::from_str(&content).map_err(|e| {
        DocGenError::validation(format!("invalid manifest {}: {e}", path.display()))
    })
}

fn write_atomic(dir: &Path, filename: &str, content: &str) -> Result<()> {
    let target = dir.join(filename);
    let temp = dir.join(format!(".{filename}.tmp"));

    std::fs::write(&temp, content).map_err(|e| DocGenError::io(&temp, e))?;
    std::fs::rename(&temp, &target).map_err(|e| DocGenError::io(&target, e))?;
    Ok(())
}
