//! The write phase: serializes a staged layout into one compressed archive.
//!
//! The archive is assembled in a temporary file inside the destination
//! directory and persisted atomically, so a failure partway through never
//! leaves a truncated archive at the final path. Entry timestamps are fixed,
//! which makes the staged content byte-reproducible across runs.

use crate::package::stage::{ArtifactSource, StagedArtifact};
use crate::util::repo::PRODUCT;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deterministic archive name: product, version, platform, wall-clock stamp.
pub fn archive_name(version: &str, platform: &str, timestamp: &DateTime<Local>) -> String {
    format!(
        "{PRODUCT}-portable-v{version}-{platform}-{}.zip",
        timestamp.format("%Y%m%d-%H%M%S")
    )
}

pub fn write(plan: &[StagedArtifact], dist_dir: &Path, file_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dist_dir)
        .with_context(|| format!("failed to create {}", dist_dir.display()))?;
    let final_path = dist_dir.join(file_name);

    let mut tmp = NamedTempFile::new_in(dist_dir)
        .context("failed to create temporary archive file")?;
    {
        let mut zip = ZipWriter::new(&mut tmp);

        for artifact in plan {
            let mode = if artifact.executable { 0o755 } else { 0o644 };
            // Fixed entry timestamp keeps archive bytes reproducible.
            let options = SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(zip::DateTime::default())
                .unix_permissions(mode);
            zip.start_file(artifact.dest.as_str(), options)
                .with_context(|| format!("failed to add {} to the archive", artifact.dest))?;
            match &artifact.source {
                ArtifactSource::Inline(bytes) => {
                    zip.write_all(bytes)
                        .with_context(|| format!("failed to write {}", artifact.dest))?;
                }
                ArtifactSource::File(path) => {
                    let mut file = File::open(path).with_context(|| {
                        format!("staged source missing: {}", path.display())
                    })?;
                    std::io::copy(&mut file, &mut zip)
                        .with_context(|| format!("failed to write {}", artifact.dest))?;
                }
            }
        }
        zip.finish().context("failed to finalize the archive")?;
    }

    tmp.persist(&final_path)
        .with_context(|| format!("failed to move archive into place at {}", final_path.display()))?;
    Ok(final_path)
}
