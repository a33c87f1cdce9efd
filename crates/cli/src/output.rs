use anyhow::{Context, Result};
use logtier_pipeline::CandidateSet;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write one log group identifier per line, in pipeline order. The file is
/// truncated first, so an empty result leaves an empty file.
pub fn write_candidates(path: &Path, candidates: &CandidateSet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let file =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for id in candidates {
        writeln!(writer, "{id}")?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
