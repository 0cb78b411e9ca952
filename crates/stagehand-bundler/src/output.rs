//! Output naming and writing.
//!
//! Code-split builds are renamed through the naming templates with a content
//! hash before anything touches disk. Writes are atomic: all files land via
//! temp-file + rename, and a failure rolls back everything written so far.

use std::fs;
use std::path::{Path, PathBuf};

use path_clean::PathClean;
use rolldown::BundleOutput;
use rolldown_common::Output;
use rustc_hash::FxHashMap;

use crate::{Error, Result, build::OutputFile, digest::short_digest};

/// One engine chunk, reduced to what renaming and writing need.
#[derive(Debug, Clone)]
pub(crate) struct ChunkInfo {
    pub filename: String,
    pub facade: Option<String>,
    pub is_entry: bool,
    pub code: String,
    pub map_json: Option<String>,
}

#[derive(Debug, Default)]
pub(crate) struct CollectedOutput {
    pub chunks: Vec<ChunkInfo>,
    pub assets: Vec<OutputFile>,
}

pub(crate) fn collect(bundle: &BundleOutput) -> CollectedOutput {
    let mut collected = CollectedOutput::default();

    for output in &bundle.assets {
        match output {
            Output::Chunk(chunk) => collected.chunks.push(ChunkInfo {
                filename: chunk.filename.to_string(),
                facade: chunk.facade_module_id.as_ref().map(|id| id.to_string()),
                is_entry: chunk.is_entry,
                code: chunk.code.clone(),
                map_json: chunk.map.as_ref().map(|map| map.to_json_string()),
            }),
            Output::Asset(asset) => collected.assets.push(OutputFile {
                path: asset.filename.to_string(),
                contents: asset.source.as_bytes().to_vec(),
            }),
        }
    }

    collected
}

/// Fill a naming template's `[dir]`, `[name]` and `[hash]` slots, appending
/// the original extension.
pub(crate) fn apply_template(template: &str, dir: &str, name: &str, hash: &str, ext: &str) -> String {
    let filled = template.replace("[dir]", dir).replace("[name]", name).replace("[hash]", hash);
    let cleaned: PathBuf = Path::new(&filled).clean();
    let mut path = cleaned.to_string_lossy().into_owned();
    if !ext.is_empty() {
        path.push('.');
        path.push_str(ext);
    }
    path
}

/// Map every chunk's engine-assigned filename to its template name.
///
/// The hash slot is filled from the chunk's pre-rewrite content, so it is
/// stable for a given source regardless of sibling renames.
pub(crate) fn plan_renames(
    chunks: &[ChunkInfo],
    root: &Path,
    entry_template: &str,
    chunk_template: &str,
) -> FxHashMap<String, String> {
    let mut renames = FxHashMap::default();

    for chunk in chunks {
        let hash = short_digest(chunk.code.as_bytes());
        let ext = Path::new(&chunk.filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("js")
            .to_string();

        let renamed = if chunk.is_entry {
            let rel = chunk
                .facade
                .as_deref()
                .map(|facade| {
                    Path::new(facade)
                        .strip_prefix(root)
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|_| PathBuf::from(facade))
                })
                .unwrap_or_else(|| PathBuf::from(&chunk.filename));

            let dir = rel.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
            let name = rel
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "entry".to_string());

            apply_template(entry_template, &dir, &name, &hash, &ext)
        } else {
            let stem = Path::new(&chunk.filename)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "chunk".to_string());
            let name = strip_engine_hash(&stem).to_string();

            apply_template(chunk_template, "", &name, &hash, &ext)
        };

        renames.insert(chunk.filename.clone(), renamed);
    }

    renames
}

/// The engine suffixes shared-chunk filenames with its own 8-char hash
/// (`shared-B8GXm7df.js`); strip it so the naming template's hash is the only
/// one in the final name.
fn strip_engine_hash(stem: &str) -> &str {
    if let Some(idx) = stem.rfind('-') {
        let suffix = &stem[idx + 1..];
        if idx > 0
            && suffix.len() == 8
            && suffix.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            return &stem[..idx];
        }
    }
    stem
}

/// Rewrite import references between renamed chunks.
///
/// References are recomputed relative to the renamed importer's directory:
/// an entry moved into `lib/` must reach a shared chunk at `_chunks/` via
/// `../_chunks/...`, not the engine's original `./...`.
pub(crate) fn rewrite_references(
    code: &str,
    renames: &FxHashMap<String, String>,
    importer: &str,
) -> String {
    let importer_dir = Path::new(importer).parent().unwrap_or(Path::new(""));
    let mut rewritten = code.to_string();
    for (old, new) in renames {
        let reference = relative_reference(new, importer_dir);
        let prefixed = format!("./{old}");
        if rewritten.contains(&prefixed) {
            rewritten = rewritten.replace(&prefixed, &reference);
        }
        if rewritten.contains(old.as_str()) {
            rewritten = rewritten.replace(old.as_str(), &reference);
        }
    }
    rewritten
}

/// A browser-resolvable path from `importer_dir` to `target`, both relative
/// to the output directory.
fn relative_reference(target: &str, importer_dir: &Path) -> String {
    let from: Vec<String> =
        importer_dir.iter().map(|c| c.to_string_lossy().into_owned()).collect();
    let to: Vec<String> =
        Path::new(target).iter().map(|c| c.to_string_lossy().into_owned()).collect();

    // Only directory components of the target participate in the common
    // prefix; the last component is the file name.
    let dir_len = to.len().saturating_sub(1);
    let mut common = 0;
    while common < from.len() && common < dir_len && from[common] == to[common] {
        common += 1;
    }

    let mut parts: Vec<String> = Vec::new();
    if from.len() == common {
        parts.push(".".to_string());
    } else {
        parts.extend(std::iter::repeat("..".to_string()).take(from.len() - common));
    }
    parts.extend(to[common..].iter().cloned());
    parts.join("/")
}

/// Point the chunk's sourcemap comment at `map_basename`, replacing any
/// reference the engine already emitted.
pub(crate) fn patch_sourcemap_reference(code: &str, map_basename: &str) -> String {
    let mut out: String = code
        .lines()
        .filter(|line| !line.trim_start().starts_with("//# sourceMappingURL="))
        .collect::<Vec<_>>()
        .join("\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("//# sourceMappingURL={map_basename}\n"));
    out
}

/// Write output files under `dir` atomically, creating directories as
/// needed. A failure removes everything staged so far.
pub fn write_files(files: &[OutputFile], dir: &Path) -> Result<()> {
    let dir = dir.clean();
    fs::create_dir_all(&dir).map_err(|e| {
        Error::WriteFailure(format!("Failed to create output directory '{}': {e}", dir.display()))
    })?;

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(files.len());

    for file in files {
        let target = validate_output_path(&dir, &file.path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                cleanup(&staged);
                Error::WriteFailure(format!(
                    "Failed to create directory '{}': {e}",
                    parent.display()
                ))
            })?;
        }

        // Append rather than replace the extension so siblings that differ
        // only in extension stage to distinct temp files.
        let temp = PathBuf::from(format!("{}.tmp", target.display()));
        fs::write(&temp, &file.contents).map_err(|e| {
            cleanup(&staged);
            Error::WriteFailure(format!("Failed to write '{}': {e}", temp.display()))
        })?;
        staged.push((temp, target));
    }

    for (temp, target) in &staged {
        fs::rename(temp, target).map_err(|e| {
            cleanup(&staged);
            Error::WriteFailure(format!(
                "Failed to rename '{}' to '{}': {e}",
                temp.display(),
                target.display()
            ))
        })?;
    }

    Ok(())
}

fn validate_output_path(base: &Path, filename: &str) -> Result<PathBuf> {
    if filename.contains('\0') {
        return Err(Error::WriteFailure("output filename contains a null byte".to_string()));
    }

    let full = base.join(Path::new(filename).clean()).clean();
    if !full.starts_with(base) {
        return Err(Error::WriteFailure(format!(
            "output path '{filename}' escapes '{}'",
            base.display()
        )));
    }
    Ok(full)
}

fn cleanup(staged: &[(PathBuf, PathBuf)]) {
    for (temp, _) in staged {
        let _ = fs::remove_file(temp);
    }
}
