//! Run history: what an applied migration changed, and how to undo it.
//!
//! Every `run --apply` stores the original content of each touched file
//! under `<state dir>/<run id>/` plus a metadata record. `revert` writes the
//! originals back once it has checked nothing changed since.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::tree::FileChange;

pub const STATE_DIR_ENV: &str = "NG_MIGRATE_STATE_DIR";

/// Short unique run id (7 hex characters, like git).
pub fn generate_run_id() -> String {
    let timestamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let hash = blake3::hash(&timestamp.to_le_bytes());
    hash.to_hex().as_str()[..7].to_string()
}

/// State directory, in priority order: `NG_MIGRATE_STATE_DIR`, `./.ng-migrate`
/// with `--local-state`, then the platform data directory.
pub fn get_state_dir(local: bool) -> Result<PathBuf> {
    if let Ok(custom_dir) = std::env::var(STATE_DIR_ENV) {
        return Ok(PathBuf::from(custom_dir));
    }

    if local {
        let current_dir = std::env::current_dir()?;
        Ok(current_dir.join(".ng-migrate"))
    } else {
        let proj_dirs = ProjectDirs::from("com", "ng-migrate", "ng-migrate")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }
}

pub fn hash_bytes(content: &[u8]) -> String {
    blake3::hash(content).to_hex().to_string()
}

pub fn hash_file(path: &Path) -> Result<String> {
    let content = fs::read(path)
        .with_context(|| format!("Failed to read file for hashing: {}", path.display()))?;
    Ok(hash_bytes(&content))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileModification {
    /// Path relative to the run root.
    pub path: String,
    /// `None` when the run created the file.
    pub hash_before: Option<String>,
    /// `None` when the run deleted the file.
    pub hash_after: Option<String>,
    /// Name of the saved original inside the run directory.
    pub backup: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Applied,
    Reverted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub root: PathBuf,
    pub command: String,
    /// Migration names, in the order they ran.
    pub migrations: Vec<String>,
    pub files_modified: Vec<FileModification>,
    pub status: RunStatus,
    pub can_revert: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunsIndex {
    pub runs: HashMap<String, RunMetadata>,
}

impl RunsIndex {
    pub fn load(state_dir: &Path) -> Result<Self> {
        let index_path = state_dir.join("runs.json");
        if !index_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&index_path).context("Failed to read runs index")?;
        serde_json::from_str(&content).context("Failed to parse runs index")
    }

    /// Load the index, starting over when it was written by an incompatible
    /// version.
    pub fn load_or_reset(state_dir: &Path) -> Result<Self> {
        match Self::load(state_dir) {
            Ok(index) => Ok(index),
            Err(e) if format!("{:#}", e).contains("missing field") => {
                warn!(location = %state_dir.display(), "incompatible state format, resetting state directory");
                if state_dir.exists() {
                    fs::remove_dir_all(state_dir).context("Failed to remove old state directory")?;
                }
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, state_dir: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(state_dir, "runs.json", content.as_bytes())
    }

    pub fn add_run(&mut self, run: RunMetadata) {
        self.runs.insert(run.run_id.clone(), run);
    }

    pub fn get_run(&self, run_id: &str) -> Option<&RunMetadata> {
        self.runs.get(run_id)
    }

    /// Newest first.
    pub fn get_sorted_runs(&self) -> Vec<&RunMetadata> {
        let mut runs: Vec<_> = self.runs.values().collect();
        runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        runs
    }
}

fn write_atomic(dir: &Path, name: &str, content: &[u8]) -> Result<()> {
    fs::create_dir_all(dir)?;
    let temp_path = dir.join(format!("{}.tmp", name));
    let mut file = fs::File::create(&temp_path)?;
    file.write_all(content)?;
    file.sync_all()?;
    drop(file);
    fs::rename(temp_path, dir.join(name))?;
    Ok(())
}

fn backup_name(path: &str) -> String {
    path.replace('/', "__")
}

/// Save the originals of `changes` and return the run record for them.
pub fn record_run(
    run_id: &str,
    root: &Path,
    command: &str,
    migrations: Vec<String>,
    changes: &[FileChange],
    state_dir: &Path,
) -> Result<RunMetadata> {
    let backup_dir = state_dir.join(run_id);
    let mut files_modified = Vec::new();
    for change in changes {
        let backup = match &change.original {
            Some(original) => {
                let name = backup_name(&change.path);
                fs::create_dir_all(&backup_dir)?;
                fs::write(backup_dir.join(&name), original)
                    .with_context(|| format!("Failed to back up {}", change.path))?;
                Some(name)
            }
            None => None,
        };
        files_modified.push(FileModification {
            path: change.path.clone(),
            hash_before: change.original.as_deref().map(hash_bytes),
            hash_after: change.content.as_deref().map(hash_bytes),
            backup,
        });
    }

    let run = RunMetadata {
        run_id: run_id.to_string(),
        timestamp: Utc::now(),
        root: root.to_path_buf(),
        command: command.to_string(),
        migrations,
        files_modified,
        status: RunStatus::Applied,
        can_revert: true,
    };
    save_run_metadata(&run, state_dir)?;
    debug!(run_id, files = run.files_modified.len(), "recorded run");
    Ok(run)
}

/// Save run metadata and add it to the index.
pub fn save_run_metadata(run: &RunMetadata, state_dir: &Path) -> Result<()> {
    let content = serde_json::to_string_pretty(run)?;
    write_atomic(state_dir, &format!("{}.json", run.run_id), content.as_bytes())?;

    let mut index = RunsIndex::load(state_dir)?;
    index.add_run(run.clone());
    index.save(state_dir)
}

pub fn load_run_metadata(run_id: &str, state_dir: &Path) -> Result<RunMetadata> {
    let metadata_path = state_dir.join(format!("{}.json", run_id));
    if !metadata_path.exists() {
        bail!("Run {} not found", run_id);
    }

    let content = fs::read_to_string(&metadata_path).context("Failed to read run metadata")?;
    serde_json::from_str(&content).context("Failed to parse run metadata")
}

/// Restore the files of a run. Returns the restored paths.
pub fn revert_run(run_id: &str, force: bool, state_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut run = load_run_metadata(run_id, state_dir)?;

    if run.status == RunStatus::Reverted {
        bail!("Run {} has already been reverted", run_id);
    }
    if !run.can_revert {
        bail!("Run {} cannot be reverted", run_id);
    }

    if !force {
        for file in &run.files_modified {
            let full = run.root.join(&file.path);
            let current = if full.exists() { Some(hash_file(&full)?) } else { None };
            if current != file.hash_after {
                bail!(
                    "File {} has changed since run {} (use --force to ignore)",
                    full.display(),
                    run_id
                );
            }
        }
    }

    let backup_dir = state_dir.join(run_id);
    let mut restored = Vec::new();
    for file in &run.files_modified {
        let full = run.root.join(&file.path);
        match &file.backup {
            Some(name) => {
                let original = fs::read(backup_dir.join(name))
                    .with_context(|| format!("Missing backup for {}", file.path))?;
                if let Some(parent) = full.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&full, original)
                    .with_context(|| format!("Failed to restore {}", full.display()))?;
            }
            None => {
                if full.exists() {
                    fs::remove_file(&full)
                        .with_context(|| format!("Failed to remove {}", full.display()))?;
                }
            }
        }
        restored.push(full);
    }

    run.status = RunStatus::Reverted;
    run.can_revert = false;
    save_run_metadata(&run, state_dir)?;
    Ok(restored)
}

/// One line per run, newest first.
pub fn format_history(limit: usize, state_dir: &Path) -> Result<Vec<String>> {
    let index = RunsIndex::load_or_reset(state_dir)?;
    Ok(index
        .get_sorted_runs()
        .into_iter()
        .take(limit)
        .map(|run| {
            let status_str = match run.status {
                RunStatus::Applied if run.can_revert => "[can revert]",
                RunStatus::Applied => "[applied]",
                RunStatus::Reverted => "[reverted]",
            };
            let files_str = if run.files_modified.len() == 1 {
                "1 file".to_string()
            } else {
                format!("{} files", run.files_modified.len())
            };
            format!(
                "{}  {}  {:20}  {:10}  {}",
                run.run_id,
                run.timestamp.format("%Y-%m-%d %H:%M"),
                truncate_str(&run.migrations.join(","), 20),
                files_str,
                status_str
            )
        })
        .collect())
}

/// Drop runs older than `keep_days`. Returns how many were removed.
pub fn clean_old_state(keep_days: u32, state_dir: &Path) -> Result<usize> {
    let index = RunsIndex::load_or_reset(state_dir)?;
    let cutoff = Utc::now() - Duration::days(keep_days as i64);

    let mut cleaned = 0;
    let mut new_index = RunsIndex::default();
    for run in index.runs.values() {
        if run.timestamp < cutoff {
            let backup_dir = state_dir.join(&run.run_id);
            if backup_dir.exists() {
                fs::remove_dir_all(&backup_dir)?;
            }
            let metadata_path = state_dir.join(format!("{}.json", run.run_id));
            if metadata_path.exists() {
                fs::remove_file(&metadata_path)?;
            }
            cleaned += 1;
        } else {
            new_index.add_run(run.clone());
        }
    }

    new_index.save(state_dir)?;
    Ok(cleaned)
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::ChangeKind;
    use tempfile::TempDir;

    fn modified(path: &str, original: &str, content: &str) -> FileChange {
        FileChange {
            path: path.to_string(),
            kind: ChangeKind::Modified,
            original: Some(original.as_bytes().to_vec()),
            content: Some(content.as_bytes().to_vec()),
        }
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert_eq!(id.len(), 7);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_record_and_revert_run() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().join("project");
        let state_dir = temp_dir.path().join("state");
        fs::create_dir_all(root.join("src"))?;
        fs::write(root.join("src/a.ts"), "new\n")?;

        let changes = vec![modified("src/a.ts", "old\n", "new\n")];
        let run = record_run("abc1234", &root, "run", vec!["element-v49".into()], &changes, &state_dir)?;
        assert_eq!(run.files_modified[0].backup.as_deref(), Some("src__a.ts"));

        let index = RunsIndex::load(&state_dir)?;
        assert!(index.get_run("abc1234").is_some());
        assert_eq!(format_history(10, &state_dir)?.len(), 1);

        let restored = revert_run("abc1234", false, &state_dir)?;
        assert_eq!(restored, vec![root.join("src/a.ts")]);
        assert_eq!(fs::read_to_string(root.join("src/a.ts"))?, "old\n");

        let reloaded = load_run_metadata("abc1234", &state_dir)?;
        assert_eq!(reloaded.status, RunStatus::Reverted);
        assert!(revert_run("abc1234", false, &state_dir).is_err());
        Ok(())
    }

    #[test]
    fn test_revert_refuses_changed_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path().to_path_buf();
        let state_dir = temp_dir.path().join(".state");
        fs::write(root.join("a.html"), "<b></b>")?;

        let changes = vec![modified("a.html", "<a></a>", "<b></b>")];
        record_run("def5678", &root, "run", vec![], &changes, &state_dir)?;
        fs::write(root.join("a.html"), "<c></c>")?;

        let err = revert_run("def5678", false, &state_dir).unwrap_err();
        assert!(err.to_string().contains("has changed"));

        revert_run("def5678", true, &state_dir)?;
        assert_eq!(fs::read_to_string(root.join("a.html"))?, "<a></a>");
        Ok(())
    }

    #[test]
    fn test_clean_keeps_recent_runs() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let state_dir = temp_dir.path().join("state");
        record_run("0000001", temp_dir.path(), "run", vec![], &[], &state_dir)?;

        let mut old = load_run_metadata("0000001", &state_dir)?;
        old.run_id = "0000002".into();
        old.timestamp = Utc::now() - Duration::days(40);
        save_run_metadata(&old, &state_dir)?;

        assert_eq!(clean_old_state(30, &state_dir)?, 1);
        let index = RunsIndex::load(&state_dir)?;
        assert!(index.get_run("0000001").is_some());
        assert!(index.get_run("0000002").is_none());
        Ok(())
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 20), "short");
        assert_eq!(truncate_str("element-v49,from-next,to-legacy", 20), "element-v49,from-...");
    }
}
