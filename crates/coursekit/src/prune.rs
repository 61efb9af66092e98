use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// The result of pruning one clone.
#[derive(Debug, PartialEq, Eq)]
pub enum PruneOutcome {
    /// These paths were removed (or would be, in a dry run), in the order visited
    Pruned(Vec<PathBuf>),

    /// The directory does not contain the path to keep, so nothing was touched
    MissingKeep,
}

/// Check that `keep` names a path strictly inside a clone.
pub fn validate_keep_path(keep: &Path) -> io::Result<()> {
    let mut has_name = false;
    for c in keep.components() {
        match c {
            Component::Normal(_) => has_name = true,
            Component::CurDir => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("path to keep must be relative and stay inside each directory: {}", keep.display()),
                ));
            }
        }
    }
    if !has_name {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path to keep must name something inside each directory: {}", keep.display()),
        ));
    }
    Ok(())
}

/// Remove everything under `root` except `root/keep` and the directories leading to it.
///
/// With `dry_run`, nothing is deleted, but the paths that would be removed are still returned.
/// Symbolic links are removed as links and never followed.
pub fn prune_clone(root: &Path, keep: &Path, dry_run: bool) -> io::Result<PruneOutcome> {
    validate_keep_path(keep)?;
    let keep_path = root.join(keep);
    if std::fs::symlink_metadata(&keep_path).is_err() {
        debug!("{} does not contain {}", root.display(), keep.display());
        return Ok(PruneOutcome::MissingKeep);
    }

    let keep_path: PathBuf = keep_path.components().filter(|c| *c != Component::CurDir).collect();
    let mut removed = Vec::new();
    prune_dir(root, &keep_path, dry_run, &mut removed)?;
    Ok(PruneOutcome::Pruned(removed))
}

fn prune_dir(dir: &Path, keep: &Path, dry_run: bool, removed: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();

    for entry in entries {
        if entry == keep {
            continue;
        }
        if keep.starts_with(&entry) {
            let is_real_dir = std::fs::symlink_metadata(&entry)?.is_dir();
            if is_real_dir {
                prune_dir(&entry, keep, dry_run, removed)?;
                continue;
            }
        }
        remove_path(&entry, dry_run)?;
        removed.push(entry);
    }
    Ok(())
}

fn remove_path(path: &Path, dry_run: bool) -> io::Result<()> {
    if dry_run {
        trace!("Would remove {}", path.display());
        return Ok(());
    }
    trace!("Removing {}", path.display());
    let metadata = std::fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    }
}
