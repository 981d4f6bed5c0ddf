use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::Result;

/// Files under `root` whose name ends with `suffix`, as paths relative to
/// `root`, sorted. Hidden entries (leading `.`) are skipped, directories too.
pub fn scan_images<P: AsRef<Path>>(root: P, suffix: &str) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                continue;
            }

            let path = entry.path();
            let file_type = entry.file_type()?;

            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() && name.ends_with(suffix) {
                if let Ok(relative) = path.strip_prefix(root) {
                    found.push(relative.to_path_buf());
                }
            }
        }
    }

    found.sort();
    Ok(found)
}

/// `paths[former..latter]` with both bounds clamped to the list.
pub fn select_range(paths: Vec<PathBuf>, former: usize, latter: usize) -> Vec<PathBuf> {
    let end = latter.min(paths.len());
    let start = former.min(end);

    paths.into_iter().skip(start).take(end - start).collect()
}
