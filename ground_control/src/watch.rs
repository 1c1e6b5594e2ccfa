//! Read side of the on-board text log written by `satellite_ocs`.

use satellite_ocs::config::LOG_FILE_PREFIX;
use std::collections::VecDeque;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Newest rolling log file in `dir`. Daily files carry a `.YYYY-MM-DD`
/// suffix, so the lexically largest name is the most recent.
pub fn latest_log(dir: &Path) -> io::Result<Option<PathBuf>> {
    let mut newest: Option<PathBuf> = None;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX));
        if matches && newest.as_ref().is_none_or(|cur| path.file_name() > cur.file_name()) {
            newest = Some(path);
        }
    }
    Ok(newest)
}

/// Last `n` lines of `path`.
pub fn tail(path: &Path, n: usize) -> io::Result<Vec<String>> {
    let mut last = VecDeque::with_capacity(n.min(4096));
    for line in BufReader::new(File::open(path)?).lines() {
        last.push_back(line?);
        if last.len() > n {
            last.pop_front();
        }
    }
    Ok(last.into())
}
