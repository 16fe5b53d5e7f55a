use std::fs;
use std::path::{Path, PathBuf};

use crate::normalize::RunTimestamp;

/// Archive name for `log_path` at `timestamp`: `history.csv` becomes
/// `history_archived_20261016_083015.csv` in the same directory.
///
/// Two archivals within the same second map to the same name; see
/// [`archive`] for how the second one is kept apart.
pub fn archive_path(log_path: &Path, timestamp: RunTimestamp) -> PathBuf {
    numbered_archive_path(log_path, timestamp, 1)
}

fn numbered_archive_path(log_path: &Path, timestamp: RunTimestamp, n: u32) -> PathBuf {
    let stem = log_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("history");
    let suffix = match n {
        1 => timestamp.archive_suffix(),
        n => format!("{}_{n}", timestamp.archive_suffix()),
    };
    let file_name = match log_path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => format!("{stem}_archived_{suffix}.{ext}"),
        None => format!("{stem}_archived_{suffix}"),
    };
    log_path.with_file_name(file_name)
}

/// Renames the live log aside and returns where it went.
///
/// An existing archive is never replaced: if the timestamped name is taken,
/// `_2`, `_3`, ... is appended to the suffix until a free name is found.
pub fn archive(log_path: &Path, timestamp: RunTimestamp) -> std::io::Result<PathBuf> {
    let mut n = 1;
    let target = loop {
        let candidate = numbered_archive_path(log_path, timestamp, n);
        if !candidate.exists() {
            break candidate;
        }
        n += 1;
    };
    fs::rename(log_path, &target)?;
    Ok(target)
}

/// Lists archived segments next to `log_path`, oldest name first.
pub fn list_archives(log_path: &Path) -> std::io::Result<Vec<PathBuf>> {
    let Some(dir) = log_path.parent().filter(|dir| dir.is_dir()) else {
        return Ok(Vec::new());
    };
    let stem = log_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("history");
    let prefix = format!("{stem}_archived_");

    let mut archives = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_archive = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with(&prefix));
        if is_archive && path.is_file() {
            archives.push(path);
        }
    }
    archives.sort();
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use time::macros::datetime;

    #[test]
    fn archive_name_embeds_timestamp_and_keeps_extension() {
        let stamp = RunTimestamp::from_offset_datetime(datetime!(2026-10-16 08:30:15 UTC));
        let path = archive_path(Path::new("/data/history.csv"), stamp);
        assert_eq!(path, Path::new("/data/history_archived_20261016_083015.csv"));
    }

    #[test]
    fn archive_moves_file_and_is_listed() {
        let temp = tempdir().expect("tempdir");
        let log = temp.path().join("history.csv");
        fs::write(&log, "datetime,code,price,stock\n").expect("write");
        let stamp = RunTimestamp::from_offset_datetime(datetime!(2026-01-02 03:04:05 UTC));

        let archived = archive(&log, stamp).expect("archive");

        assert!(!log.exists());
        assert_eq!(
            fs::read_to_string(&archived).expect("read"),
            "datetime,code,price,stock\n"
        );
        assert_eq!(list_archives(&log).expect("list"), vec![archived]);
    }

    #[test]
    fn same_second_archive_does_not_replace_the_earlier_one() {
        let temp = tempdir().expect("tempdir");
        let log = temp.path().join("history.csv");
        let stamp = RunTimestamp::from_offset_datetime(datetime!(2026-01-02 03:04:05 UTC));

        fs::write(&log, "first\n").expect("write first");
        let first = archive(&log, stamp).expect("archive first");
        fs::write(&log, "second\n").expect("write second");
        let second = archive(&log, stamp).expect("archive second");

        assert_ne!(first, second);
        assert_eq!(
            second,
            temp.path().join("history_archived_20260102_030405_2.csv")
        );
        assert_eq!(fs::read_to_string(&first).expect("read first"), "first\n");
        assert_eq!(fs::read_to_string(&second).expect("read second"), "second\n");
        assert_eq!(list_archives(&log).expect("list").len(), 2);
    }
}
