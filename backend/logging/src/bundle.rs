//! Zip export of the log directory, e.g. for attaching to a bug report.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{LogError, Result};
use crate::settings::LOCK_SUFFIX;

/// Write every regular file of `logs_dir` except lock markers into a new
/// zip at `output`, one flat member per file named after it.
///
/// `output` is overwritten if it exists and must not be inside `logs_dir`.
/// Source files are only read. Returns how many members were written.
pub fn bundle_logs(logs_dir: &Path, output: &Path) -> Result<usize> {
    let members = list_members(logs_dir)?;
    ensure_outside(logs_dir, output)?;

    let out = File::create(output).map_err(|e| LogError::io("create", output, e))?;
    let mut zip = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, path) in &members {
        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(path).map_err(|e| LogError::io("open", path, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| LogError::io("archive", path, e))?;
    }
    zip.finish()?;

    info!(
        dir = %logs_dir.display(),
        output = %output.display(),
        files = members.len(),
        "Bundled log files"
    );
    Ok(members.len())
}

/// An archive written into the log directory would join the file set and be
/// read back into itself by the next bundle.
fn ensure_outside(logs_dir: &Path, output: &Path) -> Result<()> {
    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let dir = fs::canonicalize(logs_dir).map_err(|e| LogError::io("resolve", logs_dir, e))?;
    // A parent that cannot be resolved is reported by the create below.
    let Ok(parent) = fs::canonicalize(parent) else {
        return Ok(());
    };
    if parent == dir {
        return Err(LogError::Config(format!(
            "bundle output {} must not be inside the log directory {}",
            output.display(),
            logs_dir.display()
        )));
    }
    Ok(())
}

/// Regular files to archive, sorted by name.
fn list_members(logs_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = fs::read_dir(logs_dir).map_err(|e| LogError::io("list", logs_dir, e))?;

    let mut members = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LogError::io("list", logs_dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| LogError::io("stat", &entry.path(), e))?
            .is_file();
        let name = entry.file_name().to_string_lossy().into_owned();
        if !is_file || name.ends_with(LOCK_SUFFIX) {
            continue;
        }
        members.push((name, entry.path()));
    }
    members.sort();
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::Logger;
    use crate::settings::LoggerSettings;
    use std::io::Read;

    fn read_member(archive: &mut zip::ZipArchive<File>, name: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        archive.by_name(name).unwrap().read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn bundles_rotated_files_and_skips_lock() {
        let logs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        fs::write(logs.path().join("a.0"), b"newest\n").unwrap();
        fs::write(logs.path().join("a.1"), b"older\n").unwrap();
        fs::write(logs.path().join("a.lck"), b"1234").unwrap();
        let zip_path = out.path().join("logs.zip");

        let written = bundle_logs(logs.path(), &zip_path).unwrap();

        assert_eq!(written, 2);
        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["a.0", "a.1"]);
        assert_eq!(read_member(&mut archive, "a.0"), b"newest\n");
        assert_eq!(read_member(&mut archive, "a.1"), b"older\n");
        // Sources are untouched.
        assert!(logs.path().join("a.lck").exists());
        assert_eq!(fs::read(logs.path().join("a.0")).unwrap(), b"newest\n");
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let out = tempfile::tempdir().unwrap();
        let result = bundle_logs(&out.path().join("absent"), &out.path().join("x.zip"));
        assert!(matches!(result, Err(LogError::Io { .. })));
    }

    #[test]
    fn unwritable_output_is_an_io_error() {
        let logs = tempfile::tempdir().unwrap();
        fs::write(logs.path().join("a.0"), b"x").unwrap();
        let result = bundle_logs(logs.path(), &logs.path().join("no/such/dir/x.zip"));
        assert!(matches!(result, Err(LogError::Io { .. })));
    }

    #[test]
    fn logger_bundle_matches_files_on_disk() {
        let logs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let settings = LoggerSettings::new(logs.path())
            .with_file_name("app.log")
            .with_max_file_size(120)
            .with_max_file_count(3);
        let logger = Logger::new(Some(settings)).unwrap();
        logger.set_console_enabled(false);
        for i in 0..10 {
            logger.i(format!("message number {i}"));
        }

        let zip_path = out.path().join("bundle.zip");
        let written = logger.bundle(&zip_path).unwrap();

        assert_eq!(written, 3);
        let mut archive = zip::ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        for name in ["app.log.0", "app.log.1", "app.log.2"] {
            let on_disk = fs::read(logs.path().join(name)).unwrap();
            assert_eq!(read_member(&mut archive, name), on_disk);
        }
        assert!(archive.by_name("app.log.lck").is_err());
    }

    #[test]
    fn output_inside_the_log_directory_is_rejected() {
        let logs = tempfile::tempdir().unwrap();
        fs::write(logs.path().join("a.0"), b"newest\n").unwrap();

        let result = bundle_logs(logs.path(), &logs.path().join("logs.zip"));
        assert!(matches!(result, Err(LogError::Config(_))));

        // Same directory reached through another spelling.
        let dotted = logs.path().join(".").join("logs.zip");
        assert!(matches!(bundle_logs(logs.path(), &dotted), Err(LogError::Config(_))));

        let names: Vec<_> = fs::read_dir(logs.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["a.0"]);
    }

    #[test]
    fn logger_refuses_to_bundle_into_its_own_directory() {
        let logs = tempfile::tempdir().unwrap();
        let logger = Logger::new(Some(LoggerSettings::new(logs.path()))).unwrap();
        logger.set_console_enabled(false);
        logger.i("before bundle");

        let result = logger.bundle(&logs.path().join("logs.zip"));

        assert!(matches!(result, Err(LogError::Config(_))));
        assert!(!logs.path().join("logs.zip").exists());
        logger.i("after bundle");
    }
}
