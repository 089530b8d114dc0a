//! CLI command implementations
//!
//! Commands only read. Documents are handled as plain JSON values, so any
//! backup written with the JSON codec can be inspected whatever its schema.

use std::io::Write;

use serde_json::Value;

use crate::backup::{list_backup_files, BackupFileNaming, BackupReader, JsonCodec, ProblemLog};
use crate::observability::{Diagnostics, Event, Logger, Severity};
use crate::service::RepovaultConfig;

use super::args::{BackupArgs, Command};
use super::errors::{CliError, CliResult};

/// Dispatch one parsed command, writing its output to `out`.
pub fn run_command(command: Command, out: &mut dyn Write) -> CliResult<()> {
    match command {
        Command::Files(args) => files(&args, out),
        Command::Dump(args) => dump(&args, out),
        Command::Verify(args) => verify(&args, out),
    }
}

/// Resolve file naming from flags and the optional config file
fn resolve(args: &BackupArgs) -> CliResult<(BackupFileNaming, Diagnostics)> {
    let min_severity = if args.verbose {
        Severity::Trace
    } else {
        Severity::Warn
    };
    let diagnostics = Diagnostics::new(Logger::console().with_min_severity(min_severity));

    let config = match &args.config {
        Some(path) => {
            let config = RepovaultConfig::load(path)
                .map_err(|e| CliError::config_error(e.message().to_string()))?;
            diagnostics.event(
                Event::ConfigLoaded,
                &[("path", path.display().to_string().as_str())],
            );
            config
        }
        None => RepovaultConfig::default(),
    };

    let width = args.width.unwrap_or(config.restore.filename_width);
    let naming = BackupFileNaming::new(args.prefix.clone(), width)?;
    Ok((naming, diagnostics))
}

fn reader(args: &BackupArgs) -> CliResult<(BackupReader<JsonCodec<Value>>, ProblemLog)> {
    let (naming, diagnostics) = resolve(args)?;
    let problems = ProblemLog::with_diagnostics(diagnostics.clone());
    let reader = BackupReader::new(&args.dir, naming, JsonCodec::new(), problems.clone())
        .with_diagnostics(diagnostics);
    Ok((reader, problems))
}

/// List files in read order
pub fn files(args: &BackupArgs, out: &mut dyn Write) -> CliResult<()> {
    let (naming, _) = resolve(args)?;
    let entries = list_backup_files(&args.dir, &naming);

    for entry in &entries {
        let mode = if entry.compressed { "gzip" } else { "plain" };
        writeln!(out, "{}\t{}\t{}", entry.ordinal, mode, entry.path.display())?;
    }
    writeln!(out, "{} file(s)", entries.len())?;
    Ok(())
}

/// Print every document as one JSON line
pub fn dump(args: &BackupArgs, out: &mut dyn Write) -> CliResult<()> {
    let (reader, problems) = reader(args)?;

    for document in reader.into_documents() {
        serde_json::to_writer(&mut *out, &document)?;
        writeln!(out)?;
    }

    if problems.has_errors() {
        return Err(CliError::verify_failed(problems.len()));
    }
    Ok(())
}

/// Read the whole backup and report what went wrong
pub fn verify(args: &BackupArgs, out: &mut dyn Write) -> CliResult<()> {
    let (mut reader, problems) = reader(args)?;

    while reader.read().is_some() {}

    writeln!(out, "files: {}", reader.files_opened())?;
    writeln!(out, "documents: {}", reader.documents_read())?;
    for problem in problems.problems() {
        writeln!(out, "{}", problem)?;
    }

    if !problems.is_empty() {
        return Err(CliError::verify_failed(problems.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupWriter;
    use crate::cli::errors::CliErrorCode;
    use serde_json::json;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn args(dir: &Path) -> BackupArgs {
        BackupArgs {
            dir: dir.to_path_buf(),
            prefix: "run".to_string(),
            width: Some(2),
            config: None,
            verbose: false,
        }
    }

    fn write_backup(dir: &Path, count: u64) {
        let mut writer = BackupWriter::new(
            dir,
            BackupFileNaming::new("run", 2).unwrap(),
            2,
            false,
            JsonCodec::<Value>::new(),
            ProblemLog::new(),
        )
        .unwrap();
        for i in 0..count {
            writer.write(&json!({"n": i}));
        }
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_files_lists_in_order() {
        let temp = TempDir::new().unwrap();
        write_backup(temp.path(), 3);

        let mut buf = Vec::new();
        files(&args(temp.path()), &mut buf).unwrap();
        let text = output(buf);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("1\tplain\t"));
        assert!(lines[0].ends_with("run_01.bin"));
        assert_eq!(lines[2], "2 file(s)");
    }

    #[test]
    fn test_dump_prints_json_lines() {
        let temp = TempDir::new().unwrap();
        write_backup(temp.path(), 3);

        let mut buf = Vec::new();
        dump(&args(temp.path()), &mut buf).unwrap();
        assert_eq!(output(buf), "{\"n\":0}\n{\"n\":1}\n{\"n\":2}\n");
    }

    #[test]
    fn test_verify_clean_backup() {
        let temp = TempDir::new().unwrap();
        write_backup(temp.path(), 5);

        let mut buf = Vec::new();
        verify(&args(temp.path()), &mut buf).unwrap();
        assert_eq!(output(buf), "files: 3\ndocuments: 5\n");
    }

    #[test]
    fn test_verify_reports_corruption() {
        let temp = TempDir::new().unwrap();
        write_backup(temp.path(), 5);
        fs::write(temp.path().join("run_02.bin"), b"{\"n\":").unwrap();

        let mut buf = Vec::new();
        let err = verify(&args(temp.path()), &mut buf).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::VerifyFailed);
        let damaged = temp.path().join("run_02.bin");
        let expected = format!(
            "files: 3\ndocuments: 3\n\
             [WARNING] REPOVAULT_BACKUP_CORRUPT: skipping rest of {}: \
             truncated record (5 bytes without delimiter)\n",
            damaged.display()
        );
        assert_eq!(output(buf), expected);
    }

    #[test]
    fn test_width_from_config() {
        let temp = TempDir::new().unwrap();
        write_backup(temp.path(), 1);
        let config = temp.path().join("repovault.json");
        fs::write(&config, r#"{"restore": {"filename_width": 2}}"#).unwrap();

        let mut a = args(temp.path());
        a.width = None;
        a.config = Some(config);

        let mut buf = Vec::new();
        verify(&a, &mut buf).unwrap();
        assert!(output(buf).contains("documents: 1"));
    }

    #[test]
    fn test_bad_config_is_config_error() {
        let temp = TempDir::new().unwrap();
        let mut a = args(temp.path());
        a.config = Some(temp.path().join("absent.json"));

        let err = verify(&a, &mut Vec::new()).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }
}
