//! SafeKeep - Command-line interface for the backup engine.
//!
//! A thin driver: it wires the engine context and the durable sinks,
//! starts each requested job on its own worker thread, and prints
//! progress to stderr. Job definitions come from flags (single job) or
//! from a JSON jobs file (several jobs, run concurrently).

use clap::Parser;
use engine::{
    create_job, run_job, BackupMode, EngineConfig, EngineContext, JobProgress, ProgressSink,
    StateSink, TransferJournal,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing_subscriber::EnvFilter;

/// SafeKeep - run file-backup jobs
#[derive(Parser, Debug)]
#[command(name = "safekeep")]
#[command(version = "0.1.0")]
#[command(about = "Run full and differential backup jobs with progress tracking")]
struct Args {
    /// Job name (single-job mode)
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// Source directory (single-job mode)
    #[arg(long, value_name = "PATH")]
    src: Option<PathBuf>,

    /// Destination root (single-job mode)
    #[arg(long, value_name = "PATH")]
    dst: Option<PathBuf>,

    /// Backup mode: full or differential
    #[arg(long, value_name = "MODE", default_value = "full")]
    mode: String,

    /// JSON file with an array of jobs to run concurrently
    /// (fields: name, source, destination, mode)
    #[arg(long, value_name = "FILE", conflicts_with_all = ["name", "src", "dst"])]
    jobs: Option<PathBuf>,

    /// Engine configuration file (JSON)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Durable per-job state file
    #[arg(long, value_name = "FILE", default_value = "safekeep-state.json")]
    state_file: PathBuf,

    /// Append-only transfer journal
    #[arg(long, value_name = "FILE", default_value = "safekeep-journal.log")]
    log_file: PathBuf,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,
}

/// One entry of the jobs file.
#[derive(Debug, Deserialize)]
struct JobSpec {
    name: String,
    source: PathBuf,
    destination: PathBuf,
    #[serde(default)]
    mode: Option<String>,
}

/// Console implementation of ProgressSink for displaying job progress.
struct ConsoleProgress;

impl ConsoleProgress {
    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, progress: &JobProgress) {
        if progress.is_finished() {
            eprintln!(
                "[{}] finished: {} files, {}",
                progress.job_name,
                progress.completed_files,
                Self::format_bytes(progress.bytes_transferred)
            );
            return;
        }

        if let Some(record) = &progress.current {
            let name = record
                .source_path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("(unknown)");
            let status = match &record.error {
                Some(e) => format!("FAILED ({e})"),
                None => Self::format_bytes(record.size),
            };
            eprintln!(
                "[{}] {}/{} ({}%) {} - {}",
                progress.job_name,
                progress.completed_files,
                progress.total_files,
                progress.percent_complete(),
                name,
                status
            );
        }
    }
}

fn main() {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Collect the jobs to run from the flags or the jobs file.
fn collect_jobs(args: &Args) -> Result<Vec<JobSpec>, String> {
    if let Some(jobs_path) = &args.jobs {
        let text = std::fs::read_to_string(jobs_path)
            .map_err(|e| format!("cannot read jobs file {}: {}", jobs_path.display(), e))?;
        let specs: Vec<JobSpec> = serde_json::from_str(&text)
            .map_err(|e| format!("invalid jobs file {}: {}", jobs_path.display(), e))?;
        if specs.is_empty() {
            return Err("jobs file contains no jobs".to_string());
        }
        return Ok(specs);
    }

    match (&args.name, &args.src, &args.dst) {
        (Some(name), Some(src), Some(dst)) => Ok(vec![JobSpec {
            name: name.clone(),
            source: src.clone(),
            destination: dst.clone(),
            mode: Some(args.mode.clone()),
        }]),
        _ => Err("provide --name, --src and --dst, or a --jobs file".to_string()),
    }
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("cannot read config {}: {}", path.display(), e))?;
            serde_json::from_str::<EngineConfig>(&text)
                .map_err(|e| format!("invalid config {}: {}", path.display(), e))?
        }
        None => EngineConfig::default(),
    };

    let specs = collect_jobs(args)?;

    let ctx = Arc::new(EngineContext::new(config));

    let state = StateSink::open(&args.state_file)
        .map_err(|e| format!("cannot open state file: {}", e))?;
    ctx.bus.subscribe(Arc::new(state));

    let journal = TransferJournal::open(&args.log_file)
        .map_err(|e| format!("cannot open journal: {}", e))?;
    ctx.bus.subscribe(Arc::new(journal));

    ctx.bus.subscribe(Arc::new(ConsoleProgress));

    // Build every descriptor up front so a bad job aborts before any
    // worker starts.
    let mut jobs = Vec::new();
    for spec in &specs {
        let mode_str = spec.mode.as_deref().unwrap_or("full");
        let mode = BackupMode::parse(mode_str)
            .ok_or_else(|| format!("invalid mode '{}'. Must be 'full' or 'differential'", mode_str))?;
        let job = create_job(&spec.name, &spec.source, &spec.destination, mode)
            .map_err(|e| format!("job '{}': {}", spec.name, e))?;
        jobs.push(job);
    }

    // One worker thread per job; the engine throttles large transfers
    // across them through the shared governor.
    let mut workers = Vec::new();
    for job in jobs {
        let ctx = ctx.clone();
        let name = job.name.clone();
        workers.push((name, thread::spawn(move || run_job(&job, &ctx))));
    }

    let mut any_failed_files = false;
    let mut errors = Vec::new();
    for (name, worker) in workers {
        match worker.join() {
            Ok(Ok(summary)) => {
                if summary.files_failed > 0 {
                    any_failed_files = true;
                }
            }
            Ok(Err(e)) => errors.push(format!("job '{}' failed: {}", name, e)),
            Err(_) => errors.push(format!("job '{}' panicked", name)),
        }
    }

    if !errors.is_empty() {
        return Err(errors.join("; "));
    }
    if any_failed_files {
        return Err("one or more files failed to transfer".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base_args(tmp: &TempDir) -> Args {
        Args {
            name: None,
            src: None,
            dst: None,
            mode: "full".to_string(),
            jobs: None,
            config: None,
            state_file: tmp.path().join("state.json"),
            log_file: tmp.path().join("journal.log"),
            verbose: false,
        }
    }

    #[test]
    fn test_cli_runs_single_job() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        std::fs::create_dir(&src).expect("mkdir");
        std::fs::write(src.join("test.txt"), "hello").expect("write");

        let mut args = base_args(&tmp);
        args.name = Some("docs".to_string());
        args.src = Some(src);
        args.dst = Some(tmp.path().join("dst"));

        run_cli(&args).expect("CLI should succeed");
        assert!(tmp.path().join("dst/Complete").exists());
        assert!(args.state_file.exists());
        assert!(args.log_file.exists());
    }

    #[test]
    fn test_cli_runs_jobs_file_concurrently() {
        let tmp = TempDir::new().expect("tempdir");
        for name in ["one", "two"] {
            let src = tmp.path().join(format!("src-{name}"));
            std::fs::create_dir(&src).expect("mkdir");
            std::fs::write(src.join("f.txt"), name).expect("write");
        }

        let jobs_path = tmp.path().join("jobs.json");
        std::fs::write(
            &jobs_path,
            format!(
                r#"[
                    {{"name": "one", "source": "{0}/src-one", "destination": "{0}/dst-one"}},
                    {{"name": "two", "source": "{0}/src-two", "destination": "{0}/dst-two", "mode": "full"}}
                ]"#,
                tmp.path().display()
            ),
        )
        .expect("write jobs");

        let mut args = base_args(&tmp);
        args.jobs = Some(jobs_path);

        run_cli(&args).expect("CLI should succeed");
        assert!(tmp.path().join("dst-one/Complete").exists());
        assert!(tmp.path().join("dst-two/Complete").exists());
    }

    #[test]
    fn test_cli_rejects_missing_source() {
        let tmp = TempDir::new().expect("tempdir");
        let mut args = base_args(&tmp);
        args.name = Some("docs".to_string());
        args.src = Some(PathBuf::from("/nonexistent/path"));
        args.dst = Some(tmp.path().join("dst"));

        assert!(run_cli(&args).is_err());
    }

    #[test]
    fn test_cli_rejects_invalid_mode() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        std::fs::create_dir(&src).expect("mkdir");

        let mut args = base_args(&tmp);
        args.name = Some("docs".to_string());
        args.src = Some(src);
        args.dst = Some(tmp.path().join("dst"));
        args.mode = "incremental".to_string();

        assert!(run_cli(&args).is_err());
    }

    #[test]
    fn test_cli_rejects_missing_job_definition() {
        let tmp = TempDir::new().expect("tempdir");
        let args = base_args(&tmp);
        assert!(run_cli(&args).is_err());
    }

    #[test]
    fn test_cli_loads_engine_config() {
        let tmp = TempDir::new().expect("tempdir");
        let src = tmp.path().join("src");
        std::fs::create_dir(&src).expect("mkdir");
        std::fs::write(src.join("a.txt"), "x").expect("write");

        let config_path = tmp.path().join("config.json");
        std::fs::write(&config_path, r#"{"large_file_threshold": 10}"#).expect("write");

        let mut args = base_args(&tmp);
        args.name = Some("docs".to_string());
        args.src = Some(src);
        args.dst = Some(tmp.path().join("dst"));
        args.config = Some(config_path);

        run_cli(&args).expect("CLI should succeed with config file");
    }
}
