//! Invocation of the AlphaFold 3 container and collection of its output.
//!
//! The run blocks until the child process exits; there is no timeout and no
//! cancellation. Success is not derived from the exit status alone: the
//! outcome carries the status, the captured output, and a separate probe for
//! the job's output directory, so a failed process and slow artifact
//! materialization stay distinguishable.

use anyhow::Context;
use std::io::{BufRead, BufReader, Seek, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use crate::utils::slugify;

/// Parameters of one container invocation.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Host directory holding `fold_input.json`
    pub input_dir: PathBuf,
    /// Host directory receiving prediction output
    pub output_dir: PathBuf,
    /// Host directory with the model parameters
    pub model_dir: PathBuf,
    /// Host directory with the genetic databases
    pub db_dir: PathBuf,
    /// Run the (CPU-bound) data pipeline phase
    pub run_data_pipeline: bool,
    /// Run the (GPU-bound) inference phase
    pub run_inference: bool,
    /// Compilation bucket sizes; empty means the tool's defaults
    pub buckets: Vec<u32>,
}

impl RunConfig {
    /// Render the templated docker command line for this configuration.
    pub fn command_line(&self) -> String {
        let mut parts: Vec<String> = vec![
            "docker run --rm".to_string(),
            format!("--volume {}:/root/af_input", self.input_dir.display()),
            format!("--volume {}:/root/af_output", self.output_dir.display()),
            format!("--volume {}:/root/models", self.model_dir.display()),
            format!("--volume {}:/root/public_databases", self.db_dir.display()),
            "--gpus all".to_string(),
            "alphafold3".to_string(),
            "python run_alphafold.py".to_string(),
            "--json_path=/root/af_input/fold_input.json".to_string(),
            "--model_dir=/root/models".to_string(),
            "--output_dir=/root/af_output".to_string(),
        ];
        if self.run_data_pipeline {
            parts.push("--run_data_pipeline".to_string());
        }
        if self.run_inference {
            parts.push("--run_inference".to_string());
        }
        if !self.buckets.is_empty() {
            let buckets: Vec<String> = self.buckets.iter().map(|b| b.to_string()).collect();
            parts.push(format!("--buckets {}", buckets.join(",")));
        }
        parts.join(" ")
    }
}

/// Result of one prediction run.
#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    /// Exit status code of the child process, if it exited normally
    pub status: Option<i32>,
    /// Concatenated stdout and stderr of the child
    pub output: String,
    /// Directory expected to hold the job's artifacts
    pub artifacts_dir: PathBuf,
    /// Whether that directory existed after the run
    pub artifacts_present: bool,
}

/// Directory AlphaFold 3 writes the job's artifacts to:
/// `<output_dir>/<slug(job name)>`.
pub fn job_output_dir(output_dir: &Path, job_name: &str) -> PathBuf {
    output_dir.join(slugify(job_name))
}

/// Run a shell command to completion, capturing stdout and stderr as one
/// text stream. Each line is forwarded to `on_line` as it arrives; the full
/// concatenation is returned together with the exit status code.
pub fn run_prediction(
    command: &str,
    mut on_line: Option<&mut dyn FnMut(&str)>,
) -> anyhow::Result<(Option<i32>, String)> {
    // The trailing redirect folds stderr into the captured stream, matching
    // the single combined log the tool's users expect.
    let mut child = Command::new("sh")
        .arg("-c")
        .arg(format!("{command} 2>&1"))
        .stdout(Stdio::piped())
        .spawn()
        .context("failed to spawn the prediction command")?;

    let stdout = child
        .stdout
        .take()
        .context("child process has no captured stdout")?;

    let mut output = String::new();
    for line in BufReader::new(stdout).lines() {
        let line = line.context("failed to read prediction output")?;
        debug!("{line}");
        if let Some(cb) = on_line.as_deref_mut() {
            cb(&line);
        }
        output.push_str(&line);
        output.push('\n');
    }

    // Blocks until the container exits; there is deliberately no timeout.
    let status = child
        .wait()
        .context("failed to wait for the prediction command")?;
    Ok((status.code(), output))
}

/// Build the command for `config`, run it, and probe for the job's output
/// directory afterwards.
pub fn run_job(
    config: &RunConfig,
    job_name: &str,
    on_line: Option<&mut dyn FnMut(&str)>,
) -> anyhow::Result<PredictionOutcome> {
    let command = config.command_line();
    info!("Running: {command}");

    let (status, output) = run_prediction(&command, on_line)?;
    let artifacts_dir = job_output_dir(&config.output_dir, job_name);
    let artifacts_present = artifacts_dir.exists();
    debug!(
        "Prediction finished with status {status:?}; artifacts {} at {}",
        if artifacts_present { "found" } else { "missing" },
        artifacts_dir.display()
    );

    Ok(PredictionOutcome {
        status,
        output,
        artifacts_dir,
        artifacts_present,
    })
}

/// Compress the whole output directory tree into an in-memory ZIP archive,
/// with entry names relative to `folder`.
pub fn compress_output_folder(folder: &Path) -> anyhow::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        add_dir_entries(&mut writer, folder, folder, options)?;
        writer
            .finish()
            .context("failed to finalize the ZIP archive")?;
    }
    Ok(buffer)
}

fn add_dir_entries<W: Write + Seek>(
    writer: &mut zip::ZipWriter<W>,
    root: &Path,
    dir: &Path,
    options: zip::write::SimpleFileOptions,
) -> anyhow::Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read output directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            add_dir_entries(writer, root, &path, options)?;
        } else {
            let name = path
                .strip_prefix(root)
                .expect("entry is under the walked root")
                .to_string_lossy()
                .into_owned();
            writer
                .start_file(name, options)
                .context("failed to start a ZIP entry")?;
            let mut file = std::fs::File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            std::io::copy(&mut file, writer)
                .with_context(|| format!("failed to compress {}", path.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn config() -> RunConfig {
        RunConfig {
            input_dir: PathBuf::from("/home/user/af_input"),
            output_dir: PathBuf::from("/home/user/af_output"),
            model_dir: PathBuf::from("/data/models"),
            db_dir: PathBuf::from("/data/databases"),
            run_data_pipeline: true,
            run_inference: true,
            buckets: vec![],
        }
    }

    #[test]
    fn command_line_contains_all_mounts_and_flags() {
        let cmd = config().command_line();
        assert!(cmd.starts_with("docker run --rm"));
        assert!(cmd.contains("--volume /home/user/af_input:/root/af_input"));
        assert!(cmd.contains("--volume /home/user/af_output:/root/af_output"));
        assert!(cmd.contains("--volume /data/models:/root/models"));
        assert!(cmd.contains("--volume /data/databases:/root/public_databases"));
        assert!(cmd.contains("--json_path=/root/af_input/fold_input.json"));
        assert!(cmd.contains("--run_data_pipeline"));
        assert!(cmd.contains("--run_inference"));
        assert!(!cmd.contains("--buckets"));
    }

    #[test]
    fn phases_can_be_disabled() {
        let mut config = config();
        config.run_data_pipeline = false;
        config.run_inference = false;
        let cmd = config.command_line();
        assert!(!cmd.contains("--run_data_pipeline"));
        assert!(!cmd.contains("--run_inference"));
    }

    #[test]
    fn buckets_are_comma_joined() {
        let mut config = config();
        config.buckets = vec![256, 512, 1024];
        assert!(config.command_line().ends_with("--buckets 256,512,1024"));
    }

    #[test]
    fn job_output_dir_uses_slug() {
        assert_eq!(
            job_output_dir(Path::new("/out"), "My AlphaFold Job"),
            PathBuf::from("/out/my_alphafold_job")
        );
    }

    #[test]
    fn run_prediction_merges_stdout_and_stderr() {
        let (status, output) =
            run_prediction("echo out; echo err 1>&2", None).unwrap();
        assert_eq!(status, Some(0));
        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[test]
    fn run_prediction_streams_lines() {
        let mut seen: Vec<String> = Vec::new();
        let mut push = |line: &str| seen.push(line.to_string());
        let (_, output) = run_prediction("printf 'a\\nb\\n'", Some(&mut push)).unwrap();
        assert_eq!(seen, vec!["a", "b"]);
        assert_eq!(output, "a\nb\n");
    }

    #[test]
    fn nonzero_exit_is_reported_not_raised() {
        let (status, _) = run_prediction("exit 3", None).unwrap();
        assert_eq!(status, Some(3));
    }

    #[test]
    fn archive_contains_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("seed-1");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("ranking_scores.csv"), "a,b\n").unwrap();
        std::fs::write(nested.join("model.cif"), "data_model\n").unwrap();

        let bytes = compress_output_folder(dir.path()).unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"ranking_scores.csv".to_string()));
        assert!(names.contains(&"seed-1/model.cif".to_string()));

        let mut content = String::new();
        archive
            .by_name("seed-1/model.cif")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "data_model\n");
    }
}
