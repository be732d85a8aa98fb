// LaTeX compilation in a throwaway directory with a hard wall-clock timeout.
//
// The source is untrusted: shell escape is disabled, file access is paranoid,
// stdin is closed and the compiler is never run through a shell.

pub mod handlers;
pub mod structure;

use std::path::Path;
use std::process::{Output, Stdio};
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::errors::DocumentError;

const JOB_NAME: &str = "document";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A successful compilation. The log is kept for diagnostics.
#[derive(Debug, Clone)]
pub struct CompiledArtifact {
    pub pdf: Vec<u8>,
    pub log: String,
    pub passes: u8,
}

/// Stateless compiler front-end; every call gets its own work directory.
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    timeout: Duration,
    passes: u8,
    work_root: Option<std::path::PathBuf>,
}

impl LatexCompiler {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            program: config.latex_program.clone(),
            timeout: config.latex_timeout,
            passes: config.latex_passes.max(1),
            work_root: config.work_dir.clone(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Compiles `source` to PDF.
    ///
    /// The timeout covers all passes together. The work directory is removed
    /// on every exit path, and a timed-out compiler process is killed.
    pub async fn compile(&self, source: &str) -> Result<CompiledArtifact, DocumentError> {
        let report = structure::validate(source);
        for warning in &report.warnings {
            warn!("LaTeX validation warning: {warning}");
        }
        if !report.is_valid() {
            return Err(DocumentError::CompileError {
                exit_code: None,
                log: report.findings(),
            });
        }

        let workspace = self.workspace()?;
        let dir = workspace.path();
        tokio::fs::write(dir.join(format!("{JOB_NAME}.tex")), source)
            .await
            .map_err(|source| DocumentError::Workspace { source })?;

        let deadline = Instant::now() + self.timeout;
        let started = std::time::Instant::now();

        for pass in 1..=self.passes {
            let output = self.run_pass(dir, deadline).await?;
            if !output.status.success() {
                let log = read_log(dir, &output).await;
                warn!(
                    "{} failed on pass {}/{} (exit code {:?})",
                    self.program,
                    pass,
                    self.passes,
                    output.status.code()
                );
                return Err(DocumentError::CompileError {
                    exit_code: output.status.code(),
                    log,
                });
            }
            debug!("{} pass {}/{} finished", self.program, pass, self.passes);
        }

        let log = tokio::fs::read(dir.join(format!("{JOB_NAME}.log")))
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        let pdf = match tokio::fs::read(dir.join(format!("{JOB_NAME}.pdf"))).await {
            Ok(bytes) if bytes.starts_with(b"%PDF") => bytes,
            Ok(_) => {
                return Err(DocumentError::OutputMissing {
                    reason: "output file is not a PDF".to_string(),
                    log,
                })
            }
            Err(e) => {
                return Err(DocumentError::OutputMissing {
                    reason: format!("{JOB_NAME}.pdf was not produced: {e}"),
                    log,
                })
            }
        };

        info!(
            "Compiled {} bytes of LaTeX to {} byte PDF in {} pass(es), {}ms",
            source.len(),
            pdf.len(),
            self.passes,
            started.elapsed().as_millis()
        );

        Ok(CompiledArtifact {
            pdf,
            log,
            passes: self.passes,
        })
    }

    /// Runs `<program> --version` and returns its first output line.
    pub async fn check_installation(&self) -> Result<String, DocumentError> {
        let child = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| self.launch_error(source))?;

        let output = tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| DocumentError::CompileTimeout {
                secs: PROBE_TIMEOUT.as_secs(),
            })?
            .map_err(|source| self.launch_error(source))?;

        if !output.status.success() {
            return Err(DocumentError::CompileError {
                exit_code: output.status.code(),
                log: String::from_utf8_lossy(&output.stdout).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn workspace(&self) -> Result<TempDir, DocumentError> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("beetune-latex-");
            b
        };
        match &self.work_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|source| DocumentError::Workspace { source })
    }

    async fn run_pass(&self, dir: &Path, deadline: Instant) -> Result<Output, DocumentError> {
        let child = Command::new(&self.program)
            .args([
                "-interaction=nonstopmode",
                "-halt-on-error",
                "-file-line-error",
                "-no-shell-escape",
            ])
            .arg(format!("{JOB_NAME}.tex"))
            .current_dir(dir)
            .env("openin_any", "p")
            .env("openout_any", "p")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| self.launch_error(source))?;

        match tokio::time::timeout_at(deadline, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| DocumentError::Workspace { source }),
            // Dropping the wait future drops the child, which kills it.
            Err(_) => {
                warn!(
                    "{} exceeded {}s timeout, killed",
                    self.program,
                    self.timeout.as_secs()
                );
                Err(DocumentError::CompileTimeout {
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }

    fn launch_error(&self, source: std::io::Error) -> DocumentError {
        DocumentError::CompilerLaunch {
            program: self.program.clone(),
            source,
        }
    }
}

/// The `.log` file if the compiler wrote one, else captured stdout and stderr.
async fn read_log(dir: &Path, output: &Output) -> String {
    if let Ok(bytes) = tokio::fs::read(dir.join(format!("{JOB_NAME}.log"))).await {
        if !bytes.is_empty() {
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }

    let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !log.is_empty() && !log.ends_with('\n') {
            log.push('\n');
        }
        log.push_str(&stderr);
    }
    if log.trim().is_empty() {
        log = "(compiler produced no output)".to_string();
    }
    log
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    const VALID: &str = "\\documentclass{article}\n\\begin{document}\nHello\n\\end{document}\n";

    /// Writes an executable shell script standing in for pdflatex.
    /// The job file name is the last argument.
    pub(crate) fn fake_compiler(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    pub(crate) const SUCCEEDS: &str = r#"for last; do :; done
job="${last%.tex}"
echo "This is fakeTeX, pass output" > "$job.log"
printf '%%PDF-1.5\n%%fake\n%%%%EOF\n' > "$job.pdf"
echo "Output written on $job.pdf""#;

    pub(crate) fn compiler(program: &Path, timeout: Duration, work_root: &Path) -> LatexCompiler {
        LatexCompiler::from_config(&PipelineConfig {
            max_upload_bytes: 1024,
            latex_program: program.display().to_string(),
            latex_timeout: timeout,
            latex_passes: 2,
            work_dir: Some(work_root.to_path_buf()),
        })
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_successful_compile_returns_pdf_and_log() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = fake_compiler(bin.path(), "fakelatex", SUCCEEDS);

        let artifact = compiler(&program, Duration::from_secs(10), work.path())
            .compile(VALID)
            .await
            .unwrap();

        assert!(artifact.pdf.starts_with(b"%PDF"));
        assert!(artifact.log.contains("fakeTeX"));
        assert_eq!(artifact.passes, 2);
        assert_eq!(entries(work.path()), 0, "work directory not cleaned up");
    }

    #[tokio::test]
    async fn test_runs_requested_passes_with_safe_flags() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let record = bin.path().join("calls");
        let script = format!(
            "echo \"$@ openin=$openin_any openout=$openout_any\" >> '{}'\n{SUCCEEDS}",
            record.display()
        );
        let program = fake_compiler(bin.path(), "fakelatex", &script);

        compiler(&program, Duration::from_secs(10), work.path())
            .compile(VALID)
            .await
            .unwrap();

        let calls = std::fs::read_to_string(&record).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "-interaction=nonstopmode -halt-on-error -file-line-error -no-shell-escape document.tex openin=p openout=p"
        );
    }

    #[tokio::test]
    async fn test_failing_compiler_returns_log_and_no_pdf() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = fake_compiler(
            bin.path(),
            "fakelatex",
            r#"for last; do :; done
printf '! Undefined control sequence.\nl.3 \\foo\n' > "${last%.tex}.log"
exit 1"#,
        );

        let err = compiler(&program, Duration::from_secs(10), work.path())
            .compile(VALID)
            .await
            .unwrap_err();

        match err {
            DocumentError::CompileError { exit_code, log } => {
                assert_eq!(exit_code, Some(1));
                assert!(log.contains("! Undefined control sequence."), "{log}");
            }
            other => panic!("expected CompileError, got {other:?}"),
        }
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_failure_without_log_file_uses_captured_output() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = fake_compiler(
            bin.path(),
            "fakelatex",
            "echo 'fatal: format file missing' >&2\nexit 3",
        );

        match compiler(&program, Duration::from_secs(10), work.path())
            .compile(VALID)
            .await
        {
            Err(DocumentError::CompileError { exit_code, log }) => {
                assert_eq!(exit_code, Some(3));
                assert!(log.contains("format file missing"), "{log}");
            }
            other => panic!("expected CompileError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_compiler_times_out_and_cleans_up() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = fake_compiler(bin.path(), "slowlatex", "exec sleep 30");

        let started = std::time::Instant::now();
        let err = compiler(&program, Duration::from_millis(300), work.path())
            .compile(VALID)
            .await
            .unwrap_err();

        assert!(matches!(err, DocumentError::CompileTimeout { .. }), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(entries(work.path()), 0, "temp directory left behind");
    }

    #[tokio::test]
    async fn test_success_without_pdf_is_output_missing() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = fake_compiler(bin.path(), "fakelatex", "echo 'No pages of output.'");

        match compiler(&program, Duration::from_secs(10), work.path())
            .compile(VALID)
            .await
        {
            Err(DocumentError::OutputMissing { reason, .. }) => {
                assert!(reason.contains("document.pdf"), "{reason}")
            }
            other => panic!("expected OutputMissing, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_pdf_output_is_output_missing() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let program = fake_compiler(
            bin.path(),
            "fakelatex",
            "for last; do :; done\necho 'not a pdf' > \"${last%.tex}.pdf\"",
        );

        let err = compiler(&program, Duration::from_secs(10), work.path())
            .compile(VALID)
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::OutputMissing { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_invalid_structure_never_spawns() {
        let work = tempfile::tempdir().unwrap();
        // A program that does not exist would fail with CompilerLaunch if spawned.
        let compiler = compiler(
            Path::new("/nonexistent/beetune-latex"),
            Duration::from_secs(1),
            work.path(),
        );

        match compiler.compile("\\section{Just a fragment}").await {
            Err(DocumentError::CompileError { exit_code, log }) => {
                assert_eq!(exit_code, None);
                assert!(log.contains("\\documentclass"), "{log}");
            }
            other => panic!("expected CompileError, got {other:?}"),
        }
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let work = tempfile::tempdir().unwrap();
        let compiler = compiler(
            Path::new("/nonexistent/beetune-latex"),
            Duration::from_secs(1),
            work.path(),
        );

        let err = compiler.compile(VALID).await.unwrap_err();
        assert!(matches!(err, DocumentError::CompilerLaunch { .. }), "{err:?}");
        assert!(compiler.check_installation().await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_compiles_are_isolated() {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        // Echo the source back as the "PDF" so each caller can recognise its own output.
        let program = fake_compiler(
            bin.path(),
            "echolatex",
            r#"for last; do :; done
job="${last%.tex}"
{ printf '%%PDF-fake\n'; cat "$last"; } > "$job.pdf""#,
        );
        let compiler = compiler(&program, Duration::from_secs(20), work.path());

        let jobs = (0..8).map(|i| {
            let compiler = compiler.clone();
            tokio::spawn(async move {
                let source = format!(
                    "\\documentclass{{article}}\n\\begin{{document}}\njob-{i}\n\\end{{document}}\n"
                );
                let artifact = compiler.compile(&source).await.unwrap();
                (i, String::from_utf8(artifact.pdf).unwrap())
            })
        });

        for job in jobs.collect::<Vec<_>>() {
            let (i, pdf) = job.await.unwrap();
            assert!(pdf.contains(&format!("job-{i}\n")), "job {i} got {pdf}");
            for other in (0..8).filter(|j| *j != i) {
                assert!(!pdf.contains(&format!("job-{other}\n")));
            }
        }
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_check_installation_reports_version_line() {
        let bin = tempfile::tempdir().unwrap();
        let program = fake_compiler(
            bin.path(),
            "fakelatex",
            "echo 'pdfTeX 3.141592653-2.6-1.40.25 (TeX Live 2023)'\necho 'kpathsea version 6.3.5'",
        );
        let version = compiler(&program, Duration::from_secs(5), bin.path())
            .check_installation()
            .await
            .unwrap();
        assert_eq!(version, "pdfTeX 3.141592653-2.6-1.40.25 (TeX Live 2023)");
    }
}
