//! Oracle CLI invocation under a hard wall-clock timeout.
//!
//! One subprocess attempt per evaluation, no retries. Output is drained
//! concurrently with bounded buffers so a runaway oracle can neither
//! deadlock the pipe nor exhaust memory, and a child that outlives its
//! budget is killed and reaped before the failure is reported.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::config::ScorerConfig;
use crate::scorer::prompt::build_prompt;
use crate::scorer::result::{parse_verdict, EvaluationResult, ScorerFailure};

/// Cap on captured bytes per child stream.
const OUTPUT_LIMIT_BYTES: usize = 1024 * 1024;

/// Stderr characters kept in an `ExecutionFailed` message.
const STDERR_SNIPPET_CHARS: usize = 1000;

/// Pluggable scoring seam.
///
/// The production implementation shells out to the oracle CLI; tests
/// substitute deterministic stubs to drive the decision engine.
pub trait Scorer {
    /// Score a plan. `prior_feedback` carries the previous round's
    /// feedback from round 2 on.
    fn evaluate(
        &self,
        plan: &str,
        round: u32,
        prior_feedback: Option<&str>,
    ) -> Result<EvaluationResult, ScorerFailure>;
}

/// Scorer backed by the oracle CLI (`codex exec` by default).
pub struct CliScorer {
    config: ScorerConfig,
    schema_path: PathBuf,
    cwd: Option<PathBuf>,
}

impl CliScorer {
    /// Create a scorer that writes its output schema to `schema_path`.
    pub fn new(config: ScorerConfig, schema_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            schema_path: schema_path.into(),
            cwd: None,
        }
    }

    /// Run the oracle from `cwd` so its read-only sandbox sees the
    /// project being planned.
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.config.path);
        cmd.arg("exec")
            .arg(prompt)
            .arg("--output-schema")
            .arg(&self.schema_path)
            .args(["--sandbox", "read-only", "--skip-git-repo-check"]);
        if let Some(model) = &self.config.model {
            cmd.args(["-m", model]);
        }
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl Scorer for CliScorer {
    fn evaluate(
        &self,
        plan: &str,
        round: u32,
        prior_feedback: Option<&str>,
    ) -> Result<EvaluationResult, ScorerFailure> {
        let prompt = build_prompt(
            plan,
            self.config.rubric_text(),
            &self.config.context,
            round,
            prior_feedback,
        );
        write_output_schema(&self.schema_path)?;

        let output = run_scorer_command(
            self.command(&prompt),
            &self.config.path,
            self.config.timeout_seconds,
        )?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            tracing::debug!("scorer stderr: {}", truncate_chars(&stderr, 2000));
        }
        tracing::debug!(exit = ?output.status_code, round, "scorer finished");

        if output.status_code != Some(0) {
            return Err(ScorerFailure::ExecutionFailed {
                code: output.status_code.unwrap_or(-1),
                stderr: truncate_chars(&stderr, STDERR_SNIPPET_CHARS).to_string(),
            });
        }

        parse_verdict(&String::from_utf8_lossy(&output.stdout))
    }
}

/// JSON schema the oracle's output must satisfy.
///
/// Five criteria scored 0..=2, a total, and the three feedback lists.
/// The schema constrains the oracle; [`parse_verdict`] still validates,
/// since a CLI that ignores `--output-schema` must not crash the gate.
fn output_schema() -> serde_json::Value {
    let criterion = serde_json::json!({ "type": "integer", "minimum": 0, "maximum": 2 });
    let string_list = serde_json::json!({ "type": "array", "items": { "type": "string" } });
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "required": ["score", "breakdown", "strengths", "weaknesses", "suggestions"],
        "properties": {
            "score": { "type": "integer", "minimum": 0, "maximum": 10 },
            "breakdown": {
                "type": "object",
                "additionalProperties": false,
                "required": [
                    "completeness", "correctness", "sequencing", "risk_awareness", "clarity"
                ],
                "properties": {
                    "completeness": criterion.clone(),
                    "correctness": criterion.clone(),
                    "sequencing": criterion.clone(),
                    "risk_awareness": criterion.clone(),
                    "clarity": criterion,
                },
            },
            "strengths": string_list.clone(),
            "weaknesses": string_list.clone(),
            "suggestions": string_list,
        },
    })
}

/// Write the output schema next to the session store, atomically.
fn write_output_schema(path: &Path) -> Result<(), ScorerFailure> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&output_schema()).unwrap_or_default();
        fs::write(&tmp, body)?;
        fs::rename(&tmp, path)?;
        Ok(())
    };
    write().map_err(|err| {
        ScorerFailure::unavailable(format!("cannot write schema {}: {err}", path.display()))
    })
}

/// Captured scorer process output.
struct ScorerOutput {
    status_code: Option<i32>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Spawn the scorer and wait at most `timeout_seconds`, draining both
/// streams concurrently. On expiry the child is killed and reaped.
fn run_scorer_command(
    mut cmd: Command,
    scorer_path: &str,
    timeout_seconds: u64,
) -> Result<ScorerOutput, ScorerFailure> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            ScorerFailure::not_found(scorer_path)
        } else {
            ScorerFailure::unavailable(format!("failed to run '{scorer_path}': {err}"))
        }
    })?;

    // Both streams were piped above, so take() cannot fail.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_handle =
        thread::spawn(move || stdout.map(|s| read_stream_limited(s, OUTPUT_LIMIT_BYTES)));
    let stderr_handle =
        thread::spawn(move || stderr.map(|s| read_stream_limited(s, OUTPUT_LIMIT_BYTES)));

    let status = match child.wait_timeout(Duration::from_secs(timeout_seconds)) {
        Ok(Some(status)) => status,
        Ok(None) => {
            tracing::warn!(timeout_seconds, "scorer timed out, killing");
            if let Err(err) = child.kill() {
                tracing::warn!("failed to kill timed-out scorer: {}", err);
            }
            let _ = child.wait();
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(ScorerFailure::Timeout {
                seconds: timeout_seconds,
            });
        }
        Err(err) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ScorerFailure::unavailable(format!(
                "failed waiting for '{scorer_path}': {err}"
            )));
        }
    };

    let (stdout, stdout_truncated) = join_reader(stdout_handle);
    let (stderr, stderr_truncated) = join_reader(stderr_handle);
    if stdout_truncated > 0 || stderr_truncated > 0 {
        tracing::warn!(stdout_truncated, stderr_truncated, "scorer output truncated");
    }

    Ok(ScorerOutput {
        status_code: status.code(),
        stdout,
        stderr,
    })
}

type ReaderHandle = thread::JoinHandle<Option<(Vec<u8>, usize)>>;

fn join_reader(handle: ReaderHandle) -> (Vec<u8>, usize) {
    match handle.join() {
        Ok(Some(output)) => output,
        _ => (Vec::new(), 0),
    }
}

/// Drain a stream, keeping at most `limit` bytes and counting the rest.
fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> (Vec<u8>, usize) {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n - keep;
        } else {
            truncated += n;
        }
    }

    (buf, truncated)
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
