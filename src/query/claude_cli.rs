use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use futures::{StreamExt, future, stream};
use secrecy::{ExposeSecret, Secret};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, warn};

use super::{QueryBackend, QueryEvent, QueryRequest, QueryStream};

/// Runs prompts through the agent CLI in non-interactive mode and reads its
/// newline-delimited JSON event output.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    program: PathBuf,
    api_key: Option<Secret<String>>,
}

impl ClaudeCli {
    pub fn new(program: impl Into<PathBuf>, api_key: Option<Secret<String>>) -> Self {
        Self {
            program: program.into(),
            api_key,
        }
    }

    fn command(&self, request: &QueryRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--print")
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--max-turns")
            .arg(request.options.max_turns.to_string())
            // Ends option parsing so a prompt starting with `-` stays a prompt.
            .arg("--")
            .arg(&request.prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(key) = &self.api_key {
            cmd.env("ANTHROPIC_API_KEY", key.expose_secret());
        }
        cmd
    }
}

fn parse_line(line: std::io::Result<String>) -> Option<Result<QueryEvent>> {
    match line {
        Ok(line) if line.trim().is_empty() => None,
        Ok(line) => Some(
            serde_json::from_str(&line)
                .with_context(|| format!("Malformed query event: {}", line)),
        ),
        Err(e) => Some(Err(anyhow!(e).context("Failed to read query output"))),
    }
}

/// Resolves once the process has exited; a failed exit carries the last
/// non-empty stderr line.
async fn wait_for_exit(
    mut child: Child,
    stderr_task: JoinHandle<String>,
    program: String,
) -> Result<()> {
    let status = child
        .wait()
        .await
        .context("Failed to wait for query process")?;
    let stderr = match stderr_task.await {
        Ok(stderr) => stderr,
        Err(e) => {
            warn!("Lost stderr of {}: {}", program, e);
            String::new()
        }
    };
    if status.success() {
        debug!("{} exited cleanly", program);
        return Ok(());
    }

    let detail = stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no diagnostic output");
    warn!("{} exited with {}: {}", program, status, detail);
    Err(anyhow!("{} exited with {}: {}", program, status, detail))
}

#[async_trait]
impl QueryBackend for ClaudeCli {
    async fn query(&self, request: QueryRequest) -> Result<QueryStream> {
        info!(
            "Spawning {} with max_turns={}",
            self.program.display(),
            request.options.max_turns
        );

        let mut child = self
            .command(&request)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.program.display()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Query process stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("Query process stderr not captured"))?;

        // Drained concurrently so a chatty stderr cannot block the child.
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            if let Err(e) = stderr.read_to_string(&mut buf).await {
                warn!("Failed to read query process stderr: {}", e);
            }
            buf
        });

        let events = LinesStream::new(BufReader::new(stdout).lines())
            .filter_map(|line| future::ready(parse_line(line)));

        let program = self.program.display().to_string();
        let exit = stream::once(wait_for_exit(child, stderr_task, program))
            .filter_map(|outcome| future::ready(outcome.err().map(Err)));

        Ok(events.chain(exit).boxed())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::query::{NO_RESPONSE, QueryGateway};
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn fake_cli(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-claude");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_streams_events_from_process() {
        let dir = TempDir::new().unwrap();
        let program = fake_cli(
            &dir,
            r#"echo '{"type":"system","subtype":"init"}'
echo ''
echo "{\"type\":\"result\",\"subtype\":\"success\",\"result\":\"turns=$6 key=$ANTHROPIC_API_KEY\"}""#,
        );
        let cli = ClaudeCli::new(program, Some(Secret::new("sk-test".to_string())));
        let gateway = QueryGateway::new(Arc::new(cli));

        let answer = gateway.resolve("hi", 2).await.unwrap();
        assert_eq!(answer, "turns=2 key=sk-test");
    }

    #[tokio::test]
    async fn test_prompt_is_never_parsed_as_an_option() {
        let dir = TempDir::new().unwrap();
        let program = fake_cli(
            &dir,
            r#"if [ "$7" = "--" ]; then sep=yes; else sep=no; fi
printf '{"type":"result","result":"argc=%s sep=%s prompt=%s"}\n' "$#" "$sep" "$8""#,
        );
        let gateway = QueryGateway::new(Arc::new(ClaudeCli::new(program, None)));

        let answer = gateway
            .resolve("--dangerously-skip-permissions", 1)
            .await
            .unwrap();
        assert_eq!(answer, "argc=8 sep=yes prompt=--dangerously-skip-permissions");
    }

    #[tokio::test]
    async fn test_no_result_event_from_process() {
        let dir = TempDir::new().unwrap();
        let program = fake_cli(&dir, r#"echo '{"type":"assistant","message":{}}'"#);
        let gateway = QueryGateway::new(Arc::new(ClaudeCli::new(program, None)));

        assert_eq!(gateway.resolve("hi", 1).await.unwrap(), NO_RESPONSE);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let dir = TempDir::new().unwrap();
        let program = fake_cli(
            &dir,
            r#"echo '{"type":"result","result":"ignored"}'
echo 'invalid api key' >&2
exit 3"#,
        );
        let gateway = QueryGateway::new(Arc::new(ClaudeCli::new(program, None)));

        let err = gateway.resolve("hi", 1).await.unwrap_err();
        assert!(err.to_string().contains("invalid api key"), "{err}");
    }

    #[tokio::test]
    async fn test_malformed_line_is_an_error() {
        let dir = TempDir::new().unwrap();
        let program = fake_cli(&dir, "echo 'not json'");
        let gateway = QueryGateway::new(Arc::new(ClaudeCli::new(program, None)));

        let err = gateway.resolve("hi", 1).await.unwrap_err();
        assert!(err.to_string().contains("Malformed query event"), "{err}");
    }

    #[tokio::test]
    async fn test_missing_program() {
        let cli = ClaudeCli::new("/nonexistent/claude", None);
        let result = cli.query(QueryRequest::new("hi", 1)).await;
        assert!(result.is_err());
    }
}
