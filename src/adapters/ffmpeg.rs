use crate::config::{ConversionConfig, RuntimeKind};
use crate::core::profile::CompressionProfile;
use crate::core::split;
use crate::domain::ports::Transcoder;
use crate::utils::error::{tail, BotError, Result};
use async_trait::async_trait;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::Command;

/// stderr kept in error messages
const STDERR_TAIL_CHARS: usize = 1500;
const PROBE_TIMEOUT: Duration = Duration::from_secs(60);
const REMOVE_TIMEOUT: Duration = Duration::from_secs(30);

static CONTAINER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Where and how the ffmpeg process is started.
#[derive(Debug, Clone, PartialEq)]
pub enum FfmpegRuntime {
    Docker {
        docker_bin: String,
        image: String,
        gpus: bool,
    },
    Native {
        ffmpeg_bin: String,
    },
}

/// Per-invocation container options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSpec {
    /// 只有編碼與切割需要 GPU
    pub wants_gpu: bool,
    pub container_name: Option<String>,
}

/// `vcb_<job dir>_<seq>`, restricted to characters docker accepts.
pub fn container_name(workdir: &Path) -> String {
    let job: String = workdir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let seq = CONTAINER_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("vcb_{}_{}", job, seq)
}

impl FfmpegRuntime {
    pub fn from_config(config: &ConversionConfig) -> Self {
        match config.runtime {
            RuntimeKind::Docker => FfmpegRuntime::Docker {
                docker_bin: config.docker_bin.clone(),
                image: config.docker_image.clone(),
                gpus: config.gpus,
            },
            RuntimeKind::Native => FfmpegRuntime::Native {
                ffmpeg_bin: config.ffmpeg_bin.clone(),
            },
        }
    }

    /// Program and arguments; ffmpeg file arguments stay relative to `workdir`.
    pub fn command_line(
        &self,
        workdir: &Path,
        spec: &RunSpec,
        ffmpeg_args: &[String],
    ) -> (String, Vec<String>) {
        match self {
            FfmpegRuntime::Docker {
                docker_bin,
                image,
                gpus,
            } => {
                let mut args = vec!["run".to_string(), "--rm".to_string()];
                if let Some(name) = &spec.container_name {
                    args.extend(["--name".to_string(), name.clone()]);
                }
                if *gpus && spec.wants_gpu {
                    args.extend(["--gpus".to_string(), "all".to_string()]);
                }
                args.extend([
                    "-v".to_string(),
                    format!("{}:/workdir", workdir.display()),
                    "-w".to_string(),
                    "/workdir".to_string(),
                    image.clone(),
                ]);
                args.extend(ffmpeg_args.iter().cloned());
                (docker_bin.clone(), args)
            }
            FfmpegRuntime::Native { ffmpeg_bin } => (ffmpeg_bin.clone(), ffmpeg_args.to_vec()),
        }
    }

    /// `docker rm -f <name>`; native processes need nothing beyond the kill.
    pub fn remove_command_line(&self, container: &str) -> Option<(String, Vec<String>)> {
        match self {
            FfmpegRuntime::Docker { docker_bin, .. } => Some((
                docker_bin.clone(),
                vec!["rm".to_string(), "-f".to_string(), container.to_string()],
            )),
            FfmpegRuntime::Native { .. } => None,
        }
    }

    fn command(&self, workdir: &Path, spec: &RunSpec, ffmpeg_args: &[String]) -> Command {
        let (program, args) = self.command_line(workdir, spec, ffmpeg_args);
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Killing the `docker run` client leaves the container running.
    async fn remove_container(&self, workdir: &Path, container: &str) {
        let Some((program, args)) = self.remove_command_line(container) else {
            return;
        };
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match run_with_timeout(cmd, REMOVE_TIMEOUT).await {
            Ok(output) if output.status.success() => {
                tracing::info!("🗑️ Removed container {}", container)
            }
            Ok(output) => tracing::warn!(
                "⚠️ Could not remove container {}: {}",
                container,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => tracing::warn!("⚠️ Could not remove container {}: {}", container, e),
        }
    }
}

/// Waits for the child; on timeout it is killed and reaped.
pub async fn run_with_timeout(mut cmd: Command, limit: Duration) -> Result<Output> {
    let child = cmd.spawn()?;
    let pid = child.id();

    match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(output) => Ok(output?),
        Err(_) => {
            // wait_with_output 被取消時 child 已 drop，kill_on_drop 負責終止
            tracing::warn!(
                "⏱️ Process {:?} exceeded {}s, killed",
                pid,
                limit.as_secs()
            );
            Err(BotError::ConversionTimeout {
                seconds: limit.as_secs(),
            })
        }
    }
}

fn ensure_success(output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(BotError::FfmpegError {
        status: output.status.to_string(),
        stderr: tail(stderr.trim(), STDERR_TAIL_CHARS),
    })
}

pub struct FfmpegTranscoder {
    runtime: FfmpegRuntime,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(runtime: FfmpegRuntime, timeout: Duration) -> Self {
        Self { runtime, timeout }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(
            FfmpegRuntime::from_config(config),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn run(
        &self,
        workdir: &Path,
        args: &[String],
        limit: Duration,
        wants_gpu: bool,
    ) -> Result<Output> {
        // docker -v 需要絕對路徑
        let workdir = tokio::fs::canonicalize(workdir).await?;
        let spec = RunSpec {
            wants_gpu,
            container_name: match self.runtime {
                FfmpegRuntime::Docker { .. } => Some(container_name(&workdir)),
                FfmpegRuntime::Native { .. } => None,
            },
        };
        let (program, full_args) = self.runtime.command_line(&workdir, &spec, args);
        tracing::info!("🐳 Running: {} {}", program, full_args.join(" "));

        let cmd = self.runtime.command(&workdir, &spec, args);
        let result = run_with_timeout(cmd, limit).await;

        if let (Err(BotError::ConversionTimeout { .. }), Some(name)) =
            (&result, &spec.container_name)
        {
            self.runtime.remove_container(&workdir, name).await;
        }
        result
    }

    async fn run_expecting(&self, workdir: &Path, args: &[String], output: &str) -> Result<()> {
        let result = self.run(workdir, args, self.timeout, true).await?;
        ensure_success(&result)?;

        let output_path = workdir.join(output);
        if !tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            return Err(BotError::MissingOutputError {
                path: output_path.display().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe_duration(&self, workdir: &Path, input: &str) -> Result<f64> {
        // 沒有輸出檔時 ffmpeg 以非零狀態結束，只解析 stderr
        let limit = PROBE_TIMEOUT.min(self.timeout);
        let output = self
            .run(workdir, &split::probe_args(input), limit, false)
            .await?;
        split::parse_duration(&String::from_utf8_lossy(&output.stderr))
    }

    async fn transcode(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        profile: &CompressionProfile,
    ) -> Result<()> {
        self.run_expecting(workdir, &profile.ffmpeg_args(input, output), output)
            .await
    }

    async fn cut_segment(
        &self,
        workdir: &Path,
        input: &str,
        output: &str,
        start_secs: f64,
        duration_secs: f64,
    ) -> Result<()> {
        let args = split::segment_args(input, output, start_secs, duration_secs);
        self.run_expecting(workdir, &args, output).await
    }
}
