use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::{
    AnalysisError, AnalysisResult,
    source::{self, AudioSource},
    tool::{self, RunError, ToolCommand, ToolOutput},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaAnalyzer: Send + Sync {
    /// Analyze the audio behind `url`. Cancelling `cancel` stops the run, killing
    /// whichever subprocess is active.
    async fn analyze(
        &self,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError>;
}

/// External programs used by the pipeline.
#[derive(Debug, Clone)]
pub struct AnalysisTools {
    /// Pulls audio out of a page URL (yt-dlp compatible arguments).
    pub extractor: ToolCommand,
    /// Resamples audio (ffmpeg compatible arguments).
    pub transcoder: ToolCommand,
    /// Takes a WAV path, prints `{"probability": f, "label": s}` on stdout.
    pub inference: ToolCommand,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Download,
    Conversion,
    Inference,
}

impl Stage {
    fn name(self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Conversion => "conversion",
            Stage::Inference => "inference",
        }
    }

    fn failed(self, detail: String) -> AnalysisError {
        match self {
            Stage::Download => AnalysisError::Download(detail),
            Stage::Conversion => AnalysisError::Conversion(detail),
            Stage::Inference => AnalysisError::Inference(detail),
        }
    }
}

const DEFAULT_MAX_DOWNLOAD_BYTES: u64 = 200 * 1024 * 1024;

/// Subprocess-backed MediaAnalyzer.
pub struct AudioAnalyzer {
    tools: AnalysisTools,
    http: reqwest::Client,
    stage_timeout: Duration,
    scratch_root: Option<PathBuf>,
    max_download_bytes: u64,
}

impl AudioAnalyzer {
    pub fn new(tools: AnalysisTools, stage_timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            tools,
            http,
            stage_timeout,
            scratch_root: None,
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
        })
    }

    /// Refuse direct audio links larger than `max` bytes.
    pub fn with_max_download_bytes(mut self, max: u64) -> Self {
        self.max_download_bytes = max;
        self
    }

    /// Create working directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(root.into());
        self
    }

    fn scratch_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("memora-");

        match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    fn timed_out(&self, stage: Stage) -> AnalysisError {
        AnalysisError::TimedOut {
            stage: stage.name(),
            secs: self.stage_timeout.as_secs(),
        }
    }

    fn too_large(&self) -> AnalysisError {
        AnalysisError::Download(format!(
            "audio larger than {} bytes",
            self.max_download_bytes
        ))
    }

    /// Stream a direct audio link to `dest`, giving up past `max_download_bytes`.
    async fn download(
        &self,
        url: &Url,
        dest: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), AnalysisError> {
        let fetch = async {
            let mut response = self
                .http
                .get(url.clone())
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|err| AnalysisError::Download(err.to_string()))?;

            if response
                .content_length()
                .is_some_and(|len| len > self.max_download_bytes)
            {
                return Err(self.too_large());
            }

            let mut file = tokio::fs::File::create(dest).await?;
            let mut written: u64 = 0;
            while let Some(chunk) = response
                .chunk()
                .await
                .map_err(|err| AnalysisError::Download(err.to_string()))?
            {
                written += chunk.len() as u64;
                if written > self.max_download_bytes {
                    return Err(self.too_large());
                }
                file.write_all(&chunk).await?;
            }
            file.flush().await?;

            Ok::<_, AnalysisError>(())
        };

        tokio::select! {
            result = fetch => result,
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            _ = tokio::time::sleep(self.stage_timeout) => Err(self.timed_out(Stage::Download)),
        }
    }

    /// Have the extractor write `input.<ext>` into `dir` and return its path.
    async fn extract(
        &self,
        url: &Url,
        dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, AnalysisError> {
        let template = dir.join("input.%(ext)s");
        let args: Vec<OsString> = vec![
            "-x".into(),
            "--audio-format".into(),
            "wav".into(),
            url.as_str().into(),
            "-o".into(),
            template.into_os_string(),
        ];

        self.run_stage(Stage::Download, &self.tools.extractor, &args, cancel)
            .await?;

        find_extracted(dir)
            .await?
            .ok_or_else(|| AnalysisError::Download("extractor produced no audio file".into()))
    }

    async fn transcode(
        &self,
        input: &Path,
        output: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), AnalysisError> {
        let args: Vec<OsString> = vec![
            "-y".into(),
            "-i".into(),
            input.into(),
            "-ar".into(),
            "16000".into(),
            "-ac".into(),
            "1".into(),
            output.into(),
        ];

        self.run_stage(Stage::Conversion, &self.tools.transcoder, &args, cancel)
            .await?;

        Ok(())
    }

    async fn infer(
        &self,
        wav: &Path,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let output = self
            .run_stage(Stage::Inference, &self.tools.inference, &[OsString::from(wav)], cancel)
            .await?;

        // stderr carries model loading chatter; only stdout is the verdict
        let result: AnalysisResult = serde_json::from_slice(&output.stdout)
            .map_err(|err| AnalysisError::Parse(err.to_string()))?;

        if !(0.0..=1.0).contains(&result.probability) {
            return Err(AnalysisError::Parse(format!(
                "probability {} outside [0, 1]",
                result.probability
            )));
        }

        Ok(result)
    }

    async fn run_stage(
        &self,
        stage: Stage,
        tool: &ToolCommand,
        args: &[OsString],
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, AnalysisError> {
        let output = tool::run(tool, args, cancel, self.stage_timeout)
            .await
            .map_err(|err| match err {
                RunError::Spawn(err) => {
                    stage.failed(format!("could not run {}: {err}", tool.program()))
                }
                RunError::TimedOut => self.timed_out(stage),
                RunError::Cancelled => AnalysisError::Cancelled,
            })?;

        if !output.status.success() {
            let diagnostics = output.diagnostics();
            tracing::warn!(
                stage = stage.name(),
                program = tool.program(),
                status = %output.status,
                diagnostics = %diagnostics,
                "analysis tool failed"
            );
            return Err(stage.failed(diagnostics));
        }

        Ok(output)
    }
}

#[async_trait]
impl MediaAnalyzer for AudioAnalyzer {
    async fn analyze(
        &self,
        url: &str,
        cancel: CancellationToken,
    ) -> Result<AnalysisResult, AnalysisError> {
        let url = source::parse_media_url(url)?;

        // Removed on drop, whichever way this function returns
        let scratch = self.scratch_dir()?;

        let input = match AudioSource::classify(&url) {
            AudioSource::Direct { extension } => {
                let path = scratch.path().join(format!("input.{extension}"));
                self.download(&url, &path, &cancel).await?;
                path
            }
            AudioSource::Page => self.extract(&url, scratch.path(), &cancel).await?,
        };

        let wav = scratch.path().join("audio.wav");
        self.transcode(&input, &wav, &cancel).await?;

        let result = self.infer(&wav, &cancel).await?;

        tracing::info!(
            url = %url,
            probability = result.probability,
            label = %result.label,
            "analysis complete"
        );

        Ok(result)
    }
}

/// The extractor picks the final extension itself; prefer the requested WAV.
async fn find_extracted(dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let preferred = dir.join("input.wav");
    if tokio::fs::try_exists(&preferred).await? {
        return Ok(Some(preferred));
    }

    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_name().to_string_lossy().starts_with("input.") {
            return Ok(Some(entry.path()));
        }
    }

    Ok(None)
}
