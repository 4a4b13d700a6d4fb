//! Observer → parser → gate composition.

use std::sync::Arc;

use affogato_checkpoint::Checkpoint;
use affogato_observer::{LogObserver, SourceId};
use affogato_parser::{LineParser, LogRecord};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::PipelineError;

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Lines received from the observer.
    pub received: u64,
    /// Lines decoded into records.
    pub parsed: u64,
    /// Lines that failed to decode.
    pub parse_errors: u64,
    /// Records admitted by the gate and emitted.
    pub admitted: u64,
    /// Records rejected as already seen.
    pub rejected: u64,
}

/// Forwards each record of one source at most once across all collectors
/// sharing the checkpoint store.
pub struct Pipeline {
    observer: LogObserver,
    parser: LineParser,
    checkpoint: Arc<dyn Checkpoint>,
    app_name: Option<String>,
    skip_parse_errors: bool,
}

impl Pipeline {
    /// Creates a pipeline.
    #[must_use]
    pub fn new(observer: LogObserver, checkpoint: Arc<dyn Checkpoint>) -> Self {
        Self {
            observer,
            parser: LineParser::new(),
            checkpoint,
            app_name: None,
            skip_parse_errors: true,
        }
    }

    /// Use `app_name` as checkpoint name instead of the source ID.
    #[must_use]
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Stop on the first unparseable line instead of skipping it.
    #[must_use]
    pub const fn with_skip_parse_errors(mut self, skip: bool) -> Self {
        self.skip_parse_errors = skip;
        self
    }

    /// Watches `source` until it ends, fails, or `cancel` fires, passing
    /// every admitted record to `sink`.
    ///
    /// # Errors
    ///
    /// Returns the watch's fatal error, a checkpoint store error, a parse
    /// error when parse errors are not skipped, or the sink's error.
    pub async fn run<F>(
        &self,
        cancel: &CancellationToken,
        source: SourceId,
        mut sink: F,
    ) -> Result<PipelineStats, PipelineError>
    where
        F: FnMut(&LogRecord) -> std::io::Result<()>,
    {
        let app_name = self
            .app_name
            .clone()
            .unwrap_or_else(|| source.as_str().to_string());
        let mut stats = PipelineStats::default();

        info!(source = %source, app = %app_name, "starting pipeline");
        let mut watch = self.observer.watch(cancel, source);

        while let Some(line) = watch.recv_line().await {
            stats.received += 1;

            let record = match self.parser.parse(&line) {
                Ok(record) => record,
                Err(e) => {
                    stats.parse_errors += 1;
                    let line = String::from_utf8_lossy(&line).into_owned();
                    if !self.skip_parse_errors {
                        return Err(PipelineError::Parse { line, source: e });
                    }
                    warn!(error = %e, line = %line, "skipping unparseable line");
                    continue;
                }
            };
            stats.parsed += 1;

            if self.checkpoint.check(&app_name, record.timestamp_utc()).await? {
                stats.admitted += 1;
                sink(&record)?;
            } else {
                stats.rejected += 1;
                debug!(app = %app_name, time = %record.time, "record already processed");
            }
        }

        if let Some(e) = watch.recv_error().await {
            return Err(e.into());
        }

        info!(
            app = %app_name,
            received = stats.received,
            admitted = stats.admitted,
            rejected = stats.rejected,
            parse_errors = stats.parse_errors,
            "pipeline finished"
        );
        Ok(stats)
    }
}
