//! Docker log transport using bollard.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::container::{InspectContainerOptions, LogsOptions};
use futures::StreamExt;
use tracing::debug;

use crate::error::{ObserverError, Result, SourceId};
use crate::framing::Framing;
use crate::transport::{FrameStream, LogTransport, TailOptions};

/// Tails container logs from a Docker daemon.
///
/// bollard demultiplexes the daemon's stream itself, so chunks arrive as
/// bare lines and this transport reports [`Framing::Raw`].
pub struct DockerTransport {
    client: Docker,
}

impl DockerTransport {
    /// Connect to Docker daemon using default connection method.
    ///
    /// # Errors
    ///
    /// Returns error if connection fails.
    pub fn connect() -> Result<Self> {
        let client = Docker::connect_with_local_defaults().map_err(|e| {
            ObserverError::ConnectionFailed(format!("failed to connect to Docker: {e}"))
        })?;

        Ok(Self { client })
    }

    /// Connect to Docker daemon at a specific URL.
    ///
    /// # Errors
    ///
    /// Returns error if connection fails.
    pub fn connect_with_url(url: &str) -> Result<Self> {
        let client = Docker::connect_with_http(url, 120, bollard::API_DEFAULT_VERSION).map_err(
            |e| ObserverError::ConnectionFailed(format!("failed to connect to Docker at {url}: {e}")),
        )?;

        Ok(Self { client })
    }
}

impl LogTransport for DockerTransport {
    fn open<'a>(
        &'a self,
        source: &'a SourceId,
        options: &'a TailOptions,
    ) -> Pin<Box<dyn Future<Output = Result<FrameStream>> + Send + 'a>> {
        Box::pin(async move {
            // The logs endpoint only reports a missing container once polled.
            self.client
                .inspect_container(source.as_str(), None::<InspectContainerOptions>)
                .await
                .map_err(|e| ObserverError::Attach {
                    id: source.to_string(),
                    reason: e.to_string(),
                })?;

            let log_options = LogsOptions::<String> {
                stdout: true,
                stderr: true,
                timestamps: false,
                follow: options.follow,
                tail: options.tail.to_string(),
                ..Default::default()
            };

            debug!(source = %source, tail = options.tail, follow = options.follow, "opening Docker log stream");

            let stream = self
                .client
                .logs(source.as_str(), Some(log_options))
                .map(|chunk| {
                    chunk
                        .map(|output| output.into_bytes().to_vec())
                        .map_err(|e| ObserverError::Read(e.to_string()))
                });

            Ok(Box::pin(stream) as FrameStream)
        })
    }

    fn framing(&self) -> Framing {
        Framing::Raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_raw_framing() {
        let Ok(transport) = DockerTransport::connect() else {
            return;
        };
        assert_eq!(transport.framing(), Framing::Raw);
    }

    // =========================================================================
    // Integration Tests (require Docker)
    // =========================================================================

    #[tokio::test]
    #[ignore = "requires Docker daemon"]
    async fn test_docker_missing_container_fails_attach() {
        let transport = DockerTransport::connect().expect("connect");
        let source = SourceId::new("affogato-no-such-container").expect("valid source id");

        let result = transport.open(&source, &TailOptions::snapshot(1)).await;
        assert!(matches!(result, Err(ObserverError::Attach { .. })));
    }

    /// Tails a running server container, `some-redis` unless
    /// `AFFOGATO_TEST_CONTAINER` names another.
    #[tokio::test]
    #[ignore = "requires Docker daemon and a running Valkey container"]
    async fn test_docker_tails_container_history() {
        let container = std::env::var("AFFOGATO_TEST_CONTAINER")
            .unwrap_or_else(|_| "some-redis".to_string());
        let transport = DockerTransport::connect().expect("connect");
        let source = SourceId::new(container).expect("valid source id");

        let mut stream = transport
            .open(&source, &TailOptions::snapshot(5))
            .await
            .expect("attach");

        let mut lines = 0;
        while let Some(chunk) = stream.next().await {
            let line = transport.framing().decode(chunk.expect("read")).expect("decode");
            assert!(!line.ends_with(b"\n"));
            lines += 1;
        }
        assert!((1..=5).contains(&lines));
    }
}
