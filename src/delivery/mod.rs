//! Delivery of finished renders: synchronous streaming or asynchronous jobs.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::encode::sink::EncoderFactory;
use crate::foundation::error::{KenBurnsError, KenBurnsResult};
use crate::jobs::registry::JobId;
use crate::jobs::service::JobService;
use crate::render::pipeline::RenderStats;

use self::request::RenderRequest;
use self::streaming::StreamingRenderer;

pub(crate) mod request;
pub(crate) mod streaming;

/// Delivery model, chosen once at configuration time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Encode while the client reads the response.
    #[default]
    #[serde(alias = "sync")]
    Streaming,
    /// Return a job id; the client polls and downloads later.
    #[serde(alias = "async")]
    Jobs,
}

impl DeliveryMode {
    /// Canonical name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Streaming => "streaming",
            Self::Jobs => "jobs",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMode {
    type Err = KenBurnsError;

    fn from_str(s: &str) -> KenBurnsResult<Self> {
        match s.trim() {
            "streaming" | "sync" => Ok(Self::Streaming),
            "jobs" | "async" => Ok(Self::Jobs),
            other => Err(KenBurnsError::invalid_request(format!(
                "unknown delivery mode '{other}' (expected streaming or jobs)"
            ))),
        }
    }
}

/// Outcome of accepting one request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Accepted {
    /// Rendering continues in the background under this id.
    Job(JobId),
    /// The whole video was written to the response.
    Streamed(RenderStats),
}

/// The configured delivery model. The frame pipeline is shared; only sink wiring and job
/// tracking differ.
pub enum Delivery {
    /// Synchronous streaming.
    Streaming(StreamingRenderer),
    /// Asynchronous jobs.
    Jobs(JobService),
}

impl Delivery {
    /// Build the delivery named by `config.delivery`.
    pub fn from_config(
        config: &ServiceConfig,
        encoder: Arc<dyn EncoderFactory>,
    ) -> KenBurnsResult<Self> {
        tracing::info!(mode = %config.delivery, "delivery configured");
        Ok(match config.delivery {
            DeliveryMode::Streaming => Self::Streaming(StreamingRenderer::new(config, encoder)?),
            DeliveryMode::Jobs => Self::Jobs(JobService::new(config, encoder)?),
        })
    }

    /// Active mode.
    pub fn mode(&self) -> DeliveryMode {
        match self {
            Self::Streaming(_) => DeliveryMode::Streaming,
            Self::Jobs(_) => DeliveryMode::Jobs,
        }
    }

    /// Handle one request.
    ///
    /// In streaming mode the video is written to `response`. In job mode `response` is not used;
    /// the caller reports the returned id.
    pub fn accept<W>(&self, request: RenderRequest, response: W) -> KenBurnsResult<Accepted>
    where
        W: Write + Send + 'static,
    {
        match self {
            Self::Streaming(renderer) => renderer.stream(request, response).map(Accepted::Streamed),
            Self::Jobs(service) => service.submit(request).map(Accepted::Job),
        }
    }

    /// The job service, in job mode.
    pub fn jobs(&self) -> Option<&JobService> {
        match self {
            Self::Jobs(service) => Some(service),
            Self::Streaming(_) => None,
        }
    }
}
