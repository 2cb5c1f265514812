//! Backend readiness: a two-state machine guarding every parse request.
//!
//! ```text
//!            probe == 200
//! NotReady ────────────────▶ Ready   (sticky, never re-probed)
//!    ▲  │
//!    └──┘ connection refused / non-200: sleep, try again
//! ```
//!
//! Polling is bounded by [`ParserConfig::max_probe_attempts`]; after that
//! [`BackendHealth::ensure_ready`] fails and the state stays `NotReady`, so
//! the next call starts a fresh polling round.
//!
//! Once `Ready`, the backend is trusted for the lifetime of this value. A
//! server that dies afterwards shows up as per-document transport errors,
//! not as a readiness failure.

use super::launcher::ComposeLauncher;
use super::TikaService;
use crate::config::{LaunchMode, ParserConfig};
use crate::error::{TikaError, TransportError};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Readiness of the Tika backend as seen by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendState {
    #[default]
    NotReady,
    Ready,
}

/// Version and parser list reported by the server. Informational only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceCapabilities {
    pub version: Option<String>,
    pub parsers: Option<serde_json::Value>,
}

impl ServiceCapabilities {
    /// Query `/version` and `/parsers/details`.
    ///
    /// Never fails: anything that goes wrong is logged and leaves the
    /// corresponding field empty.
    pub async fn fetch<S: TikaService>(service: &S) -> Self {
        let mut caps = Self::default();

        match service.version().await {
            Ok(resp) if resp.status.is_success() => {
                let version = resp.body.trim().to_string();
                info!("Tika Server Version: {}", version);
                caps.version = Some(version);
            }
            Ok(resp) => warn!("Tika /version returned {}", resp.status),
            Err(e) => warn!("Error checking Tika version: {}", e),
        }

        match service.parser_details().await {
            Ok(resp) if resp.status.is_success() => {
                match serde_json::from_str::<serde_json::Value>(&resp.body) {
                    Ok(parsers) => {
                        debug!(
                            "Available parsers:\n{}",
                            serde_json::to_string_pretty(&parsers).unwrap_or_default()
                        );
                        caps.parsers = Some(parsers);
                    }
                    Err(e) => warn!("Tika parser details are not valid JSON: {}", e),
                }
            }
            Ok(resp) => warn!("Tika /parsers/details returned {}", resp.status),
            Err(e) => warn!("Error listing Tika parsers: {}", e),
        }

        caps
    }
}

/// Readiness tracker owned by a [`crate::parse::DocumentParser`].
#[derive(Debug)]
pub struct BackendHealth {
    state: Mutex<BackendState>,
    capabilities: OnceLock<ServiceCapabilities>,
    launcher: Option<ComposeLauncher>,
    url: String,
    max_attempts: u32,
    interval: Duration,
    introspect: bool,
}

impl BackendHealth {
    pub fn new(config: &ParserConfig) -> Self {
        let launcher = match &config.launch {
            LaunchMode::External => None,
            LaunchMode::DockerCompose {
                service,
                project_dir,
            } => Some(ComposeLauncher::new(service.clone(), project_dir.clone())),
        };

        Self {
            state: Mutex::new(BackendState::NotReady),
            capabilities: OnceLock::new(),
            launcher,
            url: config.base_url.clone(),
            max_attempts: config.max_probe_attempts,
            interval: config.probe_interval(),
            introspect: config.introspect,
        }
    }

    /// Current state without probing.
    pub async fn state(&self) -> BackendState {
        *self.state.lock().await
    }

    /// Capabilities recorded when the backend became ready, if introspection ran.
    pub fn capabilities(&self) -> Option<&ServiceCapabilities> {
        self.capabilities.get()
    }

    /// Make sure the backend answers its health probe.
    ///
    /// Returns immediately when already `Ready`. Otherwise starts the
    /// container (if configured), then polls until the first `200 OK` or
    /// until the attempt budget runs out. Concurrent callers wait on the
    /// same lock, so only one polling round runs at a time.
    ///
    /// # Errors
    /// - [`TikaError::BackendUnavailable`] when every attempt failed
    /// - [`TikaError::ProbeFailed`] on a transport error other than a
    ///   refused connection
    pub async fn ensure_ready<S: TikaService>(&self, service: &S) -> Result<(), TikaError> {
        let mut state = self.state.lock().await;
        if *state == BackendState::Ready {
            return Ok(());
        }

        if let Some(ref launcher) = self.launcher {
            if let Err(e) = launcher.launch().await {
                warn!("{}; polling anyway", e);
            }
        }

        info!("Waiting for Tika service at {} to be ready...", self.url);
        for attempt in 1..=self.max_attempts {
            match service.probe().await {
                Ok(status) if status == reqwest::StatusCode::OK => {
                    info!("Tika service is ready (attempt {})", attempt);
                    *state = BackendState::Ready;
                    if self.introspect && self.capabilities.get().is_none() {
                        let caps = ServiceCapabilities::fetch(service).await;
                        let _ = self.capabilities.set(caps);
                    }
                    return Ok(());
                }
                Ok(status) => {
                    debug!("Probe {}/{}: HTTP {}", attempt, self.max_attempts, status);
                }
                Err(TransportError::Connect(msg)) => {
                    debug!("Probe {}/{}: {}", attempt, self.max_attempts, msg);
                }
                Err(other) => return Err(TikaError::ProbeFailed(other)),
            }

            if attempt < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        warn!("Failed to reach Tika service after {} attempts", self.max_attempts);
        Err(TikaError::BackendUnavailable {
            url: self.url.clone(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ServiceResponse;
    use crate::config::OcrStrategy;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    /// Probe-only double: pops scripted outcomes, then keeps answering 200.
    struct ScriptedProbe {
        outcomes: StdMutex<VecDeque<Result<StatusCode, TransportError>>>,
        probes: AtomicUsize,
        version_calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(outcomes: Vec<Result<StatusCode, TransportError>>) -> Self {
            Self {
                outcomes: StdMutex::new(outcomes.into()),
                probes: AtomicUsize::new(0),
                version_calls: AtomicUsize::new(0),
            }
        }

        fn probes(&self) -> usize {
            self.probes.load(Ordering::SeqCst)
        }
    }

    impl TikaService for ScriptedProbe {
        async fn probe(&self) -> Result<StatusCode, TransportError> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(StatusCode::OK))
        }

        async fn version(&self) -> Result<ServiceResponse, TransportError> {
            self.version_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ServiceResponse::ok("Apache Tika 2.9.1\n"))
        }

        async fn parser_details(&self) -> Result<ServiceResponse, TransportError> {
            Err(TransportError::Other("not served".into()))
        }

        async fn put_metadata(&self, _: &[u8]) -> Result<ServiceResponse, TransportError> {
            unreachable!("health checks never fetch metadata")
        }

        async fn put_content(
            &self,
            _: &[u8],
            _: OcrStrategy,
        ) -> Result<ServiceResponse, TransportError> {
            unreachable!("health checks never fetch content")
        }
    }

    fn fast_config(attempts: u32) -> ParserConfig {
        ParserConfig::builder()
            .max_probe_attempts(attempts)
            .probe_interval_ms(1)
            .build()
            .unwrap()
    }

    fn refused() -> Result<StatusCode, TransportError> {
        Err(TransportError::Connect("connection refused".into()))
    }

    #[tokio::test]
    async fn ready_after_refusals() {
        let service = ScriptedProbe::new(vec![refused(), refused()]);
        let health = BackendHealth::new(&fast_config(10));

        health.ensure_ready(&service).await.unwrap();

        assert_eq!(service.probes(), 3);
        assert_eq!(health.state().await, BackendState::Ready);
    }

    #[tokio::test]
    async fn ready_is_sticky() {
        let service = ScriptedProbe::new(vec![]);
        let health = BackendHealth::new(&fast_config(10));

        health.ensure_ready(&service).await.unwrap();
        health.ensure_ready(&service).await.unwrap();
        health.ensure_ready(&service).await.unwrap();

        assert_eq!(service.probes(), 1);
        assert_eq!(service.version_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn budget_exhausted_stays_not_ready() {
        let service = ScriptedProbe::new(vec![refused(), refused(), refused()]);
        let health = BackendHealth::new(&fast_config(3));

        let err = health.ensure_ready(&service).await.unwrap_err();

        assert!(matches!(err, TikaError::BackendUnavailable { attempts: 3, .. }));
        assert_eq!(service.probes(), 3);
        assert_eq!(health.state().await, BackendState::NotReady);
    }

    #[tokio::test]
    async fn non_200_counts_as_failed_attempt() {
        let service = ScriptedProbe::new(vec![Ok(StatusCode::SERVICE_UNAVAILABLE)]);
        let health = BackendHealth::new(&fast_config(5));

        health.ensure_ready(&service).await.unwrap();
        assert_eq!(service.probes(), 2);
    }

    #[tokio::test]
    async fn unexpected_transport_error_propagates() {
        let service = ScriptedProbe::new(vec![Err(TransportError::Timeout("slow".into()))]);
        let health = BackendHealth::new(&fast_config(10));

        let err = health.ensure_ready(&service).await.unwrap_err();

        assert!(matches!(err, TikaError::ProbeFailed(TransportError::Timeout(_))));
        assert_eq!(service.probes(), 1);
        assert_eq!(health.state().await, BackendState::NotReady);
    }

    #[tokio::test]
    async fn capabilities_recorded_and_failures_tolerated() {
        let service = ScriptedProbe::new(vec![]);
        let health = BackendHealth::new(&fast_config(1));

        health.ensure_ready(&service).await.unwrap();

        let caps = health.capabilities().expect("introspection ran");
        assert_eq!(caps.version.as_deref(), Some("Apache Tika 2.9.1"));
        assert!(caps.parsers.is_none());
    }

    #[tokio::test]
    async fn introspection_can_be_disabled() {
        let service = ScriptedProbe::new(vec![]);
        let config = ParserConfig::builder()
            .introspect(false)
            .build()
            .unwrap();
        let health = BackendHealth::new(&config);

        health.ensure_ready(&service).await.unwrap();

        assert!(health.capabilities().is_none());
        assert_eq!(service.version_calls.load(Ordering::SeqCst), 0);
    }
}
