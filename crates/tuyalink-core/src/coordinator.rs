// ── Poll/verify coordinator ──
//
// Owns the device snapshot. A background task refreshes it on a fixed
// period; commands can optionally poll the cloud until the device reports
// the expected values. Only cloud-observed state is ever published.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OnceCell, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use tuyalink_api::transport::{TlsMode, TransportConfig};
use tuyalink_api::{CloudClient, DeviceCommand, StatusItem};

use crate::backend::DeviceBackend;
use crate::config::{CommandOptions, CoordinatorConfig};
use crate::error::CoreError;
use crate::model::{Expectation, FunctionCatalog, Snapshot};
use crate::store::SnapshotStore;

// ── Command outcome ──────────────────────────────────────────────

/// What happened after a command batch was accepted by the cloud.
#[derive(Debug, Clone)]
pub enum FollowUp {
    /// No verification requested; the post-command refresh published this.
    Refreshed(Arc<Snapshot>),
    /// No verification requested; the post-command refresh failed and
    /// nothing was published. The command itself succeeded.
    RefreshFailed(String),
    /// The device reported every expected value; this snapshot was published.
    Verified(Arc<Snapshot>),
    /// The deadline passed without a match; the latest observed status was
    /// published anyway.
    TimedOut(Arc<Snapshot>),
    /// The coordinator was stopped while verifying. Nothing was published.
    Cancelled,
}

/// Result of [`Coordinator::send_commands`].
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// The cloud's raw `result` for the command batch.
    pub result: serde_json::Value,
    pub follow_up: FollowUp,
}

// ── Coordinator ──────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Presentation code reads
/// snapshots and sends commands through this type and never talks to the
/// cloud client directly.
pub struct Coordinator<B: DeviceBackend = CloudClient> {
    inner: Arc<CoordinatorInner<B>>,
}

impl<B: DeviceBackend> Clone for Coordinator<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<B> {
    config: CoordinatorConfig,
    backend: Arc<B>,
    store: SnapshotStore,
    catalog: OnceCell<FunctionCatalog>,
    verify_lock: Mutex<()>,
    /// Read without `verify_lock` by the scheduled refresh.
    verifying: AtomicBool,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator<CloudClient> {
    /// Build a coordinator backed by the signed cloud client. Does not
    /// touch the network; call [`start()`](Self::start) for the first
    /// refresh and background polling.
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = CloudClient::new(config.credentials.clone(), &transport)?;
        Ok(Self::with_backend(Arc::new(client), config))
    }
}

impl<B: DeviceBackend> Coordinator<B> {
    pub fn with_backend(backend: Arc<B>, config: CoordinatorConfig) -> Self {
        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                backend,
                store: SnapshotStore::new(),
                catalog: OnceCell::new(),
                verify_lock: Mutex::new(()),
                verifying: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.inner.backend
    }

    pub fn device_id(&self) -> &str {
        &self.inner.config.device_id
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Perform the first scheduled refresh and spawn the periodic refresh
    /// task. A failing first refresh is returned and nothing is spawned.
    pub async fn start(&self) -> Result<Arc<Snapshot>, CoreError> {
        let snapshot = self.refresh().await?;

        let period = self.inner.config.poll_interval;
        let mut handles = self.inner.task_handles.lock().await;
        if !period.is_zero() && handles.is_empty() {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(refresh_task(coordinator, period, cancel)));
        }

        info!(device_id = self.device_id(), "coordinator started");
        Ok(snapshot)
    }

    /// Cancel background polling and any running verify loop, then join
    /// the background task. Further refreshes and commands fail with
    /// [`CoreError::Stopped`].
    pub async fn stop(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("coordinator stopped");
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Scheduled refresh.
    ///
    /// While a verify loop is running this returns the current snapshot
    /// without calling the cloud. Otherwise it fetches status (and the
    /// function catalog, once), publishes, and marks the device available.
    /// Failures mark it unavailable and come back as
    /// [`CoreError::UpdateFailed`]; the previous snapshot stays published.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Stopped);
        }

        if self.inner.verifying.load(Ordering::Acquire) {
            if let Some(current) = self.inner.store.snapshot() {
                debug!("verify in progress, keeping current snapshot");
                return Ok(current);
            }
        }

        match self.fetch_with_catalog().await {
            Ok(snapshot) => {
                self.inner.store.set_available(true);
                Ok(self.inner.store.publish(snapshot))
            }
            Err(e) => {
                warn!(error = %e, "scheduled refresh failed");
                self.inner.store.set_available(false);
                Err(CoreError::UpdateFailed {
                    source: Box::new(e),
                })
            }
        }
    }

    /// Fetch status once and publish it, regardless of any running verify.
    pub async fn refresh_now(&self) -> Result<Arc<Snapshot>, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Stopped);
        }
        let snapshot = self.fetch_once().await?;
        Ok(self.inner.store.publish(snapshot))
    }

    /// The device's function catalog, fetched on first use.
    pub async fn functions(&self) -> Result<&FunctionCatalog, CoreError> {
        self.inner
            .catalog
            .get_or_try_init(|| async {
                let catalog: FunctionCatalog = self
                    .inner
                    .backend
                    .functions(self.device_id())
                    .await?
                    .into_iter()
                    .collect();
                debug!(count = catalog.len(), "function catalog cached");
                Ok::<_, CoreError>(catalog)
            })
            .await
    }

    async fn fetch_with_catalog(&self) -> Result<Snapshot, CoreError> {
        let items = self.inner.backend.status(self.device_id()).await?;
        self.functions().await?;
        Ok(self.build_snapshot(items))
    }

    async fn fetch_once(&self) -> Result<Snapshot, CoreError> {
        let items = self.inner.backend.status(self.device_id()).await?;
        Ok(self.build_snapshot(items))
    }

    /// Configured data points plus any catalog codes, all present.
    fn build_snapshot(&self, items: Vec<StatusItem>) -> Snapshot {
        let known = self
            .inner
            .config
            .known_data_points
            .iter()
            .map(String::as_str);
        match self.inner.catalog.get() {
            Some(catalog) => Snapshot::from_status(items, known.chain(catalog.codes())),
            None => Snapshot::from_status(items, known),
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Send a command batch using the configured verify timing.
    pub async fn send_commands(
        &self,
        commands: &[DeviceCommand],
        verify: Option<&Expectation>,
    ) -> Result<CommandOutcome, CoreError> {
        let options = self.inner.config.command_defaults;
        self.send_commands_with(commands, verify, options).await
    }

    /// Send a command batch, then either refresh once (no expectation) or
    /// poll until the device reports every expected value.
    ///
    /// A send failure is returned as-is and nothing is verified. A verify
    /// that never matches is not an error: the latest observed status is
    /// published and the outcome says [`FollowUp::TimedOut`].
    pub async fn send_commands_with(
        &self,
        commands: &[DeviceCommand],
        verify: Option<&Expectation>,
        options: CommandOptions,
    ) -> Result<CommandOutcome, CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::Stopped);
        }

        let codes: Vec<&str> = commands.iter().map(|c| c.code.as_str()).collect();
        debug!(?codes, verify = verify.is_some(), "sending commands");

        let result = match self
            .inner
            .backend
            .send_commands(self.device_id(), commands)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "command failed");
                return Err(e);
            }
        };

        let follow_up = match verify {
            Some(expected) if !expected.is_empty() => self.verify(expected, options).await,
            _ => match self.refresh_now().await {
                Ok(snapshot) => FollowUp::Refreshed(snapshot),
                Err(e) => {
                    debug!(error = %e, "post-command refresh failed");
                    FollowUp::RefreshFailed(e.to_string())
                }
            },
        };

        Ok(CommandOutcome { result, follow_up })
    }

    async fn verify(&self, expected: &Expectation, options: CommandOptions) -> FollowUp {
        let cancel = self.inner.cancel.clone();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("verify cancelled");
                FollowUp::Cancelled
            }
            follow_up = self.verify_until_deadline(expected, options) => follow_up,
        }
    }

    async fn verify_until_deadline(
        &self,
        expected: &Expectation,
        options: CommandOptions,
    ) -> FollowUp {
        let _lock = self.inner.verify_lock.lock().await;
        let _flag = VerifyFlag::raise(&self.inner.verifying);

        let deadline = Instant::now() + options.timeout;
        while Instant::now() < deadline {
            match self.fetch_once().await {
                Ok(current) if current.satisfies(expected) => {
                    debug!("verify matched");
                    return FollowUp::Verified(self.inner.store.publish(current));
                }
                Ok(_) => {}
                Err(e) => trace!(error = %e, "verify poll failed"),
            }
            tokio::time::sleep(options.interval).await;
        }

        let latest = match self.fetch_once().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                debug!(error = %e, "final verify fetch failed, republishing last snapshot");
                self.inner
                    .store
                    .snapshot()
                    .map_or_else(|| self.build_snapshot(Vec::new()), |s| (*s).clone())
            }
        };
        debug!("verify timed out, published latest status");
        FollowUp::TimedOut(self.inner.store.publish(latest))
    }

    // ── Reactive access ──────────────────────────────────────────

    /// The last published snapshot.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.inner.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.inner.store.subscribe()
    }

    pub fn updates(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.inner.store.updates()
    }

    pub fn availability(&self) -> watch::Receiver<bool> {
        self.inner.store.availability()
    }

    /// `true` iff the last scheduled refresh succeeded.
    pub fn is_available(&self) -> bool {
        self.inner.store.is_available()
    }

    /// When a snapshot was last published.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.inner.store.last_update()
    }

    pub fn is_verifying(&self) -> bool {
        self.inner.verifying.load(Ordering::Acquire)
    }
}

/// Clears the in-progress flag however the verify loop exits.
struct VerifyFlag<'a>(&'a AtomicBool);

impl<'a> VerifyFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for VerifyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn build_transport(config: &CoordinatorConfig) -> TransportConfig {
    let tls = config
        .ca_cert
        .clone()
        .map_or(TlsMode::System, TlsMode::CustomCa);
    TransportConfig {
        tls,
        timeout: config.timeout,
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically run the scheduled refresh.
async fn refresh_task<B: DeviceBackend>(
    coordinator: Coordinator<B>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Failures are logged and reflected in availability.
                let _ = coordinator.refresh().await;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;

    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tuyalink_api::{Credentials, FunctionSpec, RegionSelector};

    use super::*;
    use crate::model::{DpValue, S6_DATA_POINTS};

    /// Reports `system_arm_type` from a script; the last entry repeats.
    struct FakeBackend {
        arm_states: StdMutex<VecDeque<&'static str>>,
        status_calls: AtomicUsize,
        function_calls: AtomicUsize,
        fail_status: AtomicBool,
        fail_send: AtomicBool,
        sent: StdMutex<Vec<DeviceCommand>>,
    }

    impl FakeBackend {
        fn scripted(states: &[&'static str]) -> Arc<Self> {
            Arc::new(Self {
                arm_states: StdMutex::new(states.iter().copied().collect()),
                status_calls: AtomicUsize::new(0),
                function_calls: AtomicUsize::new(0),
                fail_status: AtomicBool::new(false),
                fail_send: AtomicBool::new(false),
                sent: StdMutex::new(Vec::new()),
            })
        }

        fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }

        fn function_calls(&self) -> usize {
            self.function_calls.load(Ordering::SeqCst)
        }
    }

    impl DeviceBackend for FakeBackend {
        async fn functions(&self, _device_id: &str) -> Result<Vec<FunctionSpec>, CoreError> {
            self.function_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(vec![FunctionSpec {
                code: "arm_delay".into(),
                kind: Some("Integer".into()),
                name: None,
                values: None,
                desc: None,
            }])
        }

        async fn status(&self, _device_id: &str) -> Result<Vec<StatusItem>, CoreError> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_status.load(Ordering::SeqCst) {
                return Err(CoreError::ConnectionFailed {
                    reason: "offline".into(),
                });
            }
            let state = {
                let mut states = self.arm_states.lock().unwrap();
                if states.len() > 1 {
                    states.pop_front().unwrap()
                } else {
                    states.front().copied().unwrap_or("disarmed")
                }
            };
            Ok(vec![StatusItem {
                code: "system_arm_type".into(),
                value: json!(state),
            }])
        }

        async fn send_commands(
            &self,
            _device_id: &str,
            commands: &[DeviceCommand],
        ) -> Result<Value, CoreError> {
            if self.fail_send.load(Ordering::SeqCst) {
                return Err(CoreError::Api {
                    message: "device is offline".into(),
                    code: Some(2009),
                    payload: json!({"success": false, "code": 2009}),
                });
            }
            self.sent.lock().unwrap().extend_from_slice(commands);
            Ok(json!(true))
        }
    }

    fn coordinator(backend: &Arc<FakeBackend>) -> Coordinator<FakeBackend> {
        let creds = Credentials::new("id", "secret", RegionSelector::Auto);
        Coordinator::with_backend(Arc::clone(backend), CoordinatorConfig::new(creds, "dev1"))
    }

    fn arm() -> Vec<DeviceCommand> {
        vec![DeviceCommand::new("system_arm_type", "armed")]
    }

    fn expect_armed() -> Expectation {
        [("system_arm_type".to_owned(), DpValue::from("armed"))]
            .into_iter()
            .collect()
    }

    fn assert_complete(snapshot: &Snapshot) {
        for code in S6_DATA_POINTS {
            assert!(snapshot.contains(code), "snapshot missing {code}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn verify_publishes_only_the_matching_snapshot() {
        let backend = FakeBackend::scripted(&["disarmed", "disarmed", "disarmed", "armed"]);
        let coord = coordinator(&backend);
        let mut updates = coord.updates();

        let outcome = coord
            .send_commands(&arm(), Some(&expect_armed()))
            .await
            .unwrap();

        assert_eq!(outcome.result, json!(true));
        let FollowUp::Verified(snapshot) = &outcome.follow_up else {
            panic!("expected Verified, got {:?}", outcome.follow_up);
        };
        assert_eq!(snapshot.value("system_arm_type").as_str(), Some("armed"));

        let published = updates.try_recv().unwrap();
        assert_eq!(published.value("system_arm_type").as_str(), Some("armed"));
        assert!(updates.try_recv().is_err(), "intermediate snapshot published");
        assert_eq!(backend.status_calls(), 4);
        assert_eq!(backend.sent.lock().unwrap().clone(), arm());
        assert!(!coord.is_verifying());
    }

    #[tokio::test(start_paused = true)]
    async fn verify_timeout_publishes_final_fetch() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);
        let mut updates = coord.updates();
        let options = CommandOptions {
            timeout: Duration::from_secs(2),
            interval: Duration::from_millis(500),
        };

        let outcome = coord
            .send_commands_with(&arm(), Some(&expect_armed()), options)
            .await
            .unwrap();

        assert_eq!(outcome.result, json!(true));
        let FollowUp::TimedOut(snapshot) = &outcome.follow_up else {
            panic!("expected TimedOut, got {:?}", outcome.follow_up);
        };
        assert_eq!(snapshot.value("system_arm_type").as_str(), Some("disarmed"));
        assert_complete(snapshot);

        assert!(updates.try_recv().is_ok());
        assert!(updates.try_recv().is_err(), "only the final fetch is published");
        assert!(backend.status_calls() >= 4);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_refresh_during_verify_skips_the_cloud() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);
        let previous = coord.refresh_now().await.unwrap();

        let task = {
            let coord = coord.clone();
            tokio::spawn(async move {
                let commands = arm();
                let expected = expect_armed();
                coord.send_commands(&commands, Some(&expected)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(coord.is_verifying());

        let before = backend.status_calls();
        let seen = coord.refresh().await.unwrap();
        assert_eq!(backend.status_calls(), before);
        assert!(Arc::ptr_eq(&seen, &previous));
        assert_eq!(backend.function_calls(), 0);

        let outcome = task.await.unwrap().unwrap();
        assert!(matches!(outcome.follow_up, FollowUp::TimedOut(_)));
        assert!(!coord.is_verifying());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_refreshes_fetch_catalog_once() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);

        let (a, b) = tokio::join!(coord.refresh(), coord.refresh());
        a.unwrap();
        let snapshot = b.unwrap();
        coord.refresh().await.unwrap();

        assert_eq!(backend.function_calls(), 1);
        assert_eq!(backend.status_calls(), 3);
        assert!(snapshot.contains("arm_delay"), "catalog codes are filled");
        assert_complete(&snapshot);
        assert!(coord.is_available());
    }

    #[tokio::test(start_paused = true)]
    async fn every_published_snapshot_contains_known_codes() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);
        let mut updates = coord.updates();

        // Verify timeout with no prior snapshot and a failing cloud.
        backend.fail_status.store(true, Ordering::SeqCst);
        let options = CommandOptions {
            timeout: Duration::from_secs(1),
            interval: Duration::from_millis(500),
        };
        coord
            .send_commands_with(&arm(), Some(&expect_armed()), options)
            .await
            .unwrap();

        backend.fail_status.store(false, Ordering::SeqCst);
        coord.refresh().await.unwrap();
        coord.refresh_now().await.unwrap();
        coord.send_commands(&arm(), None).await.unwrap();

        let mut seen = 0;
        while let Ok(snapshot) = updates.try_recv() {
            assert_complete(&snapshot);
            seen += 1;
        }
        assert_eq!(seen, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn post_command_refresh_failure_is_reported_not_raised() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);
        backend.fail_status.store(true, Ordering::SeqCst);

        let outcome = coord.send_commands(&arm(), None).await.unwrap();

        assert_eq!(outcome.result, json!(true));
        assert!(matches!(outcome.follow_up, FollowUp::RefreshFailed(_)));
        assert!(coord.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn send_failure_propagates_without_verifying() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);
        backend.fail_send.store(true, Ordering::SeqCst);

        let err = coord
            .send_commands(&arm(), Some(&expect_armed()))
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Api { code: Some(2009), .. }));
        assert_eq!(backend.status_calls(), 0);
        assert!(coord.snapshot().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_scheduled_refresh_keeps_snapshot_and_marks_unavailable() {
        let backend = FakeBackend::scripted(&["armed"]);
        let coord = coordinator(&backend);
        let good = coord.refresh().await.unwrap();
        assert!(coord.is_available());

        backend.fail_status.store(true, Ordering::SeqCst);
        let err = coord.refresh().await.unwrap_err();

        assert!(matches!(err, CoreError::UpdateFailed { .. }));
        assert!(!coord.is_available());
        assert!(Arc::ptr_eq(&coord.snapshot().unwrap(), &good));
    }

    #[tokio::test(start_paused = true)]
    async fn start_polls_until_stopped() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);

        coord.start().await.unwrap();
        assert_eq!(backend.status_calls(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(backend.status_calls(), 3);

        coord.stop().await;
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(backend.status_calls(), 3);
        assert!(matches!(coord.refresh().await, Err(CoreError::Stopped)));
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_coordinator_makes_no_cloud_calls() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);
        coord.stop().await;

        assert!(matches!(coord.refresh_now().await, Err(CoreError::Stopped)));
        assert!(matches!(
            coord.send_commands(&arm(), None).await,
            Err(CoreError::Stopped)
        ));
        assert_eq!(backend.status_calls(), 0);
        assert!(backend.sent.lock().unwrap().is_empty());
        assert!(coord.last_update().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn publishing_records_the_update_time() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);
        assert!(coord.last_update().is_none());

        coord.refresh_now().await.unwrap();
        assert!(coord.last_update().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_a_running_verify() {
        let backend = FakeBackend::scripted(&["disarmed"]);
        let coord = coordinator(&backend);

        let task = {
            let coord = coord.clone();
            tokio::spawn(async move {
                let commands = arm();
                let expected = expect_armed();
                coord.send_commands(&commands, Some(&expected)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(coord.is_verifying());

        coord.stop().await;
        let outcome = task.await.unwrap().unwrap();

        assert!(matches!(outcome.follow_up, FollowUp::Cancelled));
        assert!(!coord.is_verifying());
        assert!(coord.snapshot().is_none());
    }
}
