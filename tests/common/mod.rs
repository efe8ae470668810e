//! Shared fakes for monitor integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use connectivity_guard::config::schema::ServersConfig;
use connectivity_guard::dns::{AdapterError, DnsSwitch};
use connectivity_guard::failover::{FailoverSettings, RoutingState, Target, TransitionIntent};
use connectivity_guard::lifecycle::Shutdown;
use connectivity_guard::monitor::{Monitor, MonitorHandle, MonitorSettings, StatusSnapshot};
use connectivity_guard::notifier::{GuardEvent, NotificationQueue, NotificationWorker, Notifier, NotifierError};
use connectivity_guard::probe::{Probe, ProbeError};
use connectivity_guard::resilience::RetryPolicy;

/// Probe whose answer per target is flipped by the test.
pub struct ScriptedProbe {
    primary_up: AtomicBool,
    backup_up: AtomicBool,
    pub primary_calls: AtomicU32,
}

impl ScriptedProbe {
    pub fn new(primary_up: bool) -> Arc<Self> {
        Arc::new(Self {
            primary_up: AtomicBool::new(primary_up),
            backup_up: AtomicBool::new(true),
            primary_calls: AtomicU32::new(0),
        })
    }

    pub fn set_primary(&self, up: bool) {
        self.primary_up.store(up, Ordering::SeqCst);
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn check(&self, target: Target) -> Result<(), ProbeError> {
        let up = match target {
            Target::Primary => {
                self.primary_calls.fetch_add(1, Ordering::SeqCst);
                self.primary_up.load(Ordering::SeqCst)
            }
            Target::Backup => self.backup_up.load(Ordering::SeqCst),
        };
        if up {
            Ok(())
        } else {
            Err(ProbeError::Connect("connection refused".to_string()))
        }
    }
}

/// DNS switch that records every apply and can be told to fail or stall.
pub struct FakeDns {
    pub applied: Mutex<Vec<TransitionIntent>>,
    pub current: Mutex<Option<Target>>,
    fail: AtomicBool,
    apply_delay_ms: AtomicU64,
}

impl FakeDns {
    pub fn new(current: Option<Target>) -> Arc<Self> {
        Arc::new(Self {
            applied: Mutex::new(Vec::new()),
            current: Mutex::new(current),
            fail: AtomicBool::new(false),
            apply_delay_ms: AtomicU64::new(0),
        })
    }

    /// Make every apply take `delay` before it answers.
    pub fn set_apply_delay(&self, delay: Duration) {
        self.apply_delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn applied(&self) -> Vec<TransitionIntent> {
        self.applied.lock().unwrap().clone()
    }

    pub fn current(&self) -> Option<Target> {
        *self.current.lock().unwrap()
    }
}

#[async_trait]
impl DnsSwitch for FakeDns {
    async fn apply(&self, intent: &TransitionIntent) -> Result<(), AdapterError> {
        let delay = self.apply_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(AdapterError::Api("record update rejected".to_string()));
        }
        self.applied.lock().unwrap().push(intent.clone());
        *self.current.lock().unwrap() = Some(intent.to.target());
        Ok(())
    }

    async fn current_target(&self) -> Result<Option<Target>, AdapterError> {
        Ok(self.current())
    }
}

/// Notifier that keeps every event.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<GuardEvent>>,
}

impl RecordingNotifier {
    pub fn titles(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.title()).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, event: &GuardEvent) -> Result<(), NotifierError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Millisecond-scale settings so scenarios finish quickly.
pub fn fast_settings(max_retries: u32, auto_failback: bool) -> MonitorSettings {
    MonitorSettings {
        check_interval: Duration::from_millis(20),
        retry_policy: RetryPolicy::fixed(max_retries, Duration::from_millis(10)),
        failback_policy: RetryPolicy::fixed(max_retries, Duration::from_millis(20)),
        failover: FailoverSettings {
            cooldown: Duration::ZERO,
            switch_timeout: Duration::from_secs(5),
            auto_failback,
        },
        probe_timeout: Duration::from_millis(200),
        adapter_timeout: Duration::from_millis(500),
    }
}

pub fn servers() -> ServersConfig {
    ServersConfig {
        primary_address: "203.0.113.10".to_string(),
        backup_address: "203.0.113.20".to_string(),
    }
}

pub struct Harness {
    pub handle: MonitorHandle,
    pub shutdown: Shutdown,
    pub task: tokio::task::JoinHandle<connectivity_guard::GuardResult<()>>,
    pub worker: NotificationWorker,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn start(
        initial: RoutingState,
        settings: MonitorSettings,
        probe: Arc<ScriptedProbe>,
        dns: Arc<FakeDns>,
    ) -> Self {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, worker) = NotificationQueue::spawn(notifier.clone(), Duration::from_secs(1));
        let (monitor, handle) = Monitor::new(initial, settings, servers(), probe, dns, queue);
        let shutdown = Shutdown::new();
        let task = tokio::spawn(monitor.run(shutdown.subscribe()));
        Self {
            handle,
            shutdown,
            task,
            worker,
            notifier,
        }
    }

    /// Stop the monitor and wait for queued notifications.
    pub async fn stop(self) -> Arc<RecordingNotifier> {
        self.shutdown.trigger();
        self.task.await.unwrap().unwrap();
        drop(self.handle);
        self.worker.drain(Duration::from_secs(1)).await;
        self.notifier
    }
}

/// Wait until the published status satisfies `pred`.
pub async fn wait_for<F>(rx: &mut watch::Receiver<StatusSnapshot>, pred: F) -> StatusSnapshot
where
    F: Fn(&StatusSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if pred(&snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("status condition not reached in time")
}
