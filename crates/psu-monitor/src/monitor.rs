//! Periodic measurement scheduler
//!
//! One spawned task drives a fixed-period tick: probe connectivity, read
//! the three telemetry values through the device switch, feed the
//! protection machine, fan results out to subscribers. The device handle
//! is an async mutex shared with user-triggered actions, so applying
//! connection settings or flipping the backend can never interleave with
//! a tick in flight.
//!
//! Errors inside a tick never escape it: a failed read zeroes that tick's
//! values and the loop carries on. A protection trip is state, not an
//! error, and is delivered through its own subscriber channel.
//!
//! Subscriber callbacks run on the scheduler task; they must return
//! promptly and must not block on the device handle.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use psu_device::{DeviceError, DeviceSwitch, PowerSupply};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::protection::{Protection, ProtectionConfig, ProtectionState, TripReason};
use crate::subscribers::{Registry, SubscriptionId};

/// Measurement fan-out callback: `(voltage, current, power)`
pub type MeasurementCallback = dyn Fn(f64, f64, f64) + Send + Sync;
/// Protection trip callback
pub type ProtectionCallback = dyn Fn(TripReason) + Send + Sync;
/// Limit change callback: `(ovp_limit, ocp_limit)`
pub type LimitsCallback = dyn Fn(f64, f64) + Send + Sync;
/// Connection status callback
pub type ConnectionCallback = dyn Fn(bool) + Send + Sync;

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Tick period
    pub period: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1000),
        }
    }
}

/// One protection channel's enable and limit, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitSetting {
    /// Whether the channel is armed
    pub enabled: bool,
    /// The limit value
    pub limit: f64,
}

enum MonitorCommand {
    Shutdown,
}

struct Shared {
    protection: Mutex<Protection>,
    measurement_subs: Mutex<Registry<MeasurementCallback>>,
    protection_subs: Mutex<Registry<ProtectionCallback>>,
    limit_subs: Mutex<Registry<LimitsCallback>>,
    connection_subs: Mutex<Registry<ConnectionCallback>>,
}

/// A poisoned registry or protection lock only means a subscriber
/// panicked under it; the data is still coherent, so keep going.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The measurement scheduler
pub struct Monitor {
    device: Arc<tokio::sync::Mutex<DeviceSwitch>>,
    shared: Arc<Shared>,
    period: Duration,
    running: Option<(mpsc::Sender<MonitorCommand>, JoinHandle<()>)>,
}

impl Monitor {
    /// Create a scheduler over the device handle
    ///
    /// Protection configuration is injected here; there are no
    /// process-wide defaults.
    pub fn new(
        device: Arc<tokio::sync::Mutex<DeviceSwitch>>,
        config: MonitorConfig,
        protection: ProtectionConfig,
    ) -> Self {
        Self {
            device,
            shared: Arc::new(Shared {
                protection: Mutex::new(Protection::new(protection)),
                measurement_subs: Mutex::new(Registry::new()),
                protection_subs: Mutex::new(Registry::new()),
                limit_subs: Mutex::new(Registry::new()),
                connection_subs: Mutex::new(Registry::new()),
            }),
            period: config.period,
            running: None,
        }
    }

    /// The shared device handle, for user-triggered actions
    ///
    /// Locking it excludes the tick, so reconfiguration is race-free.
    pub fn device(&self) -> Arc<tokio::sync::Mutex<DeviceSwitch>> {
        Arc::clone(&self.device)
    }

    /// Whether the tick task is running
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Start the tick task; a no-op when already running
    pub fn start(&mut self) {
        if self.running.is_some() {
            return;
        }
        let (cmd_tx, cmd_rx) = mpsc::channel(4);
        let handle = tokio::spawn(run_monitor(
            Arc::clone(&self.device),
            Arc::clone(&self.shared),
            self.period,
            cmd_rx,
        ));
        self.running = Some((cmd_tx, handle));
    }

    /// Stop the tick task; a no-op when not running
    ///
    /// When this returns, no tick is in flight and none will fire again
    /// until the next `start`.
    pub async fn stop(&mut self) {
        if let Some((cmd_tx, handle)) = self.running.take() {
            let _ = cmd_tx.send(MonitorCommand::Shutdown).await;
            let _ = handle.await;
            info!("measurement loop stopped");
        }
    }

    /// Subscribe to per-tick measurements
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(f64, f64, f64) + Send + Sync + 'static,
    {
        lock(&self.shared.measurement_subs).subscribe(Arc::new(callback))
    }

    /// Drop a measurement subscription
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        lock(&self.shared.measurement_subs).unsubscribe(id)
    }

    /// Subscribe to protection trips
    pub fn subscribe_protection<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(TripReason) + Send + Sync + 'static,
    {
        lock(&self.shared.protection_subs).subscribe(Arc::new(callback))
    }

    /// Drop a protection subscription
    pub fn unsubscribe_protection(&self, id: SubscriptionId) -> bool {
        lock(&self.shared.protection_subs).unsubscribe(id)
    }

    /// Subscribe to OVP/OCP limit changes
    pub fn subscribe_limits<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(f64, f64) + Send + Sync + 'static,
    {
        lock(&self.shared.limit_subs).subscribe(Arc::new(callback))
    }

    /// Drop a limit-change subscription
    pub fn unsubscribe_limits(&self, id: SubscriptionId) -> bool {
        lock(&self.shared.limit_subs).unsubscribe(id)
    }

    /// Subscribe to connection status edges
    pub fn subscribe_connection_status<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        lock(&self.shared.connection_subs).subscribe(Arc::new(callback))
    }

    /// Drop a connection status subscription
    pub fn unsubscribe_connection_status(&self, id: SubscriptionId) -> bool {
        lock(&self.shared.connection_subs).unsubscribe(id)
    }

    /// Current OVP setting
    pub fn get_ovp(&self) -> LimitSetting {
        let protection = lock(&self.shared.protection);
        LimitSetting {
            enabled: protection.config().ovp_enabled,
            limit: protection.config().ovp_limit,
        }
    }

    /// Current OCP setting
    pub fn get_ocp(&self) -> LimitSetting {
        let protection = lock(&self.shared.protection);
        LimitSetting {
            enabled: protection.config().ocp_enabled,
            limit: protection.config().ocp_limit,
        }
    }

    /// Update the OVP setting and notify limit subscribers
    ///
    /// Takes effect on the next tick; an existing trip is not re-evaluated.
    pub fn set_ovp(&self, enabled: bool, limit: f64) {
        let (ovp, ocp) = {
            let mut protection = lock(&self.shared.protection);
            protection.set_ovp(enabled, limit);
            protection.limits()
        };
        notify_limits(&self.shared, ovp, ocp);
    }

    /// Update the OCP setting and notify limit subscribers
    pub fn set_ocp(&self, enabled: bool, limit: f64) {
        let (ovp, ocp) = {
            let mut protection = lock(&self.shared.protection);
            protection.set_ocp(enabled, limit);
            protection.limits()
        };
        notify_limits(&self.shared, ovp, ocp);
    }

    /// Clear a latched trip; a no-op when already safe
    pub fn reset_protection(&self) {
        lock(&self.shared.protection).reset();
    }

    /// Current protection state
    pub fn protection_state(&self) -> ProtectionState {
        lock(&self.shared.protection).state()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        // Dropping the command channel ends the loop after any tick in
        // flight; nothing to wait for here.
        self.running.take();
    }
}

async fn run_monitor(
    device: Arc<tokio::sync::Mutex<DeviceSwitch>>,
    shared: Arc<Shared>,
    period: Duration,
    mut cmd_rx: mpsc::Receiver<MonitorCommand>,
) {
    info!("measurement loop started ({} ms period)", period.as_millis());
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_connected: Option<bool> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => match cmd {
                Some(MonitorCommand::Shutdown) | None => {
                    debug!("measurement loop shutting down");
                    break;
                }
            },
            _ = ticker.tick() => {
                tick(&device, &shared, &mut last_connected).await;
            }
        }
    }
}

/// One scheduler tick, run to completion before the next is considered
async fn tick(
    device: &tokio::sync::Mutex<DeviceSwitch>,
    shared: &Shared,
    last_connected: &mut Option<bool>,
) {
    // Exclusive guard for the whole tick: backend swaps and reconnects
    // queue up behind it instead of interleaving.
    let mut dev = device.lock().await;

    let connected = dev.is_connected().await;
    if *last_connected != Some(connected) {
        *last_connected = Some(connected);
        notify_connection(shared, connected);
    }

    let (voltage, current, power) = if connected {
        match read_all(&mut dev).await {
            Ok(values) => values,
            Err(e) => {
                // Fail-safe, not fail-fatal: zero this tick, poll again next
                warn!("measurement failed: {e}");
                (0.0, 0.0, 0.0)
            }
        }
    } else {
        (0.0, 0.0, 0.0)
    };

    let tripped = lock(&shared.protection).evaluate(voltage, current);
    if let Some(reason) = tripped {
        warn!("protection tripped: {reason} (V={voltage:.3}, I={current:.3})");
        // The latch stands even if the output refuses to turn off; the
        // system must not look safe while actually over limit.
        if let Err(e) = dev.set_output(false).await {
            error!("could not disable output after {reason} trip: {e}");
        }
    }
    drop(dev);

    if let Some(reason) = tripped {
        notify_protection(shared, reason);
    }
    notify_measurements(shared, voltage, current, power);
}

async fn read_all(dev: &mut DeviceSwitch) -> Result<(f64, f64, f64), DeviceError> {
    let voltage = dev.read_voltage().await?;
    let current = dev.read_current().await?;
    let power = dev.read_power().await?;
    Ok((voltage, current, power))
}

fn notify_measurements(shared: &Shared, voltage: f64, current: f64, power: f64) {
    for cb in lock(&shared.measurement_subs).snapshot() {
        if catch_unwind(AssertUnwindSafe(|| cb(voltage, current, power))).is_err() {
            warn!("measurement subscriber panicked; skipping");
        }
    }
}

fn notify_protection(shared: &Shared, reason: TripReason) {
    for cb in lock(&shared.protection_subs).snapshot() {
        if catch_unwind(AssertUnwindSafe(|| cb(reason))).is_err() {
            warn!("protection subscriber panicked; skipping");
        }
    }
}

fn notify_limits(shared: &Shared, ovp_limit: f64, ocp_limit: f64) {
    for cb in lock(&shared.limit_subs).snapshot() {
        if catch_unwind(AssertUnwindSafe(|| cb(ovp_limit, ocp_limit))).is_err() {
            warn!("limit subscriber panicked; skipping");
        }
    }
}

fn notify_connection(shared: &Shared, connected: bool) {
    for cb in lock(&shared.connection_subs).snapshot() {
        if catch_unwind(AssertUnwindSafe(|| cb(connected))).is_err() {
            warn!("connection subscriber panicked; skipping");
        }
    }
}
