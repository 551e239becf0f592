//! Device session manager: scanning, connection slots, notification pumps
//! and the ERG control link.

use crate::devices::simulation;
use crate::devices::types::{
    ConnectionSlot, DeviceError, DeviceKind, TelemetryEvent, TrainerControl,
};
use crate::telemetry::gatt::{
    self, build_request_control, build_set_target_power, build_start_or_resume,
    CYCLING_POWER_MEASUREMENT_UUID, CYCLING_POWER_SERVICE_UUID, FTMS_CONTROL_POINT_UUID,
    FTMS_SERVICE_UUID, HEART_RATE_MEASUREMENT_UUID, HEART_RATE_SERVICE_UUID,
    INDOOR_BIKE_DATA_UUID,
};
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use crossbeam::channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

const SIMULATED_DEVICE_NAME: &str = "Simulated Bike";

/// Handle to the trainer's FTMS control point, shared with the workout
/// engine as its [`TrainerControl`] sink.
///
/// Writes are queued on the runtime and never block or fail the caller; a
/// failed write is logged and the ride carries on. Simulated rides ignore
/// target power entirely so the random walk stays visibly alive.
pub struct TrainerLink {
    control: Mutex<Option<(Peripheral, Characteristic)>>,
    simulating: AtomicBool,
    runtime: tokio::runtime::Handle,
}

impl TrainerLink {
    fn new(runtime: tokio::runtime::Handle) -> Self {
        Self {
            control: Mutex::new(None),
            simulating: AtomicBool::new(false),
            runtime,
        }
    }

    fn attach(&self, peripheral: Peripheral, control_point: Characteristic) {
        if let Ok(mut guard) = self.control.lock() {
            *guard = Some((peripheral, control_point));
        }
    }

    fn detach(&self) {
        if let Ok(mut guard) = self.control.lock() {
            *guard = None;
        }
    }

    fn set_simulating(&self, on: bool) {
        self.simulating.store(on, Ordering::Relaxed);
    }

    /// Whether an FTMS control point is currently attached.
    pub fn is_attached(&self) -> bool {
        self.control.lock().map(|g| g.is_some()).unwrap_or(false)
    }
}

impl TrainerControl for TrainerLink {
    fn set_target_power(&self, watts: i16) {
        if self.simulating.load(Ordering::Relaxed) {
            tracing::debug!("Simulated ride, ignoring target power {}W", watts);
            return;
        }

        let target = match self.control.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };

        let Some((peripheral, control_point)) = target else {
            tracing::debug!("No control point attached, dropping target power {}W", watts);
            return;
        };

        let cmd = build_set_target_power(watts);
        self.runtime.spawn(async move {
            match peripheral
                .write(&control_point, &cmd, WriteType::WithResponse)
                .await
            {
                Ok(()) => tracing::debug!("Set target power to {}W", watts),
                Err(e) => tracing::warn!("Target power write failed: {}", e),
            }
        });
    }
}

/// Manages the bike and heart-rate connection slots, telemetry streaming and
/// the simulated ride source.
pub struct DeviceSessionManager {
    /// BLE adapter, populated by `initialize`
    adapter: Option<Adapter>,
    /// Channel into the engine's telemetry cell
    event_tx: Sender<TelemetryEvent>,
    /// Trainer/power-meter slot
    bike_slot: Arc<Mutex<ConnectionSlot>>,
    /// Heart-rate monitor slot
    heart_rate_slot: Arc<Mutex<ConnectionSlot>>,
    /// ERG control link shared with the workout engine
    trainer: Arc<TrainerLink>,
    /// Connected peripherals, kept for disconnect
    bike_peripheral: Option<Peripheral>,
    heart_rate_peripheral: Option<Peripheral>,
    /// Whether the next bike connection should be simulated
    simulate: bool,
    /// Running simulation generator task
    sim_task: Option<JoinHandle<()>>,
    /// Scan timeout
    scan_timeout: Duration,
}

impl DeviceSessionManager {
    /// Create a new manager. Must be called within a tokio runtime; ERG
    /// writes are spawned onto the current runtime handle.
    pub fn new(event_tx: Sender<TelemetryEvent>) -> Self {
        Self {
            adapter: None,
            event_tx,
            bike_slot: Arc::new(Mutex::new(ConnectionSlot::default())),
            heart_rate_slot: Arc::new(Mutex::new(ConnectionSlot::default())),
            trainer: Arc::new(TrainerLink::new(tokio::runtime::Handle::current())),
            bike_peripheral: None,
            heart_rate_peripheral: None,
            simulate: false,
            sim_task: None,
            scan_timeout: Duration::from_secs(15),
        }
    }

    /// Initialize the BLE adapter.
    ///
    /// Not needed for simulated rides.
    pub async fn initialize(&mut self) -> Result<(), DeviceError> {
        tracing::info!("Initializing device session manager");

        let manager = Manager::new()
            .await
            .map_err(|e| DeviceError::BleError(e.to_string()))?;

        let adapters = manager
            .adapters()
            .await
            .map_err(|e| DeviceError::BleError(e.to_string()))?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(DeviceError::AdapterNotFound)?;

        tracing::info!("BLE adapter initialized");
        self.adapter = Some(adapter);

        Ok(())
    }

    /// The ERG control sink for the workout engine.
    pub fn trainer_control(&self) -> Arc<dyn TrainerControl> {
        self.trainer.clone()
    }

    /// Set how long `connect_bike`/`connect_heart_rate` scan before giving
    /// up. Takes effect on the next discovery.
    pub fn set_discovery_timeout(&mut self, timeout: Duration) {
        self.scan_timeout = timeout;
    }

    /// Flip simulation mode. Takes effect on the next `connect_bike`.
    pub fn toggle_simulation(&mut self) -> bool {
        self.simulate = !self.simulate;
        tracing::info!("Simulation mode: {}", self.simulate);
        self.simulate
    }

    /// Snapshot of the bike slot.
    pub fn bike_slot(&self) -> ConnectionSlot {
        self.bike_slot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the heart-rate slot.
    pub fn heart_rate_slot(&self) -> ConnectionSlot {
        self.heart_rate_slot
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Connect the bike slot: a real FTMS/cycling-power peripheral, or the
    /// synthetic generator when simulation mode is on.
    pub async fn connect_bike(&mut self) -> Result<(), DeviceError> {
        if self.simulate {
            return self.connect_simulated();
        }

        let peripheral = self
            .discover_peripheral(
                &[FTMS_SERVICE_UUID, CYCLING_POWER_SERVICE_UUID],
                DeviceKind::Bike,
            )
            .await?;

        let name = Self::peripheral_name(&peripheral).await;
        tracing::info!("Connecting to bike: {}", name);

        peripheral
            .connect()
            .await
            .map_err(|e| DeviceError::ConnectionFailed(e.to_string()))?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| DeviceError::ConnectionFailed(e.to_string()))?;

        let services = peripheral.services();
        let has_required = services
            .iter()
            .any(|s| s.uuid == FTMS_SERVICE_UUID || s.uuid == CYCLING_POWER_SERVICE_UUID);
        if !has_required {
            let _ = peripheral.disconnect().await;
            return Err(DeviceError::ServiceNotFound(name));
        }

        // Data characteristics are optional: a power-only meter has no
        // indoor bike data and that is fine.
        Self::subscribe_optional(&peripheral, CYCLING_POWER_MEASUREMENT_UUID).await;
        Self::subscribe_optional(&peripheral, INDOOR_BIKE_DATA_UUID).await;

        self.setup_ftms_control(&peripheral).await;

        // Some trainers expose heart rate on the same peripheral; take it
        // opportunistically so a separate strap is not required.
        if Self::subscribe_optional(&peripheral, HEART_RATE_MEASUREMENT_UUID).await {
            if let Ok(mut slot) = self.heart_rate_slot.lock() {
                slot.occupy(name.clone());
            }
        }

        if let Ok(mut slot) = self.bike_slot.lock() {
            slot.occupy(name.clone());
        }

        self.spawn_notification_pump(
            peripheral.clone(),
            self.bike_slot.clone(),
            Some(self.trainer.clone()),
        );
        self.bike_peripheral = Some(peripheral);

        tracing::info!("Bike connected: {}", name);
        Ok(())
    }

    /// Connect a dedicated heart-rate monitor. Independent of the bike slot.
    pub async fn connect_heart_rate(&mut self) -> Result<(), DeviceError> {
        let peripheral = self
            .discover_peripheral(&[HEART_RATE_SERVICE_UUID], DeviceKind::HeartRate)
            .await?;

        let name = Self::peripheral_name(&peripheral).await;
        tracing::info!("Connecting to heart rate monitor: {}", name);

        peripheral
            .connect()
            .await
            .map_err(|e| DeviceError::ConnectionFailed(e.to_string()))?;

        peripheral
            .discover_services()
            .await
            .map_err(|e| DeviceError::ConnectionFailed(e.to_string()))?;

        let has_service = peripheral
            .services()
            .iter()
            .any(|s| s.uuid == HEART_RATE_SERVICE_UUID);
        if !has_service {
            let _ = peripheral.disconnect().await;
            return Err(DeviceError::ServiceNotFound(name));
        }

        let measurement = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == HEART_RATE_MEASUREMENT_UUID)
            .ok_or_else(|| DeviceError::ServiceNotFound(name.clone()))?;

        peripheral
            .subscribe(&measurement)
            .await
            .map_err(|e| DeviceError::SubscriptionFailed(e.to_string()))?;

        if let Ok(mut slot) = self.heart_rate_slot.lock() {
            slot.occupy(name.clone());
        }

        self.spawn_notification_pump(peripheral.clone(), self.heart_rate_slot.clone(), None);
        self.heart_rate_peripheral = Some(peripheral);

        tracing::info!("Heart rate monitor connected: {}", name);
        Ok(())
    }

    /// Disconnect everything: the simulator, both peripherals, both slots.
    /// Ends with a telemetry reset so stale values do not linger.
    pub async fn disconnect(&mut self) {
        tracing::info!("Disconnecting all devices");

        if let Some(task) = self.sim_task.take() {
            task.abort();
        }

        if let Some(peripheral) = self.bike_peripheral.take() {
            if let Err(e) = peripheral.disconnect().await {
                tracing::warn!("Bike disconnect failed: {}", e);
            }
        }
        if let Some(peripheral) = self.heart_rate_peripheral.take() {
            if let Err(e) = peripheral.disconnect().await {
                tracing::warn!("Heart rate disconnect failed: {}", e);
            }
        }

        self.trainer.detach();
        self.trainer.set_simulating(false);

        if let Ok(mut slot) = self.bike_slot.lock() {
            slot.clear();
        }
        if let Ok(mut slot) = self.heart_rate_slot.lock() {
            slot.clear();
        }

        let _ = self.event_tx.send(TelemetryEvent::Reset);
    }

    fn connect_simulated(&mut self) -> Result<(), DeviceError> {
        // A new simulated connection replaces any running generator.
        if let Some(task) = self.sim_task.take() {
            task.abort();
        }

        self.trainer.set_simulating(true);
        self.sim_task = Some(simulation::spawn_generator(self.event_tx.clone()));

        if let Ok(mut slot) = self.bike_slot.lock() {
            slot.occupy(SIMULATED_DEVICE_NAME.to_string());
        }
        if let Ok(mut slot) = self.heart_rate_slot.lock() {
            slot.occupy(SIMULATED_DEVICE_NAME.to_string());
        }

        tracing::info!("Simulated bike connected");
        Ok(())
    }

    /// FTMS control handshake: request control, then start-or-resume. The
    /// trainer will not honor target power until both are acknowledged, but
    /// a failed handshake only downgrades the connection to read-only.
    async fn setup_ftms_control(&self, peripheral: &Peripheral) {
        let Some(control_point) = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == FTMS_CONTROL_POINT_UUID)
        else {
            tracing::info!("No FTMS control point, ERG control unavailable");
            return;
        };

        Self::subscribe_optional(peripheral, FTMS_CONTROL_POINT_UUID).await;

        for cmd in [build_request_control(), build_start_or_resume()] {
            if let Err(e) = peripheral
                .write(&control_point, &cmd, WriteType::WithResponse)
                .await
            {
                tracing::warn!("FTMS handshake write failed: {}", e);
                return;
            }
        }

        self.trainer.attach(peripheral.clone(), control_point);
        tracing::info!("FTMS control established");
    }

    async fn subscribe_optional(peripheral: &Peripheral, uuid: Uuid) -> bool {
        let Some(characteristic) = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == uuid)
        else {
            return false;
        };

        match peripheral.subscribe(&characteristic).await {
            Ok(()) => {
                tracing::debug!("Subscribed to characteristic: {}", uuid);
                true
            }
            Err(e) => {
                tracing::warn!("Subscription to {} failed: {}", uuid, e);
                false
            }
        }
    }

    /// Scan until a peripheral advertising one of `services` shows up, or
    /// the timeout elapses.
    async fn discover_peripheral(
        &self,
        services: &[Uuid],
        kind: DeviceKind,
    ) -> Result<Peripheral, DeviceError> {
        let adapter = self.adapter.as_ref().ok_or(DeviceError::AdapterNotFound)?;

        adapter
            .start_scan(ScanFilter {
                services: services.to_vec(),
            })
            .await
            .map_err(|e| DeviceError::ScanFailed(e.to_string()))?;

        tracing::info!("Scanning for {} device", kind);

        let found = tokio::time::timeout(
            self.scan_timeout,
            Self::first_matching(adapter, services),
        )
        .await;

        if let Err(e) = adapter.stop_scan().await {
            tracing::warn!("Failed to stop scan: {}", e);
        }

        match found {
            Ok(Some(peripheral)) => Ok(peripheral),
            _ => Err(DeviceError::DeviceNotFound(kind)),
        }
    }

    async fn first_matching(adapter: &Adapter, services: &[Uuid]) -> Option<Peripheral> {
        use futures::stream::StreamExt;

        let mut events = match adapter.events().await {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Failed to get adapter events: {}", e);
                return None;
            }
        };

        while let Some(event) = events.next().await {
            if let CentralEvent::DeviceDiscovered(id) = event {
                let peripherals = adapter.peripherals().await.ok()?;
                for peripheral in peripherals {
                    if peripheral.id() != id {
                        continue;
                    }
                    if let Ok(Some(props)) = peripheral.properties().await {
                        if services.iter().any(|s| props.services.contains(s)) {
                            return Some(peripheral);
                        }
                    }
                }
            }
        }

        None
    }

    async fn peripheral_name(peripheral: &Peripheral) -> String {
        peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|p| p.local_name)
            .unwrap_or_else(|| "Unknown Device".to_string())
    }

    /// Decode notifications into telemetry events until the stream ends.
    /// Stream end means the peripheral went away: the slot is cleared, any
    /// control link through that peripheral is detached so ERG writes stop,
    /// and telemetry is reset so stale values do not linger.
    fn spawn_notification_pump(
        &self,
        peripheral: Peripheral,
        slot: Arc<Mutex<ConnectionSlot>>,
        trainer: Option<Arc<TrainerLink>>,
    ) {
        let tx = self.event_tx.clone();

        tokio::spawn(async move {
            use futures::stream::StreamExt;

            let mut notifications = match peripheral.notifications().await {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::error!("Failed to get notification stream: {}", e);
                    return;
                }
            };

            while let Some(notification) = notifications.next().await {
                let data = notification.value;

                let events: Vec<TelemetryEvent> = if notification.uuid
                    == CYCLING_POWER_MEASUREMENT_UUID
                {
                    gatt::parse_cycling_power(&data)
                        .map(|m| vec![TelemetryEvent::Power(m.power_watts)])
                        .unwrap_or_default()
                } else if notification.uuid == INDOOR_BIKE_DATA_UUID {
                    gatt::parse_indoor_bike_data(&data)
                        .map(|m| {
                            let mut events = Vec::new();
                            if let Some(watts) = m.power_watts {
                                events.push(TelemetryEvent::Power(watts));
                            }
                            if let Some(rpm) = m.cadence_rpm {
                                events.push(TelemetryEvent::Cadence(rpm));
                            }
                            events
                        })
                        .unwrap_or_default()
                } else if notification.uuid == HEART_RATE_MEASUREMENT_UUID {
                    gatt::parse_heart_rate(&data)
                        .map(|m| vec![TelemetryEvent::HeartRate(m.heart_rate_bpm)])
                        .unwrap_or_default()
                } else if notification.uuid == FTMS_CONTROL_POINT_UUID {
                    match gatt::parse_control_response(&data) {
                        Some(resp) => {
                            tracing::debug!(
                                "Control point response: opcode {:#04x} -> {:?}",
                                resp.request_opcode,
                                resp.result
                            );
                        }
                        None => tracing::debug!("Unrecognized control point indication"),
                    }
                    Vec::new()
                } else {
                    Vec::new()
                };

                for event in events {
                    if tx.send(event).is_err() {
                        return;
                    }
                }
            }

            tracing::info!("Notification stream ended, clearing slot");
            Self::pump_stream_ended(&slot, trainer.as_deref(), &tx);
        });
    }

    /// Teardown when a peripheral drops out from its own side.
    fn pump_stream_ended(
        slot: &Mutex<ConnectionSlot>,
        trainer: Option<&TrainerLink>,
        tx: &Sender<TelemetryEvent>,
    ) {
        if let Ok(mut slot) = slot.lock() {
            slot.clear();
        }
        if let Some(trainer) = trainer {
            trainer.detach();
        }
        let _ = tx.send(TelemetryEvent::Reset);
    }
}
