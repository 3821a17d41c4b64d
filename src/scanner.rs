use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use btleplug::api::BDAddr;
use futures::{future, Stream, StreamExt};
use stream_cancel::{Trigger, Valved};
use tokio::sync::broadcast::{self, Sender};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_stream::wrappers::BroadcastStream;

use crate::at::{parse_device_line, AtCommand};
use crate::device::{Device, DeviceEvent, DiscoveredDevice};
use crate::transport::AtPort;
use crate::Result;

#[cfg(unix)]
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
#[cfg(not(unix))]
pub const DEFAULT_PORT: &str = "COM3";

pub const DEFAULT_BAUD_RATE: u32 = 9600;

pub struct ScanConfig {
    /// Serial port the radio module is attached to.
    port: String,
    baud_rate: u32,
    /// How long the radio scans for advertisers.
    scan_duration: Duration,
    /// How long a device target scan listens for its advertisement.
    target_scan_duration: Duration,
    /// Extra time to wait for output after the radio's own scan time.
    response_grace: Duration,
    /// Whether to switch the module into dual role before scanning.
    dual_role: bool,
    /// Filters the found devices based on device address.
    address_filter: Option<Box<dyn Fn(BDAddr) -> bool + Send + Sync>>,
    /// Filters the found devices based on local name.
    name_filter: Option<Box<dyn Fn(&str) -> bool + Send + Sync>>,
    /// Maximum results before the scan is stopped.
    max_results: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_owned(),
            baud_rate: DEFAULT_BAUD_RATE,
            scan_duration: Duration::from_secs(3),
            target_scan_duration: Duration::from_secs(3),
            response_grace: Duration::from_secs(1),
            dual_role: true,
            address_filter: None,
            name_filter: None,
            max_results: None,
        }
    }
}

impl ScanConfig {
    /// Serial port of the radio module
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = port.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Scan for devices for the given duration
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Listen for a single device's advertisement for the given duration
    pub fn target_scan_duration(mut self, duration: Duration) -> Self {
        self.target_scan_duration = duration;
        self
    }

    /// Keep reading radio output this long after a scan should have ended
    pub fn response_grace(mut self, grace: Duration) -> Self {
        self.response_grace = grace;
        self
    }

    /// Send `AT+DUAL` before scanning
    pub fn dual_role(mut self, enabled: bool) -> Self {
        self.dual_role = enabled;
        self
    }

    /// Filter scanned devices based on the device address
    pub fn filter_by_address(
        mut self,
        func: impl Fn(BDAddr) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.address_filter = Some(Box::new(func));
        self
    }

    /// Filter scanned devices based on the device name
    pub fn filter_by_name(mut self, func: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.name_filter = Some(Box::new(func));
        self
    }

    /// Stop the scan after given number of matches
    pub fn stop_after_matches(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Stop the scan after the first match
    pub fn stop_after_first_match(self) -> Self {
        self.stop_after_matches(1)
    }

    /// Require that the scanned devices have a name
    pub fn require_name(self) -> Self {
        if self.name_filter.is_none() {
            self.filter_by_name(|name| !name.is_empty())
        } else {
            self
        }
    }
}

/// The radio shared by a scan and the devices it found.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) port: Arc<Mutex<AtPort>>,
    pub(crate) target_scan_duration: Duration,
    pub(crate) response_grace: Duration,
}

type LineStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// What travels over the scanner's channel. `Finished` follows the last
/// event of a scan, so subscribers drain every event before their stream ends.
#[derive(Debug, Clone)]
enum ScanEvent {
    Device(DeviceEvent),
    Finished,
}

pub struct Scanner {
    /// Radio opened by [`Scanner::start`], kept for later scans on the same port.
    radio: Option<(String, Arc<Mutex<AtPort>>)>,
    /// Set while a scan is reading radio output.
    scanning: Arc<AtomicBool>,
    listener: Option<JoinHandle<()>>,
    event_sender: Sender<ScanEvent>,
    scan_stopper: Option<Trigger>,
    device_stream_stoppers: Arc<RwLock<Vec<Trigger>>>,
}

impl Default for Scanner {
    fn default() -> Self {
        Scanner::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        let (event_sender, _) = broadcast::channel(64);

        Self {
            radio: None,
            scanning: Arc::new(AtomicBool::new(false)),
            listener: None,
            event_sender,
            scan_stopper: None,
            device_stream_stoppers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Open the configured serial port and start scanning for ble devices.
    ///
    /// The port stays open once the scan ends, and a later scan on the same
    /// port reuses it.
    pub async fn start(&mut self, config: ScanConfig) -> Result<()> {
        if self.is_scanning() {
            log::info!("Scanner is already started.");
            return Ok(());
        }

        let port = match &self.radio {
            Some((name, port)) if *name == config.port => port.clone(),
            _ => {
                let port = Arc::new(Mutex::new(AtPort::open(
                    &config.port,
                    config.baud_rate,
                )?));
                self.radio = Some((config.port.clone(), port.clone()));
                port
            }
        };

        self.begin(config, port).await
    }

    /// Start scanning for ble devices through an already opened radio.
    pub async fn start_with_port(&mut self, config: ScanConfig, port: AtPort) -> Result<()> {
        if self.is_scanning() {
            log::info!("Scanner is already started.");
            return Ok(());
        }

        self.radio = None;
        self.begin(config, Arc::new(Mutex::new(port))).await
    }

    async fn begin(&mut self, config: ScanConfig, port: Arc<Mutex<AtPort>>) -> Result<()> {
        let session = Arc::new(Session {
            port,
            target_scan_duration: config.target_scan_duration,
            response_grace: config.response_grace,
        });

        self.scanning.store(true, Ordering::SeqCst);
        let started = ScanContext::start(
            config,
            session,
            self.event_sender.clone(),
            self.scanning.clone(),
        )
        .await;

        match started {
            Ok((stopper, listener)) => {
                self.scan_stopper = Some(stopper);
                self.listener = Some(listener);
                Ok(())
            }
            Err(e) => {
                self.scanning.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Whether a scan is still reading radio output.
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// Stop scanning for ble devices. Every open stream ends immediately.
    pub async fn stop(&mut self) -> Result<()> {
        if self.is_scanning() {
            self.scan_stopper.take();
            if let Some(listener) = self.listener.take() {
                if let Err(e) = listener.await {
                    log::error!("Scan listener failed: {}", e);
                }
            }
        } else {
            log::info!("Scanner is already stopped");
        }

        self.device_stream_stoppers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        Ok(())
    }

    /// Create a new stream that receives ble device events.
    ///
    /// The stream ends after the last event of the running scan, or of the
    /// next one if none is running, or when [`Scanner::stop`] is called.
    pub fn device_event_stream(
        &mut self,
    ) -> Valved<Pin<Box<dyn Stream<Item = DeviceEvent> + Send>>> {
        let stream: Pin<Box<dyn Stream<Item = DeviceEvent> + Send>> =
            Box::pin(self.scan_events());

        let (trigger, stream) = Valved::new(stream);
        self.push_stopper(trigger);

        stream
    }

    /// Create a new stream that receives discovered ble devices.
    ///
    /// Ends the same way as [`Scanner::device_event_stream`].
    pub fn device_stream(&mut self) -> Valved<Pin<Box<dyn Stream<Item = Device> + Send>>> {
        let stream: Pin<Box<dyn Stream<Item = Device> + Send>> =
            Box::pin(self.scan_events().filter_map(|event| async move {
                match event {
                    DeviceEvent::Discovered(device) => Some(device),
                    DeviceEvent::Updated(_) => None,
                }
            }));

        let (trigger, stream) = Valved::new(stream);
        self.push_stopper(trigger);

        stream
    }

    fn scan_events(&self) -> impl Stream<Item = DeviceEvent> + Send + 'static {
        BroadcastStream::new(self.event_sender.subscribe())
            .filter_map(|x| async move {
                match x {
                    Ok(event) => Some(event),
                    Err(e) => {
                        log::warn!("Device stream fell behind: {}", e);
                        None
                    }
                }
            })
            .take_while(|event| future::ready(!matches!(event, ScanEvent::Finished)))
            .filter_map(|event| async move {
                match event {
                    ScanEvent::Device(event) => Some(event),
                    ScanEvent::Finished => None,
                }
            })
    }

    fn push_stopper(&self, trigger: Trigger) {
        self.device_stream_stoppers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(trigger);
    }
}

struct ScanContext {
    /// Number of matching devices found so far
    result_count: usize,
    /// Reference to the radio session
    session: Arc<Session>,
    /// Configurations for the scan, such as filters and stop conditions
    config: ScanConfig,
    /// Set of devices that have been filtered and will be ignored
    filtered: HashSet<BDAddr>,
    /// Set of devices that matched the filters
    matched: HashSet<BDAddr>,
    /// Channel for sending events to the client
    event_sender: Sender<ScanEvent>,
    /// Cleared once the scan has ended
    scanning: Arc<AtomicBool>,
}

impl ScanContext {
    async fn start(
        config: ScanConfig,
        session: Arc<Session>,
        sender: Sender<ScanEvent>,
        scanning: Arc<AtomicBool>,
    ) -> Result<(Trigger, JoinHandle<()>)> {
        let mut port = session.port.clone().lock_owned().await;

        log::info!("Starting the scan");

        if config.dual_role {
            port.send(&AtCommand::Dual).await?;
        }
        port.send(&AtCommand::gap_scan(config.scan_duration)).await?;

        let deadline = Instant::now() + config.scan_duration + config.response_grace;
        let (stopper, lines) = Valved::new(scan_output(port, deadline));

        let ctx = ScanContext {
            result_count: 0,
            session,
            config,
            filtered: HashSet::new(),
            matched: HashSet::new(),
            event_sender: sender,
            scanning,
        };

        let listener = tokio::spawn(async move {
            ctx.listen(lines).await;
        });

        Ok((stopper, listener))
    }

    async fn listen(mut self, mut lines: Valved<LineStream>) {
        while let Some(line) = lines.next().await {
            if let Some(device) = parse_device_line(&line) {
                self.on_device_seen(device);
            }

            let max_result_reached = self
                .config
                .max_results
                .filter(|max_results| self.result_count >= *max_results)
                .is_some();

            if max_result_reached {
                log::info!("Scanner stop condition reached.");
                break;
            }
        }

        // Hand the radio back before any stream observes the end of the scan.
        drop(lines);
        self.scanning.store(false, Ordering::SeqCst);
        self.event_sender.send(ScanEvent::Finished).ok();

        log::info!("Scanner was stopped.");
    }

    fn on_device_seen(&mut self, device: DiscoveredDevice) {
        log::trace!("Device seen: {:?}", device);

        if self.matched.contains(&device.address) {
            self.event_sender
                .send(ScanEvent::Device(DeviceEvent::Updated(Device::new(
                    self.session.clone(),
                    device,
                ))))
                .ok();
            return;
        }

        if self.filtered.contains(&device.address) {
            // The device has already been filtered.
            return;
        }

        match self.passes_filters(&device) {
            Some(true) => self.add_device(device),
            Some(false) => {
                self.filtered.insert(device.address);
            }
            None => {
                // No name yet; a later sighting may carry one.
            }
        }
    }

    fn add_device(&mut self, device: DiscoveredDevice) {
        self.filtered.insert(device.address);
        self.matched.insert(device.address);
        self.result_count += 1;

        log::info!("Found device: {}", device);

        let event = DeviceEvent::Discovered(Device::new(self.session.clone(), device));
        if let Err(e) = self.event_sender.send(ScanEvent::Device(event)) {
            log::debug!("No stream received the device: {}", e);
        }
    }

    /// Checks if the device passes all of the filters. `None` when a filter
    /// needs information the sighting did not carry.
    fn passes_filters(&self, device: &DiscoveredDevice) -> Option<bool> {
        if let Some(filter_by_addr) = self.config.address_filter.as_ref() {
            if !filter_by_addr(device.address) {
                return Some(false);
            }
        }

        match self.config.name_filter.as_ref() {
            Some(filter_by_name) => device.name.as_deref().map(|name| filter_by_name(name)),
            None => Some(true),
        }
    }
}

/// Lines the radio prints until `deadline`. The stream holds the radio
/// until it is dropped.
fn scan_output(port: OwnedMutexGuard<AtPort>, deadline: Instant) -> LineStream {
    Box::pin(futures::stream::unfold(port, move |mut port| async move {
        match port.read_line_until(deadline).await {
            Ok(Some(line)) => Some((line, port)),
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to read scan output: {}", e);
                None
            }
        }
    }))
}
