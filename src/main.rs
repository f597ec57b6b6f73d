//! Clinic sensor node: main entry point.
//!
//! Hexagonal architecture with a single cooperative tick loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BoardAdapter      LogEventSink   NvsAdapter   Esp32Time       │
//! │  (Sensor+Button    (EventSink)    (Config+     (TimePort)      │
//! │   +LED+Reset)                      Storage)                    │
//! │  WifiAdapter       MqttAdapter    PortalAdapter ActivationAdapter
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ModeController (pure logic)               │    │
//! │  │  Provisioning · Operational · Sampler · Reset button   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::{Ets, FreeRtos};
use esp_idf_svc::hal::gpio::{PinDriver, Pull};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use clinicnode::adapters::activation::ActivationAdapter;
use clinicnode::adapters::device_id;
use clinicnode::adapters::hardware::BoardAdapter;
use clinicnode::adapters::log_sink::LogEventSink;
use clinicnode::adapters::mqtt::MqttAdapter;
use clinicnode::adapters::nvs::NvsAdapter;
use clinicnode::adapters::portal::PortalAdapter;
use clinicnode::adapters::time::Esp32TimeAdapter;
use clinicnode::adapters::wifi::WifiAdapter;
use clinicnode::app::controller::ModeController;
use clinicnode::app::ports::{ConfigError, ConfigPort};
use clinicnode::config::NodeConfig;
use clinicnode::connectivity::ConnectivityManager;
use clinicnode::drivers::hw_init::OneshotAdc;
use clinicnode::drivers::status_led::StatusLed;
use clinicnode::identity;
use clinicnode::pins;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  clinicnode v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config and identity from NVS ──────────────────
    let mut nvs = NvsAdapter::new()?;
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(ConfigError::NotFound) => {
            // First boot: seed the blob with the build-time defaults.
            let cfg = NodeConfig::default();
            if let Err(e) = nvs.save(&cfg) {
                warn!("Config: could not persist defaults ({})", e);
            }
            cfg
        }
        Err(e) => {
            warn!("NVS config rejected ({}), using defaults", e);
            NodeConfig::default()
        }
    };
    info!(
        "Config: broker={} user='{}' password={} backend={}",
        config.broker_url(),
        config.broker_username,
        config.masked_broker_password(),
        config.activation_url()
    );

    let stored = identity::load(&nvs, config.default_sensor_type).unwrap_or_else(|e| {
        warn!("Identity load failed ({}), treating as unprovisioned", e);
        None
    });

    // ── 3. Board peripherals ──────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut dht_pin = PinDriver::input_output_od(peripherals.pins.gpio4)?;
    dht_pin.set_pull(Pull::Up)?;
    dht_pin.set_high()?;
    let pir_pin = PinDriver::input(peripherals.pins.gpio15)?;
    let mut button_pin = PinDriver::input(peripherals.pins.gpio0)?;
    button_pin.set_pull(Pull::Up)?;
    let led_pin = PinDriver::output(peripherals.pins.gpio2)?;
    info!(
        "Pins: dht={} pir={} button={} led={} gas=adc1/ch{} (gpio{})",
        pins::DHT22_GPIO,
        pins::PIR_GPIO,
        pins::RESET_BUTTON_GPIO,
        pins::STATUS_LED_GPIO,
        pins::MQ4_ADC_CHANNEL,
        pins::MQ4_ADC_GPIO
    );

    let mut board = BoardAdapter::new(
        dht_pin,
        Ets,
        OneshotAdc::new(pins::MQ4_ADC_CHANNEL)?,
        pir_pin,
        button_pin,
        StatusLed::new(led_pin),
    );

    // ── 4. Network adapters ───────────────────────────────────
    let esp_wifi = EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs_partition))?;
    let wifi = WifiAdapter::new(BlockingWifi::wrap(esp_wifi, sysloop)?);
    let mqtt = MqttAdapter::new(&config.broker_url());
    let links = ConnectivityManager::new(wifi, mqtt, &config);

    let activation = ActivationAdapter::new(&config.activation_url(), config.http_timeout_ms);
    let portal = PortalAdapter::new();

    let mut clock = Esp32TimeAdapter::new();
    clock.start_sntp(&config.ntp_server)?;

    let mac = device_id::read_mac();
    let ap_ssid = device_id::access_point_ssid(&config.ap_ssid_prefix, &mac);
    info!("Device MAC: {}", device_id::mac_hex(&mac));

    // ── 5. Controller ─────────────────────────────────────────
    let tick_ms = config.tick_interval_ms;
    let mut sink = LogEventSink::new();
    let mut controller = ModeController::new(config, links, activation, portal, clock, &ap_ssid);
    let mode = controller.boot(stored, &mut board, &mut nvs, &mut sink);
    info!("Boot complete: {:?}", mode);

    // ── 6. Tick loop ──────────────────────────────────────────
    loop {
        controller.tick(&mut board, &mut nvs, &mut sink);
        FreeRtos::delay_ms(tick_ms);
    }
}
