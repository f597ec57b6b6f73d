//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements          | Connects to                 |
//! |----------------|---------------------|-----------------------------|
//! | `activation`   | ActivationPort      | Backend HTTP endpoint       |
//! | `hardware`     | SensorPort          | DHT22, ESP32 ADC, PIR GPIO  |
//! |                | ButtonPort          | Reset button GPIO           |
//! |                | IndicatorPort       | Status LED GPIO             |
//! |                | SystemPort          | Chip reset                  |
//! | `log_sink`     | EventSink           | Serial log output           |
//! | `mqtt`         | MessagingPort       | ESP-IDF MQTT client         |
//! | `nvs`          | ConfigPort          | NVS / in-memory store       |
//! |                | StoragePort         |                             |
//! | `portal`       | ProvisioningSurface | ESP-IDF HTTP server         |
//! | `time`         | TimePort            | ESP32 system timer, SNTP    |
//! | `wifi`         | WifiPort            | ESP-IDF WiFi STA + AP       |

pub mod activation;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod portal;
pub mod time;
pub mod wifi;
