//! WiFi station bring-up
//!
//! Joins the configured network using esp-wifi. A failed join is not fatal:
//! the game stays playable offline and reports are dropped until a link exists.

use esp_hal::delay::Delay;
use esp_wifi::wifi::{AuthMethod, ClientConfiguration, Configuration, WifiController};
use log::info;

/// Give up joining after this long (milliseconds)
pub const WIFI_TIMEOUT_MS: u32 = 20_000;

const JOIN_POLL_MS: u32 = 500;

/// WiFi credentials configuration
pub struct WifiCredentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Start the station and wait (bounded) for association
pub fn connect(
    controller: &mut WifiController<'_>,
    credentials: &WifiCredentials,
) -> Result<(), &'static str> {
    info!("Setting up WiFi...");

    let client_config = Configuration::Client(ClientConfiguration {
        ssid: credentials.ssid.try_into().map_err(|_| "SSID too long")?,
        password: credentials.password.try_into().map_err(|_| "Password too long")?,
        auth_method: AuthMethod::WPA2Personal,
        ..Default::default()
    });

    controller
        .set_configuration(&client_config)
        .map_err(|_| "Failed to set config")?;

    controller.start().map_err(|_| "Failed to start WiFi")?;
    info!("WiFi started, connecting to '{}'...", credentials.ssid);

    controller.connect().map_err(|_| "Failed to connect")?;

    let delay = Delay::new();
    let mut waited_ms = 0;
    while waited_ms < WIFI_TIMEOUT_MS {
        match controller.is_connected() {
            Ok(true) => {
                info!("WiFi connected after {} ms", waited_ms);
                return Ok(());
            }
            Ok(false) => info!("Waiting for WiFi connection..."),
            Err(e) => info!("WiFi error: {:?}", e),
        }
        delay.delay_millis(JOIN_POLL_MS);
        waited_ms += JOIN_POLL_MS;
    }

    Err("WiFi connection timeout")
}

/// Non-blocking link check, called once per tick
pub fn is_connected(controller: &WifiController<'_>) -> bool {
    matches!(controller.is_connected(), Ok(true))
}
