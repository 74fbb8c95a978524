#![no_std]
#![no_main]

use esp_backtrace as _;
use esp_hal::analog::adc::{Adc, AdcConfig, Attenuation};
use esp_hal::clock::CpuClock;
use esp_hal::delay::Delay;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::main;
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::{LevelFilter, info, warn};
use smoltcp::iface::{Config, Interface, SocketSet, SocketStorage};
use smoltcp::socket::tcp;
use smoltcp::wire::EthernetAddress;

use maze_controller::clock::WallClock;
use maze_controller::config::POLL_INTERVAL_MS;
use maze_controller::debounce;
use maze_controller::report::ReporterConfig;
use maze_controller::{Controller, Device, Edge, InitError, SensorChannel, TickInput, Timing};
use maze_firmware::board::{MazeBoard, Network};
use maze_firmware::wifi::{self, WifiCredentials};
use maze_firmware::{net, smoltcp_now, uptime_ms};

esp_bootloader_esp_idf::esp_app_desc!();

// WiFi credentials and collector address loaded from .env file at compile time
const WIFI_SSID: &str = env!("WIFI_SSID");
const WIFI_PASSWORD: &str = env!("WIFI_PASSWORD");
const API_IP: &str = env!("API_IP");
const API_PORT: &str = env!("API_PORT");
const API_USERNAME: &str = env!("API_USERNAME");
const API_PASSWORD: &str = env!("API_PASSWORD");

fn reporter_config() -> ReporterConfig {
    let defaults = ReporterConfig::default();
    ReporterConfig {
        ip: API_IP.parse().unwrap_or(defaults.ip),
        port: API_PORT.parse().unwrap_or(defaults.port),
        username: API_USERNAME,
        password: API_PASSWORD,
        ..defaults
    }
}

#[main]
fn main() -> ! {
    // Heap for the radio stack
    esp_alloc::heap_allocator!(size: 72 * 1024);

    esp_println::logger::init_logger_from_env();
    log::set_max_level(LevelFilter::Info);

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);
    let delay = Delay::new();

    info!("=== Maze Challenge ESP32 ===");

    // Hall sensors: active HIGH with internal pull-downs
    let input_config = InputConfig::default().with_pull(Pull::Down);
    let start_sensor = Input::new(peripherals.GPIO25, input_config);
    let finish_sensor = Input::new(peripherals.GPIO26, input_config);

    // Reset button: active LOW with internal pull-up
    let reset_button = Input::new(peripherals.GPIO5, InputConfig::default().with_pull(Pull::Up));

    let alarm_led = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let buzzer = Output::new(peripherals.GPIO4, Level::Low, OutputConfig::default());

    // Battery through a 1:2 divider on GPIO36 (ADC1_CH0)
    let mut adc1_config = AdcConfig::new();
    let mut battery_pin = adc1_config.enable_pin(peripherals.GPIO36, Attenuation::_11dB);
    let mut adc1 = Adc::new(peripherals.ADC1, adc1_config);
    let read_battery_raw = move || nb::block!(adc1.read_oneshot(&mut battery_pin)).unwrap_or(0);

    let timing = Timing::default();

    // Sensor self-check: let both gates settle for two debounce windows
    let mut start_gate = SensorChannel::with_window(timing.debounce_window_ms);
    let mut finish_gate = SensorChannel::with_window(timing.debounce_window_ms);
    let settle_until = uptime_ms().wrapping_add(2 * timing.debounce_window_ms);
    while (uptime_ms().wrapping_sub(settle_until) as i32) < 0 {
        let now_ms = uptime_ms();
        start_gate.sample(start_sensor.is_high(), now_ms);
        finish_gate.sample(finish_sensor.is_high(), now_ms);
        delay.delay_millis(POLL_INTERVAL_MS);
    }
    info!(
        "Sensors at boot: start={}, finish={}",
        start_gate.stable_level(),
        finish_gate.stable_level()
    );
    let sensors = debounce::self_check(&start_gate, &finish_gate);

    // Radio bring-up. Failing to create the controller is fatal for the
    // session; failing to join or sync only means reports are dropped.
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let rng = Rng::new(peripherals.RNG);
    let radio = esp_wifi::init(timg0.timer0, rng);
    let radio_parts = match &radio {
        Ok(init) => esp_wifi::wifi::new(init, peripherals.WIFI).ok(),
        Err(e) => {
            warn!("Radio init failed: {:?}", e);
            None
        }
    };
    let radio_ok = if radio_parts.is_some() {
        Ok(())
    } else {
        Err(InitError::Radio)
    };
    let bring_up = radio_ok.and(sensors);

    let mut socket_storage: [SocketStorage; 3] = Default::default();
    let mut tcp_rx_buffer = [0u8; 512];
    let mut tcp_tx_buffer = [0u8; 1024];
    let mut sockets = SocketSet::new(&mut socket_storage[..]);
    let mut clock = WallClock::unsynced();
    let mut wifi_controller;
    let mut wifi_device;
    let mut iface;
    let network = match radio_parts {
        Some((controller, interfaces)) => {
            wifi_controller = controller;
            wifi_device = interfaces.sta;

            let credentials = WifiCredentials {
                ssid: WIFI_SSID,
                password: WIFI_PASSWORD,
            };
            if let Err(e) = wifi::connect(&mut wifi_controller, &credentials) {
                warn!("WiFi: {} - continuing offline", e);
            }

            let hardware_addr = EthernetAddress(wifi_device.mac_address());
            iface = Interface::new(
                Config::new(hardware_addr.into()),
                &mut wifi_device,
                smoltcp_now(),
            );

            if wifi::is_connected(&wifi_controller) {
                match net::setup_network_interface(&mut iface, &mut wifi_device, &mut sockets) {
                    Ok(ip) => {
                        info!("Network configured with IP: {}", ip);
                        match net::sync_time(&mut iface, &mut wifi_device, &mut sockets) {
                            Ok(time) => clock.sync(time, uptime_ms()),
                            Err(e) => warn!("NTP sync failed: {}", e),
                        }
                    }
                    Err(e) => warn!("DHCP failed: {}", e),
                }
            }

            if !clock.is_synced() {
                warn!("Report timestamps count from the epoch until a time sync");
            }

            let tcp = sockets.add(tcp::Socket::new(
                tcp::SocketBuffer::new(&mut tcp_rx_buffer[..]),
                tcp::SocketBuffer::new(&mut tcp_tx_buffer[..]),
            ));
            Some(Network {
                controller: &mut wifi_controller,
                device: &mut wifi_device,
                iface: &mut iface,
                sockets,
                tcp,
            })
        }
        None => None,
    };

    let mut board = MazeBoard::new(
        alarm_led,
        buzzer,
        read_battery_raw,
        network,
        reporter_config(),
        clock,
    );

    let mut controller = Controller::new(timing, uptime_ms());
    let battery = board.battery_percent();
    controller.bring_up(bring_up, battery, &mut board);

    let mut reset_channel = SensorChannel::with_window(timing.debounce_window_ms);

    loop {
        let now_ms = uptime_ms();
        let reset_requested = reset_channel.sample(reset_button.is_low(), now_ms) == Edge::Rising;

        controller.tick(
            TickInput {
                now_ms,
                start_high: start_sensor.is_high(),
                finish_high: finish_sensor.is_high(),
                reset_requested,
            },
            &mut board,
        );

        delay.delay_millis(POLL_INTERVAL_MS);
    }
}
