//! The maze board as seen by the controller

use esp_hal::gpio::Output;
use esp_wifi::wifi::{WifiController, WifiDevice};
use heapless::Vec;
use log::{info, warn};
use maze_controller::battery;
use maze_controller::clock::WallClock;
use maze_controller::cue::{Cue, CueTimer};
use maze_controller::display::{Frame, Line, MAX_LINES};
use maze_controller::report::{self, ReporterConfig, StatusSnapshot};
use maze_controller::upload::{UPLOAD_TIMEOUT_MS, Upload};
use maze_controller::{Connectivity, Device, TransmissionError};
use smoltcp::iface::{Interface, SocketHandle, SocketSet};
use smoltcp::wire::IpEndpoint;

use crate::http::{self, TcpLink};
use crate::{uptime_ms, wifi};

/// Radio handles, present only when the radio came up
pub struct Network<'a, 'd> {
    pub controller: &'a mut WifiController<'d>,
    pub device: &'a mut WifiDevice<'d>,
    pub iface: &'a mut Interface,
    pub sockets: SocketSet<'a>,
    /// TCP socket reserved for collector uploads
    pub tcp: SocketHandle,
}

impl<'a, 'd> Network<'a, 'd> {
    fn link(&mut self, reporter: &ReporterConfig, local_port: u16) -> TcpLink<'_, 'a, 'd> {
        TcpLink {
            iface: &mut *self.iface,
            device: &mut *self.device,
            sockets: &mut self.sockets,
            handle: self.tcp,
            endpoint: IpEndpoint::new(reporter.ip.into(), reporter.port),
            local_port,
        }
    }
}

pub struct MazeBoard<'a, 'd, B>
where
    B: FnMut() -> u16,
{
    alarm_led: Output<'d>,
    /// Active buzzer: sounds while the pin is HIGH
    buzzer: Output<'d>,
    cue_timer: CueTimer,
    read_battery_raw: B,
    network: Option<Network<'a, 'd>>,
    reporter: ReporterConfig,
    clock: WallClock,
    last_lines: Vec<Line, MAX_LINES>,
    upload: Option<Upload>,
    reports_sent: u16,
}

impl<'a, 'd, B> MazeBoard<'a, 'd, B>
where
    B: FnMut() -> u16,
{
    pub fn new(
        alarm_led: Output<'d>,
        buzzer: Output<'d>,
        read_battery_raw: B,
        network: Option<Network<'a, 'd>>,
        reporter: ReporterConfig,
        clock: WallClock,
    ) -> Self {
        Self {
            alarm_led,
            buzzer,
            cue_timer: CueTimer::new(),
            read_battery_raw,
            network,
            reporter,
            clock,
            last_lines: Vec::new(),
            upload: None,
            reports_sent: 0,
        }
    }
}

impl<B> Device for MazeBoard<'_, '_, B>
where
    B: FnMut() -> u16,
{
    fn connectivity(&mut self) -> Connectivity {
        Connectivity {
            wifi: self
                .network
                .as_ref()
                .is_some_and(|net| wifi::is_connected(net.controller)),
            ble: false,
        }
    }

    // No panel driver: the frame goes to the serial console whenever its text changes
    fn render(&mut self, frame: &Frame) {
        let lines = frame.lines();
        if lines == self.last_lines {
            return;
        }
        for line in lines.iter().skip(1) {
            info!("Display: {}", line.as_str());
        }
        self.last_lines = lines;
    }

    fn report(&mut self, snapshot: &StatusSnapshot) -> Result<(), TransmissionError> {
        let Some(net) = self.network.as_mut() else {
            return Err(TransmissionError::Offline);
        };
        if !wifi::is_connected(net.controller) {
            return Err(TransmissionError::Offline);
        }

        let timestamp = self.clock.timestamp_at(snapshot.uptime_ms);
        let body = report::encode_json(snapshot, timestamp.as_str())?;
        let request = report::build_request(&self.reporter, body.as_str())?;
        info!("HTTP: Queued for collector: {}", body.as_str());

        self.reports_sent = self.reports_sent.wrapping_add(1);
        let mut link = net.link(&self.reporter, http::local_port(self.reports_sent));
        if let Some(previous) = self.upload.take() {
            warn!("HTTP: Previous report still in flight, replacing it");
            previous.cancel(&mut link);
        }
        self.upload = Some(Upload::begin(
            &mut link,
            request,
            uptime_ms(),
            UPLOAD_TIMEOUT_MS,
        )?);
        Ok(())
    }

    fn battery_percent(&mut self) -> u8 {
        let raw = (self.read_battery_raw)();
        battery::percent_from_raw(raw)
    }

    fn play(&mut self, cue: &Cue) {
        if let Some(on) = cue.alarm_led {
            if on {
                self.alarm_led.set_high();
            } else {
                self.alarm_led.set_low();
            }
        }
        if let Some(tone) = cue.tone {
            info!("Cue: {:?} ({} Hz, {} ms)", cue.kind, tone.frequency_hz, tone.duration_ms);
            self.buzzer.set_high();
            self.cue_timer.activate(tone, uptime_ms());
        }
    }

    fn service(&mut self, now_ms: u32) -> Option<Result<(), TransmissionError>> {
        // Silence the buzzer once the current tone has run its course
        if self.cue_timer.check_expired(now_ms) {
            self.buzzer.set_low();
            self.cue_timer.deactivate();
        }
        self.clock.advance(now_ms);

        let upload = self.upload.as_mut()?;
        let net = self.network.as_mut()?;
        let mut link = net.link(&self.reporter, http::local_port(self.reports_sent));
        let status = upload.step(&mut link, now_ms)?;
        self.upload = None;
        match status {
            Ok(code) => {
                info!("HTTP: Collector answered {}", code);
                Some(Ok(()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
