//! The top-level peripheral facade.
//!
//! [`HidPeripheral`] ties the profile reporters, the descriptor registry,
//! the GATT composer and the connection state machine together behind one
//! input-oriented API: activate profiles, start advertising, then call the
//! semantic input methods (`press_key`, `move_mouse_pointer`, ...). Inbound
//! GATT writes from the host arrive through [`HidPeripheral::handle_host_request`].

use heapless::Vec;
use log::{debug, info, warn};

use crate::adv;
use crate::config::MAX_INPUT_REPORT_LEN;
use crate::descriptor::HidProfile;
use crate::error::Error;
use crate::gatt::{self, compose_services};
use crate::link::{ConnectionState, LinkController, Peer, Transport};
use crate::report::keyboard::LedState;
use crate::report::{encode, HidReport};
use crate::reporter::{ConsumerReporter, KeyboardReporter, MouseReporter, RemoteReporter};

/// An inbound GATT write decoded by the transport layer.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostRequest {
    /// Read of a Report characteristic value.
    GetReport { report_id: u8 },
    /// Write to a Report characteristic (output reports, e.g. keyboard
    /// LEDs).
    SetReport {
        report_id: u8,
        data: Vec<u8, MAX_INPUT_REPORT_LEN>,
    },
    /// Write to the Protocol Mode characteristic.
    SetProtocol { mode: u8 },
    /// Write to the HID Control Point (suspend / exit suspend).
    ControlPoint { command: u8 },
    /// HID Virtual Cable Unplug: the host asked us to drop the link.
    VirtualCableUnplug,
}

/// The answer to a [`HostRequest`], handed back to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostReply {
    Report(Vec<u8, MAX_INPUT_REPORT_LEN>),
    Ack,
}

/// HID Control Point commands.
const CONTROL_SUSPEND: u8 = 0x00;
const CONTROL_EXIT_SUSPEND: u8 = 0x01;

/// The HID-over-GATT peripheral engine.
pub struct HidPeripheral<T: Transport> {
    link: LinkController<T>,
    active: Vec<HidProfile, { HidProfile::COUNT }>,
    keyboard: KeyboardReporter,
    mouse: MouseReporter,
    consumer: ConsumerReporter,
    remote: RemoteReporter,
    leds: LedState,
    protocol_mode: u8,
    suspended: bool,
}

impl<T: Transport> HidPeripheral<T> {
    pub fn new(transport: T) -> Self {
        Self {
            link: LinkController::new(transport),
            active: Vec::new(),
            keyboard: KeyboardReporter::new(),
            mouse: MouseReporter::new(),
            consumer: ConsumerReporter::new(),
            remote: RemoteReporter::new(),
            leds: LedState::default(),
            protocol_mode: gatt::PROTOCOL_MODE_REPORT,
            suspended: false,
        }
    }

    // Profile management. The report map is frozen once published, so the
    // active set can only change while the engine is idle.

    pub fn activate_profile(&mut self, profile: HidProfile) -> Result<(), Error> {
        if *self.link.state() != ConnectionState::Idle {
            return Err(Error::InvalidState);
        }
        if !self.active.contains(&profile) {
            self.active.push(profile).map_err(|_| Error::BufferOverflow)?;
        }
        Ok(())
    }

    pub fn deactivate_profile(&mut self, profile: HidProfile) -> Result<(), Error> {
        if *self.link.state() != ConnectionState::Idle {
            return Err(Error::InvalidState);
        }
        if let Some(pos) = self.active.iter().position(|&p| p == profile) {
            self.active.remove(pos);
        }
        Ok(())
    }

    pub fn active_profiles(&self) -> &[HidProfile] {
        &self.active
    }

    // Lifecycle

    /// Compose the service plan from the active profiles and start
    /// advertising.
    pub fn start_advertising(&mut self) -> Result<(), Error> {
        if self.active.is_empty() {
            return Err(Error::NoActiveProfiles);
        }
        let plan = compose_services(&self.active)?;
        let appearance = adv::appearance_for(&self.active);
        let payload = adv::build(crate::config::DEVICE_NAME, appearance)?;
        self.link.start(plan, payload)
    }

    /// Stop advertising or drop the connection and go idle.
    pub fn stop(&mut self) -> Result<(), Error> {
        self.link.stop()
    }

    /// Platform callback: a central connected. Retries any consumer
    /// release owed from the previous connection.
    pub fn on_central_connected(&mut self, peer_name: &str) -> Result<(), Error> {
        self.link.on_central_connected(peer_name)?;
        self.suspended = false;

        if self.consumer.release_pending() {
            debug!("retrying owed consumer release");
            let release = self.consumer.release();
            if let Err(e) = self.send(HidReport::Consumer(release)) {
                warn!("owed consumer release failed again: {:?}", e);
                self.consumer.mark_release_owed();
            }
        }
        Ok(())
    }

    /// Platform callback: the central went away. Local input state is
    /// cleared (the host considers everything released on disconnect);
    /// an owed consumer release is kept for the next connection.
    pub fn on_central_disconnected(&mut self) -> Result<(), Error> {
        self.keyboard.release_all();
        self.mouse.reset();
        self.remote.release_all();
        self.suspended = false;
        self.link.on_central_disconnected()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn connected_peer(&self) -> Option<&Peer> {
        self.link.connected_peer()
    }

    pub fn connection_state(&self) -> &ConnectionState {
        self.link.state()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// The underlying transport. The embedding keeps ownership of its
    /// platform handle through here (battery updates, bonding callbacks).
    pub fn transport(&mut self) -> &mut T {
        self.link.transport()
    }

    /// Keyboard LED state from the most recent host output report.
    pub fn keyboard_leds(&self) -> LedState {
        self.leds
    }

    fn send(&mut self, report: HidReport) -> Result<(), Error> {
        let profile = report.profile();
        if !self.active.contains(&profile) {
            return Err(Error::ProfileNotActive);
        }
        let mut buf = [0u8; MAX_INPUT_REPORT_LEN];
        let len = encode(&report, &mut buf)?;
        self.link.send_report(profile, &buf[..len])
    }

    // Mouse input

    /// Send one relative pointer movement. Deltas beyond ±127 are clamped.
    pub fn move_mouse_pointer(&mut self, dx: i16, dy: i16) -> Result<(), Error> {
        let report = self.mouse.motion(dx, dy, 0);
        self.send(HidReport::Mouse(report))
    }

    /// Send one scroll wheel step.
    pub fn scroll_wheel(&mut self, delta: i16) -> Result<(), Error> {
        let report = self.mouse.motion(0, 0, delta);
        self.send(HidReport::Mouse(report))
    }

    /// Replace the mouse button state and send it.
    pub fn set_mouse_buttons(&mut self, mask: u8) -> Result<(), Error> {
        self.mouse.set_buttons(mask);
        let report = self.mouse.report();
        self.send(HidReport::Mouse(report))
    }

    // Keyboard input

    /// Press one key (HID usage code) and send the updated held set.
    pub fn press_key(&mut self, usage: u8) -> Result<(), Error> {
        self.keyboard.press(usage)?;
        let report = self.keyboard.report();
        self.send(HidReport::Keyboard(report))
    }

    /// Release one key and send the updated held set.
    pub fn release_key(&mut self, usage: u8) -> Result<(), Error> {
        self.keyboard.release(usage);
        let report = self.keyboard.report();
        self.send(HidReport::Keyboard(report))
    }

    /// Release everything and send the empty report.
    pub fn release_all_keys(&mut self) -> Result<(), Error> {
        self.keyboard.release_all();
        self.send(HidReport::Keyboard(self.keyboard.report()))
    }

    // Consumer control input

    /// Send a consumer control press immediately followed by its release.
    ///
    /// If the press never left the device the action simply failed and no
    /// release is owed. If the press went out but the release did not, the
    /// host is left holding a key; the release is recorded as owed,
    /// retried on the next connection, and `IncompleteRelease` tells the
    /// caller the action landed in a stuck state.
    pub fn send_consumer_control(&mut self, usage: u16) -> Result<(), Error> {
        let press = self.consumer.press(usage);
        if let Err(e) = self.send(HidReport::Consumer(press)) {
            self.consumer.release();
            return Err(e);
        }
        let release = self.consumer.release();
        if self.send(HidReport::Consumer(release)).is_err() {
            self.consumer.mark_release_owed();
            return Err(Error::IncompleteRelease);
        }
        Ok(())
    }

    // TV-remote input

    /// Replace the remote button bitfield and send it. Callers send a zero
    /// mask to release.
    pub fn set_remote_buttons(&mut self, mask: u8) -> Result<(), Error> {
        self.remote.set_buttons(mask);
        let report = self.remote.report();
        self.send(HidReport::Remote(report))
    }

    // Host requests

    /// Handle an inbound GATT write or read decoded by the transport.
    pub fn handle_host_request(&mut self, request: HostRequest) -> Result<HostReply, Error> {
        match request {
            HostRequest::GetReport { report_id } => {
                let profile = self.profile_for_report_id(report_id)?;
                let report = self.current_report(profile);
                let mut buf = [0u8; MAX_INPUT_REPORT_LEN];
                let len = encode(&report, &mut buf)?;
                let mut value: Vec<u8, MAX_INPUT_REPORT_LEN> = Vec::new();
                value
                    .extend_from_slice(&buf[..len])
                    .map_err(|_| Error::BufferOverflow)?;
                Ok(HostReply::Report(value))
            }
            HostRequest::SetReport { report_id, data } => {
                let profile = self.profile_for_report_id(report_id)?;
                if profile == HidProfile::Keyboard && !data.is_empty() {
                    self.leds = LedState(data[0]);
                    debug!(
                        "keyboard LEDs: num={} caps={} scroll={}",
                        self.leds.num_lock(),
                        self.leds.caps_lock(),
                        self.leds.scroll_lock()
                    );
                }
                Ok(HostReply::Ack)
            }
            HostRequest::SetProtocol { mode } => {
                if mode == gatt::PROTOCOL_MODE_BOOT {
                    // Boot protocol is accepted but the report layouts do
                    // not change; keyboard and mouse reports are already
                    // boot-compatible.
                    warn!("host selected boot protocol mode");
                }
                self.protocol_mode = mode;
                Ok(HostReply::Ack)
            }
            HostRequest::ControlPoint { command } => {
                match command {
                    CONTROL_SUSPEND => {
                        info!("host entered suspend");
                        self.suspended = true;
                    }
                    CONTROL_EXIT_SUSPEND => {
                        info!("host left suspend");
                        self.suspended = false;
                    }
                    other => debug!("unknown control point command {:#04x}", other),
                }
                Ok(HostReply::Ack)
            }
            HostRequest::VirtualCableUnplug => {
                self.keyboard.release_all();
                self.mouse.reset();
                self.remote.release_all();
                self.link.force_disconnect()?;
                Ok(HostReply::Ack)
            }
        }
    }

    fn profile_for_report_id(&self, report_id: u8) -> Result<HidProfile, Error> {
        self.link
            .active_plan()
            .ok_or(Error::InvalidState)?
            .report_table
            .profile_for_id(report_id)
            .ok_or(Error::UnknownReportId)
    }

    fn current_report(&self, profile: HidProfile) -> HidReport {
        match profile {
            HidProfile::Keyboard => HidReport::Keyboard(self.keyboard.report()),
            HidProfile::Mouse => HidReport::Mouse(self.mouse.report()),
            HidProfile::ConsumerControl => HidReport::Consumer(self.consumer.report()),
            HidProfile::TvRemote => HidReport::Remote(self.remote.report()),
        }
    }
}
