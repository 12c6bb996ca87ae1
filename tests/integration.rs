//! End-to-end tests driving the engine through the public API with a
//! recording transport standing in for the platform stack.

use hogp::adv::AdvPayload;
use hogp::compat::{CompatOverlay, HostKind};
use hogp::gatt::{ServicePlan, REPORT_MAP};
use hogp::link::ConnectionParams;
use hogp::peripheral::{HostReply, HostRequest};
use hogp::report::consumer::ConsumerUsage;
use hogp::{ConnectionState, Error, HidPeripheral, HidProfile, Transport, TransportError};

/// Records every transport call so tests can assert on the exact traffic.
#[derive(Default)]
struct RecordingTransport {
    published: Vec<ServicePlan>,
    adv_starts: usize,
    advertising: bool,
    overlays: Vec<CompatOverlay>,
    notifications: Vec<(HidProfile, Vec<u8>)>,
    disconnects: usize,
    fail_notify_at: Option<usize>,
}

impl Transport for RecordingTransport {
    fn publish_services(&mut self, plan: &ServicePlan) -> Result<(), TransportError> {
        self.published.push(plan.clone());
        Ok(())
    }

    fn start_advertising(&mut self, _payload: &AdvPayload) -> Result<(), TransportError> {
        self.advertising = true;
        self.adv_starts += 1;
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), TransportError> {
        self.advertising = false;
        Ok(())
    }

    fn apply_compat(&mut self, overlay: &CompatOverlay) -> Result<(), TransportError> {
        self.overlays.push(overlay.clone());
        Ok(())
    }

    fn request_connection_params(
        &mut self,
        _params: ConnectionParams,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    fn notify_input_report(
        &mut self,
        profile: HidProfile,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if self.fail_notify_at == Some(self.notifications.len()) {
            return Err(TransportError::NotifyFailed);
        }
        self.notifications.push((profile, payload.to_vec()));
        Ok(())
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.disconnects += 1;
        Ok(())
    }
}

fn advertising_peripheral(profiles: &[HidProfile]) -> HidPeripheral<RecordingTransport> {
    let mut p = HidPeripheral::new(RecordingTransport::default());
    for &profile in profiles {
        p.activate_profile(profile).unwrap();
    }
    p.start_advertising().unwrap();
    p
}

#[test]
fn mouse_flow_advertise_connect_move_disconnect() {
    let mut p = advertising_peripheral(&[HidProfile::Mouse]);
    assert_eq!(*p.connection_state(), ConnectionState::Advertising);
    assert_eq!(p.transport().adv_starts, 1);
    assert_eq!(p.transport().published.len(), 1);

    p.on_central_connected("Generic Host").unwrap();
    assert!(p.is_connected());
    assert!(!p.transport().advertising);

    p.move_mouse_pointer(10, -5).unwrap();
    assert_eq!(
        p.transport().notifications,
        [(HidProfile::Mouse, vec![0x00, 0x0A, 0xFB, 0x00])]
    );

    // The link drops and the engine goes straight back to advertising.
    p.on_central_disconnected().unwrap();
    assert_eq!(*p.connection_state(), ConnectionState::Advertising);
    assert_eq!(p.transport().adv_starts, 2);
}

#[test]
fn input_before_connection_fails_and_sends_nothing() {
    let mut p = advertising_peripheral(&[HidProfile::Mouse, HidProfile::Keyboard]);
    assert_eq!(p.move_mouse_pointer(1, 1), Err(Error::NotConnected));
    assert_eq!(p.press_key(0x04), Err(Error::NotConnected));
    assert!(p.transport().notifications.is_empty());
}

#[test]
fn consumer_control_is_press_then_release_in_order() {
    let mut p = advertising_peripheral(&[HidProfile::ConsumerControl]);
    p.on_central_connected("Generic Host").unwrap();

    p.send_consumer_control(ConsumerUsage::PlayPause as u16)
        .unwrap();
    assert_eq!(
        p.transport().notifications,
        [
            (HidProfile::ConsumerControl, vec![0xCD, 0x00]),
            (HidProfile::ConsumerControl, vec![0x00, 0x00]),
        ]
    );
}

#[test]
fn interrupted_consumer_release_is_retried_on_reconnect() {
    let mut p = advertising_peripheral(&[HidProfile::ConsumerControl]);
    p.on_central_connected("Generic Host").unwrap();

    // Press (notification 0) is delivered; the release is refused.
    p.transport().fail_notify_at = Some(1);
    assert_eq!(
        p.send_consumer_control(ConsumerUsage::VolumeUp as u16),
        Err(Error::IncompleteRelease)
    );

    p.transport().fail_notify_at = None;
    p.on_central_disconnected().unwrap();
    p.on_central_connected("Generic Host").unwrap();

    // The owed release is the first report of the new connection.
    assert_eq!(
        p.transport().notifications.last().unwrap(),
        &(HidProfile::ConsumerControl, vec![0x00, 0x00])
    );
}

#[test]
fn apple_host_gets_adapted_attributes() {
    let mut p = advertising_peripheral(&[HidProfile::Keyboard, HidProfile::Mouse]);
    p.on_central_connected("Living Room Apple TV").unwrap();

    assert_eq!(p.connected_peer().unwrap().host, HostKind::Apple);
    let overlays = &p.transport().overlays;
    assert_eq!(overlays.len(), 1);
    assert_eq!(overlays[0].host, HostKind::Apple);
    assert_eq!(overlays[0].hid_information, [0x11, 0x01, 0x00, 0x02]);
    assert_eq!(overlays[0].device_name, "BLE Remote Keyboard");
    // The keyboard key-array maxima were clamped for this host.
    assert!(overlays[0].report_map.windows(2).any(|w| w == [0x29, 0x65]));
}

#[test]
fn generic_host_keeps_the_published_attributes() {
    let mut p = advertising_peripheral(&[HidProfile::Keyboard]);
    p.on_central_connected("Some Laptop").unwrap();
    assert_eq!(p.connected_peer().unwrap().host, HostKind::Generic);
    assert!(p.transport().overlays.is_empty());
}

#[test]
fn republished_plans_are_byte_identical() {
    let profiles = [HidProfile::Keyboard, HidProfile::ConsumerControl];

    let mut p = advertising_peripheral(&profiles);
    p.stop().unwrap();
    p.start_advertising().unwrap();

    let published = &p.transport().published;
    assert_eq!(published.len(), 2);
    assert_eq!(published[0], published[1]);

    // A bonded host re-reading the report map must see the same bytes.
    let map = |plan: &ServicePlan| {
        plan.services[0]
            .characteristics
            .iter()
            .find(|c| c.uuid == REPORT_MAP)
            .unwrap()
            .value
            .clone()
    };
    assert_eq!(map(&published[0]), map(&published[1]));
}

#[test]
fn host_reads_current_report_state() {
    let mut p = advertising_peripheral(&[HidProfile::Keyboard, HidProfile::Mouse]);
    p.on_central_connected("Generic Host").unwrap();
    p.press_key(0x04).unwrap();

    let reply = p
        .handle_host_request(HostRequest::GetReport { report_id: 1 })
        .unwrap();
    match reply {
        HostReply::Report(bytes) => assert_eq!(&bytes[..], &[0, 0, 0x04, 0, 0, 0, 0, 0]),
        other => panic!("unexpected reply {other:?}"),
    }
}

#[test]
fn virtual_cable_unplug_drops_and_readvertises() {
    let mut p = advertising_peripheral(&[HidProfile::TvRemote]);
    p.on_central_connected("Shield").unwrap();

    p.handle_host_request(HostRequest::VirtualCableUnplug)
        .unwrap();
    assert_eq!(p.transport().disconnects, 1);
    assert_eq!(*p.connection_state(), ConnectionState::Advertising);
}

#[test]
fn stop_suppresses_auto_readvertise() {
    let mut p = advertising_peripheral(&[HidProfile::Mouse]);
    p.on_central_connected("Generic Host").unwrap();

    p.stop().unwrap();
    assert_eq!(*p.connection_state(), ConnectionState::Idle);
    let starts = p.transport().adv_starts;

    // A late disconnect callback from the platform changes nothing.
    p.on_central_disconnected().unwrap();
    assert_eq!(*p.connection_state(), ConnectionState::Idle);
    assert_eq!(p.transport().adv_starts, starts);
}
