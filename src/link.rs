//! Connection lifecycle state machine and the platform transport seam.
//!
//! The [`LinkController`] owns the advertise → connect → stream →
//! reconnect cycle as an explicit state machine. Platform connect and
//! disconnect callbacks are forwarded into it; it drives the platform
//! stack only through the [`Transport`] trait, so the whole lifecycle is
//! testable with a mock.
//!
//! State rules:
//! - advertising can only be started from `Idle` or `Disconnected`
//! - reports can only be sent while `Connected`
//! - a disconnect re-enters advertising automatically; `stop` is the only
//!   way back to `Idle`

use heapless::String;
use log::{debug, info, warn};

use crate::adv::AdvPayload;
use crate::compat::{classify, HostKind, Strategy};
use crate::config::{
    CONN_INTERVAL_MAX, CONN_INTERVAL_MIN, MAX_INPUT_REPORT_LEN, MAX_PEER_NAME,
    PERIPHERAL_LATENCY, PREFERRED_MTU, SUPERVISION_TIMEOUT,
};
use crate::descriptor::HidProfile;
use crate::error::{Error, TransportError};
use crate::gatt::ServicePlan;

/// Connection parameters requested after a central connects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ConnectionParams {
    /// Interval range in 1.25 ms units.
    pub interval_min: u16,
    pub interval_max: u16,
    pub latency: u16,
    /// Supervision timeout in 10 ms units.
    pub timeout: u16,
    /// ATT MTU to negotiate.
    pub mtu: u16,
}

impl ConnectionParams {
    /// Lowest-latency profile this peripheral asks for.
    pub const LOW_LATENCY: ConnectionParams = ConnectionParams {
        interval_min: CONN_INTERVAL_MIN,
        interval_max: CONN_INTERVAL_MAX,
        latency: PERIPHERAL_LATENCY,
        timeout: SUPERVISION_TIMEOUT,
        mtu: PREFERRED_MTU,
    };
}

/// The connected central, as much of it as the engine needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub name: String<MAX_PEER_NAME>,
    pub host: HostKind,
}

/// Lifecycle state. `Disconnected` is transient: the controller re-enters
/// `Advertising` on its own unless `stop` intervenes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Advertising,
    Connected(Peer),
    Disconnected,
}

/// The platform Bluetooth stack, reduced to the calls the engine makes.
///
/// Implementations register the service plan with the platform attribute
/// table, run the advertiser and deliver notifications. All methods are
/// synchronous from the engine's point of view; an async platform layer
/// queues the work and reports queueing failures.
pub trait Transport {
    /// Register (or re-register) the GATT service tree.
    fn publish_services(&mut self, plan: &ServicePlan) -> Result<(), TransportError>;

    fn start_advertising(&mut self, payload: &AdvPayload) -> Result<(), TransportError>;

    fn stop_advertising(&mut self) -> Result<(), TransportError>;

    /// Swap in host-adapted attribute values after classification.
    fn apply_compat(&mut self, overlay: &crate::compat::CompatOverlay)
        -> Result<(), TransportError>;

    fn request_connection_params(&mut self, params: ConnectionParams)
        -> Result<(), TransportError>;

    /// Notify the input Report characteristic for one profile. Payloads
    /// are delivered in submission order.
    fn notify_input_report(
        &mut self,
        profile: HidProfile,
        payload: &[u8],
    ) -> Result<(), TransportError>;

    fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// The connection lifecycle state machine.
pub struct LinkController<T: Transport> {
    transport: T,
    state: ConnectionState,
    plan: Option<ServicePlan>,
    adv: Option<AdvPayload>,
    strategy: Strategy,
}

impl<T: Transport> LinkController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Idle,
            plan: None,
            adv: None,
            strategy: Strategy::GENERIC,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected(_))
    }

    pub fn connected_peer(&self) -> Option<&Peer> {
        match &self.state {
            ConnectionState::Connected(peer) => Some(peer),
            _ => None,
        }
    }

    pub fn active_plan(&self) -> Option<&ServicePlan> {
        self.plan.as_ref()
    }

    pub fn transport(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Publish the service plan and start advertising. Valid from `Idle`
    /// and `Disconnected` only.
    pub fn start(&mut self, plan: ServicePlan, adv: AdvPayload) -> Result<(), Error> {
        match self.state {
            ConnectionState::Idle | ConnectionState::Disconnected => {}
            _ => return Err(Error::InvalidState),
        }
        self.transport.publish_services(&plan)?;
        self.transport.start_advertising(&adv)?;
        self.plan = Some(plan);
        self.adv = Some(adv);
        self.state = ConnectionState::Advertising;
        info!("advertising started");
        Ok(())
    }

    /// Platform callback: a central connected. Classifies the peer,
    /// applies the compatibility overlay and requests low-latency
    /// connection parameters. Neither a failed overlay nor a refused
    /// parameter update fails the connection.
    pub fn on_central_connected(&mut self, peer_name: &str) -> Result<(), Error> {
        if self.state != ConnectionState::Advertising {
            return Err(Error::InvalidState);
        }
        if let Err(e) = self.transport.stop_advertising() {
            debug!("stop_advertising after connect: {:?}", e);
        }

        let host = classify(peer_name);
        self.strategy = Strategy::select(host);
        info!("central connected, classified as {:?}", host);

        if host != HostKind::Generic {
            if let Some(plan) = &self.plan {
                let overlay = self.strategy.overlay(&plan.base_report_map);
                if let Err(e) = self.transport.apply_compat(&overlay) {
                    warn!("compat overlay rejected ({:?}), staying generic", e);
                    self.strategy = Strategy::GENERIC;
                }
            }
        }

        if let Err(e) = self
            .transport
            .request_connection_params(ConnectionParams::LOW_LATENCY)
        {
            debug!("connection parameter request refused: {:?}", e);
        }

        let mut name: String<MAX_PEER_NAME> = String::new();
        for c in peer_name.chars() {
            if name.push(c).is_err() {
                break;
            }
        }
        self.state = ConnectionState::Connected(Peer { name, host });
        Ok(())
    }

    /// Platform callback: the central went away. Re-enters advertising
    /// with the payload from the last `start`. A stray disconnect in any
    /// other state is ignored.
    pub fn on_central_disconnected(&mut self) -> Result<(), Error> {
        if !self.is_connected() {
            return Ok(());
        }
        self.state = ConnectionState::Disconnected;
        self.strategy = Strategy::GENERIC;
        info!("central disconnected, re-advertising");

        if let Some(adv) = self.adv.clone() {
            self.transport.start_advertising(&adv)?;
            self.state = ConnectionState::Advertising;
        }
        Ok(())
    }

    /// Stop everything and return to `Idle`. Idempotent.
    pub fn stop(&mut self) -> Result<(), Error> {
        match self.state {
            ConnectionState::Advertising => {
                self.transport.stop_advertising()?;
            }
            ConnectionState::Connected(_) => {
                self.transport.disconnect()?;
            }
            _ => {}
        }
        self.state = ConnectionState::Idle;
        self.strategy = Strategy::GENERIC;
        Ok(())
    }

    /// Tear the current connection down and go straight back to
    /// advertising (Virtual Cable Unplug).
    pub fn force_disconnect(&mut self) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        self.transport.disconnect()?;
        self.on_central_disconnected()
    }

    /// Send one input report. Valid only while `Connected`; the payload
    /// length must match the profile's declared report size exactly.
    pub fn send_report(&mut self, profile: HidProfile, payload: &[u8]) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::NotConnected);
        }
        let plan = self.plan.as_ref().ok_or(Error::InvalidState)?;
        let report_id = plan
            .report_table
            .report_id(profile)
            .ok_or(Error::ProfileNotActive)?;
        if payload.len() != profile.input_report_size() {
            return Err(Error::BufferOverflow);
        }

        let mut buf = [0u8; MAX_INPUT_REPORT_LEN];
        let adapted = &mut buf[..payload.len()];
        adapted.copy_from_slice(payload);
        self.strategy.adapt_report(report_id, adapted);

        self.transport.notify_input_report(profile, adapted)?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adv;
    use crate::compat::CompatOverlay;
    use crate::gatt::compose_services;

    /// Records every transport call; individual calls can be made to fail.
    #[derive(Default)]
    pub(crate) struct MockTransport {
        pub published: Vec<ServicePlan>,
        pub advertising: bool,
        pub adv_starts: usize,
        pub overlays: Vec<CompatOverlay>,
        pub param_requests: Vec<ConnectionParams>,
        pub notifications: Vec<(HidProfile, Vec<u8>)>,
        pub disconnects: usize,
        pub fail_notify: bool,
        /// Fail the notify whose index would equal this value.
        pub fail_notify_at: Option<usize>,
        pub fail_advertise: bool,
        pub fail_apply_compat: bool,
    }

    impl Transport for MockTransport {
        fn publish_services(&mut self, plan: &ServicePlan) -> Result<(), TransportError> {
            self.published.push(plan.clone());
            Ok(())
        }

        fn start_advertising(&mut self, _payload: &AdvPayload) -> Result<(), TransportError> {
            if self.fail_advertise {
                return Err(TransportError::AdvertiseFailed);
            }
            self.advertising = true;
            self.adv_starts += 1;
            Ok(())
        }

        fn stop_advertising(&mut self) -> Result<(), TransportError> {
            self.advertising = false;
            Ok(())
        }

        fn apply_compat(&mut self, overlay: &CompatOverlay) -> Result<(), TransportError> {
            if self.fail_apply_compat {
                return Err(TransportError::Busy);
            }
            self.overlays.push(overlay.clone());
            Ok(())
        }

        fn request_connection_params(
            &mut self,
            params: ConnectionParams,
        ) -> Result<(), TransportError> {
            self.param_requests.push(params);
            Ok(())
        }

        fn notify_input_report(
            &mut self,
            profile: HidProfile,
            payload: &[u8],
        ) -> Result<(), TransportError> {
            if self.fail_notify || self.fail_notify_at == Some(self.notifications.len()) {
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

    fn started_controller(profiles: &[HidProfile]) -> LinkController<MockTransport> {
        let mut link = LinkController::new(MockTransport::default());
        let plan = compose_services(profiles).unwrap();
        let payload = adv::build("BLE Remote", adv::appearance_for(profiles)).unwrap();
        link.start(plan, payload).unwrap();
        link
    }

    #[test]
    fn lifecycle_advertise_connect_disconnect_readvertise() {
        let mut link = started_controller(&[HidProfile::Mouse]);
        assert_eq!(*link.state(), ConnectionState::Advertising);
        assert_eq!(link.transport().adv_starts, 1);

        link.on_central_connected("Generic Host").unwrap();
        assert!(link.is_connected());
        assert!(!link.transport().advertising);
        assert_eq!(
            link.transport().param_requests,
            [ConnectionParams::LOW_LATENCY]
        );

        link.on_central_disconnected().unwrap();
        assert_eq!(*link.state(), ConnectionState::Advertising);
        assert_eq!(link.transport().adv_starts, 2);
    }

    #[test]
    fn start_is_rejected_while_advertising_or_connected() {
        let mut link = started_controller(&[HidProfile::Keyboard]);
        let plan = compose_services(&[HidProfile::Keyboard]).unwrap();
        let payload = adv::build("BLE Remote", adv::APPEARANCE_KEYBOARD).unwrap();
        assert_eq!(
            link.start(plan.clone(), payload.clone()),
            Err(Error::InvalidState)
        );

        link.on_central_connected("host").unwrap();
        assert_eq!(link.start(plan, payload), Err(Error::InvalidState));
    }

    #[test]
    fn send_requires_connected_state() {
        let mut link = started_controller(&[HidProfile::Mouse]);
        assert_eq!(
            link.send_report(HidProfile::Mouse, &[0, 1, 2, 0]),
            Err(Error::NotConnected)
        );
        assert!(link.transport().notifications.is_empty());

        link.on_central_connected("host").unwrap();
        link.send_report(HidProfile::Mouse, &[0, 1, 2, 0]).unwrap();
        assert_eq!(
            link.transport().notifications,
            [(HidProfile::Mouse, vec![0, 1, 2, 0])]
        );
    }

    #[test]
    fn send_rejects_inactive_profile_and_bad_length() {
        let mut link = started_controller(&[HidProfile::Mouse]);
        link.on_central_connected("host").unwrap();
        assert_eq!(
            link.send_report(HidProfile::Keyboard, &[0; 8]),
            Err(Error::ProfileNotActive)
        );
        assert_eq!(
            link.send_report(HidProfile::Mouse, &[0; 3]),
            Err(Error::BufferOverflow)
        );
    }

    #[test]
    fn apple_peer_gets_compat_overlay() {
        let mut link = started_controller(&[HidProfile::Keyboard]);
        link.on_central_connected("Living Room Apple TV").unwrap();
        let peer = link.connected_peer().unwrap();
        assert_eq!(peer.host, HostKind::Apple);
        assert_eq!(link.transport().overlays.len(), 1);
        assert_eq!(link.transport().overlays[0].host, HostKind::Apple);
    }

    #[test]
    fn generic_peer_skips_overlay() {
        let mut link = started_controller(&[HidProfile::Keyboard]);
        link.on_central_connected("Some Laptop").unwrap();
        assert!(link.transport().overlays.is_empty());
    }

    #[test]
    fn rejected_overlay_degrades_to_generic() {
        let mut link = started_controller(&[HidProfile::Keyboard]);
        link.transport().fail_apply_compat = true;
        link.on_central_connected("iPhone").unwrap();
        assert!(link.is_connected());
        // Reports still flow, unadapted.
        link.send_report(HidProfile::Keyboard, &[0; 8]).unwrap();
    }

    #[test]
    fn stop_returns_to_idle_from_any_state() {
        let mut link = started_controller(&[HidProfile::Mouse]);
        link.stop().unwrap();
        assert_eq!(*link.state(), ConnectionState::Idle);
        assert!(!link.transport().advertising);

        // Idempotent.
        link.stop().unwrap();
        assert_eq!(*link.state(), ConnectionState::Idle);

        let mut link = started_controller(&[HidProfile::Mouse]);
        link.on_central_connected("host").unwrap();
        link.stop().unwrap();
        assert_eq!(*link.state(), ConnectionState::Idle);
        assert_eq!(link.transport().disconnects, 1);
    }

    #[test]
    fn stray_disconnect_is_ignored() {
        let mut link = LinkController::new(MockTransport::default());
        link.on_central_disconnected().unwrap();
        assert_eq!(*link.state(), ConnectionState::Idle);
    }

    #[test]
    fn force_disconnect_reenters_advertising() {
        let mut link = started_controller(&[HidProfile::Mouse]);
        link.on_central_connected("host").unwrap();
        link.force_disconnect().unwrap();
        assert_eq!(*link.state(), ConnectionState::Advertising);
        assert_eq!(link.transport().disconnects, 1);
    }

    #[test]
    fn connect_outside_advertising_is_invalid() {
        let mut link = LinkController::new(MockTransport::default());
        assert_eq!(link.on_central_connected("host"), Err(Error::InvalidState));
    }

    #[test]
    fn long_peer_name_is_truncated() {
        let mut link = started_controller(&[HidProfile::Mouse]);
        let long = "a very long host name that exceeds the peer name capacity";
        link.on_central_connected(long).unwrap();
        let peer = link.connected_peer().unwrap();
        assert_eq!(peer.name.len(), MAX_PEER_NAME);
        assert!(long.starts_with(peer.name.as_str()));
    }
}
