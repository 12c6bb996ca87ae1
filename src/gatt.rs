//! GATT service composition for the HID-over-GATT profile.
//!
//! Builds a platform-neutral description of the service tree (HID service,
//! Battery service, Device Information service) from the active profile
//! set. The `Transport` implementation walks the plan and registers it with
//! the platform attribute table; this module never talks to a stack.
//!
//! Attribute values in the plan are the generic (unadapted) ones. After a
//! central connects and is classified, a [`crate::compat::CompatOverlay`]
//! supplies the host-specific report map, HID Information and device name.

use heapless::Vec;

use crate::compat::HostKind;
use crate::config::{DEFAULT_BATTERY_LEVEL, MAX_ATTRIBUTE_LEN, PNP_ID};
use crate::descriptor::{compose, CompositeReportTable, HidProfile, ReportMap};
use crate::error::Error;

// 16-bit assigned UUIDs

pub const HID_SERVICE: u16 = 0x1812;
pub const BATTERY_SERVICE: u16 = 0x180F;
pub const DEVICE_INFORMATION_SERVICE: u16 = 0x180A;

pub const HID_INFORMATION: u16 = 0x2A4A;
pub const REPORT_MAP: u16 = 0x2A4B;
pub const HID_CONTROL_POINT: u16 = 0x2A4C;
pub const REPORT: u16 = 0x2A4D;
pub const PROTOCOL_MODE: u16 = 0x2A4E;
pub const BATTERY_LEVEL: u16 = 0x2A19;
pub const PNP_ID_CHARACTERISTIC: u16 = 0x2A50;

pub const CLIENT_CHARACTERISTIC_CONFIGURATION: u16 = 0x2902;
pub const REPORT_REFERENCE: u16 = 0x2908;

/// Report Reference descriptor report-type field.
pub const REPORT_TYPE_INPUT: u8 = 0x01;

/// Protocol Mode characteristic values.
pub const PROTOCOL_MODE_BOOT: u8 = 0x00;
pub const PROTOCOL_MODE_REPORT: u8 = 0x01;

/// Characteristic property bits (Bluetooth Core, ATT characteristic
/// declaration).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Props(pub u8);

impl Props {
    pub const READ: Props = Props(0x02);
    pub const WRITE_WITHOUT_RESPONSE: Props = Props(0x04);
    pub const WRITE: Props = Props(0x08);
    pub const NOTIFY: Props = Props(0x10);

    pub const fn union(self, other: Props) -> Props {
        Props(self.0 | other.0)
    }

    pub const fn contains(self, other: Props) -> bool {
        self.0 & other.0 == other.0
    }
}

/// An attribute value buffer.
pub type AttValue = Vec<u8, MAX_ATTRIBUTE_LEN>;

/// A characteristic descriptor in the plan.
#[derive(Clone, Debug, PartialEq)]
pub struct DescriptorSpec {
    pub uuid: u16,
    pub value: Vec<u8, 4>,
    /// The host may write this descriptor (CCCD subscriptions).
    pub writable: bool,
}

/// One characteristic in the plan.
#[derive(Clone, Debug, PartialEq)]
pub struct CharacteristicSpec {
    pub uuid: u16,
    pub props: Props,
    pub value: AttValue,
    pub descriptors: Vec<DescriptorSpec, 2>,
    /// Set on input Report characteristics so the transport can route
    /// notifications by profile.
    pub profile: Option<HidProfile>,
}

/// One primary service in the plan.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceSpec {
    pub uuid: u16,
    pub characteristics: Vec<CharacteristicSpec, 8>,
}

/// The full attribute tree to register, plus the report-routing metadata
/// the link layer needs for the connection's lifetime.
#[derive(Clone, Debug, PartialEq)]
pub struct ServicePlan {
    pub services: Vec<ServiceSpec, 3>,
    pub report_table: CompositeReportTable,
    /// The generic report map the plan was built from; compatibility
    /// overlays adapt copies of it per host.
    pub base_report_map: ReportMap,
}

fn value_from(bytes: &[u8]) -> Result<AttValue, Error> {
    let mut v = AttValue::new();
    v.extend_from_slice(bytes).map_err(|_| Error::BufferOverflow)?;
    Ok(v)
}

fn push_char(
    service: &mut ServiceSpec,
    spec: CharacteristicSpec,
) -> Result<(), Error> {
    service
        .characteristics
        .push(spec)
        .map_err(|_| Error::BufferOverflow)
}

/// Compose the service plan for an ordered set of active profiles.
///
/// The HID service layout follows the profile: Protocol Mode, one input
/// Report characteristic per profile (CCCD plus Report Reference when the
/// composite map uses report IDs), Report Map, HID Information, HID
/// Control Point. Battery and Device Information services ride along so a
/// host's HID enumeration never stalls on missing mandatory services.
pub fn compose_services(profiles: &[HidProfile]) -> Result<ServicePlan, Error> {
    let (report_map, report_table) = compose(profiles)?;

    let mut hid = ServiceSpec {
        uuid: HID_SERVICE,
        characteristics: Vec::new(),
    };

    push_char(
        &mut hid,
        CharacteristicSpec {
            uuid: PROTOCOL_MODE,
            props: Props::READ.union(Props::WRITE_WITHOUT_RESPONSE),
            value: value_from(&[PROTOCOL_MODE_REPORT])?,
            descriptors: Vec::new(),
            profile: None,
        },
    )?;

    for &(profile, report_id) in report_table.entries() {
        let mut descriptors: Vec<DescriptorSpec, 2> = Vec::new();
        // CCCD, zeroed until the host subscribes.
        let mut cccd_value: Vec<u8, 4> = Vec::new();
        let _ = cccd_value.extend_from_slice(&[0x00, 0x00]);
        descriptors
            .push(DescriptorSpec {
                uuid: CLIENT_CHARACTERISTIC_CONFIGURATION,
                value: cccd_value,
                writable: true,
            })
            .map_err(|_| Error::BufferOverflow)?;
        if report_table.uses_report_ids() {
            let mut reference: Vec<u8, 4> = Vec::new();
            let _ = reference.extend_from_slice(&[report_id, REPORT_TYPE_INPUT]);
            descriptors
                .push(DescriptorSpec {
                    uuid: REPORT_REFERENCE,
                    value: reference,
                    writable: false,
                })
                .map_err(|_| Error::BufferOverflow)?;
        }

        let mut value = AttValue::new();
        value
            .resize(profile.input_report_size(), 0)
            .map_err(|_| Error::BufferOverflow)?;

        push_char(
            &mut hid,
            CharacteristicSpec {
                uuid: REPORT,
                props: Props::READ.union(Props::NOTIFY),
                value,
                descriptors,
                profile: Some(profile),
            },
        )?;
    }

    push_char(
        &mut hid,
        CharacteristicSpec {
            uuid: REPORT_MAP,
            props: Props::READ,
            value: report_map.clone(),
            descriptors: Vec::new(),
            profile: None,
        },
    )?;

    push_char(
        &mut hid,
        CharacteristicSpec {
            uuid: HID_INFORMATION,
            props: Props::READ,
            value: value_from(&HostKind::Generic.hid_information())?,
            descriptors: Vec::new(),
            profile: None,
        },
    )?;

    push_char(
        &mut hid,
        CharacteristicSpec {
            uuid: HID_CONTROL_POINT,
            props: Props::WRITE_WITHOUT_RESPONSE,
            value: AttValue::new(),
            descriptors: Vec::new(),
            profile: None,
        },
    )?;

    let mut battery = ServiceSpec {
        uuid: BATTERY_SERVICE,
        characteristics: Vec::new(),
    };
    let mut cccd_value: Vec<u8, 4> = Vec::new();
    let _ = cccd_value.extend_from_slice(&[0x00, 0x00]);
    let mut battery_descriptors: Vec<DescriptorSpec, 2> = Vec::new();
    battery_descriptors
        .push(DescriptorSpec {
            uuid: CLIENT_CHARACTERISTIC_CONFIGURATION,
            value: cccd_value,
            writable: true,
        })
        .map_err(|_| Error::BufferOverflow)?;
    push_char(
        &mut battery,
        CharacteristicSpec {
            uuid: BATTERY_LEVEL,
            props: Props::READ.union(Props::NOTIFY),
            value: value_from(&[DEFAULT_BATTERY_LEVEL])?,
            descriptors: battery_descriptors,
            profile: None,
        },
    )?;

    let mut device_info = ServiceSpec {
        uuid: DEVICE_INFORMATION_SERVICE,
        characteristics: Vec::new(),
    };
    push_char(
        &mut device_info,
        CharacteristicSpec {
            uuid: PNP_ID_CHARACTERISTIC,
            props: Props::READ,
            value: value_from(&PNP_ID)?,
            descriptors: Vec::new(),
            profile: None,
        },
    )?;

    let mut services: Vec<ServiceSpec, 3> = Vec::new();
    let _ = services.push(hid);
    let _ = services.push(battery);
    let _ = services.push(device_info);

    Ok(ServicePlan {
        services,
        report_table,
        base_report_map: report_map,
    })
}

impl ServicePlan {
    pub fn hid_service(&self) -> &ServiceSpec {
        // compose_services always puts the HID service first.
        &self.services[0]
    }

    /// The input Report characteristic for one profile, if active.
    pub fn report_characteristic(&self, profile: HidProfile) -> Option<&CharacteristicSpec> {
        self.hid_service()
            .characteristics
            .iter()
            .find(|c| c.profile == Some(profile))
    }
}
