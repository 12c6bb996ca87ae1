//! Advertising payload construction.
//!
//! Builds the legacy 31-byte advertising data and scan response the
//! transport hands to the platform advertiser. Flags, the HID service
//! UUID and the appearance go in the advertising data so hosts can filter
//! scans; the local name rides in the scan response where there is room
//! for it.

use heapless::Vec;

use crate::descriptor::HidProfile;
use crate::error::Error;
use crate::gatt::HID_SERVICE;

/// Legacy advertising payload capacity.
pub const ADV_DATA_LEN: usize = 31;

// AD structure types
const AD_FLAGS: u8 = 0x01;
const AD_COMPLETE_16BIT_UUIDS: u8 = 0x03;
const AD_COMPLETE_LOCAL_NAME: u8 = 0x09;
const AD_APPEARANCE: u8 = 0x19;

/// LE General Discoverable, BR/EDR not supported.
const FLAGS_GENERAL_DISCOVERABLE: u8 = 0x06;

// GAP appearance values
pub const APPEARANCE_GENERIC_HID: u16 = 0x03C0;
pub const APPEARANCE_KEYBOARD: u16 = 0x03C1;
pub const APPEARANCE_MOUSE: u16 = 0x03C2;
pub const APPEARANCE_REMOTE_CONTROL: u16 = 0x0180;

/// Advertising data plus scan response, both length-prefixed AD structures.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdvPayload {
    pub data: Vec<u8, ADV_DATA_LEN>,
    pub scan_response: Vec<u8, ADV_DATA_LEN>,
}

/// Pick the GAP appearance for the active profile set. A single profile
/// advertises its exact appearance so host pickers show the right icon; a
/// composite falls back to the generic HID appearance.
pub fn appearance_for(profiles: &[HidProfile]) -> u16 {
    match profiles {
        [HidProfile::Keyboard] => APPEARANCE_KEYBOARD,
        [HidProfile::Mouse] => APPEARANCE_MOUSE,
        [HidProfile::TvRemote] => APPEARANCE_REMOTE_CONTROL,
        _ => APPEARANCE_GENERIC_HID,
    }
}

fn push_field(buf: &mut Vec<u8, ADV_DATA_LEN>, ad_type: u8, payload: &[u8]) -> Result<(), Error> {
    buf.push((payload.len() + 1) as u8)
        .map_err(|_| Error::BufferOverflow)?;
    buf.push(ad_type).map_err(|_| Error::BufferOverflow)?;
    buf.extend_from_slice(payload)
        .map_err(|_| Error::BufferOverflow)
}

/// Build the advertising payload for one name and appearance.
pub fn build(name: &str, appearance: u16) -> Result<AdvPayload, Error> {
    let mut payload = AdvPayload::default();

    push_field(&mut payload.data, AD_FLAGS, &[FLAGS_GENERAL_DISCOVERABLE])?;
    push_field(
        &mut payload.data,
        AD_COMPLETE_16BIT_UUIDS,
        &HID_SERVICE.to_le_bytes(),
    )?;
    push_field(&mut payload.data, AD_APPEARANCE, &appearance.to_le_bytes())?;

    push_field(
        &mut payload.scan_response,
        AD_COMPLETE_LOCAL_NAME,
        name.as_bytes(),
    )?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEVICE_NAME;

    #[test]
    fn data_carries_flags_uuid_and_appearance() {
        let payload = build(DEVICE_NAME, APPEARANCE_KEYBOARD).unwrap();
        assert_eq!(
            &payload.data[..],
            &[
                0x02, AD_FLAGS, 0x06, // flags
                0x03, AD_COMPLETE_16BIT_UUIDS, 0x12, 0x18, // HID service
                0x03, AD_APPEARANCE, 0xC1, 0x03, // keyboard appearance
            ]
        );
    }

    #[test]
    fn scan_response_carries_name() {
        let payload = build("BLE Remote", APPEARANCE_GENERIC_HID).unwrap();
        assert_eq!(payload.scan_response[0] as usize, "BLE Remote".len() + 1);
        assert_eq!(payload.scan_response[1], AD_COMPLETE_LOCAL_NAME);
        assert_eq!(&payload.scan_response[2..], "BLE Remote".as_bytes());
    }

    #[test]
    fn appearance_follows_profile_set() {
        assert_eq!(appearance_for(&[HidProfile::Keyboard]), APPEARANCE_KEYBOARD);
        assert_eq!(appearance_for(&[HidProfile::Mouse]), APPEARANCE_MOUSE);
        assert_eq!(
            appearance_for(&[HidProfile::TvRemote]),
            APPEARANCE_REMOTE_CONTROL
        );
        assert_eq!(
            appearance_for(&[HidProfile::ConsumerControl]),
            APPEARANCE_GENERIC_HID
        );
        assert_eq!(
            appearance_for(&[HidProfile::Keyboard, HidProfile::Mouse]),
            APPEARANCE_GENERIC_HID
        );
    }

    #[test]
    fn oversized_name_is_rejected() {
        let name = "this device name is far too long to fit a scan response";
        assert_eq!(build(name, APPEARANCE_GENERIC_HID), Err(Error::BufferOverflow));
    }
}
