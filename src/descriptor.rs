//! Report descriptor registry: per-profile HID report maps and the
//! composite builder that combines active profiles under assigned
//! report IDs.
//!
//! Composite maps are a deterministic function of the profile list: the
//! same profiles in the same activation order always yield byte-identical
//! maps. Hosts cache the report map per bonded identity, and several
//! silently ignore input if the map changes between reconnects.

use heapless::Vec;

use crate::config::MAX_ATTRIBUTE_LEN;
use crate::error::Error;
use crate::report::{consumer, keyboard, mouse, remote};

/// A binary HID report map (the Report Map characteristic value).
pub type ReportMap = Vec<u8, MAX_ATTRIBUTE_LEN>;

pub(crate) fn push_items(map: &mut ReportMap, items: &[u8]) -> Result<(), Error> {
    map.extend_from_slice(items)
        .map_err(|_| Error::BufferOverflow)
}

/// The HID profiles this peripheral can expose. Each maps to exactly one
/// report layout and one reporter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidProfile {
    Keyboard,
    Mouse,
    ConsumerControl,
    TvRemote,
}

impl HidProfile {
    pub const COUNT: usize = 4;

    /// Declared input report size in bytes. Every report emitted for the
    /// profile must match it exactly; hosts reject mismatched lengths.
    pub const fn input_report_size(self) -> usize {
        match self {
            HidProfile::Keyboard => keyboard::KEYBOARD_REPORT_SIZE,
            HidProfile::Mouse => mouse::MOUSE_REPORT_SIZE,
            HidProfile::ConsumerControl => consumer::CONSUMER_REPORT_SIZE,
            HidProfile::TvRemote => remote::REMOTE_REPORT_SIZE,
        }
    }

    fn write_map_fragment(self, map: &mut ReportMap, report_id: Option<u8>) -> Result<(), Error> {
        match self {
            HidProfile::Keyboard => keyboard::write_map_fragment(map, report_id),
            HidProfile::Mouse => mouse::write_map_fragment(map, report_id),
            HidProfile::ConsumerControl => consumer::write_map_fragment(map, report_id),
            HidProfile::TvRemote => remote::write_map_fragment(map, report_id),
        }
    }
}

/// An immutable report map plus the metadata the GATT layer needs.
/// Constructed once, never mutated; per-host variations are adapted
/// copies (see [`crate::compat`]).
#[derive(Clone, Debug, PartialEq)]
pub struct ReportDescriptor {
    pub profile: HidProfile,
    /// 0 when report IDs are unused (single-profile registration).
    pub report_id: u8,
    pub input_report_size: usize,
    pub map: ReportMap,
}

/// Registry lookup: the standalone descriptor for one profile.
pub fn descriptor(profile: HidProfile) -> Result<ReportDescriptor, Error> {
    let mut map = ReportMap::new();
    profile.write_map_fragment(&mut map, None)?;
    Ok(ReportDescriptor {
        profile,
        report_id: 0,
        input_report_size: profile.input_report_size(),
        map,
    })
}

/// Stable profile → report ID assignment for a composite registration.
/// IDs are 1-based and frozen for the life of the GATT registration.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeReportTable {
    entries: Vec<(HidProfile, u8), { HidProfile::COUNT }>,
}

impl CompositeReportTable {
    pub fn report_id(&self, profile: HidProfile) -> Option<u8> {
        self.entries
            .iter()
            .find_map(|&(p, id)| (p == profile).then_some(id))
    }

    pub fn profile_for_id(&self, report_id: u8) -> Option<HidProfile> {
        self.entries
            .iter()
            .find_map(|&(p, id)| (id == report_id).then_some(p))
    }

    /// Report IDs are only emitted when more than one profile shares the
    /// map; a lone profile keeps the ID-less form.
    pub fn uses_report_ids(&self) -> bool {
        self.entries.len() > 1
    }

    pub fn profiles(&self) -> impl Iterator<Item = HidProfile> + '_ {
        self.entries.iter().map(|&(p, _)| p)
    }

    pub fn entries(&self) -> &[(HidProfile, u8)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Build the composite registration for an ordered set of active profiles.
///
/// Duplicates are ignored (first occurrence wins). A single profile keeps
/// the ID-less form; two or more get 1-based IDs in activation order so no
/// two profiles ever share an ID.
pub fn compose(profiles: &[HidProfile]) -> Result<(ReportMap, CompositeReportTable), Error> {
    let mut unique: Vec<HidProfile, { HidProfile::COUNT }> = Vec::new();
    for &p in profiles {
        if !unique.contains(&p) {
            unique.push(p).map_err(|_| Error::BufferOverflow)?;
        }
    }
    if unique.is_empty() {
        return Err(Error::NoActiveProfiles);
    }

    let with_ids = unique.len() > 1;
    let mut table = CompositeReportTable::default();
    let mut map = ReportMap::new();
    for (i, &profile) in unique.iter().enumerate() {
        let id = if with_ids { (i + 1) as u8 } else { 0 };
        profile.write_map_fragment(&mut map, with_ids.then_some(id))?;
        let _ = table.entries.push((profile, id));
    }
    Ok((map, table))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_descriptor_has_no_report_id_item() {
        let desc = descriptor(HidProfile::Keyboard).unwrap();
        assert_eq!(desc.report_id, 0);
        assert_eq!(desc.input_report_size, 8);
        assert!(!desc.map.windows(2).any(|w| w[0] == 0x85));
    }

    #[test]
    fn composite_assigns_distinct_stable_ids() {
        let (_, table) = compose(&[HidProfile::Keyboard, HidProfile::Mouse]).unwrap();
        let kb = table.report_id(HidProfile::Keyboard).unwrap();
        let mouse = table.report_id(HidProfile::Mouse).unwrap();
        assert_eq!(kb, 1);
        assert_eq!(mouse, 2);
        assert_ne!(kb, mouse);
        assert!(table.uses_report_ids());
        assert_eq!(table.profile_for_id(1), Some(HidProfile::Keyboard));
        assert_eq!(table.profile_for_id(2), Some(HidProfile::Mouse));
        assert_eq!(table.profile_for_id(3), None);
    }

    #[test]
    fn composite_map_is_deterministic() {
        let profiles = [HidProfile::Keyboard, HidProfile::Mouse];
        let (map_a, table_a) = compose(&profiles).unwrap();
        let (map_b, table_b) = compose(&profiles).unwrap();
        assert_eq!(map_a, map_b);
        assert_eq!(table_a, table_b);
    }

    #[test]
    fn composite_dedupes_profiles() {
        let (map_a, table) = compose(&[
            HidProfile::Mouse,
            HidProfile::Keyboard,
            HidProfile::Mouse,
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.report_id(HidProfile::Mouse), Some(1));
        assert_eq!(table.report_id(HidProfile::Keyboard), Some(2));

        let (map_b, _) = compose(&[HidProfile::Mouse, HidProfile::Keyboard]).unwrap();
        assert_eq!(map_a, map_b);
    }

    #[test]
    fn single_profile_composite_keeps_id_zero() {
        let (map, table) = compose(&[HidProfile::Mouse]).unwrap();
        assert_eq!(table.report_id(HidProfile::Mouse), Some(0));
        assert!(!table.uses_report_ids());
        assert!(!map.windows(2).any(|w| w[0] == 0x85));
    }

    #[test]
    fn empty_profile_list_is_rejected() {
        assert_eq!(compose(&[]).unwrap_err(), Error::NoActiveProfiles);
    }

    #[test]
    fn composite_map_concatenates_fragments_in_order() {
        let (map, _) = compose(&[HidProfile::Keyboard, HidProfile::Mouse]).unwrap();
        // Keyboard section (Generic Desktop / Keyboard) comes first.
        assert_eq!(&map[..4], &[0x05, 0x01, 0x09, 0x06]);
        // Mouse section follows somewhere after it.
        assert!(map
            .windows(4)
            .any(|w| w == [0x05, 0x01, 0x09, 0x02]));
    }
}
