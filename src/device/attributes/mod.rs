//! Attribute key resolver and the static per-section attribute tables.
//!
//! A 16-bit key addresses one 4-byte window of one attribute:
//!
//! | bits  | field                                  |
//! |-------|----------------------------------------|
//! | 12-15 | section                                |
//! | 4-11  | attribute index within the section     |
//! | 0-3   | part (4-byte word for wide attributes) |
//!
//! Resolution is pure table lookup; the actual loads and stores are typed
//! accessors on [`Identification`], [`SystemState`], and [`DeviceConfig`],
//! keeping the register image free of raw memory overlays.
use crate::device::config::{ConfigFlags, DeviceConfig};
use crate::device::{Identification, SystemState};
use crate::error::DeviceError;

const KEY_SECTION_POS: u16 = 12;
const KEY_SECTION_MASK: u16 = 0xF;
const KEY_ATTR_POS: u16 = 4;
const KEY_ATTR_MASK: u16 = 0xFF;
const KEY_PART_MASK: u16 = 0xF;

/// Key of the writable wall-clock attribute. Writing it realigns the device
/// clock and the telemetry timing anchors.
pub const KEY_SYSTEM_TIME: u16 = build_key(Section::System, 0x1, 0);

/// Pack a section, attribute index, and part into a wire key.
pub const fn build_key(section: Section, index: u8, part: u8) -> u16 {
    ((section as u16) << KEY_SECTION_POS)
        | ((index as u16 & KEY_ATTR_MASK) << KEY_ATTR_POS)
        | (part as u16 & KEY_PART_MASK)
}

//==================================================================================SECTIONS
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Attribute section, the top nibble of a key.
pub enum Section {
    Identification = 0,
    System = 1,
    Configuration = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Storage policy of a whole section, overriding per-attribute options.
pub enum SectionBehavior {
    /// Immutable identity data.
    ReadOnly,
    /// RAM only, reset at startup.
    Volatile,
    /// Backed by persistent storage through the config callbacks.
    Persistent,
}

//==================================================================================OPTIONS
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Class visibility of an attribute.
pub enum ClassScope {
    /// Meaningful on every device.
    All,
    /// Only meaningful on devices of one class.
    Class(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Per-attribute access options.
pub struct AttrOption {
    pub readable: bool,
    pub writable: bool,
    /// Excluded from metadata enumeration. Not enforced on the wire.
    pub hidden: bool,
    pub scope: ClassScope,
}

impl AttrOption {
    const fn ro() -> Self {
        Self {
            readable: true,
            writable: false,
            hidden: false,
            scope: ClassScope::All,
        }
    }

    const fn rw() -> Self {
        Self {
            writable: true,
            ..Self::ro()
        }
    }

    const fn ro_hidden() -> Self {
        Self {
            hidden: true,
            ..Self::ro()
        }
    }

    const fn class_rw(class: u8) -> Self {
        Self {
            scope: ClassScope::Class(class),
            ..Self::rw()
        }
    }

    /// Whether a device of `class` may access the attribute at all.
    pub const fn class_visible(&self, class: u8) -> bool {
        match self.scope {
            ClassScope::All => true,
            ClassScope::Class(c) => c == class,
        }
    }
}

//==================================================================================TABLES
/// One attribute of the logical register image.
struct AttrSpec {
    /// Total size, bytes. Sizes above four are addressed by part.
    size: u8,
    option: AttrOption,
    name: &'static str,
}

const fn attr(size: u8, option: AttrOption, name: &'static str) -> AttrSpec {
    AttrSpec { size, option, name }
}

/// Reserved table slot. The index never resolves, but later attributes keep
/// their wire keys.
const fn reserved() -> AttrSpec {
    AttrSpec {
        size: 0,
        option: AttrOption::ro_hidden(),
        name: "",
    }
}

/// Unused 4-byte slot kept for key stability. Resolves and reads as zero.
const fn padding() -> AttrSpec {
    AttrSpec {
        size: 4,
        option: AttrOption::ro_hidden(),
        name: "",
    }
}

static IDENTIFICATION_ATTRS: [AttrSpec; 7] = [
    attr(1, AttrOption::ro(), "nodeid"),
    attr(2, AttrOption::ro(), "version"),
    attr(32, AttrOption::ro(), "name"),
    attr(4, AttrOption::ro(), "magic_number"),
    reserved(), // 0x4-0x5: build infos on firmwares that carry them
    reserved(),
    attr(4, AttrOption::ro(), "features"),
];

static SYSTEM_ATTRS: [AttrSpec; 19] = [
    attr(4, AttrOption::ro(), "uptime_synced"),
    attr(4, AttrOption::rw(), "time"),
    attr(4, AttrOption::ro(), "uptime"),
    attr(4, AttrOption::ro(), "start_time"),
    attr(4, AttrOption::ro(), "last_telemetry"),
    attr(4, AttrOption::ro(), "received.total"),
    attr(4, AttrOption::ro(), "received.read_attribute"),
    attr(4, AttrOption::ro(), "received.write_attribute"),
    attr(4, AttrOption::ro(), "received.command"),
    attr(4, AttrOption::ro(), "received.request_telemetry"),
    attr(4, AttrOption::ro_hidden(), "received.ignored"),
    attr(4, AttrOption::ro(), "last_telemetry_ms"),
    attr(4, AttrOption::ro(), "sent.total"),
    attr(4, AttrOption::ro(), "sent.telemetry"),
    padding(), // 0xE
    attr(4, AttrOption::ro(), "last_command_error"),
    attr(4, AttrOption::ro(), "last_telemetry_error"),
    padding(), // 0x11
    attr(1, AttrOption::ro(), "battery"),
];

static CONFIG_ATTRS: [AttrSpec; 36] = [
    attr(4, AttrOption::rw(), "telemetry.period"),
    attr(2, AttrOption::rw(), "telemetry.delay"),
    attr(2, AttrOption::rw(), "telemetry.delay_min"),
    attr(2, AttrOption::rw(), "telemetry.delay_max"),
    attr(1, AttrOption::rw(), "flags"),
    attr(4, AttrOption::rw(), "timezone"),
    attr(4, AttrOption::rw(), "location"),
    attr(4, AttrOption::class_rw(0), "class0.pulse_duration.0"),
    attr(4, AttrOption::class_rw(0), "class0.pulse_duration.1"),
    attr(4, AttrOption::class_rw(0), "class0.pulse_duration.2"),
    attr(4, AttrOption::class_rw(0), "class0.pulse_duration.3"),
    attr(4, AttrOption::class_rw(0), "class0.outputs_default"),
    attr(4, AttrOption::class_rw(0), "class0.telemetry_on_change"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.0"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.1"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.2"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.3"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.4"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.5"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.6"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.7"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.8"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.9"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.10"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.11"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.12"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.13"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.14"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.15"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.16"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.17"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.18"),
    attr(4, AttrOption::class_rw(1), "class1.pulse_duration.19"),
    attr(4, AttrOption::class_rw(1), "class1.directions"),
    attr(4, AttrOption::class_rw(1), "class1.outputs_default"),
    attr(4, AttrOption::class_rw(1), "class1.telemetry_on_change"),
];

struct SectionSpec {
    section: Section,
    behavior: SectionBehavior,
    attrs: &'static [AttrSpec],
}

static SECTIONS: [SectionSpec; 3] = [
    SectionSpec {
        section: Section::Identification,
        behavior: SectionBehavior::ReadOnly,
        attrs: &IDENTIFICATION_ATTRS,
    },
    SectionSpec {
        section: Section::System,
        behavior: SectionBehavior::Volatile,
        attrs: &SYSTEM_ATTRS,
    },
    SectionSpec {
        section: Section::Configuration,
        behavior: SectionBehavior::Persistent,
        attrs: &CONFIG_ATTRS,
    },
];

//==================================================================================RESOLUTION
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Fully resolved attribute reference: one addressable 4-byte window.
pub struct AttrRef {
    pub section: Section,
    pub behavior: SectionBehavior,
    /// Attribute index within the section table.
    pub index: u8,
    pub part: u8,
    /// Valid bytes in this window, 1 to 4.
    pub size: u8,
    /// Effective options, with the section policy folded in.
    pub option: AttrOption,
}

/// Resolve a wire key against the static tables.
pub fn resolve(key: u16) -> Result<AttrRef, DeviceError> {
    let section_num = (key >> KEY_SECTION_POS) & KEY_SECTION_MASK;
    let spec = SECTIONS
        .get(section_num as usize)
        .ok_or(DeviceError::UnknownSection)?;

    let index = ((key >> KEY_ATTR_POS) & KEY_ATTR_MASK) as u8;
    let attr = spec
        .attrs
        .get(index as usize)
        .ok_or(DeviceError::UnknownAttribute)?;
    if attr.size == 0 {
        // Reserved slot: addressable index range, no attribute behind it.
        return Err(DeviceError::UnknownAttribute);
    }

    let part = (key & KEY_PART_MASK) as u8;
    let part_offset = part as u16 * 4;
    if part_offset >= attr.size as u16 {
        return Err(DeviceError::InvalidPart);
    }

    let mut option = attr.option;
    if matches!(spec.behavior, SectionBehavior::ReadOnly) {
        option.writable = false;
    }

    Ok(AttrRef {
        section: spec.section,
        behavior: spec.behavior,
        index,
        part,
        size: (attr.size as u16 - part_offset).min(4) as u8,
        option,
    })
}

//==================================================================================METADATA
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Descriptive view of one attribute, for diagnostics and tooling.
pub struct AttributeInfo {
    /// Key of the attribute's first part.
    pub key: u16,
    pub name: &'static str,
    pub section: Section,
    /// Total size, bytes.
    pub size: u8,
    pub readable: bool,
    pub writable: bool,
    /// Survives a restart through persistent storage.
    pub persistent: bool,
}

fn info(spec: &SectionSpec, index: u8, attr: &AttrSpec) -> AttributeInfo {
    AttributeInfo {
        key: build_key(spec.section, index, 0),
        name: attr.name,
        section: spec.section,
        size: attr.size,
        readable: attr.option.readable,
        writable: attr.option.writable && !matches!(spec.behavior, SectionBehavior::ReadOnly),
        persistent: matches!(spec.behavior, SectionBehavior::Persistent),
    }
}

/// Describe the attribute addressed by `key`, part bits ignored.
pub fn attribute_by_key(key: u16) -> Result<AttributeInfo, DeviceError> {
    let resolved = resolve(key & !KEY_PART_MASK)?;
    let spec = &SECTIONS[resolved.section as usize];
    Ok(info(
        spec,
        resolved.index,
        &spec.attrs[resolved.index as usize],
    ))
}

/// Visit every non-hidden attribute in table order. Returns the number of
/// attributes visited; the callback may stop the walk early by returning
/// `false`.
pub fn for_each_attribute<F: FnMut(&AttributeInfo) -> bool>(mut f: F) -> usize {
    let mut visited = 0;
    for spec in &SECTIONS {
        for (index, attr) in spec.attrs.iter().enumerate() {
            if attr.option.hidden {
                continue;
            }
            visited += 1;
            if !f(&info(spec, index as u8, attr)) {
                return visited;
            }
        }
    }
    visited
}

//==================================================================================ACCESSORS
/// One little-endian 4-byte window of a wide byte field, zero padded.
fn window(bytes: &[u8], part: u8) -> u32 {
    let mut word = [0u8; 4];
    let start = (part as usize * 4).min(bytes.len());
    let end = (start + 4).min(bytes.len());
    word[..end - start].copy_from_slice(&bytes[start..end]);
    u32::from_le_bytes(word)
}

impl Identification {
    /// Load one resolved identification window.
    pub(crate) fn attr_load(&self, index: u8, part: u8) -> u32 {
        match index {
            0x0 => self.did.to_raw() as u32,
            0x1 => self.version as u32,
            0x2 => window(&self.name, part),
            0x3 => self.magic_number,
            0x6 => self.features,
            _ => 0,
        }
    }
}

impl SystemState {
    /// Load one resolved system window.
    pub(crate) fn attr_load(&self, index: u8) -> u32 {
        match index {
            0x0 => self.uptime_synced,
            0x1 => self.time,
            0x2 => self.uptime,
            0x3 => self.start_time,
            0x4 => self.last_telemetry,
            0x5 => self.received.total,
            0x6 => self.received.read_attribute,
            0x7 => self.received.write_attribute,
            0x8 => self.received.command,
            0x9 => self.received.request_telemetry,
            0xA => self.received.ignored,
            0xB => self.last_telemetry_ms,
            0xC => self.sent.total,
            0xD => self.sent.telemetry,
            0xF => self.last_command_error as u32,
            0x10 => self.last_telemetry_error as u32,
            0x12 => self.battery as u32,
            _ => 0,
        }
    }
}

impl DeviceConfig {
    /// Load one resolved configuration window.
    pub(crate) fn attr_load(&self, index: u8) -> u32 {
        match index {
            0x0 => self.telemetry.period_ms,
            0x1 => self.telemetry.delay_ms as u32,
            0x2 => self.telemetry.delay_min_ms as u32,
            0x3 => self.telemetry.delay_max_ms as u32,
            0x4 => self.flags.to_word() as u32,
            0x5 => self.timezone as u32,
            0x6 => u32::from_le_bytes(self.location),
            0x7..=0xA => self.class0.pulse_duration_ms[index as usize - 0x7],
            0xB => self.class0.outputs_default,
            0xC => self.class0.telemetry_on_change,
            0xD..=0x20 => self.class1.pulse_duration_ms[index as usize - 0xD],
            0x21 => self.class1.directions,
            0x22 => self.class1.outputs_default,
            _ => self.class1.telemetry_on_change,
        }
    }

    /// Store one resolved configuration window. Narrow fields truncate the
    /// incoming value to their width.
    pub(crate) fn attr_store(&mut self, index: u8, value: u32) {
        match index {
            0x0 => self.telemetry.period_ms = value,
            0x1 => self.telemetry.delay_ms = value as u16,
            0x2 => self.telemetry.delay_min_ms = value as u16,
            0x3 => self.telemetry.delay_max_ms = value as u16,
            0x4 => self.flags = ConfigFlags::from_word(value as u8),
            0x5 => self.timezone = value as i32,
            0x6 => self.location = value.to_le_bytes(),
            0x7..=0xA => self.class0.pulse_duration_ms[index as usize - 0x7] = value,
            0xB => self.class0.outputs_default = value,
            0xC => self.class0.telemetry_on_change = value,
            0xD..=0x20 => self.class1.pulse_duration_ms[index as usize - 0xD] = value,
            0x21 => self.class1.directions = value,
            0x22 => self.class1.outputs_default = value,
            _ => self.class1.telemetry_on_change = value,
        }
    }
}
