//! Board-control system command byte: the trailing byte of a full command
//! payload on the board-control endpoint, packing reset, watchdog, and
//! inhibit requests.
//!
//! Bit layout, from the LSB:
//!
//! | bits | field                                      |
//! |------|--------------------------------------------|
//! | 0    | hard reset                                 |
//! | 1    | software reset                             |
//! | 2    | watchdog-forced reset                      |
//! | 3-4  | watchdog command (none/on/off/toggle)      |
//! | 5    | configuration reset                        |
//! | 6-7  | inhibit command (none/on/off/pulse)        |

//==================================================================================SUB_COMMANDS
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Two-state sub-command controlling the hardware watchdog.
pub enum TwoStateCmd {
    None = 0,
    On = 1,
    Off = 2,
    Toggle = 3,
}

impl TwoStateCmd {
    pub const fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => TwoStateCmd::None,
            1 => TwoStateCmd::On,
            2 => TwoStateCmd::Off,
            _ => TwoStateCmd::Toggle,
        }
    }
}

impl Default for TwoStateCmd {
    fn default() -> Self {
        TwoStateCmd::None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Pulse-capable sub-command controlling the inhibit state.
pub enum PulseCmd {
    None = 0,
    On = 1,
    Off = 2,
    Pulse = 3,
}

impl PulseCmd {
    pub const fn from_raw(raw: u8) -> Self {
        match raw & 0x3 {
            0 => PulseCmd::None,
            1 => PulseCmd::On,
            2 => PulseCmd::Off,
            _ => PulseCmd::Pulse,
        }
    }
}

impl Default for PulseCmd {
    fn default() -> Self {
        PulseCmd::None
    }
}

//==================================================================================SYSTEM_COMMAND
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Individual system command dispatched to the application callback.
pub enum SystemCommand {
    InhibitOn,
    InhibitOff,
    InhibitPulse,
    ConfigReset,
    WatchdogEnable,
    WatchdogDisable,
    WatchdogToggle,
    Reset,
    WatchdogReset,
    SoftReset,
}

//==================================================================================SYSTEM_CONTROL
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
/// Decoded system control byte.
pub struct SystemControl {
    pub reset: bool,
    pub software_reset: bool,
    pub watchdog_reset: bool,
    pub watchdog: TwoStateCmd,
    pub config_reset: bool,
    pub inhibit: PulseCmd,
}

impl SystemControl {
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            reset: byte & 0x01 != 0,
            software_reset: byte & 0x02 != 0,
            watchdog_reset: byte & 0x04 != 0,
            watchdog: TwoStateCmd::from_raw(byte >> 3),
            config_reset: byte & 0x20 != 0,
            inhibit: PulseCmd::from_raw(byte >> 6),
        }
    }

    pub const fn to_byte(self) -> u8 {
        (self.reset as u8)
            | ((self.software_reset as u8) << 1)
            | ((self.watchdog_reset as u8) << 2)
            | ((self.watchdog as u8) << 3)
            | ((self.config_reset as u8) << 5)
            | ((self.inhibit as u8) << 6)
    }

    /// Requested commands in dispatch priority order: inhibit changes first,
    /// then configuration reset, watchdog control, hard reset,
    /// watchdog-forced reset, and software reset last.
    pub fn commands(self) -> impl Iterator<Item = SystemCommand> {
        let inhibit = match self.inhibit {
            PulseCmd::None => None,
            PulseCmd::On => Some(SystemCommand::InhibitOn),
            PulseCmd::Off => Some(SystemCommand::InhibitOff),
            PulseCmd::Pulse => Some(SystemCommand::InhibitPulse),
        };
        let watchdog = match self.watchdog {
            TwoStateCmd::None => None,
            TwoStateCmd::On => Some(SystemCommand::WatchdogEnable),
            TwoStateCmd::Off => Some(SystemCommand::WatchdogDisable),
            TwoStateCmd::Toggle => Some(SystemCommand::WatchdogToggle),
        };

        [
            inhibit,
            self.config_reset.then_some(SystemCommand::ConfigReset),
            watchdog,
            self.reset.then_some(SystemCommand::Reset),
            self.watchdog_reset.then_some(SystemCommand::WatchdogReset),
            self.software_reset.then_some(SystemCommand::SoftReset),
        ]
        .into_iter()
        .flatten()
    }
}
