use std::fmt;

/// Register map of the deployed Komfovent Domekt controller
///
/// A closed enumeration mapping symbolic names to the one-based register
/// numbers of the device documentation. The wire protocol addresses
/// registers zero-based; the codec performs that translation, callers
/// always work with the numbers printed in the device manual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Register {
    /// Unit on/off state
    Power = 1,
    /// Operating mode selector
    OperatingMode = 2,
    /// Configured fan level
    FanLevel = 3,
    /// Supply air temperature setpoint, 0.1 degree steps
    TemperatureSetpoint = 4,
    /// Measured supply air temperature
    SupplyTemperature = 5,
    /// Measured extract air temperature
    ExtractTemperature = 6,
    /// Measured outdoor air temperature
    OutdoorTemperature = 7,
    /// Device clock: hour in the high byte, minute packed in the low byte
    HourAndMinute = 29,
    /// Device clock: month in the high byte, day in the low byte
    MonthAndDay = 30,
    /// Device clock: four-digit year
    Year = 31,
}

impl Register {
    /// Get the one-based register number from the device documentation
    pub fn number(self) -> u16 {
        self as u16
    }

    /// Get the zero-based register offset used on the wire
    pub fn wire_offset(self) -> u16 {
        self.number() - 1
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
