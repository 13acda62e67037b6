//! Caption clock times
//!
//! Caption management (OTM) and caption statement (STM) blocks may carry a
//! 36-bit BCD clock time `hhmmssmmm` followed by 4 reserved bits.

use std::fmt::{Display, Formatter};

use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::errors::TimestampError;
use anyhow::{Result, bail};
use log::{debug, trace};

/// BCD clock time with millisecond precision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClockTime {
    pub hours: u16,
    pub minutes: u16,
    pub seconds: u16,
    pub milliseconds: u16,
}

impl Display for ClockTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

impl ClockTime {
    /// Reads the 36-bit time and skips the 4 reserved bits after it.
    ///
    /// The field is always consumed. A time that is not valid BCD yields
    /// `None`; only running out of input is an error.
    pub fn read(reader: &mut BsIoSliceReader) -> Result<Option<Self>> {
        let hours: u16 = reader.get_n(8)?;
        let minutes: u16 = reader.get_n(8)?;
        let seconds: u16 = reader.get_n(8)?;
        let milliseconds: u16 = reader.get_n(12)?;
        reader.skip_n(4)?;

        match Self::from_bcd(hours, minutes, seconds, milliseconds) {
            Ok(time) => {
                trace!("Clock time: {time}");
                Ok(Some(time))
            }
            Err(e) => {
                debug!("Ignoring clock time: {e}");
                Ok(None)
            }
        }
    }

    fn from_bcd(hours: u16, minutes: u16, seconds: u16, milliseconds: u16) -> Result<Self> {
        Ok(ClockTime {
            hours: Self::parse_bcd(hours, 2)?,
            minutes: Self::parse_bcd(minutes, 2)?,
            seconds: Self::parse_bcd(seconds, 2)?,
            milliseconds: Self::parse_bcd(milliseconds, 3)?,
        })
    }

    pub fn as_millis(&self) -> u64 {
        ((self.hours as u64 * 60 + self.minutes as u64) * 60 + self.seconds as u64) * 1000
            + self.milliseconds as u64
    }

    pub fn parse_bcd(value: u16, digits: u32) -> Result<u16> {
        let mut result = 0;

        for i in (0..digits).rev() {
            let digit = (value >> (4 * i)) & 0xF;
            if digit > 9 {
                bail!(TimestampError::InvalidBcdDigit(value));
            }
            result = result * 10 + digit;
        }

        Ok(result)
    }
}

#[test]
fn read_clock_time() -> Result<()> {
    // 01:23:45.678 followed by the reserved nibble
    let data = [0x01, 0x23, 0x45, 0x67, 0x8F];
    let mut reader = BsIoSliceReader::from_slice(&data);

    let time = ClockTime::read(&mut reader)?.expect("valid time");
    assert_eq!(format!("{time}"), "01:23:45.678");
    assert_eq!(time.as_millis(), 5_025_678);
    assert_eq!(reader.available()?, 0);
    Ok(())
}

#[test]
fn reject_invalid_bcd() {
    assert!(ClockTime::parse_bcd(0x1A, 2).is_err());
    assert_eq!(ClockTime::parse_bcd(0x999, 3).ok(), Some(999));
}

#[test]
fn invalid_time_is_consumed_and_ignored() -> Result<()> {
    let data = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
    let mut reader = BsIoSliceReader::from_slice(&data);

    assert_eq!(ClockTime::read(&mut reader)?, None);
    assert_eq!(reader.available()?, 8);

    let mut short = BsIoSliceReader::from_slice(&data[..3]);
    assert!(ClockTime::read(&mut short).is_err());
    Ok(())
}
