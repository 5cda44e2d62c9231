use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

// Modbus RTU uses 11-bit characters (1 start, 8 data, 1 parity or stop, 1 stop)
const NUM_BITS_IN_CHAR: u64 = 11;

// Above this baud rate the serial line recommendation fixes the timeouts
const MAX_BAUD_RATE: u32 = 19200;
const FIXED_INTER_CHARACTER: Duration = Duration::from_micros(750);
const FIXED_FRAME: Duration = Duration::from_micros(1750);

/// How the computed RTU timeouts are adjusted before they are applied
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Use the computed values unchanged
    Nominal,
    /// Multiply both values by a factor
    Scaled(u32),
    /// Use the fixed 750µs / 1750µs values above 19200 baud
    ModbusFloor,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy::Scaled(2)
    }
}

/// Silence intervals used to delimit and time out RTU frames
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RtuTiming {
    /// silence that ends a frame once bytes have been received
    pub inter_character_timeout: Duration,
    /// idle read timeout while waiting for the start of a frame
    pub frame_timeout: Duration,
}

impl RtuTiming {
    /// Compute the timeouts for `baud_rate` and adjust them per `policy`
    pub fn calculate(baud_rate: u32, policy: TimeoutPolicy) -> Result<Self, SimError> {
        if baud_rate == 0 {
            return Err(SimError::InvalidBaudRate(baud_rate));
        }

        if matches!(policy, TimeoutPolicy::ModbusFloor) && baud_rate > MAX_BAUD_RATE {
            return Ok(Self {
                inter_character_timeout: FIXED_INTER_CHARACTER,
                frame_timeout: FIXED_FRAME,
            });
        }

        let character_time = Duration::from_secs(NUM_BITS_IN_CHAR) / baud_rate;
        let nominal = Self {
            // multiply by 1.5
            inter_character_timeout: 3 * character_time / 2,
            frame_timeout: 10 * character_time,
        };

        Ok(match policy {
            TimeoutPolicy::Scaled(factor) => Self {
                inter_character_timeout: nominal.inter_character_timeout * factor,
                frame_timeout: nominal.frame_timeout * factor,
            },
            TimeoutPolicy::Nominal | TimeoutPolicy::ModbusFloor => nominal,
        })
    }
}

impl std::fmt::Display for RtuTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "inter-character: {} μs frame: {} μs",
            self.inter_character_timeout.as_micros(),
            self.frame_timeout.as_micros()
        )
    }
}
