//! Battery level from the ADC reading
//!
//! The cell is measured through a 1:2 resistor divider on a 12-bit ADC
//! channel with a 3.3 V full scale.

/// Full-scale ADC count
pub const ADC_MAX: u16 = 4095;

/// Voltage at full-scale count, before the divider (mV)
pub const ADC_REFERENCE_MV: u32 = 3300;

pub const DIVIDER_RATIO: u32 = 2;

/// Empty cell (mV)
pub const BATTERY_MIN_MV: u32 = 3000;

/// Full cell (mV)
pub const BATTERY_MAX_MV: u32 = 4200;

/// Battery voltage in millivolts for a raw ADC count
pub fn millivolts_from_raw(raw: u16) -> u32 {
    let raw = u32::from(raw.min(ADC_MAX));
    raw * ADC_REFERENCE_MV * DIVIDER_RATIO / u32::from(ADC_MAX)
}

/// Linear charge estimate, clamped to 0-100
pub fn percent_from_millivolts(mv: u32) -> u8 {
    if mv <= BATTERY_MIN_MV {
        return 0;
    }
    if mv >= BATTERY_MAX_MV {
        return 100;
    }
    ((mv - BATTERY_MIN_MV) * 100 / (BATTERY_MAX_MV - BATTERY_MIN_MV)) as u8
}

pub fn percent_from_raw(raw: u16) -> u8 {
    percent_from_millivolts(millivolts_from_raw(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_scale_reads_6600_mv() {
        assert_eq!(millivolts_from_raw(ADC_MAX), 6600);
        assert_eq!(millivolts_from_raw(u16::MAX), 6600);
    }

    #[test]
    fn clamps_to_range() {
        assert_eq!(percent_from_raw(0), 0);
        assert_eq!(percent_from_raw(ADC_MAX), 100);
        assert_eq!(percent_from_millivolts(2_900), 0);
        assert_eq!(percent_from_millivolts(4_300), 100);
    }

    #[test]
    fn midpoint() {
        assert_eq!(percent_from_millivolts(3_600), 50);
        // 2234 counts -> 3600 mV
        assert_eq!(percent_from_raw(2234), 50);
    }
}
