//! EPA PM2.5 air quality index.

/// (concentration low, concentration high, AQI low, AQI high), µg/m³
const PM25_BREAKPOINTS: [(f64, f64, u16, u16); 6] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 500.4, 301, 500),
];

pub const AQI_MAX: u16 = 500;

/// Map a PM2.5 concentration to AQI by linear interpolation inside its band.
///
/// Concentrations are truncated to 0.1 µg/m³ first, so nothing falls between
/// bands. Anything above the top band is capped at 500; negative or NaN
/// input reads as 0.
pub fn aqi_from_pm25(pm25: f64) -> u16 {
    if pm25.is_nan() || pm25 <= 0.0 {
        return 0;
    }

    let c = ((pm25 * 10.0) + 1e-9).floor() / 10.0;
    let top = PM25_BREAKPOINTS[PM25_BREAKPOINTS.len() - 1].1;
    if c > top {
        return AQI_MAX;
    }

    PM25_BREAKPOINTS
        .iter()
        .find(|(lo, hi, _, _)| (*lo..=*hi).contains(&c))
        .map(|&(bp_lo, bp_hi, aqi_lo, aqi_hi)| {
            let (aqi_lo, aqi_hi) = (f64::from(aqi_lo), f64::from(aqi_hi));
            let aqi = (aqi_hi - aqi_lo) / (bp_hi - bp_lo) * (c - bp_lo) + aqi_lo;
            aqi.round() as u16
        })
        .unwrap_or(0)
}
