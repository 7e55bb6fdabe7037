//! Sunrise/sunset lookup and day/night classification
//!
//! The classification is a pure function over minutes-since-midnight so it
//! can be tested apart from the lookup. The lookup itself is an optional
//! enrichment: it only runs when the request carries coordinates, and any
//! failure degrades to a fixed 06:30/18:30 window instead of failing the
//! request.

use chrono::{DateTime, Days, Timelike, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::debug;

use crate::models::Day;

/// Fallback window used when no sunrise/sunset data is available
pub const DEFAULT_SUNRISE_MINUTES: u32 = 6 * 60 + 30;
pub const DEFAULT_SUNSET_MINUTES: u32 = 18 * 60 + 30;

/// Sunrise and sunset as minutes since local midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunWindow {
    pub sunrise: u32,
    pub sunset: u32,
}

impl Default for SunWindow {
    fn default() -> Self {
        Self {
            sunrise: DEFAULT_SUNRISE_MINUTES,
            sunset: DEFAULT_SUNSET_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPhase {
    Day,
    Night,
}

/// Classify a clock time: night at or after sunset, night before sunrise.
#[must_use]
pub fn classify_day_part(minute_of_day: u32, window: SunWindow) -> DayPhase {
    if minute_of_day < window.sunrise || minute_of_day >= window.sunset {
        DayPhase::Night
    } else {
        DayPhase::Day
    }
}

/// Compute the sun window for coordinates, falling back to the default on
/// any failure.
#[must_use]
pub fn sun_window(lat: f64, lon: f64, day: Day) -> SunWindow {
    match compute_sun_window(lat, lon, day) {
        Ok(window) => window,
        Err(e) => {
            debug!(lat, lon, error = %e, "sunrise lookup failed, using default window");
            SunWindow::default()
        }
    }
}

fn compute_sun_window(lat: f64, lon: f64, day: Day) -> anyhow::Result<SunWindow> {
    let today = Utc::now().date_naive();
    let date = match day {
        Day::Today => today,
        Day::Tomorrow => today
            .checked_add_days(Days::new(1))
            .ok_or_else(|| anyhow::anyhow!("date overflow"))?,
    };

    let coordinates = Coordinates::new(lat, lon)
        .ok_or_else(|| anyhow::anyhow!("invalid coordinates: lat={lat}, lon={lon}"))?;
    let solar_day = SolarDay::new(coordinates, date);

    // No event during polar day/night; the caller degrades to the
    // default window.
    let sunrise = solar_day
        .event_time(SolarEvent::Sunrise)
        .ok_or_else(|| anyhow::anyhow!("no sunrise at lat={lat} on {date}"))?;
    let sunset = solar_day
        .event_time(SolarEvent::Sunset)
        .ok_or_else(|| anyhow::anyhow!("no sunset at lat={lat} on {date}"))?;

    // Local minute-of-day approximated from longitude (15 degrees per hour);
    // the forecast's day-part clocks are civil times, so a coarse offset is
    // enough for a day/night split.
    let offset_minutes = (lon / 15.0 * 60.0).round() as i64;

    Ok(SunWindow {
        sunrise: to_local_minutes(sunrise, offset_minutes),
        sunset: to_local_minutes(sunset, offset_minutes),
    })
}

fn to_local_minutes(time: DateTime<Utc>, offset_minutes: i64) -> u32 {
    let utc_minutes = i64::from(time.hour() * 60 + time.minute());
    (utc_minutes + offset_minutes).rem_euclid(24 * 60) as u32
}
