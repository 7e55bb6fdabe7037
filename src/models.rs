//! Wire and domain types for the suggestion pipeline
//!
//! The inbound request is deserialized loosely and upgraded to a validated
//! form explicitly, so malformed bodies surface as 400s with a proper error
//! payload instead of a transport-level rejection. Each pipeline stage has
//! its own type: `RawForecast` is what the model returns, `ForecastData` and
//! `SuggestionEntry` are what clients receive.

use serde::{Deserialize, Serialize};

use crate::DresscastError;

/// Maximum number of schedule characters embedded in a prompt
pub const SCHEDULE_MAX_CHARS: usize = 300;

/// Which day the forecast covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    #[default]
    Today,
    Tomorrow,
}

/// The four fixed forecast periods and their representative clock times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayPart {
    pub const ALL: [DayPart; 4] = [
        DayPart::Morning,
        DayPart::Afternoon,
        DayPart::Evening,
        DayPart::Night,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
            DayPart::Night => "Night",
        }
    }

    /// Representative time in HH:MM format
    #[must_use]
    pub fn clock(self) -> &'static str {
        match self {
            DayPart::Morning => "07:00",
            DayPart::Afternoon => "12:00",
            DayPart::Evening => "17:00",
            DayPart::Night => "22:00",
        }
    }

    /// Representative time as minutes since midnight
    #[must_use]
    pub fn minute_of_day(self) -> u32 {
        match self {
            DayPart::Morning => 7 * 60,
            DayPart::Afternoon => 12 * 60,
            DayPart::Evening => 17 * 60,
            DayPart::Night => 22 * 60,
        }
    }
}

/// Icon keyword attached to each day-part condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionIcon {
    Sunny,
    Cloudy,
    PartlyCloudy,
    Rain,
    Snow,
    Windy,
    ClearNight,
    PartlyCloudyNight,
}

/// Inbound request body for `POST /suggestions`, before validation.
///
/// All fields are optional at this stage; `validate` enforces the
/// per-`requestType` requirements.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSuggestionRequest {
    pub request_type: Option<String>,
    pub family: Option<Vec<String>>,
    pub day: Option<String>,
    pub schedule: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub location: Option<String>,
    pub destination_and_duration: Option<String>,
}

/// Where the forecast should be anchored
#[derive(Debug, Clone, PartialEq)]
pub enum RequestContext {
    Geolocation { lat: f64, lon: f64 },
    NamedLocation { location: String },
    Travel { destination_and_duration: String },
}

/// A fully validated suggestion request
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub context: RequestContext,
    /// Ordered family roster; suggestion output must match this order
    pub family: Vec<String>,
    pub day: Day,
    /// Already truncated to [`SCHEDULE_MAX_CHARS`]
    pub schedule: Option<String>,
}

impl RawSuggestionRequest {
    /// Enforce the per-variant field requirements and produce a typed request.
    pub fn validate(self) -> Result<ValidatedRequest, DresscastError> {
        let family = self
            .family
            .ok_or_else(|| DresscastError::validation("family is required"))?;
        if family.is_empty() || family.iter().all(|m| m.trim().is_empty()) {
            return Err(DresscastError::validation(
                "family must contain at least one member",
            ));
        }

        let day = match self.day.as_deref() {
            None => Day::Today,
            Some("today") => Day::Today,
            Some("tomorrow") => Day::Tomorrow,
            Some(other) => {
                return Err(DresscastError::validation(format!(
                    "day must be 'today' or 'tomorrow', got '{other}'"
                )));
            }
        };

        let schedule = self
            .schedule
            .map(|s| truncate_schedule(&s))
            .filter(|s| !s.trim().is_empty());

        let context = match self.request_type.as_deref() {
            Some("geolocation") => {
                let lat = self
                    .lat
                    .ok_or_else(|| DresscastError::validation("lat is required for geolocation"))?;
                let lon = self
                    .lon
                    .ok_or_else(|| DresscastError::validation("lon is required for geolocation"))?;
                if !(-90.0..=90.0).contains(&lat) {
                    return Err(DresscastError::validation(format!(
                        "lat must be between -90 and 90, got {lat}"
                    )));
                }
                if !(-180.0..=180.0).contains(&lon) {
                    return Err(DresscastError::validation(format!(
                        "lon must be between -180 and 180, got {lon}"
                    )));
                }
                RequestContext::Geolocation { lat, lon }
            }
            Some("location") => {
                let location = self
                    .location
                    .filter(|l| !l.trim().is_empty())
                    .ok_or_else(|| DresscastError::validation("location is required"))?;
                RequestContext::NamedLocation { location }
            }
            Some("travel") => {
                let destination_and_duration = self
                    .destination_and_duration
                    .filter(|d| !d.trim().is_empty())
                    .ok_or_else(|| {
                        DresscastError::validation("destinationAndDuration is required for travel")
                    })?;
                RequestContext::Travel {
                    destination_and_duration,
                }
            }
            Some(other) => {
                return Err(DresscastError::validation(format!(
                    "unknown requestType '{other}'"
                )));
            }
            None => return Err(DresscastError::validation("requestType is required")),
        };

        Ok(ValidatedRequest {
            context,
            family,
            day,
            schedule,
        })
    }
}

/// Truncate schedule text to the prompt budget, respecting char boundaries.
#[must_use]
pub fn truncate_schedule(schedule: &str) -> String {
    schedule.chars().take(SCHEDULE_MAX_CHARS).collect()
}

/// Flat forecast payload as requested from the model (weather call)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawForecast {
    pub location: String,
    pub high_temp: f64,
    pub low_temp: f64,
    pub temp07: f64,
    pub temp12: f64,
    pub temp17: f64,
    pub temp22: f64,
    pub condition07: String,
    pub condition12: String,
    pub condition17: String,
    pub condition22: String,
    #[serde(default)]
    pub date_range: Option<String>,
}

impl RawForecast {
    /// Temperature and condition for one of the four fixed periods
    #[must_use]
    pub fn part(&self, part: DayPart) -> (f64, &str) {
        match part {
            DayPart::Morning => (self.temp07, &self.condition07),
            DayPart::Afternoon => (self.temp12, &self.condition12),
            DayPart::Evening => (self.temp17, &self.condition17),
            DayPart::Night => (self.temp22, &self.condition22),
        }
    }
}

/// One rendered forecast period in the response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodForecast {
    pub period: String,
    pub time: String,
    pub temp: i32,
    pub condition: String,
    pub condition_icon: ConditionIcon,
    pub is_night: bool,
}

/// Forecast as returned to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastData {
    pub location: String,
    pub high_temp: i32,
    pub low_temp: i32,
    pub day_parts: Vec<PeriodForecast>,
    /// Interpreted trip dates; present for travel requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
    /// Minutes since midnight, local time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<u32>,
}

/// Clothing or packing advice for one roster member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionEntry {
    /// Must match a roster entry verbatim
    pub member: String,
    pub outfit: Vec<String>,
    pub notes: String,
}

/// The combined `{weather, suggestions}` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<ForecastData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<SuggestionEntry>>,
}
