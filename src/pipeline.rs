//! The weather-then-suggestions pipeline
//!
//! One request flows through two model calls: a grounded weather retrieval,
//! then a schema-constrained clothing/packing call built from the forecast.
//! Suggestions are never attempted without a forecast, and a failure in the
//! suggestion stage fails the whole request: weather without clothing advice
//! is not a useful partial answer. Day-part icons are derived afterwards,
//! with day/night variants decided by the sunrise window when coordinates
//! are available.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::DresscastError;
use crate::daylight::{DayPhase, SunWindow, classify_day_part, sun_window};
use crate::extract::parse_payload;
use crate::gemini::{GenerationMode, ModelClient};
use crate::models::{
    CombinedResult, ConditionIcon, DayPart, ForecastData, PeriodForecast, RawForecast,
    RequestContext, SuggestionEntry, ValidatedRequest,
};
use crate::prompt::{
    build_clothing_prompt, build_travel_clothing_prompt, build_travel_weather_prompt,
    build_weather_prompt,
};
use crate::retry::{AttemptError, RetryPolicy, run_with_retry};

/// Backoff bases per call type
const WEATHER_BACKOFF_BASE: Duration = Duration::from_millis(800);
const SUGGESTION_BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Orchestrates the two-stage model pipeline for one request
pub struct SuggestionPipeline {
    model: Arc<dyn ModelClient>,
    weather_policy: RetryPolicy,
    suggestion_policy: RetryPolicy,
}

impl SuggestionPipeline {
    #[must_use]
    pub fn new(model: Arc<dyn ModelClient>, max_retries: u32) -> Self {
        Self::with_backoff(
            model,
            max_retries,
            WEATHER_BACKOFF_BASE,
            SUGGESTION_BACKOFF_BASE,
        )
    }

    /// Construct with explicit backoff bases (mainly for tests)
    #[must_use]
    pub fn with_backoff(
        model: Arc<dyn ModelClient>,
        max_retries: u32,
        weather_base: Duration,
        suggestion_base: Duration,
    ) -> Self {
        Self {
            model,
            weather_policy: RetryPolicy::new(max_retries, weather_base),
            suggestion_policy: RetryPolicy::new(max_retries, suggestion_base),
        }
    }

    /// Run the full pipeline for a validated request.
    #[instrument(skip(self, request), fields(members = request.family.len()))]
    pub async fn run(&self, request: &ValidatedRequest) -> Result<CombinedResult, DresscastError> {
        let weather_prompt = match &request.context {
            RequestContext::Travel {
                destination_and_duration,
            } => build_travel_weather_prompt(destination_and_duration),
            daily => build_weather_prompt(request.day, daily),
        };

        let forecast = self.fetch_weather(&weather_prompt).await?;
        info!(location = %forecast.location, "forecast retrieved");

        let clothing_prompt = match &request.context {
            RequestContext::Travel { .. } => build_travel_clothing_prompt(&request.family, &forecast),
            _ => build_clothing_prompt(&request.family, &forecast, request.schedule.as_deref()),
        };

        let suggestions = self.fetch_suggestions(&clothing_prompt).await?;
        let suggestions = reorder_suggestions(&request.family, suggestions);
        info!(count = suggestions.len(), "suggestions generated");

        let window = match request.context {
            RequestContext::Geolocation { lat, lon } => Some(sun_window(lat, lon, request.day)),
            _ => None,
        };

        Ok(CombinedResult {
            weather: Some(assemble_forecast(forecast, window)),
            suggestions: Some(suggestions),
        })
    }

    async fn fetch_weather(&self, prompt: &str) -> Result<RawForecast, DresscastError> {
        let mode = GenerationMode::grounded_weather();
        run_with_retry(&self.weather_policy, "weather", |_| {
            let mode = &mode;
            async move {
                let raw = self
                    .model
                    .generate(prompt, mode)
                    .await
                    .map_err(AttemptError::from)?;
                let forecast: RawForecast = parse_payload(&raw).map_err(|e| {
                    AttemptError::retryable_with_raw(
                        format!("unparseable weather payload: {e}"),
                        &raw,
                    )
                })?;
                if forecast.location.trim().is_empty() {
                    return Err(AttemptError::retryable_with_raw(
                        "weather payload has an empty location",
                        &raw,
                    ));
                }
                Ok(forecast)
            }
        })
        .await
    }

    async fn fetch_suggestions(
        &self,
        prompt: &str,
    ) -> Result<Vec<SuggestionEntry>, DresscastError> {
        let mode = GenerationMode::structured_suggestions();
        run_with_retry(&self.suggestion_policy, "suggestions", |_| {
            let mode = &mode;
            async move {
                let raw = self
                    .model
                    .generate(prompt, mode)
                    .await
                    .map_err(AttemptError::from)?;
                let suggestions: Vec<SuggestionEntry> = parse_payload(&raw).map_err(|e| {
                    AttemptError::retryable_with_raw(
                        format!("suggestions payload is not an array of entries: {e}"),
                        &raw,
                    )
                })?;
                Ok(suggestions)
            }
        })
        .await
    }
}

/// Restore roster order: the model is not guaranteed to preserve input
/// order. Entries whose member label matches no roster entry sort last, in
/// their arrival order.
#[must_use]
pub fn reorder_suggestions(
    family: &[String],
    mut suggestions: Vec<SuggestionEntry>,
) -> Vec<SuggestionEntry> {
    let position = |member: &str| {
        family
            .iter()
            .position(|m| m == member)
            .unwrap_or(family.len())
    };
    suggestions.sort_by_key(|entry| position(&entry.member));
    suggestions
}

/// Keyword-based condition-to-icon mapping, case-insensitive, fixed
/// precedence order. `SUNNY` and `PARTLY_CLOUDY` get night variants when the
/// period falls outside the sun window.
#[must_use]
pub fn map_condition_to_icon(condition: &str, phase: DayPhase) -> ConditionIcon {
    let c = condition.to_lowercase();

    let icon = if c.contains("rain") || c.contains("shower") || c.contains("drizzle") {
        ConditionIcon::Rain
    } else if c.contains("snow") || c.contains("sleet") || c.contains("ice") {
        ConditionIcon::Snow
    } else if c.contains("wind") {
        ConditionIcon::Windy
    } else if c.contains("cloud") || c.contains("overcast") {
        if c.contains("partly") || c.contains("scattered") {
            ConditionIcon::PartlyCloudy
        } else {
            ConditionIcon::Cloudy
        }
    } else if c.contains("sun") || c.contains("clear") || c.contains("fair") {
        ConditionIcon::Sunny
    } else {
        ConditionIcon::PartlyCloudy
    };

    if phase == DayPhase::Night {
        match icon {
            ConditionIcon::Sunny => ConditionIcon::ClearNight,
            ConditionIcon::PartlyCloudy => ConditionIcon::PartlyCloudyNight,
            other => other,
        }
    } else {
        icon
    }
}

/// Expand the flat model forecast into the four-period response shape.
#[must_use]
pub fn assemble_forecast(raw: RawForecast, window: Option<SunWindow>) -> ForecastData {
    let effective = window.unwrap_or_default();

    let day_parts = DayPart::ALL
        .iter()
        .map(|&part| {
            let (temp, condition) = raw.part(part);
            let phase = classify_day_part(part.minute_of_day(), effective);
            PeriodForecast {
                period: part.label().to_string(),
                time: part.clock().to_string(),
                temp: temp.round() as i32,
                condition: condition.to_string(),
                condition_icon: map_condition_to_icon(condition, phase),
                is_night: phase == DayPhase::Night,
            }
        })
        .collect();

    ForecastData {
        location: raw.location,
        high_temp: raw.high_temp.round() as i32,
        low_temp: raw.low_temp.round() as i32,
        day_parts,
        date_range: raw.date_range,
        sunrise: window.map(|w| w.sunrise),
        sunset: window.map(|w| w.sunset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rstest::rstest;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Scripted model: pops one canned reply per call.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, String>>>,
        calls: AtomicU32,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|r| r.map(String::from).map_err(String::from))
                        .collect(),
                ),
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(
            &self,
            _prompt: &str,
            _mode: &GenerationMode,
        ) -> Result<String, DresscastError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(text)) => Ok(text),
                Some(Err(message)) => Err(DresscastError::model(message)),
                None => Err(DresscastError::model("script exhausted")),
            }
        }
    }

    fn weather_json() -> String {
        serde_json::json!({
            "location": "Zurich, Switzerland",
            "highTemp": 14, "lowTemp": 4,
            "temp07": 5, "temp12": 13, "temp17": 11, "temp22": 6,
            "condition07": "Clear", "condition12": "Sunny",
            "condition17": "Partly cloudy", "condition22": "Clear",
        })
        .to_string()
    }

    fn suggestions_json(members: &[&str]) -> String {
        let entries: Vec<_> = members
            .iter()
            .map(|m| {
                serde_json::json!({
                    "member": m,
                    "outfit": ["Jacket"],
                    "notes": format!("Notes for {m}")
                })
            })
            .collect();
        serde_json::to_string(&entries).unwrap()
    }

    fn location_request(family: &[&str]) -> ValidatedRequest {
        ValidatedRequest {
            context: RequestContext::NamedLocation {
                location: "Zurich".to_string(),
            },
            family: family.iter().map(|s| s.to_string()).collect(),
            day: crate::models::Day::Today,
            schedule: None,
        }
    }

    fn fast_pipeline(model: Arc<dyn ModelClient>) -> SuggestionPipeline {
        SuggestionPipeline::with_backoff(
            model,
            3,
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_full_run_restores_roster_order() {
        let model = ScriptedModel::new(vec![
            Ok(&weather_json()),
            Ok(&suggestions_json(&["C", "A", "B"])),
        ]);
        let pipeline = fast_pipeline(model.clone());

        let result = pipeline.run(&location_request(&["A", "B", "C"])).await.unwrap();
        let suggestions = result.suggestions.unwrap();
        let order: Vec<_> = suggestions.iter().map(|s| s.member.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_weather_failure_skips_suggestion_stage() {
        let model = ScriptedModel::new(vec![Err("503"), Err("503"), Err("503")]);
        let pipeline = fast_pipeline(model.clone());

        let err = pipeline
            .run(&location_request(&["Adult"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DresscastError::RetriesExhausted { attempts: 3, .. }));
        // all three calls were weather attempts; no suggestion call happened
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_suggestion_failure_fails_whole_request() {
        let model = ScriptedModel::new(vec![
            Ok(&weather_json()),
            Err("overloaded"),
            Err("overloaded"),
            Err("overloaded"),
        ]);
        let pipeline = fast_pipeline(model.clone());

        let err = pipeline
            .run(&location_request(&["Adult"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DresscastError::RetriesExhausted { .. }));
        assert_eq!(model.calls(), 4);
    }

    #[tokio::test]
    async fn test_prose_wrapped_weather_retries_then_succeeds() {
        let fenced = format!("Here you go:\n```json\n{}\n```", weather_json());
        let model = ScriptedModel::new(vec![
            Ok("Sorry, I could not find any data."),
            Ok(&fenced),
            Ok(&suggestions_json(&["Adult"])),
        ]);
        let pipeline = fast_pipeline(model.clone());

        let result = pipeline.run(&location_request(&["Adult"])).await.unwrap();
        assert_eq!(result.weather.unwrap().location, "Zurich, Switzerland");
        assert_eq!(model.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_location_is_a_retryable_violation() {
        let empty_location = weather_json().replace("Zurich, Switzerland", "  ");
        let model = ScriptedModel::new(vec![
            Ok(&empty_location),
            Ok(&weather_json()),
            Ok(&suggestions_json(&["Adult"])),
        ]);
        let pipeline = fast_pipeline(model.clone());

        let result = pipeline.run(&location_request(&["Adult"])).await.unwrap();
        assert_eq!(result.weather.unwrap().location, "Zurich, Switzerland");
    }

    #[rstest]
    #[case::rain_showers("Light rain showers", DayPhase::Day, ConditionIcon::Rain)]
    #[case::drizzle("Drizzle", DayPhase::Night, ConditionIcon::Rain)]
    #[case::sleet("Sleet and ice", DayPhase::Day, ConditionIcon::Snow)]
    #[case::windy("Strong wind", DayPhase::Day, ConditionIcon::Windy)]
    #[case::partly_day("Partly cloudy", DayPhase::Day, ConditionIcon::PartlyCloudy)]
    #[case::partly_night("Partly cloudy", DayPhase::Night, ConditionIcon::PartlyCloudyNight)]
    #[case::scattered("Scattered clouds", DayPhase::Day, ConditionIcon::PartlyCloudy)]
    #[case::overcast("Overcast", DayPhase::Night, ConditionIcon::Cloudy)]
    #[case::sunny_day("Sunny", DayPhase::Day, ConditionIcon::Sunny)]
    #[case::clear_night("Clear skies", DayPhase::Night, ConditionIcon::ClearNight)]
    #[case::unknown("Haze", DayPhase::Day, ConditionIcon::PartlyCloudy)]
    #[case::unknown_night("Haze", DayPhase::Night, ConditionIcon::PartlyCloudyNight)]
    #[case::rainy_sun_mix("Sunny with rain showers", DayPhase::Day, ConditionIcon::Rain)]
    fn test_condition_icon_mapping(
        #[case] condition: &str,
        #[case] phase: DayPhase,
        #[case] expected: ConditionIcon,
    ) {
        assert_eq!(map_condition_to_icon(condition, phase), expected);
    }

    #[test]
    fn test_unknown_members_sort_last() {
        let family = vec!["A".to_string(), "B".to_string()];
        let entries = vec![
            SuggestionEntry {
                member: "Stranger".to_string(),
                outfit: vec![],
                notes: String::new(),
            },
            SuggestionEntry {
                member: "B".to_string(),
                outfit: vec![],
                notes: String::new(),
            },
            SuggestionEntry {
                member: "A".to_string(),
                outfit: vec![],
                notes: String::new(),
            },
        ];
        let order: Vec<_> = reorder_suggestions(&family, entries)
            .into_iter()
            .map(|e| e.member)
            .collect();
        assert_eq!(order, vec!["A", "B", "Stranger"]);
    }

    #[test]
    fn test_assemble_forecast_marks_night_parts() {
        let raw: RawForecast = serde_json::from_str(&weather_json()).unwrap();
        let window = SunWindow {
            sunrise: 6 * 60 + 45,
            sunset: 18 * 60,
        };
        let forecast = assemble_forecast(raw, Some(window));

        assert_eq!(forecast.day_parts.len(), 4);
        // 07:00 is after sunrise, 17:00 before an 18:00 sunset, 22:00 after
        assert!(!forecast.day_parts[0].is_night);
        assert!(!forecast.day_parts[2].is_night);
        assert!(forecast.day_parts[3].is_night);
        // "Clear" at 22:00 becomes the night variant
        assert_eq!(
            forecast.day_parts[3].condition_icon,
            ConditionIcon::ClearNight
        );
        assert_eq!(forecast.sunrise, Some(6 * 60 + 45));
        assert_eq!(forecast.sunset, Some(18 * 60));
    }

    #[test]
    fn test_assemble_forecast_without_window_uses_default_and_omits_fields() {
        let raw: RawForecast = serde_json::from_str(&weather_json()).unwrap();
        let forecast = assemble_forecast(raw, None);
        assert!(forecast.sunrise.is_none());
        assert!(forecast.sunset.is_none());
        // default 18:30 sunset still puts the 22:00 part at night
        assert!(forecast.day_parts[3].is_night);
    }
}
