//! Prompt construction for the weather and clothing model calls
//!
//! Pure string formatting, no I/O. The weather prompts ask for the flat
//! field layout in [`crate::models::RawForecast`]; the clothing prompts embed
//! a forecast that was already retrieved and ask for the suggestions array.

use crate::models::{Day, RawForecast, RequestContext, truncate_schedule};

fn location_phrase(context: &RequestContext) -> String {
    match context {
        RequestContext::Geolocation { lat, lon } => {
            format!("at latitude {lat} and longitude {lon}")
        }
        RequestContext::NamedLocation { location } => {
            format!("for the location \"{location}\"")
        }
        RequestContext::Travel {
            destination_and_duration,
        } => format!("for an upcoming trip to {destination_and_duration}"),
    }
}

fn day_phrase(day: Day) -> &'static str {
    match day {
        Day::Today => "for today",
        Day::Tomorrow => "for tomorrow",
    }
}

fn schedule_clause(schedule: Option<&str>) -> String {
    match schedule.map(truncate_schedule) {
        Some(s) if !s.trim().is_empty() => format!(
            " The user has provided a schedule: \"{s}\". Suggestions MUST be tailored to these activities."
        ),
        _ => String::new(),
    }
}

/// Prompt for the grounded daily weather call.
#[must_use]
pub fn build_weather_prompt(day: Day, context: &RequestContext) -> String {
    format!(
        "Using real-time weather data from Google Search {} {}, provide the weather forecast.\n\
         If the location is in Switzerland, prioritize weather data from MeteoSchweiz. \
         For all other locations, use the best available real-time weather data.\n\
         The response MUST be a single, valid JSON object with these exact fields:\n\
         - \"location\": the city and region (e.g., \"Zurich, Switzerland\")\n\
         - \"highTemp\": the day's high temperature in Celsius (number)\n\
         - \"lowTemp\": the day's low temperature in Celsius (number)\n\
         - \"temp07\": temperature at 7:00 AM in Celsius (number)\n\
         - \"temp12\": temperature at 12:00 noon in Celsius (number)\n\
         - \"temp17\": temperature at 5:00 PM in Celsius (number)\n\
         - \"temp22\": temperature at 10:00 PM in Celsius (number)\n\
         - \"condition07\": brief weather condition at 7:00 AM (e.g., \"Clear\", \"Cloudy\", \"Light rain\")\n\
         - \"condition12\": brief weather condition at 12:00 noon\n\
         - \"condition17\": brief weather condition at 5:00 PM\n\
         - \"condition22\": brief weather condition at 10:00 PM\n\n\
         Use Google Search to get accurate, real-time weather data. Do not make up or estimate temperatures.",
        day_phrase(day),
        location_phrase(context),
    )
}

/// Prompt for the structured clothing-suggestion call, built from an already
/// retrieved forecast.
#[must_use]
pub fn build_clothing_prompt(
    family: &[String],
    forecast: &RawForecast,
    schedule: Option<&str>,
) -> String {
    let members = family.join(", ");
    format!(
        "Based on the following weather forecast for {location}:\n\
         - High: {high}\u{b0}C, Low: {low}\u{b0}C\n\
         - 7:00 AM: {t07}\u{b0}C, {c07}\n\
         - 12:00 noon: {t12}\u{b0}C, {c12}\n\
         - 5:00 PM: {t17}\u{b0}C, {c17}\n\
         - 10:00 PM: {t22}\u{b0}C, {c22}\n\n\
         Provide clothing suggestions for a family consisting of: {members}.{schedule}\n\n\
         The response MUST be a JSON array of objects. Each object must contain:\n\
         - \"member\": a string matching one of the provided family members ({members})\n\
         - \"outfit\": an array of strings listing clothing items. For items only needed for a \
         specific part of the day, specify when (e.g., \"Rain jacket (for evening)\"). If a \
         suggestion is specifically for an activity in the provided schedule, mention it in \
         parentheses (e.g., \"Running shoes (for morning run)\").\n\
         - \"notes\": a string with a brief explanation of the outfit choices based on the \
         weather forecast and schedule.\n\n\
         Clothing suggestions must be practical for the full day's temperature range and \
         conditions. Consider local clothing norms and styles for {location}.",
        location = forecast.location,
        high = forecast.high_temp,
        low = forecast.low_temp,
        t07 = forecast.temp07,
        c07 = forecast.condition07,
        t12 = forecast.temp12,
        c12 = forecast.condition12,
        t17 = forecast.temp17,
        c17 = forecast.condition17,
        t22 = forecast.temp22,
        c22 = forecast.condition22,
        members = members,
        schedule = schedule_clause(schedule),
    )
}

/// Prompt for the grounded travel weather call; asks the model to resolve a
/// natural-language date range into concrete dates.
#[must_use]
pub fn build_travel_weather_prompt(destination_and_duration: &str) -> String {
    format!(
        "Using real-time weather data from Google Search for an upcoming trip to \
         {destination_and_duration}, provide a weather summary.\n\
         The response MUST be a single, valid JSON object with these exact fields:\n\
         - \"location\": the destination (e.g., \"Paris, France\")\n\
         - \"dateRange\": the interpreted date range for the trip (e.g., \"Dec 24, 2024 - Dec 28, 2024\"). \
         This is crucial and must be included, especially if the trip is described with a relative \
         date like \"Christmas\" or \"next weekend\".\n\
         - \"highTemp\": typical high temperature in Celsius (number)\n\
         - \"lowTemp\": typical low temperature in Celsius (number)\n\
         - \"temp07\": typical temperature at 7:00 AM in Celsius (number)\n\
         - \"temp12\": typical temperature at 12:00 noon in Celsius (number)\n\
         - \"temp17\": typical temperature at 5:00 PM in Celsius (number)\n\
         - \"temp22\": typical temperature at 10:00 PM in Celsius (number)\n\
         - \"condition07\": brief weather condition at 7:00 AM\n\
         - \"condition12\": brief weather condition at 12:00 noon\n\
         - \"condition17\": brief weather condition at 5:00 PM\n\
         - \"condition22\": brief weather condition at 10:00 PM\n\n\
         Use Google Search to get accurate weather forecast data.",
    )
}

/// Prompt for the structured travel packing-list call.
#[must_use]
pub fn build_travel_clothing_prompt(family: &[String], forecast: &RawForecast) -> String {
    let members = family.join(", ");
    let date_range = forecast.date_range.as_deref().unwrap_or("dates unknown");
    format!(
        "Based on the following weather forecast for a trip to {location} ({date_range}):\n\
         - High: {high}\u{b0}C, Low: {low}\u{b0}C\n\
         - 7:00 AM: {t07}\u{b0}C, {c07}\n\
         - 12:00 noon: {t12}\u{b0}C, {c12}\n\
         - 5:00 PM: {t17}\u{b0}C, {c17}\n\
         - 10:00 PM: {t22}\u{b0}C, {c22}\n\n\
         Provide a packing list for a family consisting of: {members}.\n\n\
         The response MUST be a JSON array of objects. Each object must contain:\n\
         - \"member\": a string matching one of the provided family members ({members})\n\
         - \"outfit\": an array of strings listing clothing items to pack\n\
         - \"notes\": a string with packing advice based on the weather forecast\n\n\
         Consider local clothing norms and styles for {location}.",
        location = forecast.location,
        date_range = date_range,
        high = forecast.high_temp,
        low = forecast.low_temp,
        t07 = forecast.temp07,
        c07 = forecast.condition07,
        t12 = forecast.temp12,
        c12 = forecast.condition12,
        t17 = forecast.temp17,
        c17 = forecast.condition17,
        t22 = forecast.temp22,
        c22 = forecast.condition22,
        members = members,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sample_forecast() -> RawForecast {
        serde_json::from_value(serde_json::json!({
            "location": "Zurich, Switzerland",
            "highTemp": 14, "lowTemp": 4,
            "temp07": 5, "temp12": 13, "temp17": 11, "temp22": 6,
            "condition07": "Clear", "condition12": "Sunny",
            "condition17": "Partly cloudy", "condition22": "Clear",
        }))
        .unwrap()
    }

    #[test]
    fn test_weather_prompt_contains_location_and_fields() {
        let context = RequestContext::NamedLocation {
            location: "Bern".to_string(),
        };
        let prompt = build_weather_prompt(Day::Today, &context);
        assert!(prompt.contains("for the location \"Bern\""));
        assert!(prompt.contains("for today"));
        assert!(prompt.contains("\"highTemp\""));
        assert!(prompt.contains("\"temp07\""));
        assert!(prompt.contains("\"condition22\""));
        assert!(prompt.contains("MeteoSchweiz"));
    }

    #[test]
    fn test_weather_prompt_for_coordinates_and_tomorrow() {
        let context = RequestContext::Geolocation {
            lat: 47.37,
            lon: 8.54,
        };
        let prompt = build_weather_prompt(Day::Tomorrow, &context);
        assert!(prompt.contains("for tomorrow"));
        assert!(prompt.contains("latitude 47.37"));
        assert!(prompt.contains("longitude 8.54"));
    }

    #[test]
    fn test_clothing_prompt_lists_every_member() {
        let family = vec![
            "Adult".to_string(),
            "Child (5-12)".to_string(),
            "Baby (0-1)".to_string(),
        ];
        let prompt = build_clothing_prompt(&family, &sample_forecast(), None);
        for member in &family {
            assert!(prompt.contains(member), "missing member: {member}");
        }
        assert!(prompt.contains("Zurich, Switzerland"));
        assert!(prompt.contains("Running shoes (for morning run)"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   \n\t ")]
    fn test_empty_schedule_omitted(#[case] schedule: &str) {
        let family = vec!["Adult".to_string()];
        let prompt = build_clothing_prompt(&family, &sample_forecast(), Some(schedule));
        assert!(!prompt.contains("The user has provided a schedule"));
        assert!(!prompt.contains("MUST be tailored"));
    }

    #[test]
    fn test_schedule_appears_verbatim_when_present() {
        let family = vec!["Adult".to_string()];
        let prompt = build_clothing_prompt(
            &family,
            &sample_forecast(),
            Some("morning run, office, evening swim class"),
        );
        assert!(prompt.contains("morning run, office, evening swim class"));
        assert!(prompt.contains("MUST be tailored"));
    }

    #[test]
    fn test_overlong_schedule_truncated_in_prompt() {
        let family = vec!["Adult".to_string()];
        let schedule = "a".repeat(500);
        let prompt = build_clothing_prompt(&family, &sample_forecast(), Some(&schedule));
        assert!(prompt.contains(&"a".repeat(300)));
        assert!(!prompt.contains(&"a".repeat(301)));
    }

    #[test]
    fn test_travel_weather_prompt_asks_for_date_range() {
        let prompt = build_travel_weather_prompt("Paris over Christmas");
        assert!(prompt.contains("Paris over Christmas"));
        assert!(prompt.contains("\"dateRange\""));
        assert!(prompt.contains("relative"));
    }

    #[test]
    fn test_travel_clothing_prompt_is_a_packing_list() {
        let family = vec!["Adult".to_string(), "Toddler (1-4)".to_string()];
        let mut forecast = sample_forecast();
        forecast.date_range = Some("Dec 24, 2026 - Dec 28, 2026".to_string());
        let prompt = build_travel_clothing_prompt(&family, &forecast);
        assert!(prompt.contains("packing list"));
        assert!(prompt.contains("Dec 24, 2026 - Dec 28, 2026"));
        assert!(prompt.contains("Toddler (1-4)"));
    }
}
