//! Canned response for mock mode
//!
//! When mock mode is enabled the endpoint returns this fixed payload without
//! touching the model, which keeps local development and endpoint tests
//! deterministic and credential-free.

use crate::models::{CombinedResult, ConditionIcon, ForecastData, PeriodForecast, SuggestionEntry};

/// The fixed `{weather, suggestions}` payload served in mock mode.
#[must_use]
pub fn canned_response() -> CombinedResult {
    let day_parts = vec![
        PeriodForecast {
            period: "Morning".to_string(),
            time: "07:00".to_string(),
            temp: 12,
            condition: "Cool and foggy".to_string(),
            condition_icon: ConditionIcon::Cloudy,
            is_night: false,
        },
        PeriodForecast {
            period: "Afternoon".to_string(),
            time: "12:00".to_string(),
            temp: 18,
            condition: "Partly sunny".to_string(),
            condition_icon: ConditionIcon::PartlyCloudy,
            is_night: false,
        },
        PeriodForecast {
            period: "Evening".to_string(),
            time: "17:00".to_string(),
            temp: 15,
            condition: "Clear and cool".to_string(),
            condition_icon: ConditionIcon::Sunny,
            is_night: false,
        },
        PeriodForecast {
            period: "Night".to_string(),
            time: "22:00".to_string(),
            temp: 11,
            condition: "Clear skies".to_string(),
            condition_icon: ConditionIcon::ClearNight,
            is_night: true,
        },
    ];

    let suggestions = vec![
        SuggestionEntry {
            member: "Adult".to_string(),
            outfit: vec![
                "Light jacket or hoodie".to_string(),
                "Long-sleeve shirt".to_string(),
                "Jeans or comfortable pants".to_string(),
                "Closed-toe shoes".to_string(),
            ],
            notes: "It's a typical SF day! Layers are key. The morning fog will burn off, \
                    but it will get cool again in the evening."
                .to_string(),
        },
        SuggestionEntry {
            member: "Child (5-12)".to_string(),
            outfit: vec![
                "Sweatshirt".to_string(),
                "T-shirt".to_string(),
                "Pants".to_string(),
                "Sneakers".to_string(),
            ],
            notes: "A warm layer is important for the morning and after the sun goes down."
                .to_string(),
        },
        SuggestionEntry {
            member: "Toddler (1-4)".to_string(),
            outfit: vec![
                "Warm fleece jacket".to_string(),
                "Long-sleeve onesie or shirt".to_string(),
                "Pants".to_string(),
                "Socks and shoes".to_string(),
                "Beanie (for the morning)".to_string(),
            ],
            notes: "Keep the little one bundled in the morning and evening. The fleece can \
                    be removed during the warmer afternoon."
                .to_string(),
        },
        SuggestionEntry {
            member: "Baby (0-1)".to_string(),
            outfit: vec![
                "Footed pajamas or a warm romper".to_string(),
                "A warm, hooded jacket or bunting".to_string(),
                "Warm hat or beanie".to_string(),
                "Blanket for the stroller".to_string(),
            ],
            notes: "Babies get cold easily. Ensure they are well-covered, especially when \
                    it's foggy and windy."
                .to_string(),
        },
    ];

    CombinedResult {
        weather: Some(ForecastData {
            location: "San Francisco, CA".to_string(),
            high_temp: 18,
            low_temp: 11,
            day_parts,
            date_range: Some("October 26, 2024".to_string()),
            sunrise: None,
            sunset: None,
        }),
        suggestions: Some(suggestions),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_response_is_complete_and_stable() {
        let first = canned_response();
        let second = canned_response();
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );

        let weather = first.weather.unwrap();
        assert_eq!(weather.location, "San Francisco, CA");
        assert_eq!(weather.day_parts.len(), 4);
        assert_eq!(first.suggestions.unwrap().len(), 4);
    }
}
