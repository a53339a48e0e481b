//! Activity suggestions for the current conditions.

use serde::Serialize;

use crate::types::WeatherSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Warning,
    Activity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub text: &'static str,
}

fn warning(text: &'static str) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::Warning,
        text,
    }
}

fn activity(text: &'static str) -> Recommendation {
    Recommendation {
        kind: RecommendationKind::Activity,
        text,
    }
}

/// Suggestions for `weather` at local hour `hour` (0-23).
pub fn recommend(weather: &WeatherSnapshot, hour: u32) -> Vec<Recommendation> {
    let temp = weather.temperature;
    let main = weather.condition_main.to_lowercase();
    let daytime = (6..20).contains(&hour);
    let mut out = Vec::new();

    if temp >= 30.0 {
        out.push(warning("It's very hot! Drink plenty of water and stay inside if you can."));
        out.push(activity("Cool off at a pool or spend time somewhere air-conditioned."));
    } else if temp >= 25.0 {
        out.push(activity("Don't forget sunscreen! A good day for a picnic or the beach."));
    } else if temp >= 15.0 {
        out.push(activity("Ideal weather for a walk or a bike ride."));
    } else if temp >= 5.0 {
        out.push(activity("Wear a light jacket. A nice day for parks or outdoor cafes."));
    } else if temp > 0.0 {
        out.push(warning("It's cold! Dress warmly."));
    } else {
        out.push(warning("Freezing cold! Avoid going out if possible."));
        out.push(activity("A good day for hot drinks, a book or a movie at home."));
    }

    if main.contains("rain") || main.contains("drizzle") {
        out.push(warning("It's raining! Take an umbrella or a raincoat."));
        out.push(activity("Prefer indoor plans like a museum or a shopping center."));
    } else if main.contains("thunderstorm") {
        out.push(warning("Thunderstorm! Stay inside and unplug electronics if you can."));
    } else if main.contains("snow") {
        out.push(warning("Snowfall! Watch out for slippery ground."));
        if temp < 0.0 {
            out.push(activity("Good conditions for skiing or sledding."));
        }
    } else if main.contains("fog") || main.contains("mist") {
        out.push(warning("Foggy! Drive carefully."));
    } else if main.contains("clear") && daytime {
        out.push(activity("Sunny day! Great for hiking, a picnic or the beach."));
    }

    if weather.wind_speed > 10.0 {
        out.push(warning("Strong wind! Watch out for flying objects."));
    }

    if weather.humidity.is_some_and(|h| h > 80) && temp > 25.0 {
        out.push(warning("High humidity! It may feel muggy, drink plenty of fluids."));
    }

    out
}
