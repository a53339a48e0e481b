//! Input hygiene helpers for user-supplied values and displayed errors.

/// Trim and HTML-escape user input before it is displayed or stored.
pub fn sanitize_input(input: &str) -> String {
    let trimmed = input.trim();
    let mut out = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

/// OpenWeatherMap keys are 32 ASCII alphanumeric characters.
pub fn is_valid_api_key(key: &str) -> bool {
    key.len() == 32 && key.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Latitude in [-90, 90], longitude in [-180, 180].
pub fn is_valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Hide error text that may leak credentials.
pub fn safe_error_message(message: &str) -> String {
    if message.is_empty() {
        return "An unknown error occurred".to_string();
    }

    let lowered = message.to_lowercase();
    if lowered.contains("api key")
        || lowered.contains("apikey")
        || lowered.contains("api_key")
        || lowered.contains("appid")
    {
        return "API authentication failed. Please check your configuration.".to_string();
    }

    message.to_string()
}
