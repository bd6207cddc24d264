use serde::{Deserialize, Serialize};

/// Raw request body for `POST /generate-pitch`. Not yet validated.
#[derive(Debug, Clone, Deserialize)]
pub struct PitchRequest {
    pub characters: Vec<String>,
    pub locations: Vec<String>,
    pub genres: Vec<String>,
    pub creatives: Vec<String>,
}

/// A request that passed `validation::validate`. Items are trimmed.
///
/// Only constructible through the validator, so holding one proves every list
/// has 1–5 non-blank items of at most 100 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPitchRequest {
    pub(super) characters: Vec<String>,
    pub(super) locations: Vec<String>,
    pub(super) genres: Vec<String>,
    pub(super) creatives: Vec<String>,
}

impl ValidatedPitchRequest {
    pub fn characters(&self) -> &[String] {
        &self.characters
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn genres(&self) -> &[String] {
        &self.genres
    }

    pub fn creatives(&self) -> &[String] {
        &self.creatives
    }
}

/// The generated movie pitch, returned verbatim as the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchResult {
    /// A catchy title for the movie.
    pub title: String,
    /// A short, memorable tagline for the poster.
    pub tagline: String,
    /// A 1-3 sentence pitch of the plot.
    pub pitch: String,
}

impl PitchResult {
    /// Name of the first blank field, if any.
    pub fn first_blank_field(&self) -> Option<&'static str> {
        [
            ("title", &self.title),
            ("tagline", &self.tagline),
            ("pitch", &self.pitch),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_request_deserializes_all_lists() {
        let json = r#"{
            "characters": ["Robot", "Detective"],
            "locations": ["Tokyo"],
            "genres": ["Noir"],
            "creatives": ["Ridley Scott"]
        }"#;
        let request: PitchRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.characters, vec!["Robot", "Detective"]);
        assert_eq!(request.creatives, vec!["Ridley Scott"]);
    }

    #[test]
    fn test_pitch_request_missing_field_is_rejected() {
        let json = r#"{"characters": ["Robot"], "locations": ["Tokyo"], "genres": ["Noir"]}"#;
        assert!(serde_json::from_str::<PitchRequest>(json).is_err());
    }

    #[test]
    fn test_pitch_result_serializes_three_fields() {
        let result = PitchResult {
            title: "Neon Shadows".to_string(),
            tagline: "In space, every shadow hides a secret.".to_string(),
            pitch: "...".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value.as_object().unwrap().len(), 3);
        assert_eq!(value["title"], "Neon Shadows");
    }

    #[test]
    fn test_first_blank_field() {
        let mut result = PitchResult {
            title: "T".to_string(),
            tagline: "L".to_string(),
            pitch: "P".to_string(),
        };
        assert_eq!(result.first_blank_field(), None);
        result.tagline = "   ".to_string();
        assert_eq!(result.first_blank_field(), Some("tagline"));
    }
}
