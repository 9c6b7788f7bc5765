use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::KeyValueStore;

pub const PROFILE_STORAGE_KEY: &str = "beauty_advisor_profile";

/// How many previous recommendations the system context shows.
pub const RECENT_RECOMMENDATION_LIMIT: usize = 3;

/// Facts inferred about the local user, accumulated across sessions.
///
/// Every field is `#[serde(default)]`, so a stored record missing a field
/// keeps the default for it while present fields win.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub skin_type: Option<String>,
    pub skin_concerns: Vec<String>,
    pub hair_type: Option<String>,
    pub preferred_products: Vec<String>,
    pub previous_recommendations: Vec<String>,
    pub conversation_count: u32,
}

impl UserProfile {
    pub fn set_name(&mut self, raw: &str) {
        self.name = Some(capitalize_first(raw));
    }

    pub fn add_skin_concern(&mut self, concern: &str) -> bool {
        push_unique(&mut self.skin_concerns, concern)
    }

    pub fn add_preferred_product(&mut self, product: &str) -> bool {
        push_unique(&mut self.preferred_products, product)
    }

    pub fn add_recommendation(&mut self, recommendation: &str) -> bool {
        push_unique(&mut self.previous_recommendations, recommendation)
    }

    pub fn recent_recommendations(&self) -> &[String] {
        let start = self
            .previous_recommendations
            .len()
            .saturating_sub(RECENT_RECOMMENDATION_LIMIT);
        &self.previous_recommendations[start..]
    }
}

fn push_unique(items: &mut Vec<String>, value: &str) -> bool {
    if items.iter().any(|existing| existing == value) {
        return false;
    }
    items.push(value.to_string());
    true
}

/// Uppercase the first character, leave the rest untouched.
pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Read the stored profile, falling back to defaults on any failure.
///
/// Stored fields are merged one at a time, so a single field of the wrong
/// type is dropped without losing the rest of the record.
pub fn load_profile(store: &dyn KeyValueStore) -> UserProfile {
    let raw = match store.get(PROFILE_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return UserProfile::default(),
        Err(error) => {
            tracing::warn!("Failed to read stored profile: {:#}", error);
            return UserProfile::default();
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(stored)) => merge_over_defaults(stored),
        Ok(_) => {
            tracing::warn!("Stored profile is not a JSON object, using defaults");
            UserProfile::default()
        }
        Err(error) => {
            tracing::warn!("Stored profile is not valid JSON, using defaults: {}", error);
            UserProfile::default()
        }
    }
}

fn merge_over_defaults(stored: Map<String, Value>) -> UserProfile {
    let mut merged = match serde_json::to_value(UserProfile::default()) {
        Ok(Value::Object(defaults)) => defaults,
        _ => return UserProfile::default(),
    };

    for (key, value) in stored {
        if !merged.contains_key(&key) {
            continue;
        }
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        if serde_json::from_value::<UserProfile>(Value::Object(candidate.clone())).is_ok() {
            merged = candidate;
        } else {
            tracing::warn!("Ignoring stored profile field '{}' with an unexpected type", key);
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or_default()
}

/// Write the profile. Failures are logged and otherwise ignored.
pub fn save_profile(store: &dyn KeyValueStore, profile: &UserProfile) {
    let serialized = match serde_json::to_string(profile) {
        Ok(serialized) => serialized,
        Err(error) => {
            tracing::warn!("Failed to serialize profile: {}", error);
            return;
        }
    };

    if let Err(error) = store.set(PROFILE_STORAGE_KEY, &serialized) {
        tracing::warn!("Failed to save profile: {:#}", error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn stored_fields_merge_over_defaults() {
        let store = MemoryStore::new();
        store
            .set(
                PROFILE_STORAGE_KEY,
                r#"{"name":"Ana","skinConcerns":["acne"],"conversationCount":4,"futureField":true}"#,
            )
            .unwrap();

        let profile = load_profile(&store);
        assert_eq!(profile.name.as_deref(), Some("Ana"));
        assert_eq!(profile.skin_concerns, vec!["acne".to_string()]);
        assert_eq!(profile.conversation_count, 4);
        assert!(profile.skin_type.is_none());
        assert!(profile.previous_recommendations.is_empty());
    }

    #[test]
    fn corrupt_record_loads_defaults() {
        let store = MemoryStore::new();
        store.set(PROFILE_STORAGE_KEY, "not json").unwrap();
        assert_eq!(load_profile(&store), UserProfile::default());
    }

    #[test]
    fn one_bad_field_keeps_the_rest_of_the_record() {
        let store = MemoryStore::new();
        store
            .set(
                PROFILE_STORAGE_KEY,
                r#"{"name":"Ana","conversationCount":5,"skinConcerns":null,"hairType":7}"#,
            )
            .unwrap();

        let profile = load_profile(&store);
        assert_eq!(profile.name.as_deref(), Some("Ana"));
        assert_eq!(profile.conversation_count, 5);
        assert!(profile.skin_concerns.is_empty());
        assert!(profile.hair_type.is_none());
    }

    #[test]
    fn non_object_record_loads_defaults() {
        let store = MemoryStore::new();
        store.set(PROFILE_STORAGE_KEY, r#"["Ana"]"#).unwrap();
        assert_eq!(load_profile(&store), UserProfile::default());
    }

    #[test]
    fn save_then_load_preserves_profile() {
        let store = MemoryStore::new();
        let mut profile = UserProfile::default();
        profile.set_name("ana");
        profile.add_skin_concern("pores");
        profile.conversation_count = 2;

        save_profile(&store, &profile);
        assert_eq!(load_profile(&store), profile);

        let raw = store.get(PROFILE_STORAGE_KEY).unwrap().unwrap();
        assert!(raw.contains("\"skinConcerns\""));
        assert!(raw.contains("\"conversationCount\":2"));
    }

    #[test]
    fn capitalize_only_touches_first_letter() {
        assert_eq!(capitalize_first("ana"), "Ana");
        assert_eq!(capitalize_first("mcKenzie"), "McKenzie");
        assert_eq!(capitalize_first("élodie"), "Élodie");
        assert_eq!(capitalize_first(""), "");
    }

    #[test]
    fn collections_reject_duplicates_and_keep_order() {
        let mut profile = UserProfile::default();
        assert!(profile.add_skin_concern("acne"));
        assert!(profile.add_skin_concern("pores"));
        assert!(!profile.add_skin_concern("acne"));
        assert_eq!(profile.skin_concerns, vec!["acne", "pores"]);

        for item in ["A One", "B Two", "C Three", "D Four"] {
            profile.add_recommendation(item);
        }
        assert!(!profile.add_recommendation("B Two"));
        assert_eq!(profile.recent_recommendations(), ["B Two", "C Three", "D Four"]);
    }
}
