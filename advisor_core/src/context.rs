use crate::profile::UserProfile;

/// Static product and behavior instructions for the advisor persona.
pub const PRODUCT_KNOWLEDGE: &str = "\
You are a L'Oréal Beauty Advisor assistant. Your expertise covers:

MAKEUP:
- Foundations, concealers and powders (True Match, Infallible Pro-Glow)
- Lipsticks and lip products (Rouge Signature, Colour Riche)
- Eye makeup (Voluminous mascaras, eyeshadows, liners)
- Complexion products for all skin tones and types

SKINCARE:
- Anti-aging serums and creams (Revitalift, Age Perfect)
- Hydrating products (Hydra Genius, Hydrafresh)
- Cleansers and toners for different skin types
- Sun protection and daily care routines

HAIRCARE:
- Shampoos and conditioners (Elvive range)
- Hair treatments and masks
- Styling products and heat protectants
- Color care and damage repair

FRAGRANCES:
- Women's fragrances (La Vie Est Belle, Mon Paris)
- Men's fragrances and grooming
- Seasonal and occasion-based recommendations

Base recommendations on skin type, tone and concerns, hair type and styling needs, \
personal style, occasion and budget.

Stay friendly and knowledgeable, and keep the focus on finding the right L'Oréal \
products for the user's beauty needs.
";

const PROFILE_HEADER: &str = "USER PROFILE:";

const PROFILE_INSTRUCTION: &str = "Use this information naturally to personalize your \
recommendations. Do not recite the profile back to the user.";

/// Render the profile section of the system context. Empty for a first-time user.
pub fn render_profile_section(profile: &UserProfile) -> String {
    if profile.name.is_none() && profile.conversation_count == 0 {
        return String::new();
    }

    let mut lines = vec![PROFILE_HEADER.to_string()];

    if let Some(name) = &profile.name {
        lines.push(format!("- Name: {}", name));
    }
    if let Some(skin_type) = &profile.skin_type {
        lines.push(format!("- Skin type: {}", skin_type));
    }
    if !profile.skin_concerns.is_empty() {
        lines.push(format!("- Skin concerns: {}", profile.skin_concerns.join(", ")));
    }
    if let Some(hair_type) = &profile.hair_type {
        lines.push(format!("- Hair type: {}", hair_type));
    }
    if !profile.preferred_products.is_empty() {
        lines.push(format!(
            "- Preferred products: {}",
            profile.preferred_products.join(", ")
        ));
    }
    let recent = profile.recent_recommendations();
    if !recent.is_empty() {
        lines.push(format!("- Previous recommendations: {}", recent.join(", ")));
    }
    lines.push(format!(
        "- Conversations so far: {}",
        profile.conversation_count
    ));
    lines.push(String::new());
    lines.push(PROFILE_INSTRUCTION.to_string());

    lines.join("\n")
}

/// The full system message: knowledge block, then the profile section if any.
pub fn build_system_context(profile: &UserProfile) -> String {
    let section = render_profile_section(profile);
    if section.is_empty() {
        PRODUCT_KNOWLEDGE.to_string()
    } else {
        format!("{}\n{}", PRODUCT_KNOWLEDGE, section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_time_user_gets_no_profile_section() {
        let profile = UserProfile::default();
        assert_eq!(render_profile_section(&profile), "");
        assert_eq!(build_system_context(&profile), PRODUCT_KNOWLEDGE);
    }

    #[test]
    fn returning_user_without_facts_still_shows_count() {
        let profile = UserProfile {
            conversation_count: 2,
            ..UserProfile::default()
        };
        let section = render_profile_section(&profile);
        assert!(section.starts_with(PROFILE_HEADER));
        assert!(section.contains("- Conversations so far: 2"));
        assert!(!section.contains("- Name:"));
        assert!(section.ends_with(PROFILE_INSTRUCTION));
    }

    #[test]
    fn populated_fields_render_in_fixed_order() {
        let profile = UserProfile {
            name: Some("Ana".to_string()),
            skin_type: Some("oily".to_string()),
            skin_concerns: vec!["acne".to_string(), "pores".to_string()],
            hair_type: Some("curly".to_string()),
            preferred_products: vec!["Elvive".to_string()],
            previous_recommendations: vec![
                "Age Perfect".to_string(),
                "True Match".to_string(),
                "Hydra Genius".to_string(),
                "Colour Riche".to_string(),
            ],
            conversation_count: 0,
        };

        let section = render_profile_section(&profile);
        let expected_order = [
            "- Name: Ana",
            "- Skin type: oily",
            "- Skin concerns: acne, pores",
            "- Hair type: curly",
            "- Preferred products: Elvive",
            "- Previous recommendations: True Match, Hydra Genius, Colour Riche",
            "- Conversations so far: 0",
        ];
        let positions: Vec<usize> = expected_order
            .iter()
            .map(|line| section.find(line).unwrap_or_else(|| panic!("missing {line}")))
            .collect();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(!section.contains("Age Perfect"));

        let context = build_system_context(&profile);
        assert!(context.starts_with(PRODUCT_KNOWLEDGE));
        assert!(context.ends_with(&section));
    }
}
