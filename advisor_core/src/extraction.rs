//! Heuristic profile extraction.
//!
//! Each completed exchange runs through an ordered list of independent rules.
//! Rules only look at the exchange they are given, never at earlier turns.

use regex_lite::Regex;

use crate::profile::UserProfile;

pub const SKIN_TYPES: &[&str] = &["oily", "dry", "combination", "sensitive", "normal", "mature"];

pub const SKIN_CONCERNS: &[&str] = &[
    "acne",
    "wrinkles",
    "dark spots",
    "fine lines",
    "pores",
    "dullness",
    "uneven tone",
];

pub const HAIR_TYPES: &[&str] = &[
    "curly",
    "straight",
    "wavy",
    "thick",
    "thin",
    "fine",
    "coarse",
    "damaged",
    "color-treated",
    "dry",
    "oily",
];

/// Checked in order; the first one with a usable capture wins.
const NAME_PATTERNS: &[&str] = &[
    r"(?i)\bmy name is\s+([A-Za-zÀ-ÖØ-öø-ÿ][A-Za-zÀ-ÖØ-öø-ÿ'’-]*)",
    r"(?i)\bi['’]m\s+([A-Za-zÀ-ÖØ-öø-ÿ][A-Za-zÀ-ÖØ-öø-ÿ'’-]*)",
    r"(?i)\bcall me\s+([A-Za-zÀ-ÖØ-öø-ÿ][A-Za-zÀ-ÖØ-öø-ÿ'’-]*)",
    r"(?i)\bi am\s+([A-Za-zÀ-ÖØ-öø-ÿ][A-Za-zÀ-ÖØ-öø-ÿ'’-]*)",
];

/// Group 1 is the mention. The leading group stands in for `\b`, which only
/// knows ASCII word characters.
const PRODUCT_MENTION_PATTERN: &str = r"(?:^|[^\w'’À-ÿ-])([A-ZÀ-ÖØ-Þ][\w'’À-ÿ-]*(?:[ \t]+[A-ZÀ-ÖØ-Þ][\w'’À-ÿ-]*)+)";

const MAX_PRODUCT_MENTIONS: usize = 3;

/// The pair of texts a rule inspects.
#[derive(Debug, Clone, Copy)]
pub struct Exchange<'a> {
    pub user_text: &'a str,
    pub assistant_text: &'a str,
}

pub trait ExtractionRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Update `profile` from `exchange`. Returns whether anything changed.
    fn apply(&self, exchange: &Exchange<'_>, profile: &mut UserProfile) -> bool;
}

fn compile(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(error) => {
            tracing::error!("Invalid extraction pattern {:?}: {}", pattern, error);
            None
        }
    }
}

pub struct NameRule {
    patterns: Vec<Regex>,
}

impl NameRule {
    pub fn new() -> Self {
        Self {
            patterns: NAME_PATTERNS.iter().filter_map(|p| compile(p)).collect(),
        }
    }

    fn find_name<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.patterns.iter().find_map(|re| {
            re.captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|token| clean_name_token(token.as_str()))
                .find(|token| token.chars().count() > 1)
        })
    }
}

/// Drop a possessive `'s` and any trailing apostrophes or hyphens.
fn clean_name_token(token: &str) -> &str {
    let token = ["'s", "’s", "'S", "’S"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);
    token.trim_end_matches(&['\'', '’', '-'][..])
}

impl Default for NameRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule for NameRule {
    fn name(&self) -> &'static str {
        "name"
    }

    fn apply(&self, exchange: &Exchange<'_>, profile: &mut UserProfile) -> bool {
        let Some(token) = self.find_name(exchange.user_text) else {
            return false;
        };
        let before = profile.name.clone();
        profile.set_name(token);
        profile.name != before
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeField {
    Skin,
    Hair,
}

impl TypeField {
    fn label(self) -> &'static str {
        match self {
            TypeField::Skin => "skin",
            TypeField::Hair => "hair",
        }
    }

    fn slot(self, profile: &mut UserProfile) -> &mut Option<String> {
        match self {
            TypeField::Skin => &mut profile.skin_type,
            TypeField::Hair => &mut profile.hair_type,
        }
    }
}

/// Single-valued vocabulary match: a term directly followed by "skin"/"hair".
pub struct TypeRule {
    field: TypeField,
    terms: Vec<(&'static str, Regex)>,
}

impl TypeRule {
    pub fn new(field: TypeField, vocabulary: &[&'static str]) -> Self {
        let terms = vocabulary
            .iter()
            .filter_map(|term| {
                compile(&format!(r"(?i)\b{}\s*{}", term, field.label())).map(|re| (*term, re))
            })
            .collect();
        Self { field, terms }
    }

    pub fn skin() -> Self {
        Self::new(TypeField::Skin, SKIN_TYPES)
    }

    pub fn hair() -> Self {
        Self::new(TypeField::Hair, HAIR_TYPES)
    }
}

impl ExtractionRule for TypeRule {
    fn name(&self) -> &'static str {
        match self.field {
            TypeField::Skin => "skin_type",
            TypeField::Hair => "hair_type",
        }
    }

    fn apply(&self, exchange: &Exchange<'_>, profile: &mut UserProfile) -> bool {
        let Some((term, _)) = self
            .terms
            .iter()
            .find(|(_, re)| re.is_match(exchange.user_text))
        else {
            return false;
        };

        let slot = self.field.slot(profile);
        if slot.as_deref() == Some(*term) {
            return false;
        }
        *slot = Some(term.to_string());
        true
    }
}

/// Collects every concern mentioned, in the order they appear in the text.
pub struct SkinConcernRule {
    vocabulary: &'static [&'static str],
}

impl SkinConcernRule {
    pub fn new() -> Self {
        Self {
            vocabulary: SKIN_CONCERNS,
        }
    }
}

impl Default for SkinConcernRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule for SkinConcernRule {
    fn name(&self) -> &'static str {
        "skin_concerns"
    }

    fn apply(&self, exchange: &Exchange<'_>, profile: &mut UserProfile) -> bool {
        let haystack = exchange.user_text.to_lowercase();
        let mut found: Vec<(usize, &str)> = self
            .vocabulary
            .iter()
            .filter_map(|term| haystack.find(term).map(|pos| (pos, *term)))
            .collect();
        found.sort_by_key(|(pos, _)| *pos);

        let mut changed = false;
        for (_, concern) in found {
            changed |= profile.add_skin_concern(concern);
        }
        changed
    }
}

/// Capitalized multi-word runs in the reply, taken as product names.
///
/// Also catches unrelated proper nouns; there is no product catalogue to
/// check against.
pub struct ProductMentionRule {
    pattern: Option<Regex>,
    limit: usize,
}

impl ProductMentionRule {
    pub fn new() -> Self {
        Self {
            pattern: compile(PRODUCT_MENTION_PATTERN),
            limit: MAX_PRODUCT_MENTIONS,
        }
    }
}

impl Default for ProductMentionRule {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionRule for ProductMentionRule {
    fn name(&self) -> &'static str {
        "product_mentions"
    }

    fn apply(&self, exchange: &Exchange<'_>, profile: &mut UserProfile) -> bool {
        let Some(re) = &self.pattern else {
            return false;
        };

        let mut changed = false;
        let mentions = re
            .captures_iter(exchange.assistant_text)
            .filter_map(|caps| caps.get(1))
            .take(self.limit);
        for mention in mentions {
            changed |= profile.add_recommendation(mention.as_str());
        }
        changed
    }
}

pub struct ProfileExtractor {
    rules: Vec<Box<dyn ExtractionRule>>,
}

impl ProfileExtractor {
    pub fn new() -> Self {
        Self::with_rules(vec![
            Box::new(NameRule::new()),
            Box::new(TypeRule::skin()),
            Box::new(SkinConcernRule::new()),
            Box::new(TypeRule::hair()),
            Box::new(ProductMentionRule::new()),
        ])
    }

    pub fn with_rules(rules: Vec<Box<dyn ExtractionRule>>) -> Self {
        Self { rules }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Run every rule over one exchange. Returns whether the profile changed.
    pub fn extract(&self, user_text: &str, assistant_text: &str, profile: &mut UserProfile) -> bool {
        let exchange = Exchange {
            user_text,
            assistant_text,
        };

        let mut changed = false;
        for rule in &self.rules {
            if rule.apply(&exchange, profile) {
                tracing::debug!("Profile updated by '{}' rule", rule.name());
                changed = true;
            }
        }
        changed
    }
}

impl Default for ProfileExtractor {
    fn default() -> Self {
        Self::new()
    }
}
