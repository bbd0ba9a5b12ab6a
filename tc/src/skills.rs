//! System-prompt ("skill") provider for the LLM channels
//!
//! Defaults are embedded at compile time; the settings store can carry a
//! user override per channel. The `{lang}` placeholder in a skill selects
//! the response language.

use settingstore::{Lang, Settings};

pub const COACH_SKILL_DEFAULT: &str = include_str!("../prompts/coach-skill.md");
pub const ANALYZE_SKILL_DEFAULT: &str = include_str!("../prompts/analyze-skill.md");

fn apply_lang(raw: &str, lang: Lang) -> String {
    raw.replace("{lang}", lang.code())
}

/// Coach system prompt: user override when set, embedded default otherwise
pub fn coach_skill(settings: &Settings, lang: Lang) -> String {
    let raw = settings
        .coach_skill
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(COACH_SKILL_DEFAULT);
    apply_lang(raw, lang)
}

/// Analyze system prompt: user override when set, embedded default otherwise
pub fn analyze_skill(settings: &Settings, lang: Lang) -> String {
    let raw = settings
        .analyze_skill
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(ANALYZE_SKILL_DEFAULT);
    apply_lang(raw, lang)
}
