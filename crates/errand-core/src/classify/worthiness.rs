//! Task-worthiness filter.
//!
//! Decides whether a message deserves a persisted task at all, before any
//! classification happens. Deliberately cheap: regex tables, no I/O. Policy
//! is ordered; strong action signals override the small-talk patterns so
//! "thanks, now draw a cat" still becomes a task.

use std::sync::OnceLock;

use regex::{Regex, RegexSet};

use super::chat_patterns;

struct WorthinessRules {
    /// Strong positive signals: the message asks for work.
    action: RegexSet,
    /// Weak negatives: phrases that usually carry no request.
    small_talk: RegexSet,
    /// Imperative openers ("do X", "find Y", "check Z").
    imperative: Regex,
    emoji_or_symbol: Regex,
}

static RULES: OnceLock<WorthinessRules> = OnceLock::new();

fn rules() -> &'static WorthinessRules {
    RULES.get_or_init(|| WorthinessRules {
        action: RegexSet::new([
            r"(?i)\b(draw|paint|sketch|illustrate|visualize|render)\b",
            r"(?i)\b(generate|create|make|produce)\b.*\b(image|picture|photo|pic|art|artwork|drawing|logo|avatar|icon|meme|poster|portrait)\b",
            r"(?i)\b(send|transfer|swap|stake|mint|bridge)\b.*\b(sol|solana|token|tokens|nft|coin|coins|crypto|wallet|lamports)\b",
            r"(?i)\b(fetch|scrape|query|lookup|download|call)\b",
            r"(?i)\bmcp\b",
            r"https?://\S+",
        ])
        .expect("worthiness action table must compile"),
        small_talk: RegexSet::new([
            r"(?i)^\s*(i\s+(love|like|hate|miss)\s+you)\b",
            r"(?i)^\s*(you('re|\s+are)\s+(cool|great|awesome|funny|cute|amazing))\b",
            r"(?i)^\s*(just\s+(checking\s+in|saying\s+hi))\b",
            r"(?i)^\s*(how\s+(was|is)\s+your\s+(day|night|weekend))\b",
            r"(?i)^\s*(tell\s+me\s+(a\s+joke|about\s+yourself))\b",
        ])
        .expect("worthiness small-talk table must compile"),
        imperative: Regex::new(
            r"(?i)^\s*(please\s+)?(can|could|would|will)?\s*(you\s+)?(do|find|check|get|show|list|search|look\s+up|tell\s+me\s+the|give\s+me\s+the|calculate|convert|translate|summarize|write|post|tweet|reply|remind|schedule|run|execute|build|deploy|update|delete|add|remove|set)\b",
        )
        .expect("worthiness imperative pattern must compile"),
        emoji_or_symbol: Regex::new(r"^[\s\p{Emoji_Presentation}\p{Extended_Pictographic}\p{P}\p{S}]+$")
            .expect("worthiness emoji pattern must compile"),
    })
}

/// Whether a message should be persisted as a task.
///
/// Ordered policy:
/// 1. Too short, empty, or emoji/punctuation-only: reject.
/// 2. Strong action signal: accept, even if it also looks like small talk.
/// 3. Canonical chat or small-talk phrasing: reject.
/// 4. Imperative or substantive question: accept.
/// 5. Everything else: reject (the agent just replies in conversation).
pub fn should_save_as_task(message: &str) -> bool {
    let trimmed = message.trim();
    if trimmed.chars().count() < 3 {
        return false;
    }
    let r = rules();
    if r.emoji_or_symbol.is_match(trimmed) {
        return false;
    }

    if r.action.is_match(trimmed) {
        return true;
    }

    if chat_patterns::is_canonical_chat(trimmed) || r.small_talk.is_match(trimmed) {
        return false;
    }

    if r.imperative.is_match(trimmed) {
        return true;
    }

    // Substantive questions (long enough to carry a real ask).
    if trimmed.ends_with('?') && trimmed.split_whitespace().count() >= 4 {
        return true;
    }

    false
}
