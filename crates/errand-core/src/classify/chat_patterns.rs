//! Fast-path table of canonical chat utterances.
//!
//! Messages matching any of these patterns are conversational by
//! definition and never reach the model. Patterns are compiled once.

use std::sync::OnceLock;

use regex::RegexSet;

static CHAT_PATTERNS: OnceLock<RegexSet> = OnceLock::new();

fn patterns() -> &'static RegexSet {
    CHAT_PATTERNS.get_or_init(|| {
        RegexSet::new([
            // Greetings
            r"(?i)^\s*(hi|hiya|hello|hey|yo|sup|howdy|hola)\s*[!.,]*\s*$",
            r"(?i)^\s*good\s+(morning|afternoon|evening|night)\s*[!.,]*\s*$",
            r"(?i)^\s*(what'?s\s+up|how\s+are\s+you|how'?s\s+it\s+going)\s*[?!.,]*\s*$",
            // Acknowledgements and filler
            r"(?i)^\s*(ok|okay|k|kk|sure|cool|nice|great|awesome|fine|yes|no|yeah|yep|nope|lol|haha+|hmm+)\s*[!.,]*\s*$",
            r"(?i)^\s*(thanks|thank\s+you|thx|ty|cheers)\s*[!.,]*\s*$",
            r"(?i)^\s*(bye|goodbye|see\s+you|later|good\s*night)\s*[!.,]*\s*$",
            // Bot identity questions
            r"(?i)^\s*(who|what)\s+are\s+you\s*[?!.,]*\s*$",
            r"(?i)^\s*what\s+can\s+you\s+do\s*[?!.,]*\s*$",
            r"(?i)^\s*are\s+you\s+(a\s+)?(bot|robot|ai|human|real)\s*[?!.,]*\s*$",
            r"(?i)^\s*what('?s|\s+is)\s+your\s+name\s*[?!.,]*\s*$",
            // Bare punctuation
            r"^[\s?!.,:;~-]+$",
        ])
        .expect("chat pattern table must compile")
    })
}

/// Whether the message is a canonical chat utterance (fast path; bypasses
/// the model entirely).
pub fn is_canonical_chat(message: &str) -> bool {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return true;
    }
    patterns().is_match(trimmed)
}
