//! Emoji extraction from message text.
//!
//! Text is split into extended grapheme clusters so that multi-codepoint
//! emoji (ZWJ families, skin tones, flags, keycaps) come out as one entry.

use unicode_segmentation::UnicodeSegmentation;

const ZWJ: char = '\u{200D}';
const VARIATION_SELECTOR_16: char = '\u{FE0F}';

/// Emoji grapheme clusters in `text`, in order, duplicates kept.
pub fn extract_emojis(text: &str) -> Vec<String> {
    text.graphemes(true)
        .filter(|g| is_emoji(g))
        .map(str::to_string)
        .collect()
}

/// Number of emoji grapheme clusters in `text`.
pub fn count_emojis(text: &str) -> usize {
    text.graphemes(true).filter(|g| is_emoji(g)).count()
}

/// Whether a single grapheme cluster is an emoji.
pub fn is_emoji(grapheme: &str) -> bool {
    if emojis::get(grapheme).is_some() {
        return true;
    }
    if grapheme.contains(ZWJ) {
        return grapheme.split(ZWJ).all(|part| component_is_emoji(part, true));
    }
    component_is_emoji(grapheme, false)
}

/// Look up a cluster with skin-tone modifiers and variation selectors removed.
///
/// Inside ZWJ sequences components are often written without their
/// presentation selector, so `with_selector` also tries the fully
/// qualified form.
fn component_is_emoji(part: &str, with_selector: bool) -> bool {
    if part.is_empty() {
        return false;
    }
    if emojis::get(part).is_some() {
        return true;
    }

    let base: String = part
        .chars()
        .filter(|c| !is_skin_tone(*c) && *c != VARIATION_SELECTOR_16)
        .collect();
    if base.is_empty() || (base == part && !with_selector) {
        return false;
    }
    if emojis::get(&base).is_some() {
        return true;
    }
    with_selector && emojis::get(&format!("{base}{VARIATION_SELECTOR_16}")).is_some()
}

fn is_skin_tone(c: char) -> bool {
    ('\u{1F3FB}'..='\u{1F3FF}').contains(&c)
}
