//! Template-level wikitext primitives shared by field extraction and variant
//! resolution. Only the subset needed to locate templates and read their
//! parameters is supported; nothing here renders markup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static COMMENT_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static LINK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[(?:[^|\]]*\|)?([^\]]*)\]\]").unwrap());

static EMPHASIS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"'{2,}").unwrap());

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

static DISAMBIG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\{\{\s*(?:disambig(?:uation)?|dab|set index)\s*[|}]").unwrap());

/// One `{{name|key=value|...}}` invocation. Positional parameters are keyed
/// by their 1-based position, as MediaWiki does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub name: String,
    pub params: Vec<(String, String)>,
}

impl Template {
    /// Template names compare case-insensitively, with `_` and ` ` equivalent.
    pub fn name_matches(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn normalize_name(name: &str) -> String {
    name.trim()
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Top-level templates in document order.
pub fn templates(text: &str) -> Vec<Template> {
    let mut results = Vec::new();
    let bytes = text.as_bytes();
    let mut search_from = 0;

    while let Some(pos) = find_open(&bytes[search_from..]) {
        let abs_pos = search_from + pos;
        if let Some(close_pos) = find_matching_close(bytes, abs_pos) {
            let inner = &text[abs_pos + 2..close_pos];
            if let Some(template) = parse_template_inner(inner) {
                results.push(template);
            }
            search_from = close_pos + 2;
        } else {
            search_from = abs_pos + 2;
        }
    }

    results
}

/// Every template at any nesting depth, parents before the templates nested
/// in their parameters.
pub fn all_templates(text: &str) -> Vec<Template> {
    let mut out = Vec::new();
    for template in templates(text) {
        let nested: Vec<Template> = template
            .params
            .iter()
            .flat_map(|(_, value)| all_templates(value))
            .collect();
        out.push(template);
        out.extend(nested);
    }
    out
}

/// First invocation of `name`, searching nested templates as well (infoboxes
/// are often wrapped in a switch template).
pub fn find_template(text: &str, name: &str) -> Option<Template> {
    all_templates(text).into_iter().find(|t| t.name_matches(name))
}

fn find_open(bytes: &[u8]) -> Option<usize> {
    bytes.windows(2).position(|w| w == b"{{")
}

fn find_matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth: i32 = 0;
    let mut i = start;
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

fn parse_template_inner(inner: &str) -> Option<Template> {
    let segments = split_at_depth_zero(inner, b'|');
    let name = strip_comments(segments.first()?).trim().to_string();
    if name.is_empty() {
        return None;
    }

    let mut params = Vec::new();
    let mut position = 0;
    for segment in &segments[1..] {
        match find_at_depth_zero(segment, b'=') {
            Some(eq_pos) => {
                let key = segment[..eq_pos].trim().to_string();
                if !key.is_empty() {
                    params.push((key, segment[eq_pos + 1..].trim().to_string()));
                }
            }
            None => {
                position += 1;
                params.push((position.to_string(), segment.trim().to_string()));
            }
        }
    }

    Some(Template { name, params })
}

/// Splits on `sep` outside nested `{{ }}` and `[[ ]]`.
fn split_at_depth_zero(content: &str, sep: u8) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut last_split = 0;
    for pos in depth_zero_positions(content, sep) {
        segments.push(&content[last_split..pos]);
        last_split = pos + 1;
    }
    segments.push(&content[last_split..]);
    segments
}

fn find_at_depth_zero(content: &str, needle: u8) -> Option<usize> {
    depth_zero_positions(content, needle).into_iter().next()
}

fn depth_zero_positions(content: &str, needle: u8) -> Vec<usize> {
    let bytes = content.as_bytes();
    let mut positions = Vec::new();
    let mut braces: i32 = 0;
    let mut brackets: i32 = 0;
    let mut i = 0;

    while i < bytes.len() {
        let pair = bytes.get(i..i + 2);
        match pair {
            Some(b"{{") => {
                braces += 1;
                i += 2;
            }
            Some(b"}}") => {
                braces -= 1;
                i += 2;
            }
            Some(b"[[") => {
                brackets += 1;
                i += 2;
            }
            Some(b"]]") => {
                brackets -= 1;
                i += 2;
            }
            _ => {
                if bytes[i] == needle && braces <= 0 && brackets <= 0 {
                    positions.push(i);
                }
                i += 1;
            }
        }
    }
    positions
}

pub fn strip_comments(text: &str) -> String {
    COMMENT_REGEX.replace_all(text, "").into_owned()
}

/// Plain text of a parameter value: links reduced to their label, emphasis
/// quotes, HTML tags and comments removed, whitespace collapsed.
pub fn strip_markup(value: &str) -> String {
    let text = strip_comments(value);
    let text = LINK_REGEX.replace_all(&text, "$1");
    let text = EMPHASIS_REGEX.replace_all(&text, "");
    let text = TAG_REGEX.replace_all(&text, "");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn is_disambiguation(text: &str) -> bool {
    DISAMBIG_REGEX.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_template() {
        let text = "{{Infobox Bonuses\n| astab = 50\n| slot = weapon\n}}";
        let found = templates(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Infobox Bonuses");
        assert_eq!(found[0].param("astab"), Some("50"));
        assert_eq!(found[0].param("slot"), Some("weapon"));
    }

    #[test]
    fn nested_template_stays_in_value() {
        let text = "{{Infobox Item\n| name = Rune sword\n| value = {{Coins|32000}}\n}}";
        let found = templates(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].param("value"), Some("{{Coins|32000}}"));
    }

    #[test]
    fn link_pipes_do_not_split_parameters() {
        let text = "{{Infobox Item|image=[[File:Rune sword.png|130px]]|id=1289}}";
        let found = templates(text);
        assert_eq!(found[0].param("image"), Some("[[File:Rune sword.png|130px]]"));
        assert_eq!(found[0].param("id"), Some("1289"));
    }

    #[test]
    fn positional_parameters_are_numbered() {
        let found = templates("{{Coins|32000|extra}}");
        assert_eq!(found[0].param("1"), Some("32000"));
        assert_eq!(found[0].param("2"), Some("extra"));
    }

    #[test]
    fn equals_inside_nested_template_is_positional() {
        let found = templates("{{Outer|{{Inner|a=1}}}}");
        assert_eq!(found[0].param("1"), Some("{{Inner|a=1}}"));
    }

    #[test]
    fn unmatched_braces_yield_nothing() {
        assert!(templates("{{Infobox Monster\n| name = broken").is_empty());
    }

    #[test]
    fn find_template_matches_case_and_underscores() {
        let text = "intro {{cite web|url=x}} {{infobox_monster|version1=Green}}";
        let found = find_template(text, "Infobox Monster").unwrap();
        assert_eq!(found.param("version1"), Some("Green"));
    }

    #[test]
    fn find_template_descends_into_switch_wrappers() {
        let text = "{{Switch infobox\n|item1={{Infobox Monster|version1=Red}}\n}}";
        let found = find_template(text, "Infobox Monster").unwrap();
        assert_eq!(found.param("version1"), Some("Red"));
    }

    #[test]
    fn all_templates_keeps_document_order() {
        let names: Vec<String> = all_templates("{{A|x={{B}}}} {{C}}")
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn non_ascii_before_template() {
        let found = templates("Ünîcödé {{Infobox Item|name=Test}}");
        assert_eq!(found[0].param("name"), Some("Test"));
    }

    #[test]
    fn strip_markup_reduces_links_and_emphasis() {
        assert_eq!(strip_markup("[[Zulrah#Serpentine|Serpentine]]"), "Serpentine");
        assert_eq!(strip_markup("'''Phase''' [[one]]"), "Phase one");
        assert_eq!(strip_markup("Green<!-- hidden --> <br/>"), "Green");
    }

    #[test]
    fn strip_comments_removes_multiline() {
        assert_eq!(strip_comments("a<!-- x\n| astab = 5 -->b"), "ab");
    }

    #[test]
    fn disambiguation_detection() {
        assert!(is_disambiguation("{{Disambig}}\n* [[Dragon sword]]"));
        assert!(is_disambiguation("{{disambiguation|foo}}"));
        assert!(!is_disambiguation("{{Infobox Item|name=Disambig sword}}"));
    }
}
