use crate::types::Candidate;

const TYPE_DECL_SCORE: i16 = 460;
const CONSTRUCTOR_SCORE: i16 = 410;
const FUNCTION_SCORE: i16 = 340;
const METHOD_SCORE: i16 = 300;
const CONST_SCORE: i16 = 260;
const MODULE_SCORE: i16 = 220;
const FIELD_SCORE: i16 = 170;
const LOCAL_SCORE: i16 = 110;
const PARAM_SCORE: i16 = 80;

const VISIBILITY_PUBLIC: i16 = 35;
const VISIBILITY_INTERNAL: i16 = 20;
const VISIBILITY_PRIVATE: i16 = -15;

/// Weight added to key-channel matches during ranking. Candidates built by
/// the producer carry a precomputed weight; test fixtures without one are
/// classified on the fly from their text.
pub(crate) fn candidate_semantic_score(cand: &Candidate) -> i16 {
    if cand.semantic_score != 0 {
        return cand.semantic_score;
    }
    compute_semantic_score(&cand.text)
}

/// Classify a declaration line into a small signed weight: declaration kind
/// sets the base, visibility modifiers bias it.
pub fn compute_semantic_score(text: &str) -> i16 {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return 0;
    }

    let (keyword, rest, visibility) = classify_declaration(&lower);
    let Some(keyword) = keyword else {
        return visibility;
    };

    let base = declaration_base_score(keyword, rest);
    if base == 0 {
        return visibility;
    }
    base + visibility
}

/// Absorb leading modifier tokens, tracking the strongest visibility seen,
/// and return the first non-modifier token as the declaration keyword.
fn classify_declaration(lower: &str) -> (Option<&str>, &str, i16) {
    let mut remaining = lower.trim_start_matches([' ', '\t']);
    let mut visibility: i16 = 0;

    while !remaining.is_empty() {
        let (token, tail) = leading_token(remaining);
        if token.is_empty() {
            return (None, "", visibility);
        }

        match token {
            "export" | "public" | "pub" => {
                visibility = visibility.max(VISIBILITY_PUBLIC);
                remaining = trim_modifier_tail(token, tail);
            }
            "protected" | "internal" => {
                visibility = visibility.max(VISIBILITY_INTERNAL);
                remaining = trim_modifier_tail(token, tail);
            }
            "private" => {
                if visibility == 0 {
                    visibility = VISIBILITY_PRIVATE;
                }
                remaining = trim_modifier_tail(token, tail);
            }
            "default" | "async" | "abstract" | "final" | "sealed" | "partial" | "static"
            | "inline" | "open" | "virtual" | "override" | "readonly" | "extern" | "unsafe" => {
                remaining = trim_modifier_tail(token, tail);
            }
            _ => return (Some(token), tail.trim_start_matches([' ', '\t']), visibility),
        }
    }

    (None, "", visibility)
}

fn trim_modifier_tail<'a>(token: &str, tail: &'a str) -> &'a str {
    let mut rest = tail.trim_start_matches([' ', '\t']);
    if token == "pub" && rest.starts_with('(') {
        if let Some(end) = rest.find(')') {
            rest = &rest[end + 1..];
        }
    }
    rest.trim_start_matches([' ', '\t'])
}

fn declaration_base_score(keyword: &str, rest: &str) -> i16 {
    match keyword {
        "class" | "struct" | "interface" | "enum" | "trait" | "protocol" | "record" | "type" => {
            TYPE_DECL_SCORE
        }
        "constructor" => CONSTRUCTOR_SCORE,
        "func" | "function" | "def" | "fn" | "fun" => function_like_score(keyword, rest),
        "const" | "static" => CONST_SCORE,
        "namespace" | "module" | "mod" | "package" | "impl" | "extension" => MODULE_SCORE,
        "field" | "property" => FIELD_SCORE,
        "let" | "var" | "val" => LOCAL_SCORE,
        "param" | "parameter" => PARAM_SCORE,
        _ => 0,
    }
}

fn function_like_score(keyword: &str, rest: &str) -> i16 {
    let (name, is_method) = function_name_and_method(keyword, rest);
    if is_constructor_name(name) {
        return CONSTRUCTOR_SCORE;
    }
    if is_method {
        return METHOD_SCORE;
    }
    FUNCTION_SCORE
}

fn function_name_and_method<'a>(keyword: &str, rest: &'a str) -> (&'a str, bool) {
    let mut body = rest.trim_start_matches([' ', '\t']);
    let mut is_method = false;

    // `func (recv) Name(...)` marks a Go method.
    if keyword == "func" && body.starts_with('(') {
        is_method = true;
        if let Some(close) = body.find(')') {
            body = body[close + 1..].trim_start_matches([' ', '\t']);
        }
    }

    let (name, after) = leading_token(body);
    let after = after.trim_start_matches([' ', '\t']);

    if keyword == "def" && (after.contains("(self") || after.contains("(cls")) {
        is_method = true;
    }
    if keyword == "fn" && (after.contains("&self") || after.contains(" self")) {
        is_method = true;
    }

    (name, is_method)
}

fn is_constructor_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    if name == "constructor" || name == "__init__" || name == "new" {
        return true;
    }
    has_proper_prefix(name, "new")
        || has_proper_prefix(name, "create")
        || has_proper_prefix(name, "make")
        || has_proper_prefix(name, "build")
        || has_proper_prefix(name, "init")
}

fn has_proper_prefix(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len() && name.starts_with(prefix)
}

/// Split off a leading run of `[a-z0-9_]` bytes (input is lowercased).
fn leading_token(s: &str) -> (&str, &str) {
    let s = s.trim_start_matches([' ', '\t']);
    let end = s
        .bytes()
        .position(|b| !(b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_'))
        .unwrap_or(s.len());
    s.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn type_declarations_outrank_functions_and_locals() {
        let class = compute_semantic_score("class Cat {}");
        let func = compute_semantic_score("func meow() {}");
        let local = compute_semantic_score("let cat = new Cat()");
        assert!(class > func, "class {class} should beat func {func}");
        assert!(func > local, "func {func} should beat local {local}");
    }

    #[test]
    fn visibility_is_monotone_within_a_keyword_class() {
        let public = compute_semantic_score("public class Widget {}");
        let plain = compute_semantic_score("class Widget {}");
        let private = compute_semantic_score("private class Widget {}");
        assert!(public > plain);
        assert!(plain > private);
    }

    #[test]
    fn public_visibility_wins_over_earlier_private() {
        assert_eq!(
            compute_semantic_score("private export class X {}"),
            TYPE_DECL_SCORE + VISIBILITY_PUBLIC
        );
    }

    #[test]
    fn methods_score_below_free_functions() {
        let method = compute_semantic_score("func (s *Server) handle() {}");
        let free = compute_semantic_score("func handle() {}");
        assert_eq!(method, METHOD_SCORE);
        assert_eq!(free, FUNCTION_SCORE);

        assert_eq!(
            compute_semantic_score("def process(self, item):"),
            METHOD_SCORE
        );
        assert_eq!(
            compute_semantic_score("fn process(&self, item: Item)"),
            METHOD_SCORE
        );
    }

    #[test]
    fn constructor_names_upgrade_functions() {
        assert_eq!(compute_semantic_score("def __init__(self):"), CONSTRUCTOR_SCORE);
        assert_eq!(
            compute_semantic_score("fn new() -> Self"),
            CONSTRUCTOR_SCORE
        );
        assert_eq!(
            compute_semantic_score("func newServer() *Server {"),
            CONSTRUCTOR_SCORE
        );
        assert_eq!(
            compute_semantic_score("function buildIndex() {}"),
            CONSTRUCTOR_SCORE
        );
        // Prefix matching is deliberately loose: `newest` still counts.
        assert_eq!(
            compute_semantic_score("func newest() int {"),
            CONSTRUCTOR_SCORE
        );
    }

    #[test]
    fn pub_restriction_parens_are_absorbed() {
        assert_eq!(
            compute_semantic_score("pub(crate) fn start() {}"),
            FUNCTION_SCORE + VISIBILITY_PUBLIC
        );
    }

    #[test]
    fn rust_method_detection_via_self() {
        assert_eq!(
            compute_semantic_score("pub fn len(&self) -> usize"),
            METHOD_SCORE + VISIBILITY_PUBLIC
        );
    }

    #[test]
    fn unknown_lines_score_zero() {
        assert_eq!(compute_semantic_score(""), 0);
        assert_eq!(compute_semantic_score("x + y"), 0);
        assert_eq!(compute_semantic_score("// comment"), 0);
    }
}
