use snav_lang::LangId;
use tree_sitter::Node;

use crate::TokenCategory;
use crate::spans::RawSpan;

/// Walk the tree collecting leaves that intersect `[line_start, line_end)`,
/// clipped to that range, with byte offsets rebased onto the line.
pub(crate) fn collect_leaf_spans(
    node: Node<'_>,
    line_start: usize,
    line_end: usize,
    src: &[u8],
    lang: LangId,
    parent_type: &str,
    grand_type: &str,
    out: &mut Vec<RawSpan>,
) {
    let start = node.start_byte();
    let end = node.end_byte();
    if end <= line_start || start >= line_end {
        return;
    }

    if node.child_count() == 0 {
        let clipped_start = start.max(line_start);
        let clipped_end = end.min(line_end);
        if clipped_start >= clipped_end {
            return;
        }

        let text = src.get(start..end).unwrap_or_default();
        let cat = classify_leaf(lang, &node, parent_type, grand_type, text);
        out.push(RawSpan {
            start: clipped_start - line_start,
            end: clipped_end - line_start,
            cat,
        });
        return;
    }

    let next_parent = node.kind().to_ascii_lowercase();
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            collect_leaf_spans(
                child,
                line_start,
                line_end,
                src,
                lang,
                &next_parent,
                parent_type,
                out,
            );
        }
    }
}

fn classify_leaf(
    lang: LangId,
    node: &Node<'_>,
    parent_type: &str,
    grand_type: &str,
    text: &[u8],
) -> TokenCategory {
    let node_type = node.kind().to_ascii_lowercase();
    let raw_lexeme = String::from_utf8_lossy(text).trim().to_string();
    let lexeme = raw_lexeme.to_ascii_lowercase();

    if node_type == "error" || node_type.contains("invalid") {
        return TokenCategory::Error;
    }
    if node_type.contains("comment") {
        return TokenCategory::Comment;
    }
    if contains_any(&node_type, &["string", "char", "heredoc"]) {
        // JSON object keys read as structure, not data.
        if lang == LangId::Json && (parent_type == "pair" || grand_type == "pair") {
            return TokenCategory::Type;
        }
        return TokenCategory::String;
    }
    if contains_any(&node_type, &["number", "integer", "float", "numeric"]) {
        return TokenCategory::Number;
    }
    if matches!(lexeme.as_str(), "true" | "false" | "null" | "nil" | "none") {
        return TokenCategory::Number;
    }

    if node_type.ends_with("keyword") {
        return TokenCategory::Keyword;
    }

    if contains_any(
        &node_type,
        &["type_identifier", "primitive_type", "predefined_type"],
    ) {
        return TokenCategory::Type;
    }

    if is_identifier_node(&node_type) {
        if is_type_context(lang, parent_type, grand_type) {
            return TokenCategory::Type;
        }
        if is_function_context(lang, parent_type, grand_type) {
            return TokenCategory::Function;
        }
        if is_likely_constant(&raw_lexeme) {
            return TokenCategory::Number;
        }
    }

    if KEYWORDS.contains(&lexeme.as_str()) {
        return TokenCategory::Keyword;
    }
    if OPERATORS.contains(&lexeme.as_str()) {
        return TokenCategory::Operator;
    }
    if !node.is_named() && looks_like_operator(&lexeme) {
        return TokenCategory::Operator;
    }

    TokenCategory::Plain
}

fn is_identifier_node(node_type: &str) -> bool {
    node_type == "identifier"
        || node_type == "property_identifier"
        || node_type.ends_with("identifier")
        || node_type.ends_with("name")
}

fn is_function_context(lang: LangId, parent_type: &str, grand_type: &str) -> bool {
    is_context(
        parent_type,
        grand_type,
        &["function", "method", "call", "member", "selector"],
        function_contexts(lang),
    )
}

fn is_type_context(lang: LangId, parent_type: &str, grand_type: &str) -> bool {
    is_context(
        parent_type,
        grand_type,
        &["type", "class", "struct", "interface", "trait"],
        type_contexts(lang),
    )
}

fn is_context(
    parent_type: &str,
    grand_type: &str,
    hints: &[&str],
    allow_list: &[&str],
) -> bool {
    if contains_any(parent_type, hints) || contains_any(grand_type, hints) {
        return true;
    }
    allow_list.contains(&parent_type) || allow_list.contains(&grand_type)
}

fn function_contexts(lang: LangId) -> &'static [&'static str] {
    match lang {
        LangId::Go => &[
            "function_declaration",
            "method_declaration",
            "call_expression",
            "selector_expression",
        ],
        LangId::Rust => &["function_item", "call_expression", "field_expression"],
        LangId::JavaScript | LangId::TypeScript | LangId::Tsx => &[
            "function_declaration",
            "method_definition",
            "call_expression",
            "member_expression",
        ],
        LangId::Python => &["function_definition", "call"],
        LangId::C | LangId::Cpp => &["function_definition", "call_expression"],
        _ => &[],
    }
}

fn type_contexts(lang: LangId) -> &'static [&'static str] {
    match lang {
        LangId::Go => &[
            "type_spec",
            "type_declaration",
            "parameter_declaration",
            "var_declaration",
        ],
        LangId::Rust => &["struct_item", "enum_item", "trait_item", "type_item"],
        LangId::JavaScript => &["class_declaration", "type_annotation"],
        LangId::TypeScript | LangId::Tsx => &[
            "interface_declaration",
            "type_alias_declaration",
            "type_annotation",
            "class_declaration",
        ],
        LangId::Python => &["class_definition"],
        _ => &[],
    }
}

fn contains_any(s: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| s.contains(needle))
}

/// SCREAMING_SNAKE identifiers read as constants.
pub(crate) fn is_likely_constant(s: &str) -> bool {
    if s.len() < 2 {
        return false;
    }
    let mut has_letter = false;
    for r in s.chars() {
        if r == '_' || r.is_ascii_digit() {
            continue;
        }
        if r.is_alphabetic() {
            has_letter = true;
            if r.is_lowercase() {
                return false;
            }
            continue;
        }
        return false;
    }
    has_letter
}

pub(crate) fn looks_like_operator(s: &str) -> bool {
    !s.is_empty()
        && s.chars().all(|r| {
            matches!(
                r,
                '+' | '-'
                    | '*'
                    | '/'
                    | '%'
                    | '='
                    | '!'
                    | '<'
                    | '>'
                    | '&'
                    | '|'
                    | '^'
                    | '~'
                    | ':'
                    | ';'
                    | ','
                    | '.'
                    | '?'
                    | '('
                    | ')'
                    | '['
                    | ']'
                    | '{'
                    | '}'
            )
        })
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "case", "catch", "class", "const", "continue", "def",
    "default", "defer", "do", "else", "enum", "export", "extends", "fallthrough", "finally", "fn",
    "for", "from", "func", "function", "if", "impl", "import", "in", "include", "interface",
    "let", "loop", "match", "mod", "module", "mut", "namespace", "new", "package", "pub", "raise",
    "return", "struct", "switch", "trait", "try", "type", "use", "var", "while", "with", "yield",
];

const OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "=", "==", "!=", "<", "<=", ">", ">=", "&&", "||", "!", "&", "|",
    "^", "~", "->", "=>", "::", ":", ";", ",", ".", "?", "(", ")", "[", "]", "{", "}",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_shape_requires_uppercase_letters() {
        assert!(is_likely_constant("MAX_RETRIES"));
        assert!(is_likely_constant("HTTP2"));
        assert!(!is_likely_constant("MaxRetries"));
        assert!(!is_likely_constant("retries"));
        assert!(!is_likely_constant("A"));
        assert!(!is_likely_constant("__"));
        assert!(!is_likely_constant("A-B"));
    }

    #[test]
    fn operator_shape_is_punctuation_only() {
        assert!(looks_like_operator("=>"));
        assert!(looks_like_operator("::"));
        assert!(!looks_like_operator(""));
        assert!(!looks_like_operator("a+"));
    }
}
