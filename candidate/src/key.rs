use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::file_base_without_ext;

/// Ordered declaration cascade. The first regex whose first non-empty
/// capture group matches wins; later entries are deliberately looser so
/// config formats still yield something usable.
static KEY_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Namespaces, dotted or scoped, including `inline namespace`.
        r"^\s*(?:export\s+)?(?:inline\s+)?namespace\s+([A-Za-z_][A-Za-z0-9_]*(?:(?:::|\.)[A-Za-z_][A-Za-z0-9_]*)*)\b",
        r"^\s*(?:(?:export|default|async|public|private|protected|internal|abstract|final|sealed|partial|static)\s+)*(?:function|class|interface|type|enum|record)\s+([A-Za-z_$][A-Za-z0-9_$]*)\b",
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
        // Go funcs, receiver-aware.
        r"^\s*func\s*(?:\([^)]*\)\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*\(",
        r"^\s*(?:type|var|const)\s+([A-Za-z_][A-Za-z0-9_]*)",
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:fn|struct|enum|trait|mod|type|const|static)\s+([A-Za-z_][A-Za-z0-9_]*)",
        r"^\s*(?:async\s+def|def|class)\s+([A-Za-z_][A-Za-z0-9_]*)",
        r"^\s*(?:interface|class|enum|record)\s+([A-Za-z_][A-Za-z0-9_]*)",
        r"^\s*(?:fun|val|var|object|class|interface)\s+([A-Za-z_][A-Za-z0-9_]*)",
        // TOML array-of-tables and TOML/INI sections.
        r"^\s*\[\[([A-Za-z0-9_.:-]+)\]\]\s*$",
        r"^\s*\[([A-Za-z0-9_.:-]+)\]\s*$",
        // Quoted JSON/YAML keys, YAML list-item keys, shell exports.
        r#"^\s*"((?:\\.|[^"\\])+)"\s*:"#,
        r"^\s*'([^']+)'\s*:",
        r#"^\s*-\s*"((?:\\.|[^"\\])+)"\s*:"#,
        r"^\s*-\s*'([^']+)'\s*:",
        r"^\s*-\s*([A-Za-z0-9_.-]+)\s*:",
        r"^\s*export\s+([A-Za-z_][A-Za-z0-9_.-]*)\s*=",
        // HCL blocks: capture the last label.
        r#"^\s*[A-Za-z0-9_.-]+\s+"(?:\\.|[^"\\])+"\s+"((?:\\.|[^"\\])+)"\s*\{"#,
        r#"^\s*[A-Za-z0-9_.-]+\s+"((?:\\.|[^"\\])+)"\s*\{"#,
        // XML key/name/id attributes, then bare tags.
        r#"^\s*<[^>]*\b(?:[Kk][Ee][Yy]|[Nn][Aa][Mm][Ee]|[Ii][Dd])\s*=\s*"((?:\\.|[^"\\])+)""#,
        r"^\s*<[^>]*\b(?:[Kk][Ee][Yy]|[Nn][Aa][Mm][Ee]|[Ii][Dd])\s*=\s*'([^']+)'",
        r"^\s*<\s*([A-Za-z_][A-Za-z0-9_.:-]*)\b",
        r"^\s*([A-Za-z0-9_.-]+)\s*\{",
        r"^\s*([A-Za-z0-9_.-]+)\s*(?::|=)",
        r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*:=",
        r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*:",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("key regex must compile"))
    .collect()
});

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*").expect("identifier regex must compile"));

const STOP_WORDS: &[&str] = &[
    "if",
    "for",
    "while",
    "switch",
    "return",
    "case",
    "break",
    "continue",
    "default",
    "func",
    "type",
    "const",
    "var",
    "class",
    "interface",
    "enum",
    "namespace",
    "export",
    "public",
    "private",
    "protected",
    "internal",
    "abstract",
    "final",
    "sealed",
    "partial",
    "static",
    "inline",
    "def",
    "fn",
];

/// Extract a symbol name from a matched line. Falls back to the first
/// non-stopword identifier, then to the filename, so the result is never
/// empty for a non-empty path.
pub fn extract_key(text: &str, file: &str) -> String {
    for re in KEY_REGEXES.iter() {
        if let Some(caps) = re.captures(text) {
            for group in caps.iter().skip(1).flatten() {
                if !group.as_str().is_empty() {
                    return group.as_str().to_string();
                }
            }
        }
    }

    for ident in IDENTIFIER.find_iter(text) {
        let ident = ident.as_str();
        if !STOP_WORDS.contains(&ident.to_ascii_lowercase().as_str()) {
            return ident.to_string();
        }
    }

    let base = file_base_without_ext(file);
    if base.is_empty() {
        file.to_string()
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn declaration_lines() {
        let cases = [
            ("namespace Symfind.Core;", "Symfind.Core"),
            ("inline namespace symfind::core {", "symfind::core"),
            ("public class SearchIndex : Base {", "SearchIndex"),
            ("export default class QueryEngine {", "QueryEngine"),
            ("final class Tokenizer extends Base {}", "Tokenizer"),
            ("export const makeThing = () => {}", "makeThing"),
            ("func (s *Server) Handle(w http.ResponseWriter) {", "Handle"),
            ("type Config struct {", "Config"),
            ("pub(crate) fn start_producer(", "start_producer"),
            ("pub fn filter_candidates(c: &[Candidate]) {", "filter_candidates"),
            ("async def fetch_all(session):", "fetch_all"),
            ("fun onCreate(savedInstanceState: Bundle?) {", "onCreate"),
        ];
        for (text, want) in cases {
            assert_eq!(extract_key(text, "src/sample.txt"), want, "text: {text}");
        }
    }

    #[test]
    fn config_lines() {
        let cases = [
            ("[[tool.poetry.plugins]]", "tool.poetry.plugins"),
            ("[profile.release]", "profile.release"),
            (r#""scripts": {"#, "scripts"),
            ("'version': 2", "version"),
            (r#"- "db-port": 5432"#, "db-port"),
            ("- replicas: 3", "replicas"),
            ("export PATH=/usr/bin", "PATH"),
            (r#"resource "aws_s3_bucket" "assets" {"#, "assets"),
            (r#"provider "aws" {"#, "aws"),
            (r#"<add key="timeout" value="30" />"#, "timeout"),
            ("<Project Sdk=\"Microsoft.NET.Sdk\">", "Project"),
            ("retry_count = 5", "retry_count"),
            ("total := compute()", "total"),
        ];
        for (text, want) in cases {
            assert_eq!(extract_key(text, "conf/sample.txt"), want, "text: {text}");
        }
    }

    #[test]
    fn fallback_skips_stopwords() {
        assert_eq!(extract_key("if ready() { launch() }", "a/b.go"), "ready");
        assert_eq!(extract_key("return;", "pkg/handler.go"), "handler");
    }

    #[test]
    fn fallback_to_filename_without_extension() {
        assert_eq!(extract_key("!!!", "docs/README.md"), "README");
        assert_eq!(extract_key("???", "Makefile"), "Makefile");
    }
}
