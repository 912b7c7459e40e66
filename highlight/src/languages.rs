use std::collections::HashMap;

use snav_lang::LangId;
use tree_sitter::Language;

/// Grammar handles, initialized once at service construction. Languages
/// without an entry fall back to a single Plain span.
pub(crate) fn grammar_table() -> HashMap<LangId, Language> {
    HashMap::from([
        (LangId::Go, tree_sitter_go::LANGUAGE.into()),
        (LangId::Rust, tree_sitter_rust::LANGUAGE.into()),
        (LangId::Python, tree_sitter_python::LANGUAGE.into()),
        (LangId::JavaScript, tree_sitter_javascript::LANGUAGE.into()),
        (
            LangId::TypeScript,
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        ),
        (LangId::Tsx, tree_sitter_typescript::LANGUAGE_TSX.into()),
        (LangId::Yaml, tree_sitter_yaml::LANGUAGE.into()),
        (LangId::Toml, tree_sitter_toml_ng::LANGUAGE.into()),
        (LangId::Json, tree_sitter_json::LANGUAGE.into()),
        (LangId::Bash, tree_sitter_bash::LANGUAGE.into()),
        (LangId::C, tree_sitter_c::LANGUAGE.into()),
        (LangId::Cpp, tree_sitter_cpp::LANGUAGE.into()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_grammar_loads_into_a_parser() {
        let table = grammar_table();
        assert!(table.contains_key(&LangId::Go));
        assert!(!table.contains_key(&LangId::Plain));

        let mut parser = tree_sitter::Parser::new();
        for (lang, grammar) in &table {
            parser
                .set_language(grammar)
                .unwrap_or_else(|err| panic!("grammar for {lang:?} rejected: {err}"));
        }
    }
}
