use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

/// Languages the navigator understands well enough to highlight.
///
/// Anything without a grammar maps to `Plain` and renders unstyled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LangId {
    #[default]
    Plain,
    Go,
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Yaml,
    Toml,
    Json,
    Bash,
    C,
    Cpp,
}

impl LangId {
    pub fn name(self) -> &'static str {
        match self {
            LangId::Plain => "plain",
            LangId::Go => "go",
            LangId::Rust => "rust",
            LangId::Python => "python",
            LangId::JavaScript => "javascript",
            LangId::TypeScript => "typescript",
            LangId::Tsx => "tsx",
            LangId::Yaml => "yaml",
            LangId::Toml => "toml",
            LangId::Json => "json",
            LangId::Bash => "bash",
            LangId::C => "c",
            LangId::Cpp => "cpp",
        }
    }
}

/// Map a repo path to a language id. Well-known filenames win over
/// extensions so `Cargo.toml` and `go.mod` land where users expect.
pub fn detect(path: &str) -> LangId {
    let base = file_base(path);
    if let Some(id) = from_filename(base) {
        return id;
    }
    let ext = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return LangId::Plain,
    };
    from_extension(&ext)
}

/// Like [`detect`], but for extensionless scripts fall back to sniffing a
/// shebang from the first line of the file.
pub fn detect_with_shebang(path: &str, first_line: &str) -> LangId {
    let detected = detect(path);
    if detected != LangId::Plain {
        return detected;
    }

    if !first_line.starts_with("#!") {
        return LangId::Plain;
    }
    let lower = first_line.to_ascii_lowercase();
    if lower.contains("python") {
        LangId::Python
    } else if lower.contains("bash") || lower.contains("zsh") || lower.contains("sh") {
        LangId::Bash
    } else if lower.contains("node") {
        LangId::JavaScript
    } else {
        LangId::Plain
    }
}

fn file_base(path: &str) -> &str {
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

fn from_filename(base: &str) -> Option<LangId> {
    let id = match base {
        "Makefile" | "Dockerfile" | ".gitignore" | ".editorconfig" | "go.sum" => LangId::Plain,
        ".bashrc" | ".zshrc" => LangId::Bash,
        "Cargo.toml" => LangId::Toml,
        "package-lock.json" => LangId::Json,
        "go.mod" => LangId::Go,
        _ => return None,
    };
    Some(id)
}

fn from_extension(ext: &str) -> LangId {
    match ext {
        "go" => LangId::Go,
        "rs" => LangId::Rust,
        "py" => LangId::Python,
        "js" | "jsx" | "mjs" | "cjs" => LangId::JavaScript,
        "ts" => LangId::TypeScript,
        "tsx" => LangId::Tsx,
        "yaml" | "yml" => LangId::Yaml,
        "toml" => LangId::Toml,
        "json" | "jsonc" | "json5" => LangId::Json,
        "sh" | "bash" | "zsh" => LangId::Bash,
        "c" | "h" => LangId::C,
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => LangId::Cpp,
        _ => LangId::Plain,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detect_by_extension() {
        assert_eq!(detect("src/main.rs"), LangId::Rust);
        assert_eq!(detect("cmd/tool/main.go"), LangId::Go);
        assert_eq!(detect("web/app.tsx"), LangId::Tsx);
        assert_eq!(detect("conf/settings.json5"), LangId::Json);
        assert_eq!(detect("notes.md"), LangId::Plain);
    }

    #[test]
    fn detect_by_filename_beats_extension() {
        assert_eq!(detect("Cargo.toml"), LangId::Toml);
        assert_eq!(detect("vendor/go.mod"), LangId::Go);
        assert_eq!(detect("go.sum"), LangId::Plain);
        assert_eq!(detect(".bashrc"), LangId::Bash);
    }

    #[test]
    fn shebang_overrides_plain_only() {
        assert_eq!(
            detect_with_shebang("script", "#!/usr/bin/env python"),
            LangId::Python
        );
        assert_eq!(detect_with_shebang("run", "#!/bin/sh"), LangId::Bash);
        assert_eq!(
            detect_with_shebang("tool", "#!/usr/bin/env node"),
            LangId::JavaScript
        );
        assert_eq!(detect_with_shebang("main.rs", "#!/bin/sh"), LangId::Rust);
        assert_eq!(detect_with_shebang("README", "no shebang"), LangId::Plain);
    }

    #[test]
    fn hidden_files_without_extension_stay_plain() {
        assert_eq!(detect(".env"), LangId::Plain);
        assert_eq!(detect(".gitignore"), LangId::Plain);
    }
}
