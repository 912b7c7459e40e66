use serde::Deserialize;
use serde::Serialize;
use snav_lang::LangId;

/// Default declaration regex handed to the line grep. A line matches when,
/// after optional modifier keywords, it starts with one of a fixed
/// language-agnostic declaration vocabulary.
pub const DEFAULT_PATTERN: &str = r"^\s*(?:(?:export|default|async|public|private|protected|internal|abstract|final|sealed|partial|static|inline|pub(?:\([^)]*\))?)\s+)*(?:func|function|type|var|const|class|interface|enum|record|def|fn|struct|impl|trait|module|mod|let|protocol|extension|namespace)\b";

/// Regex for the config-file second pass: TOML section headers, JSON/YAML
/// keys, shell exports, HCL blocks, XML attributes/tags.
pub const DEFAULT_CONFIG_PATTERN: &str = r#"^\s*(?:\[\[[A-Za-z0-9_.:-]+\]\]\s*$|\[[A-Za-z0-9_.:-]+\]\s*$|"(?:\\.|[^"\\])+"\s*:|'[^']+'\s*:|-\s*(?:"(?:\\.|[^"\\])+"|'[^']+'|[A-Za-z0-9_.-]+)\s*:|(?:export\s+)?[A-Za-z0-9_.-]+\s*(?::|=)|[A-Za-z0-9_.-]+(?:\s+"(?:\\.|[^"\\])+"){0,2}\s*\{|<\s*[A-Za-z_][A-Za-z0-9_.:-]*(?:\s|>|/>))"#;

/// One discovered declaration or config entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Dense 1-based ordinal in emission order; stable identity across
    /// re-filtering within a session.
    pub id: u32,
    /// Repo-relative, cleaned path.
    pub file: String,
    pub line: u32,
    pub col: u32,
    /// Line contents with leading indentation trimmed.
    pub text: String,
    /// Extracted symbol name; never empty.
    pub key: String,
    pub lang: LangId,
    pub semantic_score: i16,
}

/// A scored reference into the candidate vector. Kept at 16 bytes so large
/// result sets stay cache friendly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilteredCandidate {
    pub index: u32,
    pub score: i32,
    /// When non-zero, overrides the candidate position at open time.
    pub open_line: u32,
    pub open_col: u32,
}

/// Drives the grep invocation and doubles as the on-disk index cache key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerConfig {
    pub root: String,
    pub pattern: String,
    pub excludes: Vec<String>,
    pub no_ignore: bool,
    pub exclude_tests: bool,
}

pub(crate) const TEST_EXCLUDE_GLOBS: &[&str] = &[
    "test/**",
    "tests/**",
    "__tests__/**",
    "spec/**",
    "specs/**",
    "**/test/**",
    "**/tests/**",
    "**/__tests__/**",
    "**/spec/**",
    "**/specs/**",
    "*_test.*",
    "*_spec.*",
    "*.test.*",
    "*.spec.*",
    "test_*.py",
    "**/*_test.*",
    "**/*_spec.*",
    "**/*.test.*",
    "**/*.spec.*",
    "**/test_*.py",
];

pub(crate) const CONFIG_INCLUDE_GLOBS: &[&str] = &[
    "*.json",
    "*.jsonc",
    "*.json5",
    "*.yaml",
    "*.yml",
    "*.toml",
    "*.ini",
    ".env",
    ".env.*",
    ".envrc",
    "*.properties",
    "*.conf",
    "*.cfg",
    "*.cnf",
    "*.tf",
    "*.hcl",
    "*.tfvars",
    "*.xml",
    "*.plist",
    "*.csproj",
    "*.props",
    "*.targets",
    "*.config",
];

/// Base filename without its extension, used by the key fallback and by the
/// path-only open rule.
pub(crate) fn file_base_without_ext(path: &str) -> &str {
    let base = match path.rsplit_once('/') {
        Some((_, base)) => base,
        None => path,
    };
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}
