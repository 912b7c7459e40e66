use anyhow::Result;
use anyhow::bail;
use ratatui::style::Color;
use ratatui::style::Modifier;
use ratatui::style::Style;
use snav_highlight::TokenCategory;

/// Resolved palette for both chrome and token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub name: &'static str,
    pub text: Color,
    pub input_bg: Color,
    pub selection_bg: Color,
    pub muted: Color,
    pub dim: Color,
    pub path_dir: Color,
    pub path_file: Color,
    pub path_meta: Color,
    pub header: Color,
    pub accent: Color,
    pub keyword: Color,
    pub type_name: Color,
    pub function: Color,
    pub string: Color,
    pub number: Color,
    pub comment: Color,
    pub operator: Color,
    pub error: Color,
}

const THEME_HINTS: &[&str] = &["nord", "dracula", "monokai", "github", "solarized-dark"];

/// Resolve a theme by name. An empty name means the default (`nord`);
/// `solarized` is accepted as an alias. Unknown names are an error listing
/// what is available.
pub fn load_palette(name: &str) -> Result<Palette> {
    let requested = name.trim();
    let lookup = match requested.to_ascii_lowercase().as_str() {
        "" => "nord".to_string(),
        "solarized" => "solarized-dark".to_string(),
        other => other.to_string(),
    };

    let palette = match lookup.as_str() {
        "nord" => NORD,
        "dracula" => DRACULA,
        "monokai" => MONOKAI,
        "github" => GITHUB,
        "solarized-dark" => SOLARIZED_DARK,
        _ => bail!(
            "unknown theme {requested:?}. try one of: {}",
            THEME_HINTS.join(", ")
        ),
    };
    Ok(palette)
}

/// Style for one token category, with the selection background applied for
/// the cursor row.
pub fn token_style(palette: &Palette, cat: TokenCategory, selected: bool) -> Style {
    let mut style = Style::default().fg(palette.text);
    if selected {
        style = style.bg(palette.selection_bg);
    }

    match cat {
        TokenCategory::Keyword => style.fg(palette.keyword),
        TokenCategory::Type => style.fg(palette.type_name),
        TokenCategory::Function => style.fg(palette.function),
        TokenCategory::String => style.fg(palette.string),
        TokenCategory::Number => style.fg(palette.number),
        TokenCategory::Comment => style.fg(palette.comment),
        TokenCategory::Operator => style.fg(palette.operator).add_modifier(Modifier::DIM),
        TokenCategory::Error => style.fg(palette.error).add_modifier(Modifier::BOLD),
        TokenCategory::Plain => style,
    }
}

const NORD: Palette = Palette {
    name: "nord",
    text: Color::Rgb(0xD8, 0xDE, 0xE9),
    input_bg: Color::Rgb(0x3B, 0x42, 0x52),
    selection_bg: Color::Rgb(0x43, 0x4C, 0x5E),
    muted: Color::Rgb(0x4C, 0x56, 0x6A),
    dim: Color::Rgb(0x4C, 0x56, 0x6A),
    path_dir: Color::Rgb(0x4C, 0x56, 0x6A),
    path_file: Color::Rgb(0x7B, 0x85, 0x98),
    path_meta: Color::Rgb(0x6B, 0x72, 0x80),
    header: Color::Rgb(0x8F, 0xBC, 0xBB),
    accent: Color::Rgb(0x88, 0xC0, 0xD0),
    keyword: Color::Rgb(0x81, 0xA1, 0xC1),
    type_name: Color::Rgb(0x8F, 0xBC, 0xBB),
    function: Color::Rgb(0x88, 0xC0, 0xD0),
    string: Color::Rgb(0xA3, 0xBE, 0x8C),
    number: Color::Rgb(0xB4, 0x8E, 0xAD),
    comment: Color::Rgb(0x4C, 0x56, 0x6A),
    operator: Color::Rgb(0xD8, 0xDE, 0xE9),
    error: Color::Rgb(0xBF, 0x61, 0x6A),
};

const DRACULA: Palette = Palette {
    name: "dracula",
    text: Color::Rgb(0xF8, 0xF8, 0xF2),
    input_bg: Color::Rgb(0x34, 0x35, 0x46),
    selection_bg: Color::Rgb(0x44, 0x47, 0x5A),
    muted: Color::Rgb(0x62, 0x72, 0xA4),
    dim: Color::Rgb(0x62, 0x72, 0xA4),
    path_dir: Color::Rgb(0x62, 0x72, 0xA4),
    path_file: Color::Rgb(0xBD, 0x93, 0xF9),
    path_meta: Color::Rgb(0x62, 0x72, 0xA4),
    header: Color::Rgb(0x8B, 0xE9, 0xFD),
    accent: Color::Rgb(0xFF, 0x79, 0xC6),
    keyword: Color::Rgb(0xFF, 0x79, 0xC6),
    type_name: Color::Rgb(0x8B, 0xE9, 0xFD),
    function: Color::Rgb(0x50, 0xFA, 0x7B),
    string: Color::Rgb(0xF1, 0xFA, 0x8C),
    number: Color::Rgb(0xBD, 0x93, 0xF9),
    comment: Color::Rgb(0x62, 0x72, 0xA4),
    operator: Color::Rgb(0xFF, 0x79, 0xC6),
    error: Color::Rgb(0xFF, 0x55, 0x55),
};

const MONOKAI: Palette = Palette {
    name: "monokai",
    text: Color::Rgb(0xF8, 0xF8, 0xF2),
    input_bg: Color::Rgb(0x3E, 0x3D, 0x32),
    selection_bg: Color::Rgb(0x49, 0x48, 0x3E),
    muted: Color::Rgb(0x75, 0x71, 0x5E),
    dim: Color::Rgb(0x75, 0x71, 0x5E),
    path_dir: Color::Rgb(0x75, 0x71, 0x5E),
    path_file: Color::Rgb(0xA6, 0xE2, 0x2E),
    path_meta: Color::Rgb(0x75, 0x71, 0x5E),
    header: Color::Rgb(0x66, 0xD9, 0xEF),
    accent: Color::Rgb(0xF9, 0x26, 0x72),
    keyword: Color::Rgb(0xF9, 0x26, 0x72),
    type_name: Color::Rgb(0x66, 0xD9, 0xEF),
    function: Color::Rgb(0xA6, 0xE2, 0x2E),
    string: Color::Rgb(0xE6, 0xDB, 0x74),
    number: Color::Rgb(0xAE, 0x81, 0xFF),
    comment: Color::Rgb(0x75, 0x71, 0x5E),
    operator: Color::Rgb(0xF9, 0x26, 0x72),
    error: Color::Rgb(0xF9, 0x26, 0x72),
};

const GITHUB: Palette = Palette {
    name: "github",
    text: Color::Rgb(0x24, 0x29, 0x2E),
    input_bg: Color::Rgb(0xEA, 0xEE, 0xF2),
    selection_bg: Color::Rgb(0xDD, 0xE4, 0xEB),
    muted: Color::Rgb(0x6E, 0x77, 0x81),
    dim: Color::Rgb(0x6E, 0x77, 0x81),
    path_dir: Color::Rgb(0x6E, 0x77, 0x81),
    path_file: Color::Rgb(0x05, 0x50, 0xAE),
    path_meta: Color::Rgb(0x6E, 0x77, 0x81),
    header: Color::Rgb(0x6F, 0x42, 0xC1),
    accent: Color::Rgb(0x00, 0x5C, 0xC5),
    keyword: Color::Rgb(0xD7, 0x3A, 0x49),
    type_name: Color::Rgb(0x6F, 0x42, 0xC1),
    function: Color::Rgb(0x6F, 0x42, 0xC1),
    string: Color::Rgb(0x03, 0x2F, 0x62),
    number: Color::Rgb(0x00, 0x5C, 0xC5),
    comment: Color::Rgb(0x6A, 0x73, 0x7D),
    operator: Color::Rgb(0xD7, 0x3A, 0x49),
    error: Color::Rgb(0xCB, 0x24, 0x31),
};

const SOLARIZED_DARK: Palette = Palette {
    name: "solarized-dark",
    text: Color::Rgb(0x83, 0x94, 0x96),
    input_bg: Color::Rgb(0x07, 0x36, 0x42),
    selection_bg: Color::Rgb(0x0A, 0x46, 0x56),
    muted: Color::Rgb(0x58, 0x6E, 0x75),
    dim: Color::Rgb(0x58, 0x6E, 0x75),
    path_dir: Color::Rgb(0x58, 0x6E, 0x75),
    path_file: Color::Rgb(0x26, 0x8B, 0xD2),
    path_meta: Color::Rgb(0x58, 0x6E, 0x75),
    header: Color::Rgb(0x2A, 0xA1, 0x98),
    accent: Color::Rgb(0x26, 0x8B, 0xD2),
    keyword: Color::Rgb(0x85, 0x99, 0x00),
    type_name: Color::Rgb(0xB5, 0x89, 0x00),
    function: Color::Rgb(0x26, 0x8B, 0xD2),
    string: Color::Rgb(0x2A, 0xA1, 0x98),
    number: Color::Rgb(0xD3, 0x36, 0x82),
    comment: Color::Rgb(0x58, 0x6E, 0x75),
    operator: Color::Rgb(0x83, 0x94, 0x96),
    error: Color::Rgb(0xDC, 0x32, 0x2F),
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_themes_resolve() {
        for name in THEME_HINTS {
            let palette = load_palette(name).expect("known theme");
            assert_eq!(&palette.name, name);
        }
    }

    #[test]
    fn default_and_alias_resolve() {
        assert_eq!(load_palette("").expect("default").name, "nord");
        assert_eq!(load_palette("  NORD ").expect("case-folded").name, "nord");
        assert_eq!(
            load_palette("solarized").expect("alias").name,
            "solarized-dark"
        );
    }

    #[test]
    fn unknown_theme_lists_hints() {
        let err = load_palette("no-such-theme").expect_err("unknown theme");
        let message = err.to_string();
        assert!(message.contains("no-such-theme"));
        assert!(message.contains("nord"));
    }

    #[test]
    fn selection_background_applies_to_all_categories() {
        let palette = load_palette("nord").expect("theme");
        for cat in [
            TokenCategory::Plain,
            TokenCategory::Keyword,
            TokenCategory::Error,
        ] {
            let style = token_style(&palette, cat, true);
            assert_eq!(style.bg, Some(palette.selection_bg));
        }
    }
}
