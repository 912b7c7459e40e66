use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span as UiSpan;
use ratatui::widgets::Paragraph;
use snav_candidate::Candidate;
use snav_candidate::fuzzy_positions_runes;
use snav_highlight::Span;
use snav_highlight::TokenCategory;

use crate::app::App;
use crate::text::build_emphasis_mask;
use crate::text::display_width;
use crate::text::emphasis_at;
use crate::text::truncate_text;
use crate::theme::token_style;

pub fn render(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();
    if area.width == 0 || area.height == 0 {
        return;
    }

    let (list_w, list_h, preview_w, _) = app.layout();

    let header_area = Rect::new(area.x, area.y, area.width, 2.min(area.height));
    render_header(frame, app, header_area);
    if area.height < 4 {
        return;
    }

    let content_y = area.y + 2;
    let content_h = (list_h as u16).min(area.height.saturating_sub(3));
    let list_area = Rect::new(area.x, content_y, list_w as u16, content_h);
    render_list(frame, app, list_area);

    if app.preview_enabled && preview_w > 0 {
        let preview_x = area.x + list_w as u16 + 1;
        let preview_area = Rect::new(preview_x, content_y, preview_w as u16, content_h);
        render_preview(frame, app, preview_area);
    }

    let footer_area = Rect::new(area.x, area.y + area.height - 1, area.width, 1);
    render_footer(frame, app, footer_area);
}

fn render_header(frame: &mut Frame<'_>, app: &App, area: Rect) {
    if area.height == 0 {
        return;
    }
    let palette = &app.palette;

    let query_style = Style::default().fg(palette.text).bg(palette.input_bg);
    let prompt = UiSpan::styled("query> ", Style::default().fg(palette.accent));
    let before: String = app.input[..app.input_cursor].iter().collect();
    let at: String = app
        .input
        .get(app.input_cursor)
        .map_or_else(|| " ".to_string(), |c| c.to_string());
    let after: String = app
        .input
        .get(app.input_cursor + 1..)
        .map_or_else(String::new, |rest| rest.iter().collect());
    let line1 = Line::from(vec![
        prompt,
        UiSpan::styled(before, query_style),
        UiSpan::styled(at, query_style.add_modifier(Modifier::REVERSED)),
        UiSpan::styled(after, query_style),
    ]);

    let scan_state = if app.scan_done { "done" } else { "scanning" };
    let mut status = format!(
        "{scan_state} | candidates {} | visible {}",
        app.candidates.len(),
        app.filtered.len()
    );
    if !app.status.is_empty() {
        status.push_str(" | ");
        status.push_str(&app.status);
    }
    let mut line2 = Line::from(vec![UiSpan::styled(
        status,
        Style::default().fg(palette.muted),
    )]);
    if !app.err_msg.is_empty() {
        line2.push_span(UiSpan::raw("  "));
        line2.push_span(UiSpan::styled(
            app.err_msg.clone(),
            Style::default().fg(palette.error),
        ));
    }

    frame.render_widget(Paragraph::new(vec![line1, line2]), area);
}

fn render_footer(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let text = "up/down move  pgup/pgdn jump  tab preview  ctrl-y copy  enter open  esc quit";
    let footer = Paragraph::new(Line::from(UiSpan::styled(
        truncate_text(text, area.width as usize),
        Style::default().fg(app.palette.muted),
    )));
    frame.render_widget(footer, area);
}

fn render_list(frame: &mut Frame<'_>, app: &App, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    if app.filtered.is_empty() {
        let empty = Paragraph::new(Line::from(UiSpan::styled(
            "no matches",
            Style::default().fg(app.palette.muted),
        )));
        frame.render_widget(empty, area);
        return;
    }

    let width = area.width as usize;
    let height = area.height as usize;
    let rows = (height / 2).max(1);
    let start = app.offset;
    let end = app.filtered.len().min(start + rows);

    let mut lines: Vec<Line<'_>> = Vec::with_capacity(height);
    for (row, item) in app.filtered[start..end].iter().enumerate() {
        let cand = &app.candidates[item.index as usize];
        let selected = start + row == app.cursor;
        lines.push(location_line(app, cand, selected, width));
        if lines.len() < height {
            lines.push(text_line(app, cand, selected, width));
        }
        if lines.len() >= height {
            break;
        }
    }

    frame.render_widget(Paragraph::new(lines), area);
}

/// First row of a result: `dir/file:line:col`, styled per path segment,
/// with the query's fuzzy positions emphasized.
fn location_line(app: &App, cand: &Candidate, selected: bool, width: usize) -> Line<'static> {
    let (loc, file_start, file_end) =
        format_location_with_visible_filename(&cand.file, cand.line, cand.col, width);
    let runes: Vec<char> = loc.chars().collect();
    if runes.is_empty() {
        return Line::default();
    }

    let palette = &app.palette;
    let mut dir_style = Style::default().fg(palette.path_dir);
    let mut file_style = Style::default().fg(palette.path_file);
    let mut meta_style = Style::default().fg(palette.path_meta);
    if selected {
        dir_style = dir_style.bg(palette.selection_bg);
        file_style = file_style.bg(palette.selection_bg);
        meta_style = meta_style.bg(palette.selection_bg);
    }

    let emphasis = build_emphasis_mask(runes.len(), fuzzy_positions_runes(&loc, &app.query_lower));
    let part_at = |i: usize| {
        if i < file_start {
            0
        } else if i < file_end {
            1
        } else {
            2
        }
    };

    let mut spans: Vec<UiSpan<'static>> = Vec::new();
    let mut i = 0;
    while i < runes.len() {
        let part = part_at(i);
        let emph = emphasis_at(&emphasis, i);
        let mut j = i + 1;
        while j < runes.len() && emphasis_at(&emphasis, j) == emph && part_at(j) == part {
            j += 1;
        }

        let mut style = match part {
            0 => dir_style,
            1 => file_style,
            _ => meta_style,
        };
        if emph {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        spans.push(UiSpan::styled(
            runes[i..j].iter().collect::<String>(),
            style,
        ));
        i = j;
    }

    Line::from(spans)
}

/// Second row of a result: the matched text, syntax highlighted when the
/// span cache has an answer, Plain (and queued) otherwise.
fn text_line(app: &App, cand: &Candidate, selected: bool, width: usize) -> Line<'static> {
    let text = truncate_text(&cand.text, width);
    let req = app.highlight_request(cand.lang, &cand.file, cand.line, text.clone());
    let spans = match app.highlighter.lookup(&req) {
        Some(spans) => spans.to_vec(),
        None => {
            app.highlighter.queue(req);
            vec![Span {
                start: 0,
                end: text.chars().count(),
                cat: TokenCategory::Plain,
            }]
        }
    };

    token_line(app, &text, &spans, selected)
}

/// Style a display line from its category spans, overlaying query emphasis.
pub fn token_line(app: &App, text: &str, spans: &[Span], selected: bool) -> Line<'static> {
    let runes: Vec<char> = text.chars().collect();
    if runes.is_empty() {
        return Line::default();
    }

    let emphasis = build_emphasis_mask(runes.len(), fuzzy_positions_runes(text, &app.query_lower));

    let mut out: Vec<UiSpan<'static>> = Vec::new();
    for span in spans {
        let start = span.start.min(runes.len());
        let end = span.end.min(runes.len());
        if end <= start {
            continue;
        }
        let mut i = start;
        while i < end {
            let emph = emphasis_at(&emphasis, i);
            let mut j = i + 1;
            while j < end && emphasis_at(&emphasis, j) == emph {
                j += 1;
            }
            let mut style = token_style(&app.palette, span.cat, selected);
            if emph {
                style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
            }
            out.push(UiSpan::styled(
                runes[i..j].iter().collect::<String>(),
                style,
            ));
            i = j;
        }
    }

    Line::from(out)
}

fn render_preview(frame: &mut Frame<'_>, app: &App, area: Rect) {
    if area.width == 0 || area.height == 0 {
        return;
    }
    let palette = &app.palette;
    let width = area.width as usize;
    let height = area.height as usize;

    let header_style = Style::default()
        .fg(palette.header)
        .add_modifier(Modifier::BOLD);

    if !app.preview.err.is_empty() {
        let lines = vec![
            Line::from(UiSpan::styled("preview", header_style)),
            Line::from(UiSpan::styled(
                truncate_text(&app.preview.err, width),
                Style::default().fg(palette.error),
            )),
        ];
        frame.render_widget(Paragraph::new(lines), area);
        return;
    }
    if app.preview.lines.is_empty() {
        return;
    }

    let mut lines: Vec<Line<'_>> = Vec::with_capacity(height);
    lines.push(Line::from(UiSpan::styled(
        truncate_text(&format!("preview  {}", app.preview.file), width),
        header_style,
    )));

    let avail = height - 1;
    let max_code = width.saturating_sub(7);
    for (i, source_line) in app.preview.lines.iter().take(avail).enumerate() {
        let line_no = app.preview.start_line + i;
        let prefix = UiSpan::styled(format!("{line_no:>6} "), Style::default().fg(palette.dim));

        let selected = line_no == app.preview.selected_line;
        let text = truncate_text(source_line, max_code);
        let req =
            app.highlight_request(app.preview.lang, &app.preview.file, line_no as u32, text.clone());
        let spans = match app.highlighter.lookup(&req) {
            Some(spans) => spans.to_vec(),
            None => {
                app.highlighter.queue(req);
                vec![Span {
                    start: 0,
                    end: text.chars().count(),
                    cat: TokenCategory::Plain,
                }]
            }
        };

        let mut code = token_line(app, &text, &spans, selected);
        code.spans.insert(0, prefix);
        lines.push(code);
    }

    frame.render_widget(Paragraph::new(lines), area);
}

/// Lay out `dir/file:line:col` in `width` columns keeping the filename
/// visible: the directory shrinks first. Returns the string plus the rune
/// range occupied by the filename.
pub fn format_location_with_visible_filename(
    path: &str,
    line: u32,
    col: u32,
    width: usize,
) -> (String, usize, usize) {
    if width == 0 {
        return (String::new(), 0, 0);
    }

    let suffix = format!(":{line}:{col}");
    let (dir, base) = match path.rsplit_once('/') {
        Some((dir, base)) => (format!("{dir}/"), base.to_string()),
        None => (String::new(), path.to_string()),
    };

    let base_suffix = format!("{base}{suffix}");
    let base_suffix_w = display_width(&base_suffix);

    if base_suffix_w >= width {
        let truncated = truncate_text(&base_suffix, width);
        let file_end = truncated.chars().count();
        let file_len = base.chars().count().min(file_end);
        return (truncated, 0, file_len);
    }

    let avail_dir = width - base_suffix_w;
    let dir_visible = if display_width(&dir) > avail_dir {
        truncate_text(&dir, avail_dir)
    } else {
        dir
    };

    let loc = truncate_text(&format!("{dir_visible}{base_suffix}"), width);
    let loc_len = loc.chars().count();
    let file_start = dir_visible.chars().count().min(loc_len);
    let file_end = (file_start + base.chars().count()).min(loc_len);
    (loc, file_start, file_end)
}
