use crate::transcript::TranscriptLine;
use anyhow::Result;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use std::io::Stdout;
use textwrap::wrap;

pub struct ViewSnap<'a> {
    pub input: &'a str,
    pub input_cursor: usize,
    pub lines: &'a [TranscriptLine],
    pub scroll: usize,
    pub busy: Option<&'static str>,
    pub spinner: &'static str,
    /// Right-hand header text, e.g. the schema and model in use.
    pub context: String,
}

pub fn draw(term: &mut Terminal<CrosstermBackend<Stdout>>, snap: &ViewSnap<'_>) -> Result<()> {
    term.draw(|frame| {
        let area = frame.area();

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                " Subtext ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(snap.context.clone(), Style::default().fg(Color::DarkGray)),
        ]));
        frame.render_widget(header, layout[0]);

        let visible_h = layout[1].height.saturating_sub(2) as usize;
        let content_width = layout[1].width.saturating_sub(2) as usize;
        let wrapped = wrap_transcript(snap.lines, content_width);
        let (start, end) = window(wrapped.len(), visible_h, snap.scroll);

        let items: Vec<ListItem> = wrapped[start..end]
            .iter()
            .map(|(text, style)| ListItem::new(Line::from(Span::styled(text.clone(), *style))))
            .collect();
        let body =
            List::new(items).block(Block::default().borders(Borders::ALL).title(" Analysis "));
        frame.render_widget(body, layout[1]);

        // Long pastes scroll horizontally so the caret stays visible.
        let input_width = layout[2].width.saturating_sub(2) as usize;
        let (shown, caret_col) = input_view(snap.input, snap.input_cursor, input_width);
        let input_box = Paragraph::new(shown.to_string()).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Text, URL or /command "),
        );
        frame.render_widget(Clear, layout[2]);
        frame.render_widget(input_box, layout[2]);
        frame.set_cursor_position(Position {
            x: layout[2].x + 1 + caret_col,
            y: layout[2].y + 1,
        });

        let status_line = Line::from(vec![
            Span::raw(" "),
            Span::styled(snap.spinner, Style::default().fg(Color::Yellow)),
            Span::raw(" "),
            match snap.busy {
                Some(what) => Span::styled(what, Style::default().fg(Color::Yellow)),
                None => Span::styled("Ready", Style::default().fg(Color::Green)),
            },
            Span::styled("  · /help for commands", Style::default().fg(Color::DarkGray)),
        ]);
        let status = Paragraph::new(status_line)
            .block(Block::default().borders(Borders::ALL).title(" Status "));
        frame.render_widget(status, layout[3]);
    })?;

    Ok(())
}

/// Visible `[start, end)` of `total` rows, `scroll` rows up from the bottom.
fn window(total: usize, visible: usize, scroll: usize) -> (usize, usize) {
    let scroll = scroll.min(total.saturating_sub(visible));
    let end = total - scroll;
    (end.saturating_sub(visible), end)
}

/// Tail of `input` that fits `width` columns with the caret in view.
fn input_view(input: &str, cursor: usize, width: usize) -> (&str, u16) {
    use unicode_width::UnicodeWidthStr;
    let mut start = 0;
    while start < cursor && UnicodeWidthStr::width(&input[start..cursor]) >= width.max(1) {
        start += input[start..].chars().next().map_or(1, char::len_utf8);
    }
    let col = UnicodeWidthStr::width(&input[start..cursor]) as u16;
    (&input[start..], col)
}

fn wrap_transcript(lines: &[TranscriptLine], width: usize) -> Vec<(String, Style)> {
    let effective_width = width.max(1);
    let mut out = Vec::new();

    for entry in lines {
        let style = entry.style;
        for raw_line in entry.text.split('\n') {
            if raw_line.is_empty() {
                out.push((String::new(), style));
                continue;
            }
            // Keep the leading indent on continuation rows.
            let body = raw_line.trim_start_matches(' ');
            let indent = &raw_line[..raw_line.len() - body.len()];
            let opts = textwrap::Options::new(effective_width)
                .initial_indent(indent)
                .subsequent_indent(indent);
            let segments = wrap(body, opts);
            if segments.is_empty() {
                out.push((String::new(), style));
            } else {
                out.extend(segments.into_iter().map(|seg| (seg.into_owned(), style)));
            }
        }
    }

    out
}
