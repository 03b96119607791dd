use crate::types::{FetchFailure, ResultRow};
use crate::utils::get_color;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};
use regex::Regex;

/// Column widths shared by the header and the result rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    pub context: usize,
    pub namespace: usize,
    pub kind: usize,
}

impl ColumnWidths {
    pub fn measure(rows: &[&ResultRow]) -> Self {
        let mut widths = Self {
            context: "CONTEXT".len(),
            namespace: "NAMESPACE".len(),
            kind: "KIND".len(),
        };
        for row in rows {
            widths.context = widths.context.max(row.context.chars().count());
            widths.namespace = widths.namespace.max(row.namespace.chars().count());
            widths.kind = widths.kind.max(row.kind.to_string().len());
        }
        widths
    }
}

pub struct QueryHeader<'a> {
    query: &'a str,
    widths: ColumnWidths,
}

impl<'a> QueryHeader<'a> {
    pub fn new(query: &'a str, widths: ColumnWidths) -> Self {
        Self { query, widths }
    }
}

impl<'a> Widget for QueryHeader<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Collapse the query onto a single line
        let query = self.query.split_whitespace().collect::<Vec<_>>().join(" ");
        let columns = format!(
            "{:<cw$}  {:<nw$}  {:<kw$}  NAME",
            "CONTEXT",
            "NAMESPACE",
            "KIND",
            cw = self.widths.context,
            nw = self.widths.namespace,
            kw = self.widths.kind,
        );
        let lines = vec![
            Line::from(Span::styled(query, Style::default().fg(Color::Cyan))),
            Line::from(Span::styled(
                columns,
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        Paragraph::new(lines).render(area, buf);
    }
}

pub struct ResultView<'a> {
    rows: Vec<&'a ResultRow>,
    failures: &'a [FetchFailure],
    widths: ColumnWidths,
    scroll_offset: usize,
    search_pattern: &'a str,
}

impl<'a> ResultView<'a> {
    pub fn new(
        rows: Vec<&'a ResultRow>,
        failures: &'a [FetchFailure],
        widths: ColumnWidths,
        scroll_offset: usize,
        search_pattern: &'a str,
    ) -> Self {
        Self {
            rows,
            failures,
            widths,
            scroll_offset,
            search_pattern,
        }
    }

    fn format_row<'b>(&self, row: &'b ResultRow, search: Option<&Regex>) -> Line<'b> {
        let mut spans = vec![
            Span::styled(
                format!("{:<w$}  ", row.context, w = self.widths.context),
                Style::default().fg(get_color(&row.context)),
            ),
            Span::styled(
                format!("{:<w$}  ", row.namespace, w = self.widths.namespace),
                Style::default().fg(Color::Blue),
            ),
            Span::styled(
                format!("{:<w$}  ", row.kind.to_string(), w = self.widths.kind),
                Style::default().fg(Color::Green),
            ),
        ];

        // Highlight search matches within the name
        match search {
            Some(regex) => {
                let mut last_end = 0;
                for mat in regex.find_iter(&row.name) {
                    if mat.start() > last_end {
                        spans.push(Span::raw(&row.name[last_end..mat.start()]));
                    }
                    spans.push(Span::styled(
                        mat.as_str(),
                        Style::default()
                            .fg(Color::Black)
                            .bg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ));
                    last_end = mat.end();
                }
                if last_end < row.name.len() {
                    spans.push(Span::raw(&row.name[last_end..]));
                }
            }
            None => spans.push(Span::raw(row.name.as_str())),
        }

        Line::from(spans)
    }
}

impl<'a> Widget for ResultView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let search = if self.search_pattern.is_empty() {
            None
        } else {
            Regex::new(&format!("(?i){}", self.search_pattern)).ok()
        };

        let mut lines: Vec<Line> = self
            .failures
            .iter()
            .map(|f| {
                Line::from(Span::styled(
                    format!(
                        "! {}/{} {} ({}): {}",
                        f.context,
                        f.namespace,
                        f.kind.plural(),
                        f.selector,
                        f.message
                    ),
                    Style::default().fg(Color::Red),
                ))
            })
            .collect();
        let failure_lines = lines.len();

        if self.rows.is_empty() {
            lines.push(Line::from(Span::styled(
                "(no matching resources)",
                Style::default().fg(Color::DarkGray),
            )));
        }
        lines.extend(self.rows.iter().map(|row| self.format_row(row, search.as_ref())));

        // Once scrolling starts the offset counts rows, not failure lines
        let scroll = if self.scroll_offset > 0 {
            self.scroll_offset + failure_lines
        } else {
            0
        };
        let scroll = u16::try_from(scroll).unwrap_or(u16::MAX);

        Paragraph::new(lines).scroll((scroll, 0)).render(area, buf);
    }
}

pub struct StatusBar<'a> {
    total_rows: usize,
    visible_rows: usize,
    contexts: &'a [String],
    failures: usize,
    last_refresh: String,
    active_filters: &'a [String],
    paused: bool,
    refreshing: bool,
}

impl<'a> StatusBar<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        total_rows: usize,
        visible_rows: usize,
        contexts: &'a [String],
        failures: usize,
        last_refresh: String,
        active_filters: &'a [String],
        paused: bool,
        refreshing: bool,
    ) -> Self {
        Self {
            total_rows,
            visible_rows,
            contexts,
            failures,
            last_refresh,
            active_filters,
            paused,
            refreshing,
        }
    }
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let filters_str = if self.active_filters.is_empty() {
            "none".to_string()
        } else {
            self.active_filters.join(", ")
        };

        let status_parts = [
            format!("Rows: {}/{}", self.visible_rows, self.total_rows),
            format!("Contexts: {}", self.contexts.join(",")),
            format!("Refreshed: {}", self.last_refresh),
            format!("Failures: {}", self.failures),
            format!("Filters: {}", filters_str),
        ];

        let mut status_text = status_parts.join(" | ");

        if self.refreshing {
            status_text.push_str(" | [REFRESHING]");
        }
        if self.paused {
            status_text.push_str(" | [PAUSED]");
        }
        status_text.push_str(" | ? for help");

        let style = if self.failures > 0 {
            Style::default().bg(Color::Red).fg(Color::White)
        } else {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        };

        Paragraph::new(status_text).style(style).render(area, buf);
    }
}

pub struct HelpOverlay;

impl Widget for HelpOverlay {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let help_lines = vec![
            "Keyboard Shortcuts",
            "",
            "  q/Q/Ctrl-C  - Quit",
            "  r           - Re-run the query now",
            "  p           - Pause/Resume automatic refresh",
            "  k           - Cycle kind filter (all/pod/deployment/service)",
            "  ?           - Toggle this help",
            "",
            "Search & Filter:",
            "  /           - Search (highlights matches, use n/N to navigate)",
            "  n/N         - Jump to next/previous search match",
            "  f           - Filter (show only matching rows)",
            "  Esc         - Clear search, filter and kind filter",
            "",
            "Navigation:",
            "  ↑/↓         - Scroll",
            "  PgUp/PgDn   - Page scroll",
            "  Home/End    - Jump to top/bottom",
            "  g/G         - Jump to top/bottom (vim-style)",
            "",
            "Press any key to close",
        ];

        let lines: Vec<Line> = help_lines.iter().map(|s| Line::from(*s)).collect();

        // Center the help overlay
        let help_width = 70;
        let help_height = help_lines.len() as u16 + 2;
        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;

        let help_area = Rect {
            x: area.x + x,
            y: area.y + y,
            width: help_width.min(area.width),
            height: help_height.min(area.height),
        };

        Clear.render(help_area, buf);

        let block = Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .style(Style::default().bg(Color::Black).fg(Color::White));

        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .style(Style::default().bg(Color::Black).fg(Color::White))
            .render(help_area, buf);
    }
}
