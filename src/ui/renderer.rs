use crate::ui::app::{App, AppMode};
use crate::ui::layout::create_layout;
use crate::ui::widgets::{ColumnWidths, HelpOverlay, QueryHeader, ResultView, StatusBar};
use crate::utils::format_since;
use chrono::Local;
use ratatui::{
    Frame, Terminal,
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    text::Span,
    widgets::{Block, Borders, Clear, Paragraph},
};

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &App) -> std::io::Result<()> {
    terminal.draw(|f| render_frame(f, app))?;
    Ok(())
}

fn render_frame(f: &mut Frame, app: &App) {
    let layout = create_layout(f.area());

    let rows = app.visible_rows();
    let widths = ColumnWidths::measure(&rows);
    let visible = rows.len();

    f.render_widget(QueryHeader::new(&app.query, widths), layout.header);

    let result_view = ResultView::new(
        rows,
        &app.failures,
        widths,
        app.scroll_offset,
        &app.search_pattern,
    );
    f.render_widget(result_view, layout.main);

    let last_refresh = match app.last_refresh {
        Some(at) => format!("{} (#{})", format_since(at, Local::now()), app.refresh_count),
        None => "never".to_string(),
    };
    let active_filters = app.active_filters();
    let status_bar = StatusBar::new(
        app.rows.len(),
        visible,
        &app.contexts,
        app.failures.len(),
        last_refresh,
        &active_filters,
        app.paused,
        app.refreshing,
    );
    f.render_widget(status_bar, layout.status_bar);

    if app.help_visible {
        f.render_widget(HelpOverlay, f.area());
    }

    match app.mode {
        AppMode::Search => render_input_bar(
            f,
            format!("Search: {}_", app.search_pattern),
            "Search (Enter to apply, Esc to cancel)",
            Color::Yellow,
        ),
        AppMode::Filter => render_input_bar(
            f,
            format!("Filter: {}_", app.filter_pattern),
            "Filter (Enter to apply, Esc to cancel)",
            Color::Cyan,
        ),
        AppMode::Normal | AppMode::Help => {}
    }
}

fn render_input_bar(f: &mut Frame, text: String, title: &str, color: Color) {
    let area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(f.area())[1];

    // Clear the area to make it opaque
    f.render_widget(Clear, area);

    let widget = Paragraph::new(Span::styled(text, Style::default().fg(color)))
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .style(Style::default().fg(color)),
        )
        .alignment(Alignment::Left);

    f.render_widget(widget, area);
}
