use crate::types::QueryOutcome;
use crate::ui::app::{App, AppMode};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use futures::StreamExt;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Refreshed(QueryOutcome),
}

pub async fn event_loop(tx: mpsc::Sender<AppEvent>) {
    use crossterm::event::EventStream;

    let mut event_stream = EventStream::new();

    while let Some(maybe_event) = event_stream.next().await {
        if let Ok(Event::Key(key)) = maybe_event
            && tx.send(AppEvent::Key(key)).await.is_err()
        {
            break;
        }
    }
}

/// Returns false when the app should quit.
pub fn handle_key_event(app: &mut App, key: KeyEvent) -> bool {
    match app.mode {
        AppMode::Normal => handle_normal_mode(app, key),
        AppMode::Search => handle_search_mode(app, key),
        AppMode::Filter => handle_filter_mode(app, key),
        AppMode::Help => handle_help_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> bool {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _)
        | (KeyCode::Char('Q'), _)
        | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            return false;
        }
        (KeyCode::Char('r'), _) => {
            app.request_refresh();
        }
        (KeyCode::Char('p'), _) => {
            app.paused = !app.paused;
        }
        (KeyCode::Char('k'), _) => {
            app.cycle_kind_filter();
        }
        (KeyCode::Char('/'), _) => {
            app.mode = AppMode::Search;
            app.search_pattern.clear();
        }
        (KeyCode::Char('f'), _) => {
            app.mode = AppMode::Filter;
            app.filter_pattern.clear();
        }
        (KeyCode::Esc, _) => {
            app.search_pattern.clear();
            app.filter_pattern.clear();
            app.kind_filter = None;
            app.update_search_matches();
        }
        (KeyCode::Char('?'), _) => {
            app.help_visible = !app.help_visible;
            if app.help_visible {
                app.mode = AppMode::Help;
            }
        }
        (KeyCode::Char('n'), _) => {
            app.jump_to_next_match();
        }
        (KeyCode::Char('N'), _) => {
            app.jump_to_prev_match();
        }
        (KeyCode::Up, _) => {
            app.scroll_up();
        }
        (KeyCode::Down, _) => {
            app.scroll_down();
        }
        (KeyCode::PageUp, _) => {
            app.page_up(20);
        }
        (KeyCode::PageDown, _) => {
            app.page_down(20);
        }
        (KeyCode::Home, _) | (KeyCode::Char('g'), _) => {
            app.scroll_to_top();
        }
        (KeyCode::End, _) | (KeyCode::Char('G'), _) => {
            app.scroll_to_bottom();
        }
        _ => {}
    }
    true
}

fn handle_search_mode(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Normal;
            app.search_pattern.clear();
            app.search_matches.clear();
        }
        KeyCode::Enter => {
            app.mode = AppMode::Normal;
            app.update_search_matches();
            if let Some(&first) = app.search_matches.first() {
                app.scroll_offset = first;
            }
        }
        KeyCode::Char(c) => {
            app.search_pattern.push(c);
        }
        KeyCode::Backspace => {
            app.search_pattern.pop();
        }
        _ => {}
    }
    true
}

fn handle_filter_mode(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.mode = AppMode::Normal;
            app.filter_pattern.clear();
            app.scroll_offset = 0;
            app.update_search_matches();
        }
        KeyCode::Enter => {
            app.mode = AppMode::Normal;
            app.scroll_offset = 0;
            app.update_search_matches();
        }
        KeyCode::Char(c) => {
            app.filter_pattern.push(c);
        }
        KeyCode::Backspace => {
            app.filter_pattern.pop();
        }
        _ => {}
    }
    true
}

fn handle_help_mode(app: &mut App, _key: KeyEvent) -> bool {
    app.help_visible = false;
    app.mode = AppMode::Normal;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        App::new("SELECT ...".to_string(), vec!["minikube".to_string()])
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert!(!handle_key_event(&mut app, key(KeyCode::Char('q'))));
        assert!(!handle_key_event(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
        assert!(handle_key_event(&mut app, key(KeyCode::Char('x'))));
    }

    #[test]
    fn test_refresh_and_pause() {
        let mut app = app();
        handle_key_event(&mut app, key(KeyCode::Char('r')));
        assert!(app.refresh_requested);
        handle_key_event(&mut app, key(KeyCode::Char('p')));
        assert!(app.paused);
    }

    #[test]
    fn test_filter_input() {
        let mut app = app();
        handle_key_event(&mut app, key(KeyCode::Char('f')));
        assert_eq!(app.mode, AppMode::Filter);
        for c in "webx".chars() {
            handle_key_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_key_event(&mut app, key(KeyCode::Backspace));
        handle_key_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.mode, AppMode::Normal);
        assert_eq!(app.filter_pattern, "web");

        handle_key_event(&mut app, key(KeyCode::Esc));
        assert!(app.filter_pattern.is_empty());
    }

    #[test]
    fn test_filter_cancel_recomputes_search_matches() {
        let mut app = app();
        app.apply_outcome(
            QueryOutcome {
                sets: vec![crate::types::ResourceSet {
                    context: "minikube".to_string(),
                    namespace: "testing".to_string(),
                    kind: crate::types::ResourceKind::Pod,
                    names: ["api-1", "web-1", "web-2"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                }],
                failures: vec![],
            },
            chrono::Local::now(),
        );

        app.search_pattern = "web".to_string();
        app.update_search_matches();
        assert_eq!(app.search_matches, vec![1, 2]);

        handle_key_event(&mut app, key(KeyCode::Char('f')));
        for c in "web".chars() {
            handle_key_event(&mut app, key(KeyCode::Char(c)));
        }
        handle_key_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.search_matches, vec![0, 1]);

        // Starting a new filter and cancelling it shows every row again
        handle_key_event(&mut app, key(KeyCode::Char('f')));
        handle_key_event(&mut app, key(KeyCode::Char('x')));
        handle_key_event(&mut app, key(KeyCode::Esc));
        assert!(app.filter_pattern.is_empty());
        assert_eq!(app.scroll_offset, 0);
        assert_eq!(app.search_matches, vec![1, 2]);
    }

    #[test]
    fn test_help_closes_on_any_key() {
        let mut app = app();
        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert_eq!(app.mode, AppMode::Help);
        assert!(app.help_visible);
        handle_key_event(&mut app, key(KeyCode::Char('z')));
        assert_eq!(app.mode, AppMode::Normal);
        assert!(!app.help_visible);
    }
}
