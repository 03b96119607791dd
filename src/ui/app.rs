use crate::types::{FetchFailure, QueryOutcome, ResourceKind, ResultRow};
use chrono::{DateTime, Local};
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Normal,
    Search,
    Filter,
    Help,
}

pub struct App {
    // Query
    pub query: String,
    pub contexts: Vec<String>,

    // Latest result
    pub rows: Vec<ResultRow>,
    pub failures: Vec<FetchFailure>,
    pub last_refresh: Option<DateTime<Local>>,
    pub refresh_count: usize,
    pub refreshing: bool,
    pub refresh_requested: bool,

    // UI state
    pub scroll_offset: usize,

    // Search state (/ key - highlights and allows n/N navigation)
    pub search_pattern: String,
    pub search_matches: Vec<usize>,
    pub current_match_index: usize,

    // Filter state (f key - shows only matching rows)
    pub filter_pattern: String,
    pub kind_filter: Option<ResourceKind>,

    // UI mode
    pub mode: AppMode,
    pub help_visible: bool,
    pub paused: bool,
}

impl App {
    pub fn new(query: String, contexts: Vec<String>) -> Self {
        Self {
            query,
            contexts,
            rows: Vec::new(),
            failures: Vec::new(),
            last_refresh: None,
            refresh_count: 0,
            refreshing: false,
            refresh_requested: false,
            scroll_offset: 0,
            search_pattern: String::new(),
            search_matches: Vec::new(),
            current_match_index: 0,
            filter_pattern: String::new(),
            kind_filter: None,
            mode: AppMode::Normal,
            help_visible: false,
            paused: false,
        }
    }

    pub fn apply_outcome(&mut self, outcome: QueryOutcome, at: DateTime<Local>) {
        self.rows = outcome.rows();
        self.failures = outcome.failures;
        self.last_refresh = Some(at);
        self.refresh_count += 1;
        self.refreshing = false;

        let max_offset = self.visible_rows().len().saturating_sub(1);
        self.scroll_offset = self.scroll_offset.min(max_offset);
        self.update_search_matches();
    }

    /// Rows after the kind toggle and the filter pattern are applied.
    pub fn visible_rows(&self) -> Vec<&ResultRow> {
        let filter_regex = if !self.filter_pattern.is_empty() {
            // Make filter case-insensitive by default (prepend (?i))
            Regex::new(&format!("(?i){}", self.filter_pattern)).ok()
        } else {
            None
        };

        self.rows
            .iter()
            .filter(|row| self.kind_filter.is_none_or(|k| row.kind == k))
            .filter(|row| match &filter_regex {
                Some(re) => re.is_match(&row_text(row)),
                None => true,
            })
            .collect()
    }

    pub fn update_search_matches(&mut self) {
        self.search_matches.clear();
        self.current_match_index = 0;

        if self.search_pattern.is_empty() {
            return;
        }

        let pattern = format!("(?i){}", self.search_pattern);
        let Ok(regex) = Regex::new(&pattern) else {
            return;
        };

        self.search_matches = self
            .visible_rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| regex.is_match(&row_text(row)))
            .map(|(idx, _)| idx)
            .collect();
    }

    pub fn jump_to_next_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        self.current_match_index = (self.current_match_index + 1) % self.search_matches.len();
        self.scroll_offset = self.search_matches[self.current_match_index];
    }

    pub fn jump_to_prev_match(&mut self) {
        if self.search_matches.is_empty() {
            return;
        }
        if self.current_match_index == 0 {
            self.current_match_index = self.search_matches.len() - 1;
        } else {
            self.current_match_index -= 1;
        }
        self.scroll_offset = self.search_matches[self.current_match_index];
    }

    /// all -> pod -> deployment -> service -> all
    pub fn cycle_kind_filter(&mut self) {
        let kinds = ResourceKind::all();
        self.kind_filter = match self.kind_filter {
            None => Some(kinds[0]),
            Some(current) => kinds
                .iter()
                .position(|k| *k == current)
                .and_then(|i| kinds.get(i + 1).copied()),
        };
        self.scroll_offset = 0;
        self.update_search_matches();
    }

    pub fn request_refresh(&mut self) {
        self.refresh_requested = true;
    }

    pub fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        if self.scroll_offset < self.visible_rows().len().saturating_sub(1) {
            self.scroll_offset += 1;
        }
    }

    pub fn page_up(&mut self, page_size: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(page_size);
    }

    pub fn page_down(&mut self, page_size: usize) {
        let max_offset = self.visible_rows().len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + page_size).min(max_offset);
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.visible_rows().len().saturating_sub(1);
    }

    pub fn active_filters(&self) -> Vec<String> {
        let mut filters = Vec::new();
        if let Some(kind) = self.kind_filter {
            filters.push(format!("kind: {}", kind));
        }
        if !self.filter_pattern.is_empty() {
            filters.push(format!("filter: {}", self.filter_pattern));
        }
        if !self.search_pattern.is_empty() {
            filters.push(format!("search: {}", self.search_pattern));
        }
        filters
    }
}

/// Text a row is matched against by search and filter.
pub fn row_text(row: &ResultRow) -> String {
    format!("{} {} {} {}", row.context, row.namespace, row.kind, row.name)
}
