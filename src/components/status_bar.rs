use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

pub const FILES_HINTS: &str = " a:new r:ren f:fav d:trash x:cut p:paste t:trash s:starred q:quit ";
pub const TRASH_HINTS: &str = " u:restore d:delete t:files q:quit ";
pub const FAVORITES_HINTS: &str = " enter:open f:unstar d:trash s:files q:quit ";

/// Status bar: location, selection info and key hints, or a transient status message.
pub struct StatusBarWidget<'a> {
    location: &'a str,
    info: &'a str,
    status_message: Option<&'a str>,
    is_error: bool,
    indicator: Option<&'a str>,
    hints: &'a str,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(location: &'a str, info: &'a str) -> Self {
        Self {
            location,
            info,
            status_message: None,
            is_error: false,
            indicator: None,
            hints: FILES_HINTS,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    /// Short bold marker, e.g. a loading or offline flag.
    pub fn indicator(mut self, text: &'a str) -> Self {
        self.indicator = Some(text);
        self
    }

    /// Key hints for the current view.
    pub fn hints(mut self, hints: &'a str) -> Self {
        self.hints = hints;
        self
    }
}

fn truncate_left(text: &str, budget: usize) -> String {
    let len = text.chars().count();
    if len <= budget {
        return text.to_string();
    }
    if budget > 3 {
        let tail: String = text.chars().skip(len - (budget - 3)).collect();
        format!("...{tail}")
    } else {
        text.chars().take(budget).collect()
    }
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }

        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default().bg(Color::Red).fg(Color::White)
            } else {
                Style::default().fg(Color::Green)
            };

            let display: String = msg.chars().take(width).collect();
            let display = format!("{:<width$}", display, width = width);
            let line = Line::from(Span::styled(display, style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let key_hints = self.hints;
        let hints_len = key_hints.chars().count();
        let indicator = self.indicator.map(|s| format!(" {s}")).unwrap_or_default();
        let remaining = width
            .saturating_sub(hints_len)
            .saturating_sub(indicator.chars().count());

        let info_len = self.info.chars().count();
        let location_budget = remaining.saturating_sub(info_len).saturating_sub(1);
        let location = truncate_left(self.location, location_budget);
        let info: String = self
            .info
            .chars()
            .take(remaining.saturating_sub(location.chars().count()))
            .collect();

        let gap = remaining
            .saturating_sub(location.chars().count())
            .saturating_sub(info.chars().count());

        let spans = vec![
            Span::styled(location, Style::default().fg(Color::White)),
            Span::raw(" ".repeat(gap)),
            Span::styled(info, Style::default().fg(Color::Cyan)),
            Span::styled(
                indicator,
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                key_hints,
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            ),
        ];

        let line = Line::from(spans);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}
