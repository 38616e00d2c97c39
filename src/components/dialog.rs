use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Widget},
};

use crate::app::{AppMode, DialogKind, DialogState};

/// Dialog widget that renders a centered modal overlay.
pub struct DialogWidget<'a> {
    mode: &'a AppMode,
    dialog_state: &'a DialogState,
}

impl<'a> DialogWidget<'a> {
    pub fn new(mode: &'a AppMode, dialog_state: &'a DialogState) -> Self {
        Self { mode, dialog_state }
    }
}

/// Calculate a centered rectangle within the given area.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(x, y, w, h)
}

impl<'a> Widget for DialogWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let kind = match &self.mode {
            AppMode::Dialog(kind) => kind,
            _ => return,
        };

        match kind {
            DialogKind::CreateFolder { .. } => {
                render_input_dialog("New Folder", self.dialog_state, area, buf);
            }
            DialogKind::Rename { .. } => {
                render_input_dialog("Rename", self.dialog_state, area, buf);
            }
            DialogKind::DeleteConfirm {
                names, permanent, ..
            } => {
                render_confirm_dialog(names, *permanent, area, buf);
            }
            DialogKind::Error { message } => {
                render_error_dialog(message, area, buf);
            }
        }
    }
}

fn hint_line(hint: &str) -> Line<'_> {
    let hint_style = Style::default()
        .fg(Color::DarkGray)
        .add_modifier(Modifier::DIM);
    Line::from(Span::styled(hint, hint_style))
}

fn render_input_dialog(title: &str, state: &DialogState, area: Rect, buf: &mut Buffer) {
    let dialog_width = 50.min(area.width.saturating_sub(4));
    let dialog_height = 5;
    let rect = centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // Input line with a block cursor; cursor_position is a byte offset on a char boundary
    let input = &state.input;
    let cursor_pos = state.cursor_position.min(input.len());
    let max_width = inner.width as usize;

    let before = &input[..cursor_pos];
    let rest = &input[cursor_pos..];
    let (cursor_char, after) = match rest.chars().next() {
        Some(c) => rest.split_at(c.len_utf8()),
        None => (" ", ""),
    };

    // Keep the cursor in view by dropping leading characters
    let before_chars = before.chars().count();
    let budget = max_width.saturating_sub(2);
    let before_display: String = if before_chars > budget {
        before.chars().skip(before_chars - budget).collect()
    } else {
        before.to_string()
    };

    let input_style = Style::default().fg(Color::White);
    let cursor_style = Style::default()
        .bg(Color::White)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD);

    let line = Line::from(vec![
        Span::styled(before_display, input_style),
        Span::styled(cursor_char, cursor_style),
        Span::styled(after, input_style),
    ]);
    buf.set_line(inner.x, inner.y + inner.height / 2, &line, inner.width);

    if inner.height > 1 {
        let hint = hint_line("[Enter] Confirm  [Esc] Cancel");
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
    }
}

fn render_confirm_dialog(names: &[String], permanent: bool, area: Rect, buf: &mut Buffer) {
    let max_name_len = names.iter().map(|n| n.chars().count()).max().unwrap_or(10);

    let dialog_width = (max_name_len as u16 + 10)
        .max(44)
        .min(area.width.saturating_sub(4));
    let dialog_height = (names.len() as u16 + 6).min(area.height.saturating_sub(2));
    let rect = centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let (title, header) = if permanent {
        (" Delete Permanently ", "Delete forever? This cannot be undone.")
    } else {
        (" Move to Trash ", "Move the following to the trash?")
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let header = Line::from(Span::styled(
        header,
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    ));
    buf.set_line(inner.x, inner.y, &header, inner.width);

    let max_items = (inner.height.saturating_sub(3)) as usize;
    for (i, name) in names.iter().take(max_items).enumerate() {
        let line = Line::from(Span::styled(
            format!("  • {}", name),
            Style::default().fg(Color::White),
        ));
        buf.set_line(inner.x, inner.y + 2 + i as u16, &line, inner.width);
    }
    if names.len() > max_items && max_items > 0 {
        let more = Line::from(Span::styled(
            format!("  … and {} more", names.len() - max_items),
            Style::default().fg(Color::DarkGray),
        ));
        buf.set_line(inner.x, inner.y + 1 + max_items as u16, &more, inner.width);
    }

    let hint = hint_line("[y] Yes  [n/Esc] Cancel");
    buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
}

fn render_error_dialog(message: &str, area: Rect, buf: &mut Buffer) {
    let dialog_width = (message.chars().count() as u16 + 6)
        .max(30)
        .min(area.width.saturating_sub(4));
    let dialog_height = 5;
    let rect = centered_rect(dialog_width, dialog_height, area);

    Clear.render(rect, buf);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .padding(Padding::horizontal(1));

    let inner = block.inner(rect);
    block.render(rect, buf);

    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let msg_line = Line::from(Span::styled(message, Style::default().fg(Color::Red)));
    buf.set_line(inner.x, inner.y + inner.height / 2, &msg_line, inner.width);

    if inner.height > 1 {
        let hint = hint_line("[Enter/Esc] Dismiss");
        buf.set_line(inner.x, inner.y + inner.height - 1, &hint, inner.width);
    }
}

/// Full-screen notice shown while an upload or move holds the tree.
pub struct BusyOverlay<'a> {
    message: &'a str,
}

impl<'a> BusyOverlay<'a> {
    pub fn new(message: &'a str) -> Self {
        Self { message }
    }
}

impl<'a> Widget for BusyOverlay<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let width = (self.message.chars().count() as u16 + 8).min(area.width);
        let rect = centered_rect(width, 3, area);
        Clear.render(rect, buf);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let inner = block.inner(rect);
        block.render(rect, buf);
        if inner.height == 0 {
            return;
        }
        let line = Line::from(Span::styled(
            self.message,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .centered();
        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}
