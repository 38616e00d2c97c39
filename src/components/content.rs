use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::components::tree::file_icon_by_ext;
use crate::tree::node::Node;
use crate::tree::selection::Selection;

/// Listing of the current folder: name, size and last update.
pub struct ContentWidget<'a> {
    nodes: &'a [Node],
    selection: &'a Selection,
    cursor: Option<usize>,
    scroll: usize,
    drop_folder: Option<&'a str>,
    use_icons: bool,
    block: Option<Block<'a>>,
}

impl<'a> ContentWidget<'a> {
    pub fn new(nodes: &'a [Node], selection: &'a Selection, use_icons: bool) -> Self {
        Self {
            nodes,
            selection,
            cursor: None,
            scroll: 0,
            drop_folder: None,
            use_icons,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    pub fn cursor(mut self, cursor: Option<usize>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn drop_folder(mut self, id: Option<&'a str>) -> Self {
        self.drop_folder = id;
        self
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

impl<'a> Widget for ContentWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };
        if inner.height == 0 || inner.width == 0 {
            return;
        }

        if self.nodes.is_empty() {
            let line = Line::from(Span::styled(
                "This folder is empty",
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        let width = inner.width as usize;
        let visible = self
            .nodes
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(inner.height as usize);

        for (i, (idx, node)) in visible.enumerate() {
            let y = inner.y + i as u16;
            let is_selected = self.selection.contains(&node.id);

            let icon = match (self.use_icons, node.is_folder()) {
                (true, true) => "\u{f07b} ",
                (true, false) => file_icon_by_ext(&node.name),
                (false, true) => "[D] ",
                (false, false) => "[F] ",
            };
            let marker = if is_selected { "● " } else { "" };
            let star = if node.is_favorite { " ★" } else { "" };
            let name = format!("{marker}{icon}{}{star}", node.name);

            let size = if node.is_folder() {
                String::new()
            } else {
                format_size(node.size)
            };
            let updated = node
                .updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            let details = format!("{size:>10}  {updated:<16}");

            let name_width = width.saturating_sub(details.chars().count() + 1);
            let name: String = name.chars().take(name_width).collect();
            let pad = name_width.saturating_sub(name.chars().count());

            let style = if self.drop_folder == Some(node.id.as_str()) {
                Style::default().bg(Color::Green).fg(Color::Black)
            } else if self.cursor == Some(idx) {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else if is_selected {
                Style::default().bg(Color::DarkGray).fg(Color::Yellow)
            } else if node.is_folder() {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };

            let line = Line::from(vec![
                Span::styled(name, style),
                Span::styled(" ".repeat(pad + 1), style),
                Span::styled(details, style.fg(Color::Gray)),
            ]);
            buf.set_line(inner.x, y, &line, inner.width);
        }
    }
}
