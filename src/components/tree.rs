use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::clipboard::MoveClipboard;
use crate::tree::node::NodeType;
use crate::tree::selection::{Selection, VisibleRow};

/// Tree widget that renders the visible rows with box-drawing characters.
pub struct TreeWidget<'a> {
    rows: &'a [VisibleRow],
    selection: &'a Selection,
    cursor: Option<usize>,
    scroll: usize,
    drop_folder: Option<&'a str>,
    cut: Option<&'a MoveClipboard>,
    use_icons: bool,
    block: Option<Block<'a>>,
}

impl<'a> TreeWidget<'a> {
    pub fn new(rows: &'a [VisibleRow], selection: &'a Selection, use_icons: bool) -> Self {
        Self {
            rows,
            selection,
            cursor: None,
            scroll: 0,
            drop_folder: None,
            cut: None,
            use_icons,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = block.into();
        self
    }

    /// Highlight the cursor row; `None` when the panel is unfocused.
    pub fn cursor(mut self, cursor: Option<usize>) -> Self {
        self.cursor = cursor;
        self
    }

    pub fn scroll(mut self, scroll: usize) -> Self {
        self.scroll = scroll;
        self
    }

    /// Folder currently accepting a drop.
    pub fn drop_folder(mut self, id: Option<&'a str>) -> Self {
        self.drop_folder = id;
        self
    }

    pub fn cut(mut self, clipboard: &'a MoveClipboard) -> Self {
        self.cut = Some(clipboard);
        self
    }

    /// Build the prefix string for tree indentation using box-drawing characters.
    ///
    /// Continuation lines depend on whether each ancestor was the last of its siblings.
    fn build_prefix(row: &VisibleRow, rows: &[VisibleRow], row_index: usize) -> String {
        if row.depth == 0 {
            return String::new();
        }

        let mut parts: Vec<&str> = Vec::new();

        for d in 1..row.depth {
            // Walk backwards to the ancestor at depth d
            let mut ancestor_is_last = false;
            for j in (0..row_index).rev() {
                if rows[j].depth == d {
                    ancestor_is_last = rows[j].is_last_sibling;
                    break;
                }
                if rows[j].depth < d {
                    break;
                }
            }
            parts.push(if ancestor_is_last { "   " } else { "│  " });
        }

        parts.push(if row.is_last_sibling { "└──" } else { "├──" });
        parts.join("")
    }

    fn row_indicator(&self, row: &VisibleRow) -> &'static str {
        match (self.use_icons, row.node_type) {
            (true, NodeType::Folder) if row.is_expanded => "\u{f07c} ",
            (true, NodeType::Folder) => "\u{f07b} ",
            (true, NodeType::File) => file_icon_by_ext(&row.name),
            (false, NodeType::Folder) if row.is_expanded => "[-] ",
            (false, NodeType::Folder) if row.has_children => "[+] ",
            (false, NodeType::Folder) => "[D] ",
            (false, NodeType::File) => "[F] ",
        }
    }
}

/// Nerd Font icon for a file, picked by extension.
pub fn file_icon_by_ext(name: &str) -> &'static str {
    let ext = name.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "rs" | "py" | "js" | "ts" | "go" | "c" | "cpp" | "java" => "\u{f121} ",
        "json" | "toml" | "yaml" | "yml" => "\u{e60b} ",
        "md" | "markdown" | "txt" => "\u{f48a} ",
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "svg" | "webp" => "\u{f1c5} ",
        "mp3" | "wav" | "flac" | "ogg" => "\u{f1c7} ",
        "mp4" | "mkv" | "avi" | "mov" | "webm" => "\u{f1c8} ",
        "zip" | "tar" | "gz" | "xz" | "rar" | "7z" => "\u{f1c6} ",
        "pdf" => "\u{f1c1} ",
        "csv" | "xls" | "xlsx" => "\u{f1c3} ",
        _ => "\u{f15b} ",
    }
}

impl<'a> Widget for TreeWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner_area = if let Some(block) = &self.block {
            let inner = block.inner(area);
            block.clone().render(area, buf);
            inner
        } else {
            area
        };

        let rows = self.rows;
        let visible_height = inner_area.height as usize;
        if rows.is_empty() || visible_height == 0 {
            return;
        }

        let visible = rows.iter().enumerate().skip(self.scroll).take(visible_height);

        for (i, (idx, row)) in visible.enumerate() {
            let y = inner_area.y + i as u16;

            let prefix = Self::build_prefix(row, rows, idx);
            let indicator = self.row_indicator(row);
            let is_cursor = self.cursor == Some(idx);
            let is_selected = self.selection.contains(&row.id);
            let is_drop = self.drop_folder == Some(row.id.as_str());
            let is_cut = self.cut.is_some_and(|c| c.contains(&row.id));

            let style = if is_drop {
                Style::default()
                    .bg(Color::Green)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD)
            } else if is_cursor {
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD)
            } else if is_selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else if is_cut {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC)
            } else {
                match row.node_type {
                    NodeType::Folder => Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                    NodeType::File => Style::default().fg(Color::White),
                }
            };

            let marker = if is_selected { "● " } else { "" };
            let star = if row.is_favorite { " ★" } else { "" };
            let line_content = format!("{prefix}{marker}{indicator}{}{star}", row.name);
            let line = Line::from(Span::styled(line_content, style));
            buf.set_line(inner_area.x, y, &line, inner_area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::model::unflatten;
    use crate::tree::node::{Node, NodeId};
    use crate::tree::selection::visible_rows;
    use std::collections::HashSet;

    fn rows(expanded: &[&str]) -> Vec<VisibleRow> {
        let tree = unflatten(&[
            Node::folder("docs", None, "docs"),
            Node::folder("sub", Some("docs"), "sub"),
            Node::file("deep", Some("sub"), "deep.md"),
            Node::file("a", Some("docs"), "a.md"),
            Node::file("readme", None, "readme.txt"),
        ]);
        let expanded: HashSet<NodeId> = expanded.iter().map(|s| s.to_string()).collect();
        visible_rows(&tree, &expanded)
    }

    fn render_lines(widget: TreeWidget, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn prefixes_follow_sibling_structure() {
        let rows = rows(&["docs", "sub"]);
        let prefixes: Vec<String> = rows
            .iter()
            .enumerate()
            .map(|(i, r)| TreeWidget::build_prefix(r, &rows, i))
            .collect();
        assert_eq!(prefixes, vec!["", "├──", "│  └──", "└──", ""]);
    }

    #[test]
    fn renders_plain_indicators_without_icons() {
        let rows = rows(&["docs"]);
        let selection = Selection::default();
        let lines = render_lines(TreeWidget::new(&rows, &selection, false), 30, 5);
        assert_eq!(lines[0], "[-] docs");
        assert_eq!(lines[1], "├──[+] sub");
        assert_eq!(lines[2], "└──[F] a.md");
        assert_eq!(lines[3], "[F] readme.txt");
    }

    #[test]
    fn selected_rows_are_marked() {
        let rows = rows(&[]);
        let selection = Selection::default().pick("readme", crate::tree::selection::PickKind::Plain, &[]);
        let lines = render_lines(TreeWidget::new(&rows, &selection, false), 30, 2);
        assert_eq!(lines[1], "● [F] readme.txt");
    }

    #[test]
    fn drop_folder_is_highlighted() {
        let rows = rows(&[]);
        let selection = Selection::default();
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        TreeWidget::new(&rows, &selection, false)
            .drop_folder(Some("docs"))
            .render(area, &mut buf);
        assert_eq!(buf.cell((0, 0)).unwrap().bg, Color::Green);
        assert_ne!(buf.cell((0, 1)).unwrap().bg, Color::Green);
    }

    #[test]
    fn scroll_skips_leading_rows() {
        let rows = rows(&["docs"]);
        let selection = Selection::default();
        let lines = render_lines(TreeWidget::new(&rows, &selection, false).scroll(3), 30, 2);
        assert_eq!(lines[0], "[F] readme.txt");
        assert_eq!(lines[1], "");
    }

    #[test]
    fn icon_falls_back_for_unknown_extension() {
        assert_eq!(file_icon_by_ext("archive.unknownext"), "\u{f15b} ");
        assert_eq!(file_icon_by_ext("photo.PNG"), "\u{f1c5} ");
    }
}
