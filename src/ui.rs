use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders},
    Frame,
};

use crate::app::{inner_of, keep_visible, App, AppMode, Panel, View};
use crate::components::content::ContentWidget;
use crate::components::dialog::{BusyOverlay, DialogWidget};
use crate::components::status_bar::{StatusBarWidget, FAVORITES_HINTS, FILES_HINTS, TRASH_HINTS};
use crate::components::tree::TreeWidget;
use crate::tree::dnd::{DragPayload, DragPhase};
use crate::tree::model::DropTarget;
use crate::tree::store::OpKind;

/// Render the application UI.
pub fn render(app: &mut App, frame: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());
    let (main_area, status_area) = (chunks[0], chunks[1]);

    match app.view {
        View::Files => {
            let panels = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
                .split(main_area);
            app.tree_area = panels[0];
            app.content_area = panels[1];
        }
        View::Trash | View::Favorites => {
            app.tree_area = main_area;
            app.content_area = Rect::default();
        }
    }

    render_tree(app, frame);
    if app.view == View::Files {
        render_content(app, frame);
    }
    render_status_bar(app, frame, status_area);

    if app.is_blocked() {
        frame.render_widget(BusyOverlay::new("Working… please wait"), main_area);
    }
    if matches!(app.mode, AppMode::Dialog(_)) {
        frame.render_widget(DialogWidget::new(&app.mode, &app.dialog_state), frame.area());
    }
}

/// Border color for a panel: drop feedback first, then focus.
fn border_style(app: &App, panel: Panel, accepts_drop: bool) -> Style {
    match app.drag.phase() {
        DragPhase::HoveringInvalid => Style::default().fg(Color::Red),
        DragPhase::HoveringValid(_) if accepts_drop => Style::default().fg(Color::Green),
        _ if app.focus == panel => Style::default().fg(Color::Cyan),
        _ => Style::default().fg(Color::DarkGray),
    }
}

/// Folder id the current gesture would drop into, if any.
fn drop_folder(app: &App) -> Option<&str> {
    match app.drag.hover_target() {
        Some(DropTarget::Folder(id)) => Some(id.as_str()),
        _ => None,
    }
}

fn render_tree(app: &mut App, frame: &mut Frame) {
    let rows = app.tree_rows();
    let height = inner_of(app.tree_area).height as usize;
    app.tree_scroll = keep_visible(app.tree_cursor, app.tree_scroll, height);

    let root_drop = app.drag.hover_target() == Some(&DropTarget::Root);
    let title = match app.view {
        View::Files => " Files ".to_string(),
        View::Trash => format!(" Trash ({}) ", rows.len()),
        View::Favorites => format!(" Favorites ({}) ", rows.len()),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(app, Panel::Tree, root_drop));

    let cursor = (app.focus == Panel::Tree).then_some(app.tree_cursor);
    let widget = TreeWidget::new(&rows, &app.selection, app.use_icons)
        .block(block)
        .cursor(cursor)
        .scroll(app.tree_scroll)
        .drop_folder(drop_folder(app))
        .cut(&app.clipboard);
    frame.render_widget(widget, app.tree_area);
}

fn render_content(app: &mut App, frame: &mut Frame) {
    let nodes = app.content_nodes();
    let height = inner_of(app.content_area).height as usize;
    app.content_scroll = keep_visible(app.content_cursor, app.content_scroll, height);

    let current_drop = match app.drag.hover_target() {
        Some(DropTarget::Folder(id)) => app.current_folder.as_deref() == Some(id.as_str()),
        Some(DropTarget::Root) => app.current_folder.is_none(),
        _ => false,
    };
    let block = Block::default()
        .title(format!(" {} ", breadcrumb_text(app)))
        .borders(Borders::ALL)
        .border_style(border_style(app, Panel::Content, current_drop));

    let cursor = (app.focus == Panel::Content).then_some(app.content_cursor);
    let widget = ContentWidget::new(&nodes, &app.selection, app.use_icons)
        .block(block)
        .cursor(cursor)
        .scroll(app.content_scroll)
        .drop_folder(drop_folder(app));
    frame.render_widget(widget, app.content_area);
}

/// `/ Docs / Reports` for the current folder.
fn breadcrumb_text(app: &App) -> String {
    match app.store.breadcrumb(app.current_folder.as_deref()) {
        Ok(chain) if chain.is_empty() => "/".to_string(),
        Ok(chain) => chain
            .iter()
            .map(|n| n.name.as_str())
            .fold(String::new(), |acc, name| format!("{acc}/ {name} "))
            .trim_end()
            .to_string(),
        Err(_) => "/".to_string(),
    }
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let (location, hints) = match app.view {
        View::Files => (breadcrumb_text(app), FILES_HINTS),
        View::Trash => ("Trash".to_string(), TRASH_HINTS),
        View::Favorites => ("Favorites".to_string(), FAVORITES_HINTS),
    };

    let mut info = Vec::new();
    match app.drag.payload() {
        Some(DragPayload::Nodes(ids)) => info.push(format!("dragging {} item(s)", ids.len())),
        Some(DragPayload::Files(files)) => info.push(format!("dropping {} file(s)", files.len())),
        None => {}
    }
    if !app.selection.is_empty() {
        info.push(format!("{} selected", app.selection.len()));
    }
    if !app.clipboard.is_empty() {
        info.push(format!("{} cut", app.clipboard.len()));
    }
    let info = info.join(" | ");

    let status = app.store.status();
    let indicator = if app.unavailable {
        Some("OFFLINE")
    } else if [OpKind::Fetch, OpKind::Create, OpKind::Update, OpKind::Delete]
        .into_iter()
        .any(|kind| status.is_loading(kind))
    {
        Some("loading…")
    } else {
        None
    };

    let mut widget = StatusBarWidget::new(&location, &info).hints(hints);
    if let Some(indicator) = indicator {
        widget = widget.indicator(indicator);
    }
    if let Some(msg) = &app.status_message {
        widget = widget.status_message(&msg.text, msg.is_error);
    }
    frame.render_widget(widget, area);
}
