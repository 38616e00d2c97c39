use std::time::Instant;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

use crate::app::{App, AppMode, DialogKind, View};
use crate::tree::selection::PickKind;

/// Handle a key event.
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }
    match app.mode {
        AppMode::Dialog(_) => handle_dialog_key(app, key),
        AppMode::Normal => {
            // An upload or move holds the tree; only quitting gets through.
            if app.is_blocked() {
                if key.code == KeyCode::Char('q') {
                    app.quit();
                }
                return;
            }
            handle_normal_key(app, key);
        }
    }
}

fn handle_normal_key(app: &mut App, key: KeyEvent) {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('j') => app.move_cursor(1, false),
        KeyCode::Char('k') => app.move_cursor(-1, false),
        KeyCode::Char('J') => app.move_cursor(1, true),
        KeyCode::Char('K') => app.move_cursor(-1, true),
        KeyCode::Down => app.move_cursor(1, shift),
        KeyCode::Up => app.move_cursor(-1, shift),
        KeyCode::PageDown => app.move_cursor(10, shift),
        KeyCode::PageUp => app.move_cursor(-10, shift),
        KeyCode::Char('g') | KeyCode::Home => app.select_first(),
        KeyCode::Char('G') | KeyCode::End => app.select_last(),
        KeyCode::Char(' ') => app.toggle_pick(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => app.open_at_cursor(),
        KeyCode::Char('h') | KeyCode::Left => app.collapse_at_cursor(),
        KeyCode::Backspace => app.go_up(),
        KeyCode::Tab | KeyCode::BackTab => app.switch_focus(),
        KeyCode::Char('a') => app.request_create_folder(),
        KeyCode::Char('r') | KeyCode::F(2) => app.request_rename(),
        KeyCode::Char('f') => app.toggle_favorite(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete(shift),
        KeyCode::Char('D') => app.request_delete(true),
        KeyCode::Char('u') => app.restore(),
        KeyCode::Char('t') => app.toggle_view(),
        KeyCode::Char('s') => app.toggle_favorites_view(),
        KeyCode::Char('R') | KeyCode::F(5) => app.reload(),
        KeyCode::Char('x') => app.cut(),
        KeyCode::Char('p') => app.paste_clipboard(),
        KeyCode::Esc => app.cancel(),
        _ => {}
    }
}

/// How the open dialog consumes keys.
enum DialogInput {
    Text,
    Confirm,
    Dismiss,
}

fn handle_dialog_key(app: &mut App, key: KeyEvent) {
    let input = match &app.mode {
        AppMode::Dialog(DialogKind::CreateFolder { .. } | DialogKind::Rename { .. }) => {
            DialogInput::Text
        }
        AppMode::Dialog(DialogKind::DeleteConfirm { .. }) => DialogInput::Confirm,
        _ => DialogInput::Dismiss,
    };
    match input {
        DialogInput::Text => match key.code {
            KeyCode::Enter => app.confirm_dialog(),
            KeyCode::Esc => app.close_dialog(),
            KeyCode::Backspace => app.dialog_delete_char(),
            KeyCode::Left => app.dialog_move_cursor_left(),
            KeyCode::Right => app.dialog_move_cursor_right(),
            KeyCode::Home => app.dialog_cursor_home(),
            KeyCode::End => app.dialog_cursor_end(),
            KeyCode::Char(c) => app.dialog_input_char(c),
            _ => {}
        },
        DialogInput::Confirm => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_dialog(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_dialog(),
            _ => {}
        },
        DialogInput::Dismiss => {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                app.close_dialog();
            }
        }
    }
}

/// Handle a mouse event.
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent) {
    if !matches!(app.mode, AppMode::Normal) || app.is_blocked() {
        return;
    }
    let (column, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            app.mouse_down(column, row, pick_kind(mouse.modifiers));
        }
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(column, row, Instant::now()),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(column, row, Instant::now()),
        MouseEventKind::Down(MouseButton::Right) => app.context_click(column, row),
        MouseEventKind::ScrollDown => app.scroll(column, row, 1),
        MouseEventKind::ScrollUp => app.scroll(column, row, -1),
        _ => {}
    }
}

/// Modifier keys held during a click decide how the selection changes.
fn pick_kind(modifiers: KeyModifiers) -> PickKind {
    if modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER) {
        PickKind::Toggle
    } else if modifiers.contains(KeyModifiers::SHIFT) {
        PickKind::Range
    } else {
        PickKind::Plain
    }
}

/// Handle bracketed paste: dropped files or a copied id list.
pub fn handle_paste(app: &mut App, text: &str) {
    match app.mode {
        AppMode::Dialog(DialogKind::CreateFolder { .. } | DialogKind::Rename { .. }) => {
            for c in text.chars().filter(|c| !c.is_control()) {
                app.dialog_input_char(c);
            }
        }
        AppMode::Normal if !app.is_blocked() && app.view == View::Files => app.paste_text(text),
        _ => {}
    }
}
