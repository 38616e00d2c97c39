use std::collections::HashSet;
use std::future::Future;
use std::time::Instant;

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::clipboard::MoveClipboard;
use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::event::{Event, Operation, OperationResult};
use crate::tree::dnd::{DragController, DragPayload, DropIntent, Surface};
use crate::tree::model;
use crate::tree::node::{Node, NodeId, NodeType};
use crate::tree::selection::{self, PickKind, Selection, VisibleRow};
use crate::tree::store::{OpKind, TreeStore};

/// Which node set is on screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Files,
    Trash,
    Favorites,
}

/// Panel holding keyboard focus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Panel {
    #[default]
    Tree,
    Content,
}

/// The kind of dialog being displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    CreateFolder {
        parent_id: Option<NodeId>,
    },
    Rename {
        node_id: NodeId,
    },
    DeleteConfirm {
        ids: Vec<NodeId>,
        names: Vec<String>,
        permanent: bool,
    },
    Error {
        message: String,
    },
}

/// Application mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum AppMode {
    #[default]
    Normal,
    Dialog(DialogKind),
}

/// State for a dialog's text input.
#[derive(Debug, Default)]
pub struct DialogState {
    pub input: String,
    pub cursor_position: usize,
}

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Main application state.
pub struct App {
    pub store: TreeStore,
    tx: UnboundedSender<Event>,
    pub should_quit: bool,
    pub mode: AppMode,
    pub dialog_state: DialogState,
    pub status_message: Option<StatusMessage>,
    pub view: View,
    pub focus: Panel,
    pub expanded: HashSet<NodeId>,
    pub selection: Selection,
    pub tree_cursor: usize,
    pub content_cursor: usize,
    pub tree_scroll: usize,
    pub content_scroll: usize,
    /// Folder listed in the content panel (`None` = root).
    pub current_folder: Option<NodeId>,
    pub drag: DragController,
    pub clipboard: MoveClipboard,
    /// Set after a transport failure; remote calls stay off until a reload.
    pub unavailable: bool,
    pub confirm_delete: bool,
    pub use_icons: bool,
    /// Last rendered panel areas, for mouse hit-testing.
    pub tree_area: Rect,
    pub content_area: Rect,
    /// Row pressed with the left button and not yet released.
    press: Option<NodeId>,
    /// Plain click on an already selected row, applied on release unless a drag starts.
    deferred_pick: Option<NodeId>,
}

impl App {
    pub fn new(store: TreeStore, config: &AppConfig, tx: UnboundedSender<Event>) -> Self {
        Self {
            store,
            tx,
            should_quit: false,
            mode: AppMode::Normal,
            dialog_state: DialogState::default(),
            status_message: None,
            view: if config.show_trash() {
                View::Trash
            } else {
                View::Files
            },
            focus: Panel::Tree,
            expanded: HashSet::new(),
            selection: Selection::default(),
            tree_cursor: 0,
            content_cursor: 0,
            tree_scroll: 0,
            content_scroll: 0,
            current_folder: None,
            drag: DragController::new(config.hover_expand()),
            clipboard: MoveClipboard::new(),
            unavailable: false,
            confirm_delete: config.confirm_delete(),
            use_icons: config.use_icons(),
            tree_area: Rect::default(),
            content_area: Rect::default(),
            press: None,
            deferred_pick: None,
        }
    }

    // ── Derived rows ─────────────────────────────────────────────────────

    /// Rows of the left panel: the expanded tree, or a flat trash/favorites list.
    pub fn tree_rows(&self) -> Vec<VisibleRow> {
        match self.view {
            View::Files => {
                let tree = model::unflatten(&self.store.active_nodes());
                selection::visible_rows(&tree, &self.expanded)
            }
            View::Trash => selection::flat_rows(&model::sort_siblings(&self.store.trashed_nodes())),
            View::Favorites => selection::flat_rows(&model::sort_siblings(&self.store.favorites())),
        }
    }

    /// Children of the current folder, sibling-sorted. Empty in the trash view.
    pub fn content_nodes(&self) -> Vec<Node> {
        if self.view != View::Files {
            return Vec::new();
        }
        self.store.with_nodes(|nodes| {
            model::children_of(self.current_folder.as_deref(), nodes)
                .into_iter()
                .filter(|n| n.is_active())
                .cloned()
                .collect()
        })
    }

    /// Ids of a panel in display order; range picks span this order.
    fn panel_ids(&self, panel: Panel) -> Vec<NodeId> {
        match (panel, self.view) {
            (Panel::Tree, View::Files) => {
                let tree = model::unflatten(&self.store.active_nodes());
                selection::visible_order(&tree, &self.expanded)
            }
            (Panel::Tree, _) => self.tree_rows().into_iter().map(|r| r.id).collect(),
            (Panel::Content, _) => self.content_nodes().into_iter().map(|n| n.id).collect(),
        }
    }

    fn cursor(&self, panel: Panel) -> usize {
        match panel {
            Panel::Tree => self.tree_cursor,
            Panel::Content => self.content_cursor,
        }
    }

    fn set_cursor(&mut self, panel: Panel, index: usize) {
        match panel {
            Panel::Tree => self.tree_cursor = index,
            Panel::Content => self.content_cursor = index,
        }
    }

    pub fn cursor_id(&self) -> Option<NodeId> {
        self.panel_ids(self.focus).get(self.cursor(self.focus)).cloned()
    }

    pub fn cursor_node(&self) -> Option<Node> {
        self.cursor_id().and_then(|id| self.store.node(&id))
    }

    /// Nodes an action applies to: the selection, else the cursor row.
    pub fn targets(&self) -> Vec<NodeId> {
        if self.selection.is_empty() {
            self.cursor_id().into_iter().collect()
        } else {
            self.selection.selected.clone()
        }
    }

    /// Folder new content goes into, from the focused panel's point of view.
    pub fn target_folder(&self) -> Option<NodeId> {
        match self.focus {
            Panel::Content => self.current_folder.clone(),
            Panel::Tree => self.cursor_node().and_then(|node| match node.node_type {
                NodeType::Folder => Some(node.id),
                NodeType::File => node.parent_id,
            }),
        }
    }

    /// Whether a blocking operation suspends input.
    pub fn is_blocked(&self) -> bool {
        self.store.is_loading(OpKind::Blocking)
    }

    // ── Navigation ───────────────────────────────────────────────────────

    /// Move the cursor; with `extend` the selection grows as a range pick.
    pub fn move_cursor(&mut self, delta: isize, extend: bool) {
        let ids = self.panel_ids(self.focus);
        if ids.is_empty() {
            return;
        }
        let current = self.cursor(self.focus).min(ids.len() - 1);
        let next = current
            .saturating_add_signed(delta)
            .min(ids.len() - 1);
        self.set_cursor(self.focus, next);

        if extend {
            if self.selection.last_picked.is_none() {
                self.selection = self.selection.pick(&ids[current], PickKind::Plain, &ids);
            }
            self.selection = self.selection.pick(&ids[next], PickKind::Range, &ids);
        }
    }

    pub fn select_first(&mut self) {
        self.set_cursor(self.focus, 0);
    }

    pub fn select_last(&mut self) {
        let len = self.panel_ids(self.focus).len();
        self.set_cursor(self.focus, len.saturating_sub(1));
    }

    /// Toggle the cursor row in the selection.
    pub fn toggle_pick(&mut self) {
        let ids = self.panel_ids(self.focus);
        if let Some(id) = ids.get(self.cursor(self.focus)) {
            self.selection = self.selection.pick(id, PickKind::Toggle, &ids);
        }
    }

    pub fn switch_focus(&mut self) {
        if self.view == View::Files {
            self.focus = match self.focus {
                Panel::Tree => Panel::Content,
                Panel::Content => Panel::Tree,
            };
        }
    }

    /// `t`: between the files and the trash.
    pub fn toggle_view(&mut self) {
        let next = match self.view {
            View::Files => View::Trash,
            View::Trash | View::Favorites => View::Files,
        };
        self.set_view(next);
    }

    /// `s`: between the files and the starred nodes.
    pub fn toggle_favorites_view(&mut self) {
        let next = match self.view {
            View::Favorites => View::Files,
            View::Files | View::Trash => View::Favorites,
        };
        self.set_view(next);
    }

    fn set_view(&mut self, view: View) {
        self.view = view;
        self.focus = Panel::Tree;
        self.selection.clear();
        self.tree_cursor = 0;
        self.tree_scroll = 0;
        self.drag.cancel();
    }

    /// Enter/`l`: open a folder (expand it and list it), or show a file's folder.
    ///
    /// From the favorites list this jumps back to the files view.
    pub fn open_at_cursor(&mut self) {
        if self.view == View::Trash {
            return;
        }
        let Some(node) = self.cursor_node() else {
            return;
        };
        if self.view == View::Favorites {
            self.set_view(View::Files);
        }
        match node.node_type {
            NodeType::Folder => {
                self.expanded.insert(node.id.clone());
                self.open_folder(Some(node.id));
            }
            NodeType::File => {
                let size = node.size;
                self.open_folder(node.parent_id.clone());
                self.set_status(format!("{} ({} bytes)", node.name, size));
            }
        }
    }

    /// `h`: collapse an expanded folder, else jump to the parent row.
    pub fn collapse_at_cursor(&mut self) {
        if self.focus != Panel::Tree || self.view != View::Files {
            return;
        }
        let rows = self.tree_rows();
        let Some(row) = rows.get(self.tree_cursor) else {
            return;
        };
        if row.is_expanded {
            self.expanded.remove(&row.id);
        } else if let Some(parent) = &row.parent_id {
            if let Some(index) = rows.iter().position(|r| &r.id == parent) {
                self.tree_cursor = index;
            }
        }
    }

    /// Backspace: list the parent of the current folder.
    pub fn go_up(&mut self) {
        let parent = self
            .current_folder
            .as_deref()
            .and_then(|id| self.store.node(id))
            .and_then(|folder| folder.parent_id);
        self.open_folder(parent);
    }

    /// List `folder` in the content panel, expanding its ancestors in the tree.
    pub fn open_folder(&mut self, folder: Option<NodeId>) {
        if let Ok(chain) = self.store.breadcrumb(folder.as_deref()) {
            for ancestor in chain.iter().filter(|n| Some(&n.id) != folder.as_ref()) {
                self.expanded.insert(ancestor.id.clone());
            }
        }
        self.current_folder = folder;
        self.content_cursor = 0;
        self.content_scroll = 0;
    }

    /// Esc: end a gesture, else drop the selection.
    pub fn cancel(&mut self) {
        if self.drag.is_active() {
            self.drag.cancel();
            self.press = None;
        } else {
            self.selection.clear();
        }
    }

    // ── Mouse ────────────────────────────────────────────────────────────

    /// Panel and row index under a terminal cell. The index is `None` on empty space.
    pub fn hit(&self, column: u16, row: u16) -> Option<(Panel, Option<usize>)> {
        let panels = [
            (Panel::Tree, self.tree_area, self.tree_scroll),
            (Panel::Content, self.content_area, self.content_scroll),
        ];
        for (panel, area, scroll) in panels {
            if !contains(area, column, row) {
                continue;
            }
            let inner = inner_of(area);
            if !contains(inner, column, row) {
                return Some((panel, None));
            }
            let index = (row - inner.y) as usize + scroll;
            let len = self.panel_ids(panel).len();
            return Some((panel, (index < len).then_some(index)));
        }
        None
    }

    /// Drop surface under a terminal cell.
    pub fn surface_at(&self, column: u16, row: u16) -> Surface {
        if self.view != View::Files {
            return Surface::Outside;
        }
        match self.hit(column, row) {
            Some((Panel::Tree, Some(index))) => self
                .tree_rows()
                .get(index)
                .map_or(Surface::Outside, |r| Surface::Node {
                    id: r.id.clone(),
                    node_type: r.node_type,
                    parent_id: r.parent_id.clone(),
                }),
            Some((Panel::Tree, None)) => Surface::Container(None),
            Some((Panel::Content, Some(index))) => self
                .content_nodes()
                .get(index)
                .map_or(Surface::Outside, Surface::of),
            Some((Panel::Content, None)) => Surface::Container(self.current_folder.clone()),
            None => Surface::Outside,
        }
    }

    /// Left button pressed.
    pub fn mouse_down(&mut self, column: u16, row: u16, kind: PickKind) {
        self.press = None;
        self.deferred_pick = None;
        let Some((panel, index)) = self.hit(column, row) else {
            return;
        };
        if self.view != View::Files && panel == Panel::Content {
            return;
        }
        self.focus = panel;
        let ids = self.panel_ids(panel);
        let Some(index) = index else {
            if kind == PickKind::Plain {
                self.selection.clear();
            }
            return;
        };
        let id = ids[index].clone();
        self.set_cursor(panel, index);

        if kind == PickKind::Plain && self.selection.contains(&id) {
            self.deferred_pick = Some(id.clone());
        } else {
            self.selection = self.selection.pick(&id, kind, &ids);
        }
        self.press = Some(id);
    }

    /// Pointer moved with the left button held.
    pub fn mouse_drag(&mut self, column: u16, row: u16, now: Instant) {
        if !self.drag.is_active() {
            let Some(id) = self.press.take() else {
                return;
            };
            self.deferred_pick = None;
            self.drag.start(&id, &self.selection);
        }
        let surface = self.surface_at(column, row);
        if surface == Surface::Outside {
            tracing::trace!("pointer left the panels, cancelling drag");
            self.drag.leave();
            return;
        }
        let drag = &mut self.drag;
        self.store.with_nodes(|nodes| drag.hover(&surface, nodes, now));
    }

    /// Left button released: drop an active gesture, or finish a click.
    pub fn mouse_up(&mut self, column: u16, row: u16, now: Instant) {
        self.press = None;
        if self.drag.is_active() {
            let surface = self.surface_at(column, row);
            let drag = &mut self.drag;
            self.store.with_nodes(|nodes| drag.hover(&surface, nodes, now));
            match self.drag.drop_intent() {
                Some(intent) => self.run_intent(intent),
                None => self.set_error_status(AppError::InvalidDrop.to_string()),
            }
            return;
        }
        if let Some(id) = self.deferred_pick.take() {
            let ids = self.panel_ids(self.focus);
            self.selection = self.selection.pick(&id, PickKind::Plain, &ids);
        }
    }

    /// Right click: context pick. A folder becomes the target folder, a file points at its parent.
    pub fn context_click(&mut self, column: u16, row: u16) {
        let Some((panel, index)) = self.hit(column, row) else {
            return;
        };
        self.focus = panel;
        let Some(index) = index else {
            self.selection.clear();
            return;
        };
        let ids = self.panel_ids(panel);
        let id = ids[index].clone();
        self.set_cursor(panel, index);
        self.selection = self.selection.pick(&id, PickKind::Context, &ids);

        if self.view == View::Files && panel == Panel::Content {
            if let Some(node) = self.store.node(&id) {
                if node.is_folder() {
                    self.open_folder(Some(node.id));
                }
            }
        }
    }

    pub fn scroll(&mut self, column: u16, row: u16, delta: isize) {
        if let Some((panel, _)) = self.hit(column, row) {
            self.focus = panel;
            self.move_cursor(delta, false);
        }
    }

    /// Pasted text: file paths upload, a JSON id list moves, into the focused location.
    pub fn paste_text(&mut self, text: &str) {
        if self.view != View::Files {
            self.set_error_status(AppError::InvalidDrop.to_string());
            return;
        }
        let Some(payload) = DragPayload::from_transfer(text) else {
            return;
        };
        let surface = self.focused_surface();
        self.drag.start_with(payload);
        let drag = &mut self.drag;
        self.store.with_nodes(|nodes| drag.hover(&surface, nodes, Instant::now()));
        match self.drag.drop_intent() {
            Some(intent) => self.run_intent(intent),
            None => self.set_error_status(AppError::InvalidDrop.to_string()),
        }
    }

    fn focused_surface(&self) -> Surface {
        match self.focus {
            Panel::Content => Surface::Container(self.current_folder.clone()),
            Panel::Tree => self
                .cursor_node()
                .map_or(Surface::Container(None), |node| Surface::of(&node)),
        }
    }

    /// Periodic housekeeping; opens folders hovered long enough during a drag.
    pub fn on_tick(&mut self, now: Instant) {
        self.clear_expired_status();
        if let Some(folder) = self.drag.tick(now) {
            tracing::trace!(folder = %folder, "auto-expanding hovered folder");
            self.expanded.insert(folder);
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────

    pub fn reload(&mut self) {
        self.unavailable = false;
        self.spawn(Operation::Load, |store| async move {
            store.load_tree(true).await.map(|r| r.message)
        });
    }

    pub fn request_create_folder(&mut self) {
        if self.view == View::Files {
            let parent_id = self.target_folder();
            self.open_dialog(DialogKind::CreateFolder { parent_id });
        }
    }

    pub fn request_rename(&mut self) {
        if let Some(node_id) = self.cursor_id() {
            self.open_dialog(DialogKind::Rename { node_id });
        }
    }

    pub fn toggle_favorite(&mut self) {
        let ids = self.targets();
        if ids.is_empty() || self.view == View::Trash {
            return;
        }
        self.spawn(Operation::Favorite, move |store| async move {
            store.toggle_favorite(&ids).await.map(|r| r.message)
        });
    }

    /// Trash (or delete for good) the targets, asking first when configured to.
    pub fn request_delete(&mut self, permanent: bool) {
        let ids = self.targets();
        if ids.is_empty() {
            return;
        }
        let permanent = permanent || self.view == View::Trash;
        if self.confirm_delete || permanent {
            let names = ids
                .iter()
                .map(|id| self.store.node(id).map_or_else(|| id.clone(), |n| n.name))
                .collect();
            self.open_dialog(DialogKind::DeleteConfirm {
                ids,
                names,
                permanent,
            });
        } else {
            self.run_delete(ids, permanent);
        }
    }

    fn run_delete(&mut self, ids: Vec<NodeId>, permanent: bool) {
        if permanent {
            self.spawn(Operation::Delete, move |store| async move {
                store.hard_delete(&ids).await.map(|r| r.message)
            });
        } else {
            self.spawn(Operation::Trash, move |store| async move {
                store.soft_delete(&ids).await.map(|r| r.message)
            });
        }
    }

    pub fn restore(&mut self) {
        let ids = self.targets();
        if ids.is_empty() || self.view != View::Trash {
            return;
        }
        self.spawn(Operation::Restore, move |store| async move {
            store.restore(&ids).await.map(|r| r.message)
        });
    }

    /// `x`: remember the targets for a later paste.
    pub fn cut(&mut self) {
        if self.view != View::Files {
            return;
        }
        let ids = self.targets();
        if !ids.is_empty() {
            self.set_status(format!("{} item(s) cut", ids.len()));
            self.clipboard.set(ids);
        }
    }

    /// `p`: move the cut nodes into the target folder.
    pub fn paste_clipboard(&mut self) {
        if self.clipboard.is_empty() || self.view != View::Files {
            return;
        }
        let intent = DropIntent::Move {
            parent_id: self.target_folder(),
            ids: self.clipboard.take(),
        };
        self.run_intent(intent);
    }

    fn run_intent(&mut self, intent: DropIntent) {
        let op = match intent {
            DropIntent::Upload { .. } => Operation::Upload,
            DropIntent::Move { .. } => Operation::Move,
        };
        if let Some(parent) = intent.parent_id() {
            self.expanded.insert(parent.to_string());
        }
        self.spawn(op, move |store| async move { intent.execute(&store).await });
    }

    /// Run a store operation off the UI loop; its outcome comes back as an event.
    fn spawn<F, Fut>(&mut self, op: Operation, task: F)
    where
        F: FnOnce(TreeStore) -> Fut,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        if self.unavailable && op != Operation::Load {
            self.set_error_status("Server unavailable. Press R to retry.".to_string());
            return;
        }
        tracing::debug!(?op, "dispatching store operation");
        let tx = self.tx.clone();
        let future = task(self.store.clone());
        tokio::spawn(async move {
            let result = future.await;
            let _ = tx.send(Event::OperationComplete(OperationResult { op, result }));
        });
    }

    /// Fold a finished operation back into the view.
    pub fn handle_operation_complete(&mut self, outcome: OperationResult) {
        match outcome.result {
            Ok(message) => {
                tracing::info!(op = ?outcome.op, %message, "operation complete");
                if outcome.op == Operation::Load {
                    let orphans = self.store.with_nodes(model::orphan_ids);
                    if !orphans.is_empty() {
                        tracing::debug!(count = orphans.len(), "orphaned nodes kept in cache");
                    }
                }
                if !message.is_empty() {
                    self.set_status(message);
                }
            }
            Err(err) if err.is_unavailable() => {
                tracing::warn!(op = ?outcome.op, "service unavailable");
                self.unavailable = true;
                self.drag.cancel();
                self.open_dialog(DialogKind::Error {
                    message: format!("{err} Press R to retry."),
                });
            }
            Err(err) => {
                tracing::warn!(op = ?outcome.op, error = %err, "operation failed");
                self.set_error_status(err.to_string());
            }
        }
        self.refresh_after_change();
    }

    /// Drop stale ids and re-home the content panel after the cache changed.
    fn refresh_after_change(&mut self) {
        let active: HashSet<NodeId> = self
            .store
            .active_nodes()
            .into_iter()
            .map(|n| n.id)
            .collect();
        let mut on_screen: HashSet<NodeId> = self.panel_ids(Panel::Tree).into_iter().collect();
        on_screen.extend(self.panel_ids(Panel::Content));
        self.selection.retain(|id| on_screen.contains(id));
        self.clipboard.retain(|id| active.contains(id));
        self.expanded.retain(|id| active.contains(id));

        match self.store.nearest_active_ancestor_id(self.current_folder.as_deref()) {
            Ok(folder) => self.current_folder = folder,
            Err(err) => {
                self.current_folder = None;
                self.set_error_status(err.to_string());
            }
        }

        let tree_len = self.tree_rows().len();
        self.tree_cursor = self.tree_cursor.min(tree_len.saturating_sub(1));
        let content_len = self.content_nodes().len();
        self.content_cursor = self.content_cursor.min(content_len.saturating_sub(1));
    }

    // ── Dialogs ──────────────────────────────────────────────────────────

    /// Open a dialog of the given kind.
    pub fn open_dialog(&mut self, kind: DialogKind) {
        self.dialog_state = DialogState::default();
        if let DialogKind::Rename { ref node_id } = kind {
            if let Some(node) = self.store.node(node_id) {
                self.dialog_state.cursor_position = node.name.len();
                self.dialog_state.input = node.name;
            }
        }
        self.mode = AppMode::Dialog(kind);
    }

    /// Close the current dialog and return to normal mode.
    pub fn close_dialog(&mut self) {
        self.mode = AppMode::Normal;
        self.dialog_state = DialogState::default();
    }

    /// Enter (or `y`) on the open dialog.
    pub fn confirm_dialog(&mut self) {
        let AppMode::Dialog(kind) = std::mem::take(&mut self.mode) else {
            return;
        };
        let input = std::mem::take(&mut self.dialog_state.input);
        self.close_dialog();

        match kind {
            DialogKind::CreateFolder { parent_id } => {
                if let Some(parent) = &parent_id {
                    self.expanded.insert(parent.clone());
                }
                self.spawn(Operation::CreateFolder, move |store| async move {
                    store
                        .create_folder(parent_id.as_deref(), &input)
                        .await
                        .map(|r| r.message)
                });
            }
            DialogKind::Rename { node_id } => {
                self.spawn(Operation::Rename, move |store| async move {
                    store.rename(&node_id, &input).await.map(|r| r.message)
                });
            }
            DialogKind::DeleteConfirm { ids, permanent, .. } => {
                self.selection.clear();
                self.run_delete(ids, permanent);
            }
            DialogKind::Error { .. } => {}
        }
    }

    /// Insert a character at the current cursor position.
    pub fn dialog_input_char(&mut self, c: char) {
        self.dialog_state
            .input
            .insert(self.dialog_state.cursor_position, c);
        self.dialog_state.cursor_position += c.len_utf8();
    }

    /// Delete the character before the cursor (backspace).
    pub fn dialog_delete_char(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
            self.dialog_state
                .input
                .remove(self.dialog_state.cursor_position);
        }
    }

    /// Move cursor left by one character.
    pub fn dialog_move_cursor_left(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(prev) = self.dialog_state.input[..pos].chars().next_back() {
            self.dialog_state.cursor_position -= prev.len_utf8();
        }
    }

    /// Move cursor right by one character.
    pub fn dialog_move_cursor_right(&mut self) {
        let pos = self.dialog_state.cursor_position;
        if let Some(next) = self.dialog_state.input[pos..].chars().next() {
            self.dialog_state.cursor_position += next.len_utf8();
        }
    }

    pub fn dialog_cursor_home(&mut self) {
        self.dialog_state.cursor_position = 0;
    }

    pub fn dialog_cursor_end(&mut self) {
        self.dialog_state.cursor_position = self.dialog_state.input.len();
    }

    // ── Status ───────────────────────────────────────────────────────────

    pub fn set_status(&mut self, text: String) {
        self.status_message = Some(StatusMessage {
            text,
            is_error: false,
            created: Instant::now(),
        });
    }

    pub fn set_error_status(&mut self, text: String) {
        self.status_message = Some(StatusMessage {
            text,
            is_error: true,
            created: Instant::now(),
        });
    }

    /// Clear the status message if it has been displayed for more than 3 seconds.
    pub fn clear_expired_status(&mut self) {
        if let Some(status) = &self.status_message {
            if status.created.elapsed().as_secs() > 3 {
                self.status_message = None;
            }
        }
    }

    /// Quit the application.
    pub fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

/// Area inside a one-cell border.
pub fn inner_of(area: Rect) -> Rect {
    Rect::new(
        area.x.saturating_add(1),
        area.y.saturating_add(1),
        area.width.saturating_sub(2),
        area.height.saturating_sub(2),
    )
}

/// Scroll offset that keeps `cursor` inside a window of `height` rows.
pub fn keep_visible(cursor: usize, scroll: usize, height: usize) -> usize {
    if height == 0 {
        return 0;
    }
    if cursor < scroll {
        cursor
    } else if cursor >= scroll + height {
        cursor + 1 - height
    } else {
        scroll
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::{Failure, MemoryTreeService};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn seed() -> Vec<Node> {
        vec![
            Node::folder("docs", None, "Docs"),
            Node::folder("reports", Some("docs"), "Reports"),
            Node::file("q1", Some("reports"), "q1.pdf"),
            Node::file("notes", Some("docs"), "notes.md"),
            Node::folder("pics", None, "Pics"),
            Node::file("todo", None, "todo.txt"),
        ]
    }

    async fn setup() -> (Arc<MemoryTreeService>, App, UnboundedReceiver<Event>) {
        let service = Arc::new(MemoryTreeService::with_nodes(seed()));
        let store = TreeStore::new(service.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(store, &AppConfig::default(), tx);
        app.reload();
        settle(&mut app, &mut rx).await;
        app.tree_area = Rect::new(0, 0, 40, 20);
        app.content_area = Rect::new(40, 0, 40, 20);
        (service, app, rx)
    }

    async fn settle(app: &mut App, rx: &mut UnboundedReceiver<Event>) {
        match rx.recv().await {
            Some(Event::OperationComplete(result)) => app.handle_operation_complete(result),
            other => panic!("unexpected event {other:?}"),
        }
    }

    fn row_names(app: &App) -> Vec<String> {
        app.tree_rows().into_iter().map(|r| r.name).collect()
    }

    fn row_of(app: &App, id: &str) -> u16 {
        let index = app.tree_rows().iter().position(|r| r.id == id).unwrap();
        // one border row above the first item
        index as u16 + 1
    }

    #[tokio::test]
    async fn reload_lists_root_folders_first() {
        let (_service, app, _rx) = setup().await;
        assert_eq!(row_names(&app), vec!["Docs", "Pics", "todo.txt"]);
        assert!(!app.is_blocked());
    }

    #[tokio::test]
    async fn open_and_collapse_folder() {
        let (_service, mut app, _rx) = setup().await;
        app.open_at_cursor();
        assert_eq!(app.current_folder.as_deref(), Some("docs"));
        assert_eq!(row_names(&app), vec!["Docs", "Reports", "notes.md", "Pics", "todo.txt"]);
        let content: Vec<String> = app.content_nodes().into_iter().map(|n| n.name).collect();
        assert_eq!(content, vec!["Reports", "notes.md"]);

        app.move_cursor(1, false);
        app.collapse_at_cursor();
        assert_eq!(app.tree_cursor, 0);
        app.collapse_at_cursor();
        assert_eq!(row_names(&app), vec!["Docs", "Pics", "todo.txt"]);
    }

    #[tokio::test]
    async fn shift_movement_extends_range() {
        let (_service, mut app, _rx) = setup().await;
        app.move_cursor(1, true);
        app.move_cursor(1, true);
        assert_eq!(app.selection.selected, vec!["docs", "pics", "todo"]);
        app.move_cursor(-1, true);
        assert_eq!(app.selection.selected, vec!["docs", "pics"]);
    }

    #[tokio::test]
    async fn create_folder_through_dialog() {
        let (_service, mut app, mut rx) = setup().await;
        app.request_create_folder();
        assert_eq!(
            app.mode,
            AppMode::Dialog(DialogKind::CreateFolder {
                parent_id: Some("docs".into())
            })
        );
        for c in "Drafts".chars() {
            app.dialog_input_char(c);
        }
        app.confirm_dialog();
        settle(&mut app, &mut rx).await;

        assert_eq!(app.mode, AppMode::Normal);
        assert!(app.expanded.contains("docs"));
        assert!(row_names(&app).contains(&"Drafts".to_string()));
        assert!(!app.status_message.as_ref().unwrap().is_error);
    }

    #[tokio::test]
    async fn blank_folder_name_reports_error_without_call() {
        let (service, mut app, mut rx) = setup().await;
        let calls = service.calls();
        app.request_create_folder();
        app.dialog_input_char(' ');
        app.confirm_dialog();
        settle(&mut app, &mut rx).await;

        let status = app.status_message.as_ref().unwrap();
        assert!(status.is_error);
        assert_eq!(status.text, "Name is required");
        assert_eq!(service.calls(), calls);
    }

    #[tokio::test]
    async fn rename_prefills_current_name() {
        let (_service, mut app, mut rx) = setup().await;
        app.select_last();
        app.request_rename();
        assert_eq!(app.dialog_state.input, "todo.txt");
        assert_eq!(app.dialog_state.cursor_position, 8);

        app.dialog_delete_char();
        app.dialog_delete_char();
        app.dialog_delete_char();
        for c in "md".chars() {
            app.dialog_input_char(c);
        }
        app.confirm_dialog();
        settle(&mut app, &mut rx).await;
        assert_eq!(app.store.node("todo").unwrap().name, "todo.md");
    }

    #[tokio::test]
    async fn trashing_current_folder_rehomes_content_panel() {
        let (_service, mut app, mut rx) = setup().await;
        app.open_folder(Some("reports".into()));
        app.selection = Selection {
            selected: vec!["docs".into()],
            last_picked: Some("docs".into()),
        };
        app.request_delete(false);
        assert!(matches!(app.mode, AppMode::Dialog(DialogKind::DeleteConfirm { permanent: false, .. })));
        app.confirm_dialog();
        settle(&mut app, &mut rx).await;

        assert!(!app.store.node("docs").unwrap().is_active());
        // reports itself is still active; only docs was trashed
        assert_eq!(app.current_folder.as_deref(), Some("reports"));
        assert_eq!(row_names(&app), vec!["Pics", "todo.txt"]);

        app.toggle_view();
        assert_eq!(row_names(&app), vec!["Docs"]);
        app.restore();
        settle(&mut app, &mut rx).await;
        assert!(app.store.node("docs").unwrap().is_active());
    }

    #[tokio::test]
    async fn hard_delete_from_trash_view_is_permanent() {
        let (_service, mut app, mut rx) = setup().await;
        app.select_last();
        app.confirm_delete = false;
        app.request_delete(false);
        settle(&mut app, &mut rx).await;

        app.toggle_view();
        app.request_delete(false);
        assert!(matches!(app.mode, AppMode::Dialog(DialogKind::DeleteConfirm { permanent: true, .. })));
        app.confirm_dialog();
        settle(&mut app, &mut rx).await;
        assert!(app.store.node("todo").is_none());
        assert!(app.tree_rows().is_empty());
    }

    #[tokio::test]
    async fn mouse_drag_moves_file_into_folder() {
        let (_service, mut app, mut rx) = setup().await;
        let now = Instant::now();
        app.mouse_down(5, row_of(&app, "todo"), PickKind::Plain);
        app.mouse_drag(5, row_of(&app, "pics"), now);
        assert!(app.drag.hover_target().is_some());
        app.mouse_up(5, row_of(&app, "pics"), now);
        settle(&mut app, &mut rx).await;

        assert_eq!(app.store.node("todo").unwrap().parent_id.as_deref(), Some("pics"));
        assert!(app.expanded.contains("pics"));
    }

    #[tokio::test]
    async fn invalid_drop_never_reaches_service() {
        let (service, mut app, mut rx) = setup().await;
        app.open_at_cursor();
        let calls = service.calls();
        let now = Instant::now();

        app.mouse_down(5, row_of(&app, "docs"), PickKind::Plain);
        app.mouse_drag(5, row_of(&app, "reports"), now);
        assert!(app.drag.hover_target().is_none());
        app.mouse_up(5, row_of(&app, "reports"), now);

        assert!(rx.try_recv().is_err());
        assert_eq!(service.calls(), calls);
        assert_eq!(app.status_message.as_ref().unwrap().text, "Cannot drop here");
        // expansion state untouched by the rejected hover
        assert!(app.expanded.contains("docs"));
        assert!(!app.expanded.contains("reports"));
    }

    #[tokio::test]
    async fn dragging_a_selected_row_carries_whole_selection() {
        let (_service, mut app, mut rx) = setup().await;
        app.open_at_cursor();
        let now = Instant::now();
        app.mouse_down(5, row_of(&app, "notes"), PickKind::Plain);
        app.mouse_down(5, row_of(&app, "todo"), PickKind::Toggle);
        app.mouse_down(5, row_of(&app, "notes"), PickKind::Plain);
        app.mouse_drag(5, row_of(&app, "pics"), now);
        app.mouse_up(5, row_of(&app, "pics"), now);
        settle(&mut app, &mut rx).await;

        assert_eq!(app.store.node("notes").unwrap().parent_id.as_deref(), Some("pics"));
        assert_eq!(app.store.node("todo").unwrap().parent_id.as_deref(), Some("pics"));
    }

    #[tokio::test]
    async fn click_without_drag_on_selected_row_collapses_selection() {
        let (_service, mut app, _rx) = setup().await;
        app.mouse_down(5, row_of(&app, "docs"), PickKind::Plain);
        app.mouse_down(5, row_of(&app, "pics"), PickKind::Toggle);
        assert_eq!(app.selection.len(), 2);
        app.mouse_down(5, row_of(&app, "docs"), PickKind::Plain);
        assert_eq!(app.selection.len(), 2);
        app.mouse_up(5, row_of(&app, "docs"), Instant::now());
        assert_eq!(app.selection.selected, vec!["docs"]);
    }

    #[tokio::test]
    async fn stable_hover_expands_folder_on_tick() {
        let (_service, mut app, _rx) = setup().await;
        let t0 = Instant::now();
        app.mouse_down(5, row_of(&app, "todo"), PickKind::Plain);
        app.mouse_drag(5, row_of(&app, "docs"), t0);
        app.on_tick(t0 + Duration::from_millis(100));
        assert!(!app.expanded.contains("docs"));
        app.on_tick(t0 + Duration::from_millis(700));
        assert!(app.expanded.contains("docs"));
        app.cancel();
        assert!(!app.drag.is_active());
    }

    #[tokio::test]
    async fn pasted_file_uploads_into_content_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, [0u8; 16]).unwrap();

        let (_service, mut app, mut rx) = setup().await;
        app.open_folder(Some("pics".into()));
        app.focus = Panel::Content;
        app.paste_text(&path.display().to_string());
        settle(&mut app, &mut rx).await;

        let content = app.content_nodes();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].name, "scan.png");
        assert_eq!(content[0].content_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn cut_and_paste_moves_to_root() {
        let (_service, mut app, mut rx) = setup().await;
        app.open_folder(Some("docs".into()));
        app.focus = Panel::Content;
        app.move_cursor(1, false);
        app.cut();
        assert_eq!(app.clipboard.len(), 1);

        app.go_up();
        app.paste_clipboard();
        settle(&mut app, &mut rx).await;
        assert!(app.store.node("notes").unwrap().parent_id.is_none());
        assert!(app.clipboard.is_empty());
    }

    #[tokio::test]
    async fn unavailable_service_blocks_until_reload() {
        let (service, mut app, mut rx) = setup().await;
        service.fail_next(Failure::Unavailable);
        app.toggle_favorite();
        settle(&mut app, &mut rx).await;

        assert!(app.unavailable);
        assert!(matches!(app.mode, AppMode::Dialog(DialogKind::Error { .. })));
        app.close_dialog();

        let calls = service.calls();
        app.toggle_favorite();
        assert!(rx.try_recv().is_err());
        assert_eq!(service.calls(), calls);

        app.reload();
        settle(&mut app, &mut rx).await;
        assert!(!app.unavailable);
        app.toggle_favorite();
        settle(&mut app, &mut rx).await;
        assert!(app.store.node("docs").unwrap().is_favorite);
    }

    #[tokio::test]
    async fn context_click_on_empty_space_clears_selection() {
        let (_service, mut app, _rx) = setup().await;
        app.mouse_down(5, row_of(&app, "docs"), PickKind::Plain);
        app.context_click(5, 15);
        assert!(app.selection.is_empty());
    }

    #[tokio::test]
    async fn dialog_cursor_editing_handles_multibyte() {
        let (_service, mut app, _rx) = setup().await;
        app.open_dialog(DialogKind::CreateFolder { parent_id: None });
        app.dialog_input_char('é');
        app.dialog_input_char('x');
        app.dialog_move_cursor_left();
        app.dialog_move_cursor_left();
        assert_eq!(app.dialog_state.cursor_position, 0);
        app.dialog_move_cursor_left();
        assert_eq!(app.dialog_state.cursor_position, 0);
        app.dialog_cursor_end();
        app.dialog_delete_char();
        app.dialog_delete_char();
        assert!(app.dialog_state.input.is_empty());
        app.dialog_delete_char();
        app.dialog_cursor_home();
        assert_eq!(app.dialog_state.cursor_position, 0);
    }

    #[tokio::test]
    async fn favorites_view_lists_starred_and_jumps_back() {
        let (_service, mut app, mut rx) = setup().await;
        app.open_folder(Some("reports".into()));
        app.focus = Panel::Content;
        app.toggle_favorite();
        settle(&mut app, &mut rx).await;

        app.toggle_favorites_view();
        assert_eq!(row_names(&app), vec!["q1.pdf"]);
        assert!(app.content_nodes().is_empty());

        app.open_at_cursor();
        assert_eq!(app.view, View::Files);
        assert_eq!(app.current_folder.as_deref(), Some("reports"));
        assert!(app.expanded.contains("docs"));
    }

    #[tokio::test]
    async fn leaving_the_panels_cancels_the_drag() {
        let (service, mut app, mut rx) = setup().await;
        let calls = service.calls();
        let now = Instant::now();
        app.mouse_down(5, row_of(&app, "todo"), PickKind::Plain);
        app.mouse_drag(5, row_of(&app, "pics"), now);
        assert!(app.drag.is_active());

        app.mouse_drag(100, 30, now);
        assert!(!app.drag.is_active());
        app.mouse_up(5, row_of(&app, "pics"), now);
        assert!(rx.try_recv().is_err());
        assert_eq!(service.calls(), calls);
    }

    #[test]
    fn keep_visible_scrolls_minimally() {
        assert_eq!(keep_visible(0, 0, 10), 0);
        assert_eq!(keep_visible(12, 0, 10), 3);
        assert_eq!(keep_visible(2, 5, 10), 2);
        assert_eq!(keep_visible(7, 5, 10), 5);
        assert_eq!(keep_visible(3, 0, 0), 0);
    }
}
