pub mod content;
pub mod dialog;
pub mod status_bar;
pub mod tree;
