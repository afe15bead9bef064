pub mod dialogs;
pub mod watermark_panel;
