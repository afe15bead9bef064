pub mod text;
pub mod watermark;
