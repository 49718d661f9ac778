//! Custom widgets

mod text_block;

pub use text_block::{layout_lines, StyledLine, TextBlock, TextBlockState};
