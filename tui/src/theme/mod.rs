//! Theme and Colors
//!
//! One style per display tag, plus the chrome around the conversation.

use ratatui::style::{Color, Modifier, Style};

use streamchat_core::DisplayTag;

// ============================================================================
// Conversation Palette
// ============================================================================

/// User echo green
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Assistant body text
pub const ASSISTANT_TEXT: Color = Color::Rgb(225, 225, 225);

/// Code block foreground
pub const CODE_FG: Color = Color::Rgb(230, 200, 120);

/// Code block background
pub const CODE_BG: Color = Color::Rgb(40, 40, 48);

/// Bold text accent
pub const BOLD_ACCENT: Color = Color::Rgb(255, 255, 255);

/// Error red
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

/// System/dim text
pub const DIM_GRAY: Color = Color::Rgb(120, 120, 120);

// ============================================================================
// UI Colors
// ============================================================================

/// Status bar accent
pub const ACCENT_MAGENTA: Color = Color::Magenta;

/// Busy indicator
pub const BUSY_YELLOW: Color = Color::Yellow;

/// Style for a run of conversation text
#[must_use]
pub fn style_for(tag: DisplayTag) -> Style {
    match tag {
        DisplayTag::User => Style::default().fg(USER_GREEN),
        DisplayTag::AssistantPlain => Style::default().fg(ASSISTANT_TEXT),
        DisplayTag::AssistantCode => Style::default().fg(CODE_FG).bg(CODE_BG),
        DisplayTag::AssistantBold => Style::default()
            .fg(BOLD_ACCENT)
            .add_modifier(Modifier::BOLD),
        DisplayTag::Error => Style::default().fg(ERROR_RED),
        DisplayTag::SystemNotice => Style::default()
            .fg(DIM_GRAY)
            .add_modifier(Modifier::ITALIC),
    }
}
