//! TextBlock Widget
//!
//! A borderless, bottom-anchored text region made of styled runs. Runs may
//! contain newlines; lines wider than the area are broken at the character
//! that would overflow.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::widgets::StatefulWidget;
use unicode_width::UnicodeWidthChar;

/// One laid-out screen line
pub type StyledLine = Vec<(String, Style)>;

/// State for a scrollable text block
#[derive(Debug, Default)]
pub struct TextBlockState {
    /// Scroll offset (lines from bottom, 0 = latest)
    pub scroll_offset: usize,
    /// Total content lines at the last render
    pub total_lines: usize,
}

impl TextBlockState {
    /// Scroll towards older content
    pub fn scroll_up(&mut self, lines: usize) {
        let max = self.total_lines.saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + lines).min(max);
    }

    /// Scroll towards newer content
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Scroll to the oldest content
    pub fn scroll_to_top(&mut self) {
        self.scroll_offset = self.total_lines.saturating_sub(1);
    }

    /// Scroll to bottom
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }
}

/// Break styled runs into screen lines of at most `width` columns
#[must_use]
pub fn layout_lines(runs: &[(String, Style)], width: usize) -> Vec<StyledLine> {
    let width = width.max(1);
    let mut lines: Vec<StyledLine> = vec![Vec::new()];
    let mut used = 0usize;

    for (text, style) in runs {
        let mut current = String::new();
        for ch in text.chars() {
            if ch == '\n' {
                push_run(&mut lines, &mut current, *style);
                lines.push(Vec::new());
                used = 0;
                continue;
            }
            let w = ch.width().unwrap_or(0);
            if used + w > width && used > 0 {
                push_run(&mut lines, &mut current, *style);
                lines.push(Vec::new());
                used = 0;
            }
            current.push(ch);
            used += w;
        }
        push_run(&mut lines, &mut current, *style);
    }

    lines
}

fn push_run(lines: &mut [StyledLine], current: &mut String, style: Style) {
    if current.is_empty() {
        return;
    }
    if let Some(line) = lines.last_mut() {
        line.push((std::mem::take(current), style));
    }
}

/// A borderless, scrollable text block
pub struct TextBlock<'a> {
    runs: &'a [(String, Style)],
}

impl<'a> TextBlock<'a> {
    /// Create a block over styled runs
    pub fn new(runs: &'a [(String, Style)]) -> Self {
        Self { runs }
    }
}

impl StatefulWidget for TextBlock<'_> {
    type State = TextBlockState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let height = area.height as usize;
        if height == 0 || area.width == 0 {
            return;
        }

        let lines = layout_lines(self.runs, area.width as usize);
        state.total_lines = lines.len();

        // Clamp scroll
        let max_scroll = state.total_lines.saturating_sub(height);
        state.scroll_offset = state.scroll_offset.min(max_scroll);

        let visible_end = state.total_lines.saturating_sub(state.scroll_offset);
        let visible_start = visible_end.saturating_sub(height);

        for (i, line) in lines[visible_start..visible_end].iter().enumerate() {
            let y = area.y + i as u16;
            let mut x = area.x;
            for (text, style) in line {
                let (next_x, _) = buf.set_stringn(
                    x,
                    y,
                    text,
                    (area.x + area.width).saturating_sub(x) as usize,
                    *style,
                );
                x = next_x;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ratatui::style::Color;

    fn texts(line: &StyledLine) -> String {
        line.iter().map(|(t, _)| t.as_str()).collect()
    }

    #[test]
    fn test_layout_breaks_on_newlines_and_width() {
        let red = Style::default().fg(Color::Red);
        let runs = vec![("abcdef\ngh".to_string(), red)];
        let lines = layout_lines(&runs, 4);

        let rendered: Vec<String> = lines.iter().map(texts).collect();
        assert_eq!(rendered, vec!["abcd", "ef", "gh"]);
    }

    #[test]
    fn test_layout_keeps_styles_on_one_line() {
        let a = Style::default().fg(Color::Red);
        let b = Style::default().fg(Color::Blue);
        let runs = vec![("x ".to_string(), a), ("bold".to_string(), b)];
        let lines = layout_lines(&runs, 80);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], vec![("x ".to_string(), a), ("bold".to_string(), b)]);
    }

    #[test]
    fn test_layout_counts_wide_chars() {
        let runs = vec![("你好世界".to_string(), Style::default())];
        let lines = layout_lines(&runs, 4);
        let rendered: Vec<String> = lines.iter().map(texts).collect();
        assert_eq!(rendered, vec!["你好", "世界"]);
    }

    #[test]
    fn test_render_shows_latest_lines() {
        let runs = vec![("1\n2\n3\n4".to_string(), Style::default())];
        let area = Rect::new(0, 0, 5, 2);
        let mut buf = Buffer::empty(area);
        let mut state = TextBlockState::default();

        TextBlock::new(&runs).render(area, &mut buf, &mut state);

        assert_eq!(state.total_lines, 4);
        assert_eq!(buf[(0, 0)].symbol(), "3");
        assert_eq!(buf[(0, 1)].symbol(), "4");

        state.scroll_up(10);
        TextBlock::new(&runs).render(area, &mut buf, &mut state);
        assert_eq!(state.scroll_offset, 2);
        assert_eq!(buf[(0, 0)].symbol(), "1");
    }
}
