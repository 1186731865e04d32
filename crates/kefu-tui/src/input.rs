//! Single-line text editing shared by the message box and popup inputs.
//!
//! Cursors are character indices, never byte offsets.

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Insert(char),
    InsertStr(String),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn apply_edit(text: &mut String, cursor: &mut usize, edit: Edit) {
    let char_count = text.chars().count();
    *cursor = (*cursor).min(char_count);

    match edit {
        Edit::Insert(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        Edit::InsertStr(s) => {
            // Single-line input: pasted newlines become spaces
            let s: String = s.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }).collect();
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert_str(byte_pos, &s);
            *cursor += s.chars().count();
        }
        Edit::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        Edit::Delete => {
            if *cursor < char_count {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        Edit::Left => *cursor = cursor.saturating_sub(1),
        Edit::Right => *cursor = (*cursor + 1).min(char_count),
        Edit::Home => *cursor = 0,
        Edit::End => *cursor = char_count,
    }
}

/// Terminal column width of a character. Combining marks and joiners are zero.
pub fn char_width(c: char) -> usize {
    UnicodeWidthChar::width(c).unwrap_or(0)
}

/// Column width as ratatui measures it when rendering
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Hard-wrap text to a column width. Breaks anywhere, since CJK text has no
/// spaces to break on. Explicit newlines are kept.
pub fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(2);
    let mut lines = Vec::new();

    for raw_line in text.split('\n') {
        let mut current = String::new();
        let mut current_width = 0;
        for c in raw_line.chars() {
            let w = char_width(c);
            if current_width + w > width && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += w;
        }
        lines.push(current);
    }

    lines
}
