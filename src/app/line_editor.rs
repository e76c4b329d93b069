/// Single-line text field with a character limit.
#[derive(Clone, Debug)]
pub struct LineEditor {
    text: String,
    cursor_col: usize,
    max_chars: usize,
}

impl LineEditor {
    pub fn with_limit(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            cursor_col: 0,
            max_chars,
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    pub fn cursor_col(&self) -> usize {
        self.cursor_col
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor_col = 0;
    }

    /// Insert at the cursor. Control characters are dropped and input past
    /// the limit is ignored.
    pub fn insert_char(&mut self, ch: char) {
        if ch.is_control() || self.len() >= self.max_chars {
            return;
        }
        let byte_index = char_to_byte_index(&self.text, self.cursor_col);
        self.text.insert(byte_index, ch);
        self.cursor_col += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor_col == 0 {
            return;
        }
        let byte_index = char_to_byte_index(&self.text, self.cursor_col - 1);
        self.text.remove(byte_index);
        self.cursor_col -= 1;
    }

    pub fn delete_forward(&mut self) {
        if self.cursor_col >= self.len() {
            return;
        }
        let byte_index = char_to_byte_index(&self.text, self.cursor_col);
        self.text.remove(byte_index);
    }

    pub fn move_left(&mut self) {
        self.cursor_col = self.cursor_col.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor_col = (self.cursor_col + 1).min(self.len());
    }

    pub fn move_home(&mut self) {
        self.cursor_col = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor_col = self.len();
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }
}

fn char_to_byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}
