use crossterm::event::KeyCode;

/// Single-line text field. The cursor counts chars, not bytes.
#[derive(Default, Clone)]
pub struct LineEdit {
    pub value: String,
    pub cursor: usize,
    pub password: bool,
}

impl LineEdit {
    pub fn masked() -> Self {
        Self { password: true, ..Default::default() }
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn set(&mut self, s: impl Into<String>) {
        self.value = s.into();
        self.cursor = self.char_len();
    }
    pub fn push(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, ch);
        self.cursor += 1;
    }
    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }
    pub fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }
    pub fn left(&mut self) {
        if self.cursor > 0 { self.cursor -= 1; }
    }
    pub fn right(&mut self) {
        if self.cursor < self.char_len() { self.cursor += 1; }
    }
    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
    pub fn rendered(&self) -> String {
        if self.password { "*".repeat(self.char_len()) } else { self.value.clone() }
    }

    /// Applies an editing key. Returns false for keys a field does not handle
    /// (Enter, Esc, Tab, ...), which the caller then interprets.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(c) => self.push(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.left(),
            KeyCode::Right => self.right(),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.char_len(),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_at_the_cursor() {
        let mut e = LineEdit::default();
        e.set("Rce");
        e.left();
        e.left();
        e.push('i');
        assert_eq!(e.value, "Rice");
        e.right();
        e.delete();
        assert_eq!(e.value, "Ric");
        e.backspace();
        assert_eq!(e.value, "Ri");
    }

    #[test]
    fn multibyte_text_is_safe() {
        let mut e = LineEdit::default();
        e.set("kopi☕");
        e.backspace();
        e.push('é');
        assert_eq!(e.value, "kopié");
        assert_eq!(e.cursor, 5);
    }

    #[test]
    fn navigation_keys_are_left_to_the_caller() {
        let mut e = LineEdit::default();
        assert!(e.handle_key(KeyCode::Char('a')));
        assert!(e.handle_key(KeyCode::Home));
        assert!(e.handle_key(KeyCode::Char('b')));
        assert_eq!(e.value, "ba");
        assert!(!e.handle_key(KeyCode::Enter));
        assert!(!e.handle_key(KeyCode::Tab));
    }

    #[test]
    fn password_is_masked() {
        let mut e = LineEdit::masked();
        e.set("rahasia");
        assert_eq!(e.rendered(), "*******");
    }
}
