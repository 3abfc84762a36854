use std::collections::BTreeMap;

/// Latin letters mapped to the characters commonly substituted for them.
pub fn default_homoglyphs() -> BTreeMap<char, Vec<char>> {
    let mut map = BTreeMap::new();

    // Cyrillic / Greek / Latin-extended lookalikes plus digit and symbol swaps
    map.insert('a', vec!['а', 'ɑ', 'α']);
    map.insert('c', vec!['с']);
    map.insert('e', vec!['е']);
    map.insert('i', vec!['і', '1']);
    map.insert('o', vec!['о', 'ο', '0']);
    map.insert('p', vec!['р']);
    map.insert('s', vec!['ѕ', '$']);
    map.insert('y', vec!['у']);
    map.insert('l', vec!['ⅼ', '1', '!']);

    map
}

/// Detects characters that imitate Latin letters.
#[derive(Debug, Clone)]
pub struct HomoglyphTable {
    lookalikes: Vec<char>,
}

impl Default for HomoglyphTable {
    fn default() -> Self {
        Self::new(&default_homoglyphs())
    }
}

impl HomoglyphTable {
    pub fn new(map: &BTreeMap<char, Vec<char>>) -> Self {
        let mut lookalikes: Vec<char> = Vec::new();
        for glyph in map.values().flatten() {
            if !lookalikes.contains(glyph) {
                lookalikes.push(*glyph);
            }
        }
        Self { lookalikes }
    }

    pub fn is_lookalike(&self, ch: char) -> bool {
        self.lookalikes.contains(&ch)
    }

    /// Every character outside printable ASCII, or listed in the table, in
    /// order of first appearance and without repeats. Tab is allowed since
    /// unfolded header values keep their folding whitespace.
    pub fn matches(&self, value: &str) -> Vec<char> {
        let mut hits = Vec::new();
        for ch in value.chars() {
            let unprintable = ch != '\t' && !(' '..='~').contains(&ch);
            if (unprintable || self.is_lookalike(ch)) && !hits.contains(&ch) {
                hits.push(ch);
            }
        }
        hits
    }

    /// Mixed-script word check: ASCII letters next to non-ASCII letters.
    ///
    /// Digit and punctuation swaps are ignored here; in running text they
    /// are ordinary characters.
    pub fn word_matches(&self, word: &str) -> Vec<char> {
        if !word.chars().any(|c| c.is_ascii_alphabetic()) {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for ch in word.chars() {
            let foreign_letter = !ch.is_ascii() && (ch.is_alphabetic() || self.is_lookalike(ch));
            if foreign_letter && !hits.contains(&ch) {
                hits.push(ch);
            }
        }
        hits
    }
}
