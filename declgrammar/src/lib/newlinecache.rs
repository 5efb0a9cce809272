/// Maps byte offsets in an input to 1-based `(line, column)` pairs. Columns count characters,
/// with `\r\n` treated as a single line terminator.
pub struct NewlineCache {
    /// Byte offsets of the start of every line. The first line always starts at 0.
    newlines: Vec<usize>,
    trailing_bytes: usize,
}

impl Default for NewlineCache {
    fn default() -> NewlineCache {
        NewlineCache {
            newlines: vec![0],
            trailing_bytes: 0,
        }
    }
}

impl NewlineCache {
    /// Create a cache for the whole of `src`.
    pub fn from_str(src: &str) -> Self {
        let mut cache = NewlineCache::default();
        cache.feed(src);
        cache
    }

    /// Feed more input into the cache. `src` is treated as if it were concatenated with all
    /// previous calls to `feed`.
    pub fn feed(&mut self, src: &str) {
        let start_pos = self.input_length();
        for (offset, c) in src.char_indices() {
            if c == '\n' {
                self.trailing_bytes = 0;
                self.newlines.push(start_pos + offset + 1);
            } else {
                self.trailing_bytes += c.len_utf8();
            }
        }
    }

    /// Total known input length.
    fn input_length(&self) -> usize {
        self.newlines.last().unwrap() + self.trailing_bytes
    }

    /// How many lines have been seen so far (an empty input has one line).
    pub fn lines_len(&self) -> usize {
        self.newlines.len()
    }

    /// Convert a byte offset in the input to a 1-based line number. Returns `None` if the byte
    /// offset exceeds the known input length.
    pub fn byte_to_line_num(&self, byte: usize) -> Option<usize> {
        if byte > self.input_length() {
            return None;
        }
        // `newlines` is sorted, so the line is the number of line starts at or before `byte`.
        Some(self.newlines.partition_point(|&line_off| line_off <= byte))
    }

    /// Convert `byte` to a 1-based `(line, column)` pair. `src` must be the concatenation of
    /// everything passed to `feed`. Returns `None` if the byte offset exceeds the known input
    /// length or if `src` and the known input length differ.
    pub fn byte_to_line_and_col(&self, src: &str, byte: usize) -> Option<(usize, usize)> {
        if byte > self.input_length() || src.len() != self.input_length() {
            return None;
        }

        let line_num = self.byte_to_line_num(byte)?;
        let line_byte = self.newlines[line_num - 1];
        let mut column = 1;
        let mut skip_char = None;
        for (c_off, c) in src[line_byte..].char_indices() {
            if line_byte + c_off == byte {
                break;
            }
            if Some(c) != skip_char {
                column += 1;
            }
            skip_char = if c == '\r' { Some('\n') } else { None };
        }
        // A `\r` immediately followed by its `\n` is one terminator: don't count the `\n`.
        if byte > line_byte && skip_char.is_some() && src[byte..].starts_with('\n') {
            column -= 1;
        }
        Some((line_num, column))
    }

    /// Return the text of the line containing `byte` (without its terminator).
    pub fn line_str<'a>(&self, src: &'a str, byte: usize) -> Option<&'a str> {
        let line_num = self.byte_to_line_num(byte)?;
        let st = self.newlines[line_num - 1];
        let en = self
            .newlines
            .get(line_num)
            .map(|x| x - 1)
            .unwrap_or_else(|| src.len());
        Some(src[st..en].trim_end_matches('\r'))
    }
}
