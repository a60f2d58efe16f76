// Splits raw child output into logical lines
//
// Downloaders redraw their progress line with a bare `\r`, so `\r`, `\n` and
// `\r\n` all terminate a line. The unterminated tail of each chunk is held
// back until the next chunk (or `finish`) completes it.

#[derive(Debug, Default)]
pub struct LineSplitter {
    pending: Vec<u8>,
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completed (trimmed, non-empty)
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        for (index, byte) in chunk.iter().enumerate() {
            if *byte == b'\r' || *byte == b'\n' {
                self.pending.extend_from_slice(&chunk[start..index]);
                if let Some(line) = take_line(&mut self.pending) {
                    lines.push(line);
                }
                start = index + 1;
            }
        }
        self.pending.extend_from_slice(&chunk[start..]);

        lines
    }

    /// Flush the held-back tail once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        take_line(&mut self.pending)
    }
}

fn take_line(buffer: &mut Vec<u8>) -> Option<String> {
    // decoded only once complete, so multi-byte characters split across chunks survive
    let line = String::from_utf8_lossy(buffer).trim().to_string();
    buffer.clear();
    if line.is_empty() {
        None
    } else {
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_all(chunks: &[&[u8]]) -> Vec<String> {
        let mut splitter = LineSplitter::new();
        let mut lines = Vec::new();
        for chunk in chunks {
            lines.extend(splitter.push(chunk));
        }
        lines.extend(splitter.finish());
        lines
    }

    #[test]
    fn test_mixed_line_endings_any_two_chunk_boundaries() {
        let input = b"abc\r\ndef\rghi\n";
        for first in 0..=input.len() {
            for second in first..=input.len() {
                let lines = split_all(&[&input[..first], &input[first..second], &input[second..]]);
                assert_eq!(lines, vec!["abc", "def", "ghi"], "split at {} / {}", first, second);
            }
        }
    }

    #[test]
    fn test_blank_lines_dropped_and_lines_trimmed() {
        let lines = split_all(&[b"  first  \n\n\r\n   \rsecond\n"]);
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn test_partial_tail_held_until_finish() {
        let mut splitter = LineSplitter::new();
        assert_eq!(splitter.push(b"[download] 10% (frag 1"), Vec::<String>::new());
        assert_eq!(splitter.push(b"/10)\r[down"), vec!["[download] 10% (frag 1/10)"]);
        assert_eq!(splitter.finish().as_deref(), Some("[down"));
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_whitespace_tail_not_flushed() {
        let mut splitter = LineSplitter::new();
        splitter.push(b"done\n   ");
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_multibyte_character_across_chunks() {
        let text = "Destination: /out/Café.mp4\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        let lines = split_all(&[&text[..split], &text[split..]]);
        assert_eq!(lines, vec!["Destination: /out/Café.mp4"]);
    }
}
