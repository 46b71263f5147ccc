//! Split generated text into short speakable pieces.

const SENTENCE_ENDINGS: &[char] = &['。', '！', '？', '!', '?', '；', ';'];
const SOFT_BREAKS: &[char] = &['，', ',', '、', ' ', '\n', '\t'];
/// A sentence ending only closes a chunk once this much non-blank text is buffered.
const MIN_SENTENCE_CHARS: usize = 4;

pub const DEFAULT_TARGET_CHUNK_CHARS: usize = 22;
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 36;
const MIN_TARGET_CHUNK_CHARS: usize = 8;

/// Incremental chunker: feed text as it arrives, flush the tail at the end.
///
/// Lengths are counted in characters, not bytes.
#[derive(Debug, Clone)]
pub struct TextChunker {
    target_chars: usize,
    max_chars: usize,
    buffer: String,
    buffered_chars: usize,
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_CHUNK_CHARS, DEFAULT_MAX_CHUNK_CHARS)
    }
}

impl TextChunker {
    pub fn new(target_chars: usize, max_chars: usize) -> Self {
        let target_chars = target_chars.max(MIN_TARGET_CHUNK_CHARS);
        Self {
            target_chars,
            max_chars: max_chars.max(target_chars),
            buffer: String::new(),
            buffered_chars: 0,
        }
    }

    pub fn feed(&mut self, delta: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        for ch in delta.chars() {
            self.buffer.push(ch);
            self.buffered_chars += 1;

            let boundary = (SENTENCE_ENDINGS.contains(&ch)
                && self.buffer.trim().chars().count() >= MIN_SENTENCE_CHARS)
                || (self.buffered_chars >= self.target_chars && SOFT_BREAKS.contains(&ch))
                || self.buffered_chars >= self.max_chars;
            if boundary {
                let chunk = self.take_buffer();
                if !chunk.is_empty() {
                    chunks.push(chunk);
                }
            }
        }
        chunks
    }

    /// Whatever is left, trimmed. Empty when nothing is buffered.
    pub fn flush(&mut self) -> String {
        self.take_buffer()
    }

    fn take_buffer(&mut self) -> String {
        let chunk = self.buffer.trim().to_string();
        self.buffer.clear();
        self.buffered_chars = 0;
        chunk
    }
}

/// Chunk a complete reply in one go.
pub fn chunk_text(text: &str) -> Vec<String> {
    let mut chunker = TextChunker::default();
    let mut chunks = chunker.feed(text);
    let tail = chunker.flush();
    if !tail.is_empty() {
        chunks.push(tail);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_endings() {
        let mut chunker = TextChunker::new(10, 20);
        assert_eq!(
            chunker.feed("你在写代码。看起来快完成了！"),
            vec!["你在写代码。", "看起来快完成了！"]
        );
    }

    #[test]
    fn unterminated_text_waits_for_flush() {
        let mut chunker = TextChunker::new(12, 24);
        assert!(chunker.feed("这个句子没有结尾标点").is_empty());
        assert_eq!(chunker.flush(), "这个句子没有结尾标点");
        assert_eq!(chunker.flush(), "");
    }

    #[test]
    fn short_exclamations_stay_buffered() {
        let mut chunker = TextChunker::default();
        assert!(chunker.feed("嗯！").is_empty());
        assert_eq!(chunker.feed("好的，我们继续吧。"), vec!["嗯！好的，我们继续吧。"]);
    }

    #[test]
    fn soft_break_after_target_and_hard_cap() {
        let mut chunker = TextChunker::new(8, 12);
        assert_eq!(
            chunker.feed("abcdefgh, ijklmnopqrstuvwxyz"),
            vec!["abcdefgh,", "ijklmnopqrs"]
        );
        assert_eq!(chunker.flush(), "tuvwxyz");
    }

    #[test]
    fn target_is_floored() {
        let mut chunker = TextChunker::new(1, 2);
        assert!(chunker.feed("a b c d").is_empty());
    }

    #[test]
    fn chunk_text_includes_tail() {
        assert_eq!(chunk_text("第一句。第二句没完"), vec!["第一句。", "第二句没完"]);
    }
}
