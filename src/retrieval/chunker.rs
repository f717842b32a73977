use uuid::Uuid;

/// Text chunk produced by the chunker.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Unique chunk id
    pub id: Uuid,
    /// Raw text of the chunk
    pub text: String,
    /// Unit index of the first character/word
    pub start: usize,
    /// Unit index after the last character/word
    pub end: usize,
    /// Source label (file path, document name)
    pub source: String,
}

impl Chunk {
    pub fn new(text: String, start: usize, end: usize, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            start,
            end,
            source: source.into(),
        }
    }
}

/// Chunking strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkingStrategy {
    /// Split by characters with overlap (default, suits unsegmented Chinese)
    Characters,
    /// Split by whitespace-separated words with overlap
    Words,
}

/// Simple chunker with overlap.
#[derive(Debug, Clone)]
pub struct Chunker {
    size: usize,
    overlap: usize,
    strategy: ChunkingStrategy,
}

impl Chunker {
    /// Create a new character chunker.
    pub fn new(size: usize, overlap: usize) -> Self {
        Self::with_strategy(size, overlap, ChunkingStrategy::Characters)
    }

    /// Create with custom strategy.
    pub fn with_strategy(size: usize, overlap: usize, strategy: ChunkingStrategy) -> Self {
        Self {
            size: size.max(1),
            overlap: overlap.min(size.saturating_sub(1)),
            strategy,
        }
    }

    /// Split text into overlapping chunks.
    pub fn chunk(&self, text: &str, source: impl Into<String>) -> Vec<Chunk> {
        let source = source.into();
        match self.strategy {
            ChunkingStrategy::Characters => {
                let chars: Vec<char> = text.trim().chars().collect();
                self.windows(&chars, source, |units| {
                    units.iter().collect::<String>().trim().to_string()
                })
            }
            ChunkingStrategy::Words => {
                let words: Vec<&str> = text.split_whitespace().collect();
                self.windows(&words, source, |units| units.join(" "))
            }
        }
    }

    fn windows<T, F>(&self, units: &[T], source: String, join: F) -> Vec<Chunk>
    where
        F: Fn(&[T]) -> String,
    {
        if units.is_empty() {
            return Vec::new();
        }

        let step = self.size.saturating_sub(self.overlap).max(1);
        let mut chunks = Vec::new();
        let mut idx = 0;

        while idx < units.len() {
            let end = (idx + self.size).min(units.len());
            let text = join(&units[idx..end]);
            if !text.is_empty() {
                chunks.push(Chunk::new(text, idx, end, source.clone()));
            }

            if end == units.len() {
                break;
            }
            idx += step;
        }

        chunks
    }
}
