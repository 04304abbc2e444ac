use crate::error::IngestError;
use crate::models::ChunkingConfig;

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Splits `text` into ordered character windows of `chunk_chars`, each
/// window starting `chunk_chars - overlap_chars` after the previous one.
/// The last chunk may be shorter. Empty input yields an empty sequence.
///
/// Concatenating the first chunk with every later chunk minus its
/// `overlap_chars`-long prefix reproduces `text` exactly.
pub fn chunk_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>, IngestError> {
    if config.chunk_chars == 0 {
        return Err(IngestError::InvalidChunkConfig(
            "chunk size must be positive".to_string(),
        ));
    }
    if config.overlap_chars >= config.chunk_chars {
        return Err(IngestError::InvalidChunkConfig(format!(
            "overlap {} must be smaller than chunk size {}",
            config.overlap_chars, config.chunk_chars
        )));
    }

    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }

    let step = config.chunk_chars - config.overlap_chars;
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + config.chunk_chars).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut text = String::new();
        for (index, chunk) in chunks.iter().enumerate() {
            if index == 0 {
                text.push_str(chunk);
            } else {
                text.extend(chunk.chars().skip(overlap));
            }
        }
        text
    }

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        assert_eq!(normalize_whitespace(input), "A lot of spacing");
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let config = ChunkingConfig {
            chunk_chars: 10,
            overlap_chars: 2,
        };
        assert!(chunk_text("", config).unwrap().is_empty());
    }

    #[test]
    fn short_input_is_a_single_chunk() {
        let config = ChunkingConfig {
            chunk_chars: 100,
            overlap_chars: 10,
        };
        let chunks = chunk_text("short text", config).unwrap();
        assert_eq!(chunks, vec!["short text".to_string()]);
    }

    #[test]
    fn chunks_overlap_by_the_configured_amount() {
        let config = ChunkingConfig {
            chunk_chars: 8,
            overlap_chars: 3,
        };
        let chunks = chunk_text("abcdefghijklmnop", config).unwrap();
        assert_eq!(chunks[0], "abcdefgh");
        assert_eq!(chunks[1], "fghijklm");
        assert!(chunks[1].starts_with(&chunks[0][5..]));
    }

    #[test]
    fn reassembly_reproduces_the_input() {
        let config = ChunkingConfig {
            chunk_chars: 7,
            overlap_chars: 2,
        };
        let input = "The pressure relief valve opens at 250 psi during normal operation.";
        let chunks = chunk_text(input, config).unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(reassemble(&chunks, config.overlap_chars), input);
    }

    #[test]
    fn reassembly_handles_multibyte_characters() {
        let config = ChunkingConfig {
            chunk_chars: 5,
            overlap_chars: 1,
        };
        let input = "압력 밸브는 250psi에서 열립니다 — café naïve";
        let chunks = chunk_text(input, config).unwrap();
        assert_eq!(reassemble(&chunks, config.overlap_chars), input);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk_size() {
        let config = ChunkingConfig {
            chunk_chars: 5,
            overlap_chars: 5,
        };
        assert!(matches!(
            chunk_text("anything", config),
            Err(IngestError::InvalidChunkConfig(_))
        ));
    }
}
