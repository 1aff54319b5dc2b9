//! Fixed-size sliding-window chunking over document text.

use crate::error::{RagError, Result};

/// Splits `text` into overlapping windows of at most `chunk_size` characters.
///
/// Windows start at offset 0 and each subsequent window starts `overlap`
/// characters before the previous one ended. The final window may be shorter
/// than `chunk_size`. Offsets count `char`s, so multi-byte code points are
/// never split.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<&str>> {
    validate_params(chunk_size, overlap)?;
    if text.is_empty() {
        return Ok(Vec::new());
    }

    // Byte offset of every char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut chunks = Vec::with_capacity(char_len / (chunk_size - overlap) + 1);
    let mut start = 0usize;
    loop {
        let end = (start + chunk_size).min(char_len);
        chunks.push(&text[boundaries[start]..boundaries[end]]);
        if end == char_len {
            break;
        }
        start = end - overlap;
    }
    Ok(chunks)
}

/// Checks `chunk_size > 0` and `overlap < chunk_size`.
pub fn validate_params(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidArgument(
            "chunk_size must be > 0".to_string(),
        ));
    }
    if overlap >= chunk_size {
        return Err(RagError::InvalidArgument(format!(
            "overlap ({overlap}) must be < chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}
