//! Expansion of printf-style output into bytes.
//!
//! The platform hands over a format string plus arguments; expansion is done
//! by a `vsnprintf`-like writer. A fixed stack scratch covers ordinary lines,
//! longer output is expanded again into a heap buffer of the exact size, so
//! nothing is ever truncated.

use thiserror::Error;

/// Stack scratch size for the first expansion pass.
pub const SCRATCH_LEN: usize = 256;

/// Format expansion errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The writer reported a negative size.
    #[error("format expansion failed with code {0}")]
    Failed(i32),
}

/// Expand with `write` and hand the bytes to `consume`.
///
/// `write` follows `vsnprintf` semantics: it fills at most `buf.len() - 1`
/// bytes plus a NUL and returns the full length the output needs, or a
/// negative value on failure. It is called a second time only when the output
/// does not fit the scratch buffer.
pub fn expand<W, C, R>(mut write: W, consume: C) -> Result<R, FormatError>
where
    W: FnMut(&mut [u8]) -> i32,
    C: FnOnce(&[u8]) -> R,
{
    let mut scratch = [0u8; SCRATCH_LEN];
    let size = write(&mut scratch);
    let len = usize::try_from(size).map_err(|_| FormatError::Failed(size))?;

    if len < SCRATCH_LEN {
        return Ok(consume(&scratch[..len]));
    }

    let mut dynamic = vec![0u8; len + 1];
    let again = write(&mut dynamic);
    let written = usize::try_from(again).map_err(|_| FormatError::Failed(again))?;

    Ok(consume(&dynamic[..written.min(len)]))
}

/// `vsnprintf`-style writer over an already formatted string.
///
/// Used where the text is produced by Rust formatting rather than C.
pub fn snprintf_writer(text: &str) -> impl FnMut(&mut [u8]) -> i32 + '_ {
    move |buf: &mut [u8]| {
        let bytes = text.as_bytes();
        if let Some(room) = buf.len().checked_sub(1) {
            let n = bytes.len().min(room);
            buf[..n].copy_from_slice(&bytes[..n]);
            buf[n] = 0;
        }
        i32::try_from(bytes.len()).unwrap_or(-1)
    }
}
