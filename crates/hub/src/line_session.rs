// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framed line I/O over a byte stream (C1).
//!
//! Accumulates inbound bytes into a buffer and emits one complete line at a time,
//! split on a configurable delimiter. Writes append a (possibly different) outbound
//! delimiter. Empty lines are dropped silently, matching devices that echo `\r\n`
//! when only `\r` is expected.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use unicode_normalization::UnicodeNormalization;

/// Framed line reader/writer over split halves of a byte stream.
///
/// Generic over the read/write halves so that both real `TcpStream` halves and
/// in-memory `tokio::io::duplex` halves (used in tests to script arbitrary byte
/// fragmentation) can drive the same framing logic.
pub struct LineSession<R, W> {
    read: R,
    write: W,
    inbound_delim: Vec<u8>,
    outbound_delim: Vec<u8>,
    buf: Vec<u8>,
}

impl<R, W> LineSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(read: R, write: W, inbound_delim: impl Into<Vec<u8>>, outbound_delim: impl Into<Vec<u8>>) -> Self {
        Self { read, write, inbound_delim: inbound_delim.into(), outbound_delim: outbound_delim.into(), buf: Vec::new() }
    }

    /// Read until the next complete, non-empty line is available.
    ///
    /// Returns `Ok(None)` on clean EOF with no partial line pending.
    pub async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(pos) = find_subslice(&self.buf, &self.inbound_delim) {
                let rest = self.buf.split_off(pos + self.inbound_delim.len());
                let mut line_bytes = std::mem::replace(&mut self.buf, rest);
                line_bytes.truncate(pos);
                if line_bytes.is_empty() {
                    continue;
                }
                return Ok(Some(String::from_utf8_lossy(&line_bytes).into_owned()));
            }

            let mut chunk = [0u8; 4096];
            let n = self.read.read(&mut chunk).await?;
            if n == 0 {
                return Ok(None);
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Write one line, coercing it to ASCII and appending the outbound delimiter.
    pub async fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let ascii = to_ascii(line);
        self.write.write_all(ascii.as_bytes()).await?;
        self.write.write_all(&self.outbound_delim).await?;
        self.write.flush().await
    }
}

/// Coerce a payload to ASCII: NFKD-normalize first so a combining accent
/// separates from its base letter, then drop whatever still isn't ASCII.
///
/// Device protocols are ASCII; this keeps a stray multibyte character from
/// corrupting the wire framing of an otherwise well-formed command while
/// still letting the base letter of an accented character through.
fn to_ascii(line: &str) -> String {
    line.nfkd().filter(char::is_ascii).collect()
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}
