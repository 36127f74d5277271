// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The post-processing hook is the extension point a real device driver would
//! use to speak a framed binary protocol over the same line-oriented transport.
//! This is a synthetic example only: a reply is framed as `payload + XOR checksum
//! byte`, both hex-encoded onto the wire. A correct checksum decodes to the
//! payload; a corrupted one fails the request without poisoning the queue.

use std::time::Duration;

use tokio::io::split;
use tokio_util::sync::CancellationToken;

use hamjab_hub::line_session::LineSession;
use hamjab_hub::queued_sender::{PostProcessor, ProtocolError, QueuedLineSender, SendError, SendOutcome};

fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

fn frame(payload: &str) -> String {
    let mut bytes = payload.as_bytes().to_vec();
    let checksum = xor_checksum(&bytes);
    bytes.push(checksum);
    hex::encode(&bytes)
}

/// Minimal hex codec so this test doesn't pull in a real framing implementation
/// for a device this crate will never ship support for.
mod hex {
    pub fn encode(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
    }
}

fn checksum_framed_post_processor() -> PostProcessor {
    std::sync::Arc::new(|line: &str| {
        let bytes = hex::decode(line).ok_or_else(|| ProtocolError("malformed hex frame".to_owned()))?;
        let (payload, checksum) = bytes.split_at(bytes.len().saturating_sub(1));
        let expected = xor_checksum(payload);
        if checksum.first().copied() != Some(expected) {
            return Err(ProtocolError("invalid checksum received".to_owned()));
        }
        String::from_utf8(payload.to_vec()).map_err(|_| ProtocolError("non-utf8 payload".to_owned()))
    })
}

#[tokio::test]
async fn correctly_checksummed_reply_decodes_to_its_payload() {
    let (a, mut peer) = tokio::io::duplex(4096);
    let (r, w) = split(a);
    let session = LineSession::new(r, w, "\r", "\r");
    let (sender, _join) =
        QueuedLineSender::spawn(session, Duration::from_secs(1), checksum_framed_post_processor(), None, CancellationToken::new());

    let send_fut = sender.send("STATUS", Some(Duration::from_secs(1)));
    let responder = async {
        use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
        let mut buf = [0u8; 64];
        let n = peer.read(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf[..n]).contains("STATUS"));
        peer.write_all(format!("{}\r", frame("ON")).as_bytes()).await.unwrap();
    };

    let (result, _) = tokio::join!(send_fut, responder);
    assert_eq!(result, Ok(SendOutcome::Line("ON".to_owned())));
}

#[tokio::test]
async fn corrupted_checksum_fails_the_request_without_poisoning_the_queue() {
    let (a, mut peer) = tokio::io::duplex(4096);
    let (r, w) = split(a);
    let session = LineSession::new(r, w, "\r", "\r");
    let (sender, _join) =
        QueuedLineSender::spawn(session, Duration::from_secs(1), checksum_framed_post_processor(), None, CancellationToken::new());

    // Flip the last hex digit of the checksum byte to corrupt it.
    let mut good_frame = frame("ON");
    let last = good_frame.pop().unwrap();
    good_frame.push(if last == 'f' { '0' } else { 'f' });

    let send_fut = sender.send("STATUS", Some(Duration::from_secs(1)));
    let responder = async {
        use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
        let mut buf = [0u8; 64];
        let _n = peer.read(&mut buf).await.unwrap();
        peer.write_all(format!("{good_frame}\r").as_bytes()).await.unwrap();
    };

    let (result, _) = tokio::join!(send_fut, responder);
    assert_eq!(result, Err(SendError::Protocol(ProtocolError("invalid checksum received".to_owned()))));

    // The slot is free again: the next request is not blocked by the failure above.
    let send_fut = sender.send("STATUS", Some(Duration::from_secs(1)));
    let responder = async {
        use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
        let mut buf = [0u8; 64];
        let _n = peer.read(&mut buf).await.unwrap();
        peer.write_all(format!("{}\r", frame("OFF")).as_bytes()).await.unwrap();
    };
    let (result, _) = tokio::join!(send_fut, responder);
    assert_eq!(result, Ok(SendOutcome::Line("OFF".to_owned())));
}
