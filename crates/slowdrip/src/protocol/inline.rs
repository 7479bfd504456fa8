//! Inline command framing.
//!
//! Redis-compatible servers accept a command as a single space-separated line
//! terminated by CRLF, without the array/bulk-string envelope:
//!
//! ```text
//! GET key_1\r\n
//! ```
//!
//! The slow-read phase writes exactly this and never reads the reply.

use bytes::{BufMut, Bytes, BytesMut};

const CRLF: &[u8] = b"\r\n";

/// Frames `op` and its arguments as one inline command line.
pub fn encode_inline(op: &str, args: &[&str]) -> Bytes {
    let len = op.len() + args.iter().map(|a| a.len() + 1).sum::<usize>() + CRLF.len();
    let mut buf = BytesMut::with_capacity(len);
    buf.put_slice(op.as_bytes());
    for arg in args {
        buf.put_u8(b' ');
        buf.put_slice(arg.as_bytes());
    }
    buf.put_slice(CRLF);
    buf.freeze()
}

pub fn inline_get(key: &str) -> Bytes {
    encode_inline("GET", &[key])
}
