//! wire
//!
//! Framing of checkout responses.
//!
//! # Format
//!
//! ```text
//! stream : "BAM\0" frame* payload
//! frame  : type u32 | size u32 | size bytes        (little endian)
//! ```
//!
//! A type-1 frame carries a UTF-8 status message. A type-2 frame header
//! starts the payload: everything after it, to the end of the stream, is a
//! zip archive of the checkout. Any other type is an error.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::archive::{self, ArchiveError};

/// Stream magic.
pub const MAGIC: &[u8; 4] = b"BAM\0";

/// Frame type of a status message.
pub const FRAME_MESSAGE: u32 = 1;

/// Frame type that starts the payload.
pub const FRAME_PAYLOAD: u32 = 2;

const HEADER_LEN: usize = 8;

/// Errors reading or writing a checkout stream.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("not a checkout stream (magic {found:02x?})")]
    BadMagic { found: Vec<u8> },

    #[error("stream ends inside a frame header ({got} of 8 bytes)")]
    TruncatedHeader { got: usize },

    #[error("stream ends inside a message ({got} of {expected} bytes)")]
    TruncatedMessage { expected: usize, got: usize },

    #[error("unknown frame type {0}")]
    UnknownFrame(u32),

    #[error("stream ended before the payload")]
    MissingPayload,

    #[error("message is not valid UTF-8")]
    InvalidText(#[from] std::string::FromUtf8Error),

    #[error("destination already exists: {0}")]
    DestinationExists(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Write the stream magic.
pub fn write_magic(out: &mut impl Write) -> io::Result<()> {
    out.write_all(MAGIC)
}

/// Write a status message frame.
pub fn write_message(out: &mut impl Write, text: &str) -> io::Result<()> {
    write_header(out, FRAME_MESSAGE, text.len())?;
    out.write_all(text.as_bytes())
}

/// Write the payload header followed by the payload.
pub fn write_payload(out: &mut impl Write, payload: &mut impl Read) -> io::Result<u64> {
    write_header(out, FRAME_PAYLOAD, 0)?;
    io::copy(payload, out)
}

fn write_header(out: &mut impl Write, kind: u32, size: usize) -> io::Result<()> {
    let size = u32::try_from(size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame too large"))?;
    out.write_all(&kind.to_le_bytes())?;
    out.write_all(&size.to_le_bytes())
}

/// Read as many bytes as available into `buf`, up to its length.
fn read_full(input: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match input.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(got)
}

/// Read a checkout stream, passing messages to `on_message` and copying the
/// payload to `payload`. Returns the payload size.
///
/// Nothing is written to `payload` unless the framing up to the payload is
/// valid.
pub fn read_checkout(
    input: &mut impl Read,
    payload: &mut impl Write,
    mut on_message: impl FnMut(&str),
) -> Result<u64, WireError> {
    let mut magic = [0u8; 4];
    let got = read_full(input, &mut magic)?;
    if got < magic.len() || &magic != MAGIC {
        return Err(WireError::BadMagic {
            found: magic[..got].to_vec(),
        });
    }

    loop {
        let mut header = [0u8; HEADER_LEN];
        match read_full(input, &mut header)? {
            0 => return Err(WireError::MissingPayload),
            HEADER_LEN => {}
            got => return Err(WireError::TruncatedHeader { got }),
        }
        let kind = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        match kind {
            FRAME_MESSAGE => {
                // The claimed size is not trusted for allocation.
                let mut body = Vec::new();
                let got = Read::take(&mut *input, size as u64).read_to_end(&mut body)?;
                if got < size {
                    return Err(WireError::TruncatedMessage {
                        expected: size,
                        got,
                    });
                }
                on_message(&String::from_utf8(body)?);
            }
            FRAME_PAYLOAD => return Ok(io::copy(input, payload)?),
            other => return Err(WireError::UnknownFrame(other)),
        }
    }
}

/// Read a checkout stream into a fresh directory `dest`.
///
/// The payload is staged in a temporary file and only extracted once the
/// stream has been read completely; on any error `dest` is not created.
pub fn checkout(
    input: &mut impl Read,
    dest: &Path,
    on_message: impl FnMut(&str),
) -> Result<Vec<PathBuf>, WireError> {
    if dest.exists() {
        return Err(WireError::DestinationExists(dest.to_path_buf()));
    }
    let staged = tempfile::NamedTempFile::new()?;
    {
        let mut out = BufWriter::new(File::create(staged.path())?);
        read_checkout(input, &mut out, on_message)?;
        out.flush()?;
    }
    extract_archive(staged.path(), dest)
}

/// Extract a checkout archive into `dest`, which must not exist yet.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>, WireError> {
    if dest.exists() {
        return Err(WireError::DestinationExists(dest.to_path_buf()));
    }
    fs::create_dir_all(dest)?;
    match archive::extract(archive_path, dest) {
        Ok(files) => Ok(files),
        Err(err) => {
            let _ = fs::remove_dir_all(dest);
            Err(err.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveWriter;
    use tempfile::TempDir;

    fn frame(kind: u32, body: &[u8]) -> Vec<u8> {
        let mut out = kind.to_le_bytes().to_vec();
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn messages_then_payload() {
        let mut stream = MAGIC.to_vec();
        write_message(&mut stream, "packing").unwrap();
        write_message(&mut stream, "done").unwrap();
        write_payload(&mut stream, &mut &b"ZIPDATA"[..]).unwrap();

        let mut messages = Vec::new();
        let mut payload: Vec<u8> = Vec::new();
        let size = read_checkout(&mut stream.as_slice(), &mut payload, |m| {
            messages.push(m.to_string())
        })
        .unwrap();

        assert_eq!(messages, vec!["packing", "done"]);
        assert_eq!(payload, b"ZIPDATA");
        assert_eq!(size, 7);
    }

    #[test]
    fn bad_magic() {
        let stream = b"HTTP/1.1 500".to_vec();
        let err = read_checkout(&mut stream.as_slice(), &mut io::sink(), |_| {}).unwrap_err();
        assert!(matches!(err, WireError::BadMagic { .. }));
    }

    #[test]
    fn truncated_header_and_body() {
        let mut stream = MAGIC.to_vec();
        stream.extend_from_slice(&[1, 0, 0]);
        let err = read_checkout(&mut stream.as_slice(), &mut io::sink(), |_| {}).unwrap_err();
        assert!(matches!(err, WireError::TruncatedHeader { got: 3 }));

        let mut stream = MAGIC.to_vec();
        let mut message = frame(FRAME_MESSAGE, b"hello");
        message.truncate(message.len() - 2);
        stream.extend_from_slice(&message);
        let err = read_checkout(&mut stream.as_slice(), &mut io::sink(), |_| {}).unwrap_err();
        assert!(matches!(
            err,
            WireError::TruncatedMessage {
                expected: 5,
                got: 3
            }
        ));
    }

    /// Reader that remembers the largest read it was asked for.
    struct Recording<'a> {
        inner: &'a [u8],
        largest: usize,
    }

    impl Read for Recording<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.largest = self.largest.max(buf.len());
            self.inner.read(buf)
        }
    }

    #[test]
    fn oversized_message_claim_is_not_preallocated() {
        let mut stream = MAGIC.to_vec();
        stream.extend_from_slice(&FRAME_MESSAGE.to_le_bytes());
        stream.extend_from_slice(&u32::MAX.to_le_bytes());
        stream.extend_from_slice(b"abc");
        let mut input = Recording {
            inner: &stream,
            largest: 0,
        };

        let err = read_checkout(&mut input, &mut io::sink(), |_| {}).unwrap_err();
        assert!(matches!(
            err,
            WireError::TruncatedMessage {
                expected,
                got: 3
            } if expected == u32::MAX as usize
        ));
        assert!(input.largest < 1 << 20, "read buffer of {} bytes", input.largest);
    }

    #[test]
    fn unknown_frame_writes_nothing() {
        let mut stream = MAGIC.to_vec();
        stream.extend_from_slice(&frame(7, b"??"));
        stream.extend_from_slice(&frame(FRAME_PAYLOAD, b""));
        let mut payload: Vec<u8> = Vec::new();
        let err = read_checkout(&mut stream.as_slice(), &mut payload, |_| {}).unwrap_err();
        assert!(matches!(err, WireError::UnknownFrame(7)));
        assert!(payload.is_empty());
    }

    #[test]
    fn stream_without_payload() {
        let mut stream = MAGIC.to_vec();
        stream.extend_from_slice(&frame(FRAME_MESSAGE, b"hi"));
        let err = read_checkout(&mut stream.as_slice(), &mut io::sink(), |_| {}).unwrap_err();
        assert!(matches!(err, WireError::MissingPayload));
    }

    #[test]
    fn checkout_extracts_into_new_directory() {
        let temp = TempDir::new().unwrap();
        let zip_path = temp.path().join("co.zip");
        let mut writer = ArchiveWriter::create(&zip_path).unwrap();
        writer.add_bytes("shot.blend", b"scene").unwrap();
        writer.add_bytes("data/sky.png", b"png").unwrap();
        writer.finish().unwrap();

        let mut stream = MAGIC.to_vec();
        write_message(&mut stream, "ok").unwrap();
        write_payload(&mut stream, &mut File::open(&zip_path).unwrap()).unwrap();

        let dest = temp.path().join("checkout");
        let files = checkout(&mut stream.as_slice(), &dest, |_| {}).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(fs::read(dest.join("data/sky.png")).unwrap(), b"png");

        let err = checkout(&mut stream.as_slice(), &dest, |_| {}).unwrap_err();
        assert!(matches!(err, WireError::DestinationExists(_)));
    }

    #[test]
    fn malformed_stream_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("checkout");
        let stream = b"BAM\0\x09\0\0\0\0\0\0\0".to_vec();
        assert!(checkout(&mut stream.as_slice(), &dest, |_| {}).is_err());
        assert!(!dest.exists());
    }
}
