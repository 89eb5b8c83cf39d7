//! Control commands — the tagged multipart messages of the Ferry protocol.
//!
//! The first frame of a control message is the command tag; payload frames
//! follow. Numeric payloads (`fetch` offset and length) travel as decimal
//! text, file names as UTF-8 text.
//!
//! Chunk replies are deliberately *not* a command: the registrar answers a
//! `fetch` with a single untagged frame of raw bytes, and the requester's
//! pull loop reads it as such. The loops disambiguate by context — while a
//! transfer is active, nothing else is on the wire (single-transfer-at-a-time
//! is a protocol property, not an accident).

use bytes::Bytes;

/// A tagged control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Requester → Registrar: register my identity. No payload.
    Connect,
    /// Registrar → Requester: identity recorded. No payload.
    Established,
    /// Registrar → Requester: a file is ready to be pulled.
    NewFile(String),
    /// Requester → Registrar: send `length` bytes starting at `offset`.
    Fetch { offset: u64, length: u32 },
    /// Requester → Registrar: the named artifact is ready on the relay.
    Download(String),
}

/// Errors that can arise when decoding a control message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("empty message")]
    Empty,

    #[error("unknown command tag: {0:?}")]
    UnknownTag(String),

    #[error("{0} command is missing its {1} frame")]
    MissingFrame(&'static str, &'static str),

    #[error("{0} is not valid UTF-8")]
    NotUtf8(&'static str),

    #[error("{0} is not a decimal number: {1:?}")]
    NotDecimal(&'static str, String),
}

impl Command {
    /// Encode to multipart frames, tag first.
    pub fn to_frames(&self) -> Vec<Bytes> {
        match self {
            Command::Connect => vec![Bytes::from_static(b"connect")],
            Command::Established => vec![Bytes::from_static(b"established")],
            Command::NewFile(name) => vec![
                Bytes::from_static(b"new_file"),
                Bytes::from(name.clone().into_bytes()),
            ],
            Command::Fetch { offset, length } => vec![
                Bytes::from_static(b"fetch"),
                Bytes::from(offset.to_string().into_bytes()),
                Bytes::from(length.to_string().into_bytes()),
            ],
            Command::Download(name) => vec![
                Bytes::from_static(b"download"),
                Bytes::from(name.clone().into_bytes()),
            ],
        }
    }

    /// Decode from multipart frames.
    pub fn from_frames(frames: &[Bytes]) -> Result<Self, CommandError> {
        let tag = frames.first().ok_or(CommandError::Empty)?;

        match tag.as_ref() {
            b"connect" => Ok(Command::Connect),
            b"established" => Ok(Command::Established),
            b"new_file" => {
                let name = text_frame(frames, 1, "new_file", "file name")?;
                Ok(Command::NewFile(name))
            }
            b"fetch" => {
                let offset = text_frame(frames, 1, "fetch", "offset")?;
                let length = text_frame(frames, 2, "fetch", "length")?;
                Ok(Command::Fetch {
                    offset: offset
                        .parse()
                        .map_err(|_| CommandError::NotDecimal("offset", offset))?,
                    length: length
                        .parse()
                        .map_err(|_| CommandError::NotDecimal("length", length))?,
                })
            }
            b"download" => {
                let name = text_frame(frames, 1, "download", "file name")?;
                Ok(Command::Download(name))
            }
            other => Err(CommandError::UnknownTag(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }
}

fn text_frame(
    frames: &[Bytes],
    index: usize,
    command: &'static str,
    field: &'static str,
) -> Result<String, CommandError> {
    let frame = frames
        .get(index)
        .ok_or(CommandError::MissingFrame(command, field))?;
    std::str::from_utf8(frame)
        .map(str::to_owned)
        .map_err(|_| CommandError::NotUtf8(field))
}
