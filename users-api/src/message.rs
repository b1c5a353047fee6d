use std::{io, net::SocketAddr};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::model::User;

const LINE_ENDINGS: &[char] = &['\n', '\r'];

pub type WorkerId = u32;

/// Messages a worker sends to the primary over its stdout pipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Ready {
        worker: WorkerId,
        pid: u32,
        addr: SocketAddr,
    },
    Snapshot {
        worker: WorkerId,
        users: Vec<User>,
    },
}

pub async fn read_message<R, T>(reader: &mut R) -> io::Result<Option<T>>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(LINE_ENDINGS);
        if trimmed.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str(trimmed).map_err(to_io_error)?;
        return Ok(Some(parsed));
    }
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    // One JSON document per line; flushed so the primary sees it right away.
    let mut encoded = serde_json::to_vec(message).map_err(to_io_error)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

fn to_io_error(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn decodes_tagged_lines_and_skips_blank_ones() {
        let input = concat!(
            "\r\n",
            r#"{"type":"ready","worker":2,"pid":4242,"addr":"127.0.0.1:4000"}"#,
            "\n",
            r#"{"type":"snapshot","worker":2,"users":[]}"#,
            "\n",
        );
        let mut reader = tokio::io::BufReader::new(input.as_bytes());

        let ready = read_message::<_, WorkerMessage>(&mut reader)
            .await
            .expect("read ready")
            .expect("ready line");
        assert_eq!(
            ready,
            WorkerMessage::Ready {
                worker: 2,
                pid: 4242,
                addr: "127.0.0.1:4000".parse().expect("socket addr"),
            }
        );

        let snapshot = read_message::<_, WorkerMessage>(&mut reader)
            .await
            .expect("read snapshot")
            .expect("snapshot line");
        assert_eq!(
            snapshot,
            WorkerMessage::Snapshot {
                worker: 2,
                users: Vec::new()
            }
        );

        let end = read_message::<_, WorkerMessage>(&mut reader)
            .await
            .expect("read eof");
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn garbage_lines_are_invalid_data() {
        let mut reader = tokio::io::BufReader::new(&b"not json\n"[..]);
        let error = read_message::<_, WorkerMessage>(&mut reader)
            .await
            .expect_err("garbage should not decode");
        assert_eq!(error.kind(), io::ErrorKind::InvalidData);
    }
}
