//! A communication channel used to send/receive messages to/from the other party.

use std::{fmt, future::Future, time::Duration};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tokio::{
    sync::mpsc::{Receiver, Sender, channel, error::SendError},
    time::timeout,
};
use tracing::trace;

use crate::utils::{deserialize, serialize};

/// Errors related to sending / receiving / (de-)serializing messages.
#[derive(Debug, Error)]
#[error("channel error during {phase}: {reason:?}")]
pub struct Error {
    /// The protocol phase during which the error occurred.
    pub phase: String,
    /// The specific error that was raised.
    pub reason: ErrorKind,
}

/// The specific error that occurred when trying to send / receive a message.
#[derive(Debug)]
pub enum ErrorKind {
    /// The (serialized) message could not be received over the channel.
    RecvError(String),
    /// The (serialized) message could not be sent over the channel.
    SendError(String),
    /// The message could not be (de-)serialized.
    SerdeError(String),
    /// The message is a Vec, but not of the expected length.
    InvalidLength,
}

/// A bidirectional, ordered byte channel between the two parties of a protocol.
///
/// Implementations must deliver messages in the order they were sent. Any failure is
/// reported as an error and aborts the running protocol.
pub trait Channel {
    /// The error that can occur sending messages over the channel.
    type SendError: fmt::Debug;
    /// The error that can occur receiving messages over the channel.
    type RecvError: fmt::Debug;

    /// Sends a message to the other party.
    fn send_bytes(
        &mut self,
        msg: Vec<u8>,
    ) -> impl Future<Output = Result<(), Self::SendError>> + Send;

    /// Awaits the next message from the other party.
    fn recv_bytes(&mut self) -> impl Future<Output = Result<Vec<u8>, Self::RecvError>> + Send;
}

/// Serializes and sends a protocol message to the other party.
pub(crate) async fn send_to(
    channel: &mut impl Channel,
    phase: &str,
    msg: &(impl Serialize + ?Sized),
) -> Result<(), Error> {
    let msg = serialize(msg).map_err(|e| Error {
        phase: format!("sending {phase}"),
        reason: ErrorKind::SerdeError(format!("{e:?}")),
    })?;
    channel.send_bytes(msg).await.map_err(|e| Error {
        phase: phase.to_string(),
        reason: ErrorKind::SendError(format!("{e:?}")),
    })
}

/// Receives and deserializes a protocol message from the other party.
pub(crate) async fn recv_from<T: DeserializeOwned>(
    channel: &mut impl Channel,
    phase: &str,
) -> Result<T, Error> {
    let msg = channel.recv_bytes().await.map_err(|e| Error {
        phase: phase.to_string(),
        reason: ErrorKind::RecvError(format!("{e:?}")),
    })?;
    deserialize(&msg).map_err(|e| Error {
        phase: format!("receiving {phase}"),
        reason: ErrorKind::SerdeError(format!("{e:?}")),
    })
}

/// Receives and deserializes a Vec from the other party (while checking the length).
pub(crate) async fn recv_vec_from<T: DeserializeOwned>(
    channel: &mut impl Channel,
    phase: &str,
    len: usize,
) -> Result<Vec<T>, Error> {
    let v: Vec<T> = recv_from(channel, phase).await?;
    if v.len() == len {
        Ok(v)
    } else {
        Err(Error {
            phase: phase.to_string(),
            reason: ErrorKind::InvalidLength,
        })
    }
}

/// An in-memory channel using tokio's bounded [`Sender`] and [`Receiver`].
#[derive(Debug)]
pub struct SimpleChannel {
    s: Sender<Vec<u8>>,
    r: Receiver<Vec<u8>>,
}

impl SimpleChannel {
    /// Creates the two connected ends of a channel, one for each party.
    pub fn pair() -> (Self, Self) {
        let buffer_capacity = 1024;
        let (send_a_to_b, recv_a_to_b) = channel(buffer_capacity);
        let (send_b_to_a, recv_b_to_a) = channel(buffer_capacity);
        let a = SimpleChannel {
            s: send_a_to_b,
            r: recv_b_to_a,
        };
        let b = SimpleChannel {
            s: send_b_to_a,
            r: recv_a_to_b,
        };
        (a, b)
    }
}

#[derive(Debug)]
/// The error raised by `recv` calls of a [`SimpleChannel`].
pub enum AsyncRecvError {
    /// The channel has been closed.
    Closed,
    /// No message was received before the timeout.
    TimeoutElapsed,
    /// A chunk without a valid chunk header was received.
    MalformedChunk,
}

impl Channel for SimpleChannel {
    type SendError = SendError<Vec<u8>>;
    type RecvError = AsyncRecvError;

    async fn send_bytes(&mut self, msg: Vec<u8>) -> Result<(), SendError<Vec<u8>>> {
        let kb = msg.len() as f64 / 1024.0;
        trace!(size_kb = format!("{kb:.2}"), "sending msg");
        let chunk_size = 100 * 1024 * 1024;
        let mut chunks: Vec<_> = msg.chunks(chunk_size).collect();
        if chunks.is_empty() {
            chunks.push(&[]);
        }
        let length = chunks.len();
        for (i, chunk) in chunks.into_iter().enumerate() {
            if length > 1 {
                trace!(chunk = i + 1, chunks = length, "sending chunk");
            }
            let mut msg = Vec::with_capacity(2 * 4 + chunk.len());
            msg.extend((i as u32).to_be_bytes());
            msg.extend((length as u32).to_be_bytes());
            msg.extend(chunk);
            self.s.send(msg).await?;
        }
        Ok(())
    }

    async fn recv_bytes(&mut self) -> Result<Vec<u8>, AsyncRecvError> {
        let mut msg: Vec<u8> = vec![];
        loop {
            let chunk = match timeout(Duration::from_secs(10 * 60), self.r.recv()).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => return Err(AsyncRecvError::Closed),
                Err(_) => return Err(AsyncRecvError::TimeoutElapsed),
            };
            if chunk.len() < 8 {
                return Err(AsyncRecvError::MalformedChunk);
            }
            let i = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            let length = u32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
            msg.extend(&chunk[8..]);
            if i + 1 >= length {
                break Ok(msg);
            }
        }
    }
}
