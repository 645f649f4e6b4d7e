//! Conversion between axum WebSocket messages and hub frames.

use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message};
use tickcast_hub::Frame;

/// Converts an outbound hub frame to an axum message.
#[must_use]
pub fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(bytes) => match std::str::from_utf8(&bytes) {
            Ok(text) => Message::Text(text.into()),
            Err(_) => Message::Binary(bytes),
        },
        Frame::Binary(bytes) => Message::Binary(bytes),
        Frame::Ping(bytes) => Message::Ping(bytes),
        Frame::Pong(bytes) => Message::Pong(bytes),
        Frame::Close(reason) => Message::Close(reason.map(|reason| CloseFrame {
            code: reason.code(),
            reason: reason.description().into(),
        })),
    }
}

/// Converts an inbound axum message to a hub frame.
#[must_use]
pub fn from_message(message: Message) -> Frame {
    match message {
        Message::Text(text) => Frame::Text(Bytes::copy_from_slice(text.as_str().as_bytes())),
        Message::Binary(bytes) => Frame::Binary(bytes),
        Message::Ping(bytes) => Frame::Ping(bytes),
        Message::Pong(bytes) => Frame::Pong(bytes),
        Message::Close(_) => Frame::Close(None),
    }
}
