//! Decoding of the Firebase REST streaming protocol (`text/event-stream`).

use async_stream::try_stream;
use futures::{Stream, StreamExt, pin_mut};
use reqwest::Response;

use super::error::{FirebaseDaoError, FirebaseResult};

/// One server-sent event received from the streaming endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct StreamFrame {
    pub event: String,
    pub data: String,
}

/// What a frame means for the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FrameKind {
    /// `put` or `patch`: data under the watched path changed.
    Changed,
    KeepAlive,
    /// `cancel` or `auth_revoked`: the server will not send anything else.
    Closed,
    Unknown,
}

impl StreamFrame {
    pub fn kind(&self) -> FrameKind {
        match self.event.as_str() {
            "put" | "patch" => FrameKind::Changed,
            "keep-alive" => FrameKind::KeepAlive,
            "cancel" | "auth_revoked" => FrameKind::Closed,
            _ => FrameKind::Unknown,
        }
    }
}

/// Accumulates raw chunks and yields complete frames as their terminating blank line arrives.
#[derive(Debug, Default)]
pub(super) struct FrameBuffer {
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        self.pending
            .extend(chunk.iter().copied().filter(|byte| *byte != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = self
            .pending
            .windows(2)
            .position(|window| window == b"\n\n")
        {
            let block: Vec<u8> = self.pending.drain(..end + 2).collect();
            if let Some(frame) = parse_block(&String::from_utf8_lossy(&block)) {
                frames.push(frame);
            }
        }
        frames
    }
}

fn parse_block(block: &str) -> Option<StreamFrame> {
    let mut event = None;
    let mut data = String::new();
    for line in block.lines() {
        if let Some(value) = line.strip_prefix("event:") {
            event = Some(value.trim().to_string());
        } else if let Some(value) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.trim_start());
        }
    }
    event
        .filter(|name| !name.is_empty())
        .map(|event| StreamFrame { event, data })
}

/// Turn a streaming response into a stream of decoded frames.
pub(super) fn frames(
    path: String,
    response: Response,
) -> impl Stream<Item = FirebaseResult<StreamFrame>> {
    try_stream! {
        let bytes = response.bytes_stream();
        pin_mut!(bytes);
        let mut buffer = FrameBuffer::default();
        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|source| FirebaseDaoError::StreamRead {
                path: path.clone(),
                source,
            })?;
            for frame in buffer.push(&chunk) {
                yield frame;
            }
        }
    }
}
