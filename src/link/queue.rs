// Copyright 2026 Launcher Link Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Outbound byte queue feeding the writer task.

use tokio::sync::mpsc;

use super::frame::CommandFrame;

/// Create a connected queue/drain pair.
pub fn channel() -> (CommandQueue, CommandDrain) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandQueue { tx }, CommandDrain { rx })
}

/// Producer side. Enqueueing never blocks and never fails; bytes are
/// drained in exactly the order they were pushed.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<u8>,
}

impl CommandQueue {
    /// Queue a single byte. Dropped silently once the session is gone.
    pub fn push(&self, byte: u8) {
        let _ = self.tx.send(byte);
    }

    /// Queue all bytes of an encoded frame.
    pub fn push_frame(&self, frame: &CommandFrame) {
        for &byte in frame.bytes() {
            self.push(byte);
        }
    }
}

/// Consumer side, owned by the writer task.
#[derive(Debug)]
pub struct CommandDrain {
    rx: mpsc::UnboundedReceiver<u8>,
}

impl CommandDrain {
    /// Await the next byte. `None` once every producer handle is dropped.
    pub async fn next(&mut self) -> Option<u8> {
        self.rx.recv().await
    }
}
