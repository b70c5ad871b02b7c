//! In-process transport.
//!
//! Requests are handed to a closure that plays the server. Used by the test suite and
//! for embedding a service in the same process.

use std::collections::VecDeque;

use crate::transport::Error;
use crate::transport::Result;
use crate::transport::Transport;

type Handler = Box<dyn FnMut(&[u8]) -> Result<Vec<u8>> + Send>;

pub struct MemoryTransport {
    handler: Handler,
    open: bool,
    request: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
    flush_error: Option<Error>,
}

impl MemoryTransport {
    pub fn new(handler: impl FnMut(&[u8]) -> Result<Vec<u8>> + Send + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            open: false,
            request: Vec::new(),
            replies: VecDeque::new(),
            flush_error: None,
        }
    }

    /// Makes every flush report `error` after the request has been delivered.
    pub fn failing_flush(mut self, error: Error) -> Self {
        self.flush_error = Some(error);
        self
    }
}

#[async_trait::async_trait]
impl Transport for MemoryTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    async fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    async fn write(&mut self, buf: &[u8]) -> Result<()> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        self.request.extend_from_slice(buf);
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if !self.open {
            return Err(Error::NotOpen);
        }
        let request = std::mem::take(&mut self.request);
        let reply = (self.handler)(&request)?;
        self.replies.push_back(reply);
        match &self.flush_error {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        self.replies.pop_front().ok_or(Error::NoReply)
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.request.clear();
        self.replies.clear();
        Ok(())
    }
}
