//! Thrift over HTTP: one POST per call, the reply is the response body.

use reqwest::Url;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;

use crate::config::ClientConfig;
use crate::transport::Error;
use crate::transport::Result;
use crate::transport::Transport;

const THRIFT_MEDIA_TYPE: &str = "application/x-thrift";

pub struct HttpTransport {
    url: Url,
    client: reqwest::Client,
    max_message_size: usize,
    request: Vec<u8>,
    reply: Option<Vec<u8>>,
    /// Why the last POST produced no reply, reported by the next `read`.
    failure: Option<Error>,
    open: bool,
}

fn http_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_connect() {
        Error::ConnectionLost(e.to_string())
    } else {
        Error::Io(e.to_string())
    }
}

impl HttpTransport {
    pub fn new(url: Url, config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(http_error)?;
        Ok(Self {
            url,
            client,
            max_message_size: config.max_message_size,
            request: Vec::new(),
            reply: None,
            failure: None,
            open: false,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            return Err(Error::FrameTooLarge { size, limit: self.max_message_size });
        }
        Ok(())
    }

    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>> {
        self.check_size(body.len())?;
        tracing::trace!(url = %self.url, bytes = body.len(), "posting request");

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, THRIFT_MEDIA_TYPE)
            .header(ACCEPT, THRIFT_MEDIA_TYPE)
            .body(body)
            .send()
            .await
            .map_err(http_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }
        if let Some(len) = response.content_length() {
            self.check_size(usize::try_from(len).unwrap_or(usize::MAX))?;
        }
        let bytes = response.bytes().await.map_err(http_error)?;
        self.check_size(bytes.len())?;
        tracing::trace!(bytes = bytes.len(), "received reply");
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    fn is_open(&self) -> bool {
        self.open
    }

    /// HTTP is connectionless; opening only enables the transport.
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
        let body = std::mem::take(&mut self.request);
        self.reply = None;
        self.failure = None;
        match self.post(body).await {
            Ok(reply) => {
                self.reply = Some(reply);
                Ok(())
            }
            Err(e) => {
                self.failure = Some(e.clone());
                Err(e)
            }
        }
    }

    async fn read(&mut self) -> Result<Vec<u8>> {
        match self.reply.take() {
            Some(reply) => Ok(reply),
            None => Err(self.failure.take().unwrap_or(Error::NoReply)),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        self.request.clear();
        self.reply = None;
        self.failure = None;
        Ok(())
    }
}
