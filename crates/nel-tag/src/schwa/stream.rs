//! Draining a subprocess's stdout on a background thread.
//!
//! The pump thread copies whatever the child writes into a channel; the
//! caller's thread decodes records from that channel through [`RecordReader`],
//! blocking until a whole record has arrived.

use std::io::{self, Read};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use serde::de::DeserializeOwned;
use serde_json::StreamDeserializer;
use serde_json::de::IoRead;
use tracing::debug;

use crate::error::{Result, TagError};

const PUMP_BUF: usize = 4096;

/// Copy `source` into `tx` until EOF, a read error, or the receiver is gone.
pub fn spawn_pump<R>(mut source: R, tx: Sender<Vec<u8>>) -> io::Result<JoinHandle<()>>
where
    R: Read + Send + 'static,
{
    thread::Builder::new()
        .name("nel-tag-stdout-pump".to_string())
        .spawn(move || {
            let mut buf = [0u8; PUMP_BUF];
            loop {
                match source.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        debug!("stdout pump stopped: {e}");
                        break;
                    }
                }
            }
        })
}

/// `Read` over the chunks arriving on a channel.
///
/// A disconnected channel reads as EOF. With a timeout set, waiting longer
/// than it for the next chunk fails with [`io::ErrorKind::TimedOut`].
pub struct QueueReader {
    rx: Receiver<Vec<u8>>,
    timeout: Option<Duration>,
    current: Vec<u8>,
    pos: usize,
}

impl QueueReader {
    pub fn new(rx: Receiver<Vec<u8>>, timeout: Option<Duration>) -> Self {
        Self {
            rx,
            timeout,
            current: Vec::new(),
            pos: 0,
        }
    }
}

impl Read for QueueReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.pos >= self.current.len() {
            let next = match self.timeout {
                None => self.rx.recv().ok(),
                Some(timeout) => match self.rx.recv_timeout(timeout) {
                    Ok(chunk) => Some(chunk),
                    Err(RecvTimeoutError::Disconnected) => None,
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "timed out waiting for tagger output",
                        ));
                    }
                },
            };
            match next {
                Some(chunk) => {
                    self.current = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = out.len().min(self.current.len() - self.pos);
        out[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Decodes consecutive JSON records from a byte channel.
pub struct RecordReader<T: DeserializeOwned> {
    rx: Receiver<Vec<u8>>,
    timeout: Option<Duration>,
    records: StreamDeserializer<'static, IoRead<QueueReader>, T>,
}

impl<T: DeserializeOwned> RecordReader<T> {
    pub fn new(rx: Receiver<Vec<u8>>, timeout: Option<Duration>) -> Self {
        let records = Self::decoder(&rx, timeout);
        Self {
            rx,
            timeout,
            records,
        }
    }

    fn decoder(
        rx: &Receiver<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> StreamDeserializer<'static, IoRead<QueueReader>, T> {
        serde_json::Deserializer::from_reader(QueueReader::new(rx.clone(), timeout)).into_iter()
    }

    /// Block until the next record is decoded.
    ///
    /// After an error the decoder is unusable until [`RecordReader::resync`].
    pub fn read(&mut self) -> Result<T> {
        match self.records.next() {
            Some(Ok(record)) => Ok(record),
            // The queue only fails reads when the timeout expires.
            Some(Err(e)) if e.is_io() => Err(TagError::Timeout(self.timeout.unwrap_or_default())),
            Some(Err(e)) => Err(TagError::Record(e)),
            None => Err(TagError::StreamClosed),
        }
    }

    /// Drop queued bytes and any partially decoded record, then start a
    /// fresh decoder. Returns the number of queued bytes discarded.
    pub fn resync(&mut self) -> usize {
        let mut dropped = 0;
        while let Ok(chunk) = self.rx.try_recv() {
            dropped += chunk.len();
        }
        self.records = Self::decoder(&self.rx, self.timeout);
        dropped
    }
}
