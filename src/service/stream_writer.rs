use crate::models::error::{LogSinkError, Result};
use crate::models::log_record::WriteOutcome;
use crate::service::log_stream::LogStream;
use log::{debug, info};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Message sent from writers to the background worker
enum Command {
    Write {
        chunk: Vec<u8>,
        done: Sender<Result<WriteOutcome>>,
    },
    End,
}

/// Completion of one submitted chunk. Yields exactly one value.
pub type Completion = Receiver<Result<WriteOutcome>>;

/// Cloneable sender side of a [`StreamWriter`].
#[derive(Clone)]
pub struct StreamHandle {
    tx: Sender<Command>,
}

impl StreamHandle {
    /// Queues a chunk without waiting for it to be written.
    pub fn submit(&self, chunk: impl Into<Vec<u8>>) -> Result<Completion> {
        let (done, completion) = mpsc::channel();
        self.tx
            .send(Command::Write {
                chunk: chunk.into(),
                done,
            })
            .map_err(|_| LogSinkError::StreamClosed)?;
        Ok(completion)
    }

    /// Queues a chunk and blocks until it has been written or has failed.
    pub fn write(&self, chunk: impl Into<Vec<u8>>) -> Result<WriteOutcome> {
        self.submit(chunk)?
            .recv()
            .map_err(|_| LogSinkError::StreamClosed)?
    }
}

/// Owns a [`LogStream`] on a background thread and feeds it chunks one at a time, in the
/// order they were queued.
pub struct StreamWriter {
    handle: StreamHandle,
    worker: Option<JoinHandle<()>>,
}

impl StreamWriter {
    pub fn spawn(stream: LogStream) -> Self {
        let (tx, rx) = mpsc::channel::<Command>();

        let worker = thread::spawn(move || {
            stream_worker(stream, rx);
        });

        StreamWriter {
            handle: StreamHandle { tx },
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> StreamHandle {
        self.handle.clone()
    }

    pub fn submit(&self, chunk: impl Into<Vec<u8>>) -> Result<Completion> {
        self.handle.submit(chunk)
    }

    pub fn write(&self, chunk: impl Into<Vec<u8>>) -> Result<WriteOutcome> {
        self.handle.write(chunk)
    }

    /// Lets every chunk queued so far finish, then finishes the stream. Chunks queued
    /// afterwards through a cloned handle fail with [`LogSinkError::StreamClosed`].
    pub fn end(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.worker.take() {
            Some(worker) => {
                let _ = self.handle.tx.send(Command::End);
                worker.join().map_err(|_| LogSinkError::WorkerPanicked)
            }
            None => Ok(()),
        }
    }
}

impl Drop for StreamWriter {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

/// Background worker that writes chunks to the stream
fn stream_worker(stream: LogStream, rx: Receiver<Command>) {
    let mut written = 0usize;
    let mut failed = 0usize;

    while let Ok(command) = rx.recv() {
        match command {
            Command::Write { chunk, done } => {
                let result = stream.write(&chunk);
                match &result {
                    Ok(_) => written += 1,
                    Err(e) => {
                        failed += 1;
                        debug!("Write to '{}' failed: {}", stream.table_name(), e);
                    }
                }
                // Ignore errors if the submitter stopped waiting
                let _ = done.send(result);
            }
            Command::End => break,
        }
    }

    info!(
        "Log stream for '{}' ending: {} written, {} failed",
        stream.table_name(),
        written,
        failed
    );
    stream.finish();
}
