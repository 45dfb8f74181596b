//! Stream plumbing shared by the local and remote runners.

use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::trace;

/// Buffer size for reading child output.
const READ_BUFFER_SIZE: usize = 8192;

/// Which side of a copy failed.
#[derive(Debug)]
pub(crate) enum CopyError {
    /// Reading the caller's input.
    Read(io::Error),
    /// Writing to the command.
    Write(io::Error),
}

/// Copy `reader` into `writer` in chunks of at most `chunk_size` bytes.
pub(crate) fn copy_chunked(
    reader: &mut dyn Read,
    writer: &mut dyn Write,
    chunk_size: usize,
) -> Result<u64, CopyError> {
    let mut buf = vec![0u8; chunk_size.max(1)];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        writer.write_all(&buf[..n]).map_err(CopyError::Write)?;
        total += n as u64;
        trace!("input: wrote {} bytes", n);
    }

    writer.flush().map_err(CopyError::Write)?;
    Ok(total)
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(PoisonError::into_inner)
}

fn wait_done(done: &mpsc::Receiver<io::Result<()>>, limit: Option<Duration>) -> Option<io::Result<()>> {
    let received = match limit {
        Some(limit) => match done.recv_timeout(limit) {
            Ok(result) => Ok(result),
            Err(mpsc::RecvTimeoutError::Timeout) => return None,
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(()),
        },
        None => done.recv().map_err(|_| ()),
    };

    Some(received.unwrap_or_else(|()| Err(io::Error::other("stream thread exited early"))))
}

/// Reads a child output pipe on a background thread.
///
/// Everything read so far stays available through [`take`](Self::take), so
/// output can be recovered after the child is killed.
pub(crate) struct StreamCollector {
    buf: Arc<Mutex<Vec<u8>>>,
    done: mpsc::Receiver<io::Result<()>>,
}

impl StreamCollector {
    pub fn spawn<R: Read + Send + 'static>(name: &str, mut reader: R) -> io::Result<Self> {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&buf);
        let (tx, done) = mpsc::channel();
        let label = name.to_string();

        thread::Builder::new()
            .name(format!("zfs-exec-{name}"))
            .spawn(move || {
                let mut chunk = [0u8; READ_BUFFER_SIZE];
                let result = loop {
                    match reader.read(&mut chunk) {
                        Ok(0) => break Ok(()),
                        Ok(n) => {
                            trace!("{}: read {} bytes", label, n);
                            lock(&shared).extend_from_slice(&chunk[..n]);
                        }
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => break Err(e),
                    }
                };
                // Receiver may be gone after a timeout.
                let _ = tx.send(result);
            })?;

        Ok(Self { buf, done })
    }

    /// Wait for end of stream. `None` if `limit` passed first.
    pub fn wait(&self, limit: Option<Duration>) -> Option<io::Result<()>> {
        wait_done(&self.done, limit)
    }

    /// Take everything read so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *lock(&self.buf))
    }
}

/// Writes the input payload to a child on a background thread.
pub(crate) struct InputFeeder {
    done: mpsc::Receiver<io::Result<()>>,
    finished: bool,
}

impl InputFeeder {
    /// Start copying `input` into `stdin`, closing it afterwards.
    ///
    /// A child that exits without reading all of its input is not an error.
    pub fn spawn<W: Write + Send + 'static>(
        mut input: Box<dyn Read + Send>,
        mut stdin: W,
        chunk_size: usize,
    ) -> io::Result<Self> {
        let (tx, done) = mpsc::channel();

        thread::Builder::new()
            .name("zfs-exec-stdin".to_string())
            .spawn(move || {
                let result = match copy_chunked(&mut *input, &mut stdin, chunk_size) {
                    Ok(_) => Ok(()),
                    Err(CopyError::Write(e)) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    Err(CopyError::Write(e)) | Err(CopyError::Read(e)) => Err(e),
                };
                drop(stdin);
                let _ = tx.send(result);
            })?;

        Ok(Self {
            done,
            finished: false,
        })
    }

    /// Whether the copy result has been reported.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Non-blocking check for a finished copy.
    pub fn poll(&mut self) -> Option<io::Result<()>> {
        self.wait(Some(Duration::ZERO))
    }

    /// Wait for the copy to finish. `None` if `limit` passed first or the
    /// result was already reported.
    pub fn wait(&mut self, limit: Option<Duration>) -> Option<io::Result<()>> {
        if self.finished {
            return None;
        }
        let result = wait_done(&self.done, limit)?;
        self.finished = true;
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Records the size of every write.
    struct ChunkRecorder {
        writes: Vec<usize>,
        data: Vec<u8>,
    }

    impl Write for ChunkRecorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes.push(buf.len());
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad input"))
        }
    }

    #[test]
    fn test_copy_chunked_bounds_writes() {
        let payload = vec![7u8; 10_000];
        let mut writer = ChunkRecorder {
            writes: Vec::new(),
            data: Vec::new(),
        };
        let copied = copy_chunked(&mut Cursor::new(payload.clone()), &mut writer, 4096).unwrap();

        assert_eq!(copied, 10_000);
        assert_eq!(writer.data, payload);
        assert!(writer.writes.iter().all(|&n| n <= 4096));
    }

    #[test]
    fn test_copy_chunked_read_error() {
        let mut sink = Vec::new();
        let err = copy_chunked(&mut FailingReader, &mut sink, 16).unwrap_err();
        assert!(matches!(err, CopyError::Read(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn test_collector_reads_to_end() {
        let collector = StreamCollector::spawn("test", Cursor::new(b"hello\n".to_vec())).unwrap();
        assert!(matches!(collector.wait(None), Some(Ok(()))));
        assert_eq!(collector.take(), b"hello\n");
    }

    #[test]
    fn test_feeder_reports_reader_error() {
        let mut feeder = InputFeeder::spawn(Box::new(FailingReader), Vec::new(), 16).unwrap();
        let result = feeder.wait(Some(Duration::from_secs(5)));
        assert!(matches!(result, Some(Err(_))));
        assert!(feeder.poll().is_none());
    }
}
