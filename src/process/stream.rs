use std::borrow::Cow;
use std::fmt;

use log::{debug, trace};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::error::{ProcessError, ProcessResult};
use crate::pattern::PatternCounterSet;

/// Which of the child's output streams a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Stdout => "stdout",
            StreamKind::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stream of newline-delimited lines read from a child pipe
///
/// Lines are raw bytes with the trailing `\n` removed. Anything else,
/// including a `\r` before the newline, is kept.
pub struct LineStream<R> {
    reader: BufReader<R>,
    kind: StreamKind,
}

impl<R: AsyncRead + Unpin> LineStream<R> {
    /// Create a new line stream
    pub fn new(reader: R, kind: StreamKind) -> Self {
        Self {
            reader: BufReader::new(reader),
            kind,
        }
    }

    /// Get the next line from the stream, `None` at end of stream
    ///
    /// A final fragment without a terminating newline is returned as a line.
    pub async fn next_line(&mut self) -> ProcessResult<Option<Vec<u8>>> {
        let mut line = Vec::new();
        let read = self
            .reader
            .read_until(b'\n', &mut line)
            .await
            .map_err(|e| ProcessError::ReadError(self.kind, e))?;

        if read == 0 {
            return Ok(None);
        }

        if line.last() == Some(&b'\n') {
            line.pop();
        }

        Ok(Some(line))
    }
}

/// Relay every line of `input` to `output` and count pattern matches
///
/// Each line is written and flushed before it is classified, and the next
/// line is not read until classification is done. Returns the number of
/// lines processed once `input` reaches end of stream.
pub async fn classify<R, W>(
    input: R,
    output: &mut W,
    counters: &PatternCounterSet,
) -> ProcessResult<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let kind = counters.kind();
    let mut lines = LineStream::new(input, kind);
    let mut processed = 0u64;

    while let Some(mut line) = lines.next_line().await? {
        line.push(b'\n');
        output
            .write_all(&line)
            .await
            .map_err(|e| ProcessError::WriteError(kind, e))?;
        output
            .flush()
            .await
            .map_err(|e| ProcessError::WriteError(kind, e))?;

        let text: Cow<'_, str> = String::from_utf8_lossy(&line[..line.len() - 1]);
        let matched = counters.classify(&text);
        if matched > 0 {
            trace!("[{}] line {} matched {} counter(s)", kind, processed, matched);
        }

        processed += 1;
    }

    debug!("Child {} closed after {} line(s)", kind, processed);
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CounterConfig, WrapperConfig};
    use crate::metrics::MetricsRegistry;
    use crate::pattern::CounterSets;
    use std::io::{self, Cursor};

    fn counters(both: &[(&str, &str)], stdout: &[(&str, &str)]) -> (MetricsRegistry, CounterSets) {
        let group = |entries: &[(&str, &str)]| -> Vec<CounterConfig> {
            entries
                .iter()
                .map(|(name, regex)| CounterConfig::new(*name, "help", *regex))
                .collect()
        };
        let config = WrapperConfig {
            both: group(both),
            stdout: group(stdout),
            stderr: Vec::new(),
        };

        let registry = MetricsRegistry::new();
        let sets = CounterSets::build(&config, &registry).unwrap();
        (registry, sets)
    }

    #[tokio::test]
    async fn test_line_stream_yields_lines_then_none() {
        let mut lines = LineStream::new(&b"first\n\nthird"[..], StreamKind::Stdout);
        assert_eq!(lines.next_line().await.unwrap(), Some(b"first".to_vec()));
        assert_eq!(lines.next_line().await.unwrap(), Some(Vec::new()));
        assert_eq!(lines.next_line().await.unwrap(), Some(b"third".to_vec()));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_relays_lines_verbatim_and_in_order() {
        let (_registry, sets) = counters(&[], &[]);
        let input = b"alpha\r\nbeta\n\n  gamma  \n\xff\xfe raw\n".to_vec();
        let mut sink = Vec::new();

        let lines = classify(Cursor::new(input.clone()), &mut sink, &sets.stdout)
            .await
            .unwrap();

        assert_eq!(lines, 5);
        assert_eq!(sink, input);
    }

    #[tokio::test]
    async fn test_unterminated_fragment_is_a_final_line() {
        let (registry, sets) = counters(&[("tail", "partial")], &[]);
        let mut sink = Vec::new();

        let lines = classify(&b"complete\npartial"[..], &mut sink, &sets.stdout)
            .await
            .unwrap();

        assert_eq!(lines, 2);
        assert_eq!(sink, b"complete\npartial\n");
        assert_eq!(registry.value("tail"), Some(1));
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let (_registry, sets) = counters(&[], &[]);
        let mut sink = Vec::new();
        let lines = classify(&b""[..], &mut sink, &sets.stdout).await.unwrap();
        assert_eq!(lines, 0);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_counts_each_matching_counter_once_per_line() {
        let (registry, sets) = counters(
            &[("total_errors", "error")],
            &[("errors_twice", "error.*error"), ("fatal", "fatal")],
        );
        let input = "2024 fatal error occurred\nerror error error\nall good\n";
        let mut sink = Vec::new();

        classify(input.as_bytes(), &mut sink, &sets.stdout).await.unwrap();

        assert_eq!(registry.value("total_errors"), Some(2));
        assert_eq!(registry.value("errors_twice"), Some(1));
        assert_eq!(registry.value("fatal"), Some(1));
    }

    #[tokio::test]
    async fn test_newline_is_not_part_of_the_matched_text() {
        let (registry, sets) = counters(&[("anchored", "^done$")], &[]);
        let mut sink = Vec::new();
        classify(&b"done\nnot done\n"[..], &mut sink, &sets.stdout)
            .await
            .unwrap();
        assert_eq!(registry.value("anchored"), Some(1));
    }

    #[tokio::test]
    async fn test_read_error_is_fatal() {
        let (registry, sets) = counters(&[("seen", ".")], &[]);
        let input = tokio_test::io::Builder::new()
            .read(b"before\n")
            .read_error(io::Error::other("pipe broke"))
            .build();
        let mut sink = Vec::new();

        let err = classify(input, &mut sink, &sets.stdout).await.unwrap_err();

        assert!(matches!(err, ProcessError::ReadError(StreamKind::Stdout, _)));
        assert_eq!(sink, b"before\n");
        assert_eq!(registry.value("seen"), Some(1));
    }

    #[tokio::test]
    async fn test_write_error_is_fatal() {
        let (_registry, sets) = counters(&[], &[]);
        let mut sink = tokio_test::io::Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            .build();

        let err = classify(&b"line\n"[..], &mut sink, &sets.stderr)
            .await
            .unwrap_err();

        assert!(matches!(err, ProcessError::WriteError(StreamKind::Stderr, _)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_streams_share_counter_without_loss() {
        let (registry, sets) = counters(&[("total_errors", "error")], &[]);
        let CounterSets { stdout, stderr } = sets;

        let payload = |n: usize| -> Vec<u8> {
            (0..n)
                .map(|i| if i % 2 == 0 { "an error\n" } else { "fine\n" })
                .collect::<String>()
                .into_bytes()
        };
        let out_input = payload(20_000);
        let err_input = payload(30_000);

        let out = tokio::spawn(async move {
            let mut sink = tokio::io::sink();
            classify(Cursor::new(out_input), &mut sink, &stdout).await
        });
        let err = tokio::spawn(async move {
            let mut sink = tokio::io::sink();
            classify(Cursor::new(err_input), &mut sink, &stderr).await
        });

        assert_eq!(out.await.unwrap().unwrap(), 20_000);
        assert_eq!(err.await.unwrap().unwrap(), 30_000);
        assert_eq!(registry.value("total_errors"), Some(25_000));
    }
}
