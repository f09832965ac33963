use crate::sink::{LineSink, SinkError};
use async_trait::async_trait;
use std::error::Error;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// Asynchronous destination for batches of log lines.
///
/// Implementations move lines to wherever they ultimately live (a file, a
/// socket, an HTTP collector). [`ChannelSink`] calls `write_batch` from its
/// background task and never from the logging thread.
#[async_trait]
pub trait AsyncLineWriter: Send + Sync {
    /// Write a batch of complete JSON lines, each terminated by `\n`.
    ///
    /// **Returns**
    /// - `Ok(())` if the whole batch was accepted.
    /// - `Err(..)` if it was not. The batch is retried with backoff up to the
    ///   configured number of attempts and dropped after that.
    async fn write_batch(&self, lines: &[String]) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffered lines. Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

/// Tuning for [`ChannelSink`].
#[derive(Clone, Debug)]
pub struct ChannelSinkConfig {
    /// Lines buffered before new ones are dropped.
    pub channel_buffer: usize,
    pub batch_size: usize,
    /// Longest a partial batch waits before being written.
    pub flush_interval: Duration,
    /// Attempts per batch, the first one included.
    pub max_attempts: u32,
}

impl Default for ChannelSinkConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

/// Counters shared between a [`ChannelSink`] and its background task.
#[derive(Debug, Default)]
pub struct ChannelStats {
    /// Lines accepted into the channel.
    pub enqueued: AtomicU64,
    /// Lines dropped because the channel was full or closed.
    pub dropped: AtomicU64,
    /// Lines the writer accepted.
    pub written: AtomicU64,
    /// Lines discarded after exhausting retries.
    pub failed: AtomicU64,
}

/// [`LineSink`] that never blocks the logging thread.
///
/// Lines go into a bounded `tokio` channel. A background task drains the
/// channel into batches and hands them to an [`AsyncLineWriter`]. When the
/// channel is full the line is dropped and counted; there is no delivery
/// guarantee.
pub struct ChannelSink {
    sender: mpsc::Sender<String>,
    stats: Arc<ChannelStats>,
}

impl ChannelSink {
    /// Create a sink and spawn its background task on the current Tokio
    /// runtime.
    ///
    /// Minimal thresholds are enforced for `channel_buffer`, `batch_size`,
    /// `flush_interval` and `max_attempts` to avoid degenerate configurations.
    /// The task ends once every clone of the sink has been dropped and the
    /// remaining lines are written.
    pub fn spawn(writer: Arc<dyn AsyncLineWriter>, config: ChannelSinkConfig) -> (Self, JoinHandle<()>) {
        let buffer = config.channel_buffer.max(16);
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(10));
        let max_attempts = config.max_attempts.max(1);

        let (tx, mut rx) = mpsc::channel::<String>(buffer);
        let stats = Arc::new(ChannelStats::default());
        let stats_bg = Arc::clone(&stats);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let backoff = Duration::from_millis(100);
            let max_backoff = Duration::from_secs(10);

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Some(line) => {
                            batch.push(line);
                            if batch.len() >= batch_size {
                                send_batch(&*writer, &mut batch, &stats_bg, max_attempts, backoff, max_backoff).await;
                            }
                        }
                        None => {
                            if !batch.is_empty() {
                                send_batch(&*writer, &mut batch, &stats_bg, max_attempts, backoff, max_backoff).await;
                            }
                            if let Err(e) = writer.flush().await {
                                tracing::warn!(error = %e, "failed to flush async log writer");
                            }
                            break;
                        }
                    },
                    _ = sleep(flush_interval) => {
                        if !batch.is_empty() {
                            send_batch(&*writer, &mut batch, &stats_bg, max_attempts, backoff, max_backoff).await;
                        }
                    }
                }
            }
        });

        (Self { sender: tx, stats }, handle)
    }

    pub fn stats(&self) -> Arc<ChannelStats> {
        Arc::clone(&self.stats)
    }
}

async fn send_batch(
    writer: &dyn AsyncLineWriter,
    batch: &mut Vec<String>,
    stats: &ChannelStats,
    max_attempts: u32,
    mut backoff: Duration,
    max_backoff: Duration,
) {
    let mut attempt = 1;
    loop {
        match writer.write_batch(batch).await {
            Ok(()) => {
                stats.written.fetch_add(batch.len() as u64, Ordering::Relaxed);
                batch.clear();
                return;
            }
            Err(e) if attempt >= max_attempts => {
                tracing::warn!(error = %e, lines = batch.len(), attempt, "dropping log batch after failed writes");
                stats.failed.fetch_add(batch.len() as u64, Ordering::Relaxed);
                batch.clear();
                return;
            }
            Err(e) => {
                tracing::debug!(error = %e, attempt, ?backoff, "async log write failed, retrying");
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, max_backoff);
                attempt += 1;
            }
        }
    }
}

impl LineSink for ChannelSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        match self.sender.try_send(line.to_string()) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("log channel full, dropping log line");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SinkError::Closed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Collecting {
        lines: Mutex<Vec<String>>,
        failures_left: AtomicU32,
    }

    #[async_trait]
    impl AsyncLineWriter for Collecting {
        async fn write_batch(&self, lines: &[String]) -> Result<(), Box<dyn Error + Send + Sync>> {
            if self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err("collector unavailable".into());
            }
            self.lines.lock().await.extend_from_slice(lines);
            Ok(())
        }
    }

    fn config() -> ChannelSinkConfig {
        ChannelSinkConfig {
            channel_buffer: 64,
            batch_size: 2,
            flush_interval: Duration::from_millis(10),
            max_attempts: 3,
        }
    }

    #[tokio::test]
    async fn drains_remaining_lines_on_drop() {
        let writer = Arc::new(Collecting::default());
        let (sink, handle) = ChannelSink::spawn(writer.clone(), config());
        let stats = sink.stats();

        for i in 0..5 {
            sink.write_line(&format!("{{\"n\":{}}}\n", i)).unwrap();
        }
        drop(sink);
        handle.await.unwrap();

        assert_eq!(writer.lines.lock().await.len(), 5);
        assert_eq!(stats.enqueued.load(Ordering::Relaxed), 5);
        assert_eq!(stats.written.load(Ordering::Relaxed), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_failed_batches() {
        let writer = Arc::new(Collecting {
            failures_left: AtomicU32::new(2),
            ..Default::default()
        });
        let (sink, handle) = ChannelSink::spawn(writer.clone(), config());
        let stats = sink.stats();

        sink.write_line("{\"a\":1}\n").unwrap();
        sink.write_line("{\"b\":2}\n").unwrap();
        drop(sink);
        handle.await.unwrap();

        assert_eq!(writer.lines.lock().await.len(), 2);
        assert_eq!(stats.failed.load(Ordering::Relaxed), 0);
    }
}
