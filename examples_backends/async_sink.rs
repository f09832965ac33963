use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use json_line_logger::channel_sink::{AsyncLineWriter, ChannelSink, ChannelSinkConfig};
use json_line_logger::Logger;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Writes batches to stderr; stands in for a network collector.
struct StderrWriter {
    out: Mutex<tokio::io::Stderr>,
}

#[async_trait]
impl AsyncLineWriter for StderrWriter {
    async fn write_batch(&self, lines: &[String]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut out = self.out.lock().await;
        for line in lines {
            out.write_all(line.as_bytes()).await?;
        }
        out.flush().await?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let writer = Arc::new(StderrWriter { out: Mutex::new(tokio::io::stderr()) });
    let (sink, handle) = ChannelSink::spawn(writer, ChannelSinkConfig::default());
    let stats = sink.stats();

    let logger = Logger::builder("async-example").output(sink).build()?;
    for i in 0..10 {
        logger.info(format!("background write {}", i))?;
    }

    // Dropping the last logger closes the channel; the task drains and exits.
    drop(logger);
    handle.await?;

    eprintln!("{:?}", stats);
    Ok(())
}
