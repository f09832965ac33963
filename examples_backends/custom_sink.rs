use json_line_logger::sink::{LineSink, SinkError};
use json_line_logger::Logger;

/// Example of integrating a completely custom destination by implementing
/// the `LineSink` trait directly. Imagine this talks to some proprietary
/// collector for which this crate does not provide a built-in sink.
struct MyCollectorSink;

impl LineSink for MyCollectorSink {
    fn write_line(&self, line: &str) -> Result<(), SinkError> {
        // Here you would call your own client library.
        // For the sake of example we just print the line.
        print!("[my-collector] {}", line);
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = Logger::builder("custom-sink-example").output(MyCollectorSink).build()?;

    logger.info("custom sink example started")?;
    logger.error("simulated error sent via custom sink")?;
    Ok(())
}
