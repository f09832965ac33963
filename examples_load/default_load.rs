use std::time::Instant;

use json_line_logger::noop_sink::NoopSink;
use json_line_logger::{Logger, PropertyTree};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut scope = PropertyTree::new();
    scope.insert("service.type".to_string(), json!("load-test"));

    let logger = Logger::builder("load")
        .output(NoopSink)
        .default_properties(scope)
        .build()?
        .context_provider(|| {
            let mut ctx = PropertyTree::new();
            ctx.insert("trace.id".to_string(), json!("1c8a5fb2-fecd-44d8-92a4-449eb2ce4dcb"));
            ctx
        });

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        let mut payload = PropertyTree::new();
        payload.insert("message".to_string(), json!("default load test error"));
        payload.insert("iteration".to_string(), json!(i));
        logger.error(payload)?;
    }

    let elapsed = start.elapsed();
    println!(
        "default config: logged {} entries in {:?} (~{:.0} entries/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    Ok(())
}
