use json_line_logger::{Fault, Logger, PropertyTree};
use serde_json::{json, Value};

fn tree(value: Value) -> PropertyTree {
    match value {
        Value::Object(map) => map,
        _ => PropertyTree::new(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = Logger::new("petshop")?;

    logger.info("shop is open")?;

    // Scoped properties for one customer journey, plus a per-call request id.
    let purchase_logger = logger
        .with(tree(json!({
            "customer": {"full_name": "Freda Bloggs"},
            "event.action": "pet purchase"
        })))
        .context_provider(|| tree(json!({ "request.id": request_id() })));

    purchase_logger.info(tree(json!({
        "message": "customer bought a dog",
        "pet": {"name": "Barker", "breed": "Bitsa"},
        "pet.species": "dog"
    })))?;

    if let Err(e) = "twelve".parse::<u32>() {
        purchase_logger.error_with("could not read stock count", &Fault::capture(&e))?;
    }

    Ok(())
}

fn request_id() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default();
    format!("req-{:08x}", nanos)
}
