use json_line_logger::init::init_tracing;
use json_line_logger::Logger;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = Logger::new("auth-service")?;
    init_tracing(logger)?;

    info!("starting service");

    error!(
        user.id = 42,
        reason = "invalid password",
        "authentication failed"
    );

    Ok(())
}
