use std::io::{Read, Write};

use prost::Message;

use webflux_generator::{error_response, generate_response};

/// Protoc talks protobuf over stdin/stdout; logs go to stderr only.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut input = Vec::new();
    std::io::stdin().read_to_end(&mut input)?;

    let response = match generate_response(&input) {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(%err, "generation failed");
            error_response(&err)
        }
    };

    std::io::stdout().write_all(&response.encode_to_vec())?;
    Ok(())
}
