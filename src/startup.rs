// src/startup.rs
use std::io;

use tokio::net::TcpListener;

/// Bind `host:port`, moving to the next port while the address is taken.
///
/// Gives up after `attempts` failed binds, or immediately on any error other
/// than `AddrInUse`.
pub async fn bind_with_retry(host: &str, port: u16, attempts: u16) -> io::Result<TcpListener> {
    let attempts = attempts.max(1);
    let mut port = port;

    for attempt in 1..=attempts {
        tracing::info!(port, attempt, "Binding listener");
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && attempt < attempts => {
                let Some(next) = port.checked_add(1) else {
                    return Err(e);
                };
                tracing::warn!(busy = port, next, "Port is busy, trying next port");
                port = next;
            }
            Err(e) => {
                tracing::error!(attempts = attempt, error = %e, "Failed to start server");
                return Err(e);
            }
        }
    }

    unreachable!("loop returns on the final attempt")
}
