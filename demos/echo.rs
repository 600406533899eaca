//! Echo - an acceptor that writes every message back.
//!
//! This demo shows:
//! - Binding an acceptor with a filter in its pipeline
//! - Connecting and waiting on the connect future
//! - Observing the echoed messages on the connector side
//!
//! ```text
//! RUST_LOG=vpipe=debug cargo run --example echo
//! ```

use std::sync::Arc;

use bytes::Bytes;
use vpipe::{
    Filter, IoHandler, PipeAcceptor, PipeAddress, PipeConnector, PipeHub, PipeSession, Result,
};

/// Writes every received message back to the sender.
struct EchoHandler;

impl IoHandler for EchoHandler {
    fn message_received(&self, session: &PipeSession, message: Bytes) {
        if let Err(e) = session.write(message) {
            tracing::warn!("Echo failed: {}", e);
        }
    }
}

/// Prints what comes back.
struct PrintHandler;

impl IoHandler for PrintHandler {
    fn session_opened(&self, session: &PipeSession) {
        println!("connected {} -> {}", session.local_address(), session.remote_address());
    }

    fn message_received(&self, _session: &PipeSession, message: Bytes) {
        println!("echo: {}", String::from_utf8_lossy(&message));
    }

    fn session_closed(&self, session: &PipeSession) {
        println!("closed {}", session.local_address());
    }
}

/// Reverses inbound text.
struct Reverse;

impl Filter for Reverse {
    fn message_received(&self, _session: &PipeSession, message: Bytes) -> Result<Option<Bytes>> {
        let mut reversed = message.to_vec();
        reversed.reverse();
        Ok(Some(Bytes::from(reversed)))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let hub = PipeHub::new();
    let address = PipeAddress::new(9000);

    let acceptor = PipeAcceptor::builder(Arc::new(EchoHandler))
        .filter("reverse", Reverse)
        .build(&hub);
    acceptor.bind(address)?;

    let connector = PipeConnector::builder(Arc::new(PrintHandler)).build(&hub);
    let session = connector.connect(&address).await_session().await?;

    for word in ["hello", "virtual", "pipe"] {
        session.write(Bytes::from(word))?;
    }

    session.close().wait().await;
    acceptor.dispose();
    Ok(())
}
