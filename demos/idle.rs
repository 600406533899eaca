//! Idle - reader idle notifications from the hub's idle checker.
//!
//! The acceptor is configured to report `ReaderIdle` after 200ms without
//! input. The connector sends a few messages, goes quiet, and the acceptor
//! closes the session once it has been idle twice.
//!
//! ```text
//! RUST_LOG=vpipe=debug cargo run --example idle
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use vpipe::config::{PipeConfig, SessionConfig};
use vpipe::{IdleStatus, IoHandler, NoopHandler, PipeAcceptor, PipeAddress, PipeConnector, PipeHub, PipeSession};

#[derive(Default)]
struct IdleWatcher {
    idle_count: AtomicUsize,
}

impl IoHandler for IdleWatcher {
    fn message_received(&self, _session: &PipeSession, message: Bytes) {
        println!("received {}", String::from_utf8_lossy(&message));
    }

    fn session_idle(&self, session: &PipeSession, status: IdleStatus) {
        let count = self.idle_count.fetch_add(1, Ordering::SeqCst) + 1;
        println!("{:?} on {} ({})", status, session.local_address(), count);
        if count >= 2 {
            session.close();
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let hub = PipeHub::builder()
        .config(PipeConfig::default().idle_check_interval(Duration::from_millis(50)))
        .build()?;
    let checker = hub.spawn_idle_checker();

    let acceptor = PipeAcceptor::builder(Arc::new(IdleWatcher::default()))
        .session_config(SessionConfig::default().reader_idle(Duration::from_millis(200)))
        .build(&hub);
    acceptor.bind(PipeAddress::new(1))?;

    let connector = PipeConnector::builder(Arc::new(NoopHandler)).build(&hub);
    let session = connector.connect(&PipeAddress::new(1)).await_session().await?;

    for i in 0..3 {
        session.write(Bytes::from(format!("tick {}", i)))?;
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    session.close_future().wait().await;
    println!("session closed after going idle");

    checker.abort();
    Ok(())
}
