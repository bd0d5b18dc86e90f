//! Scripted connector for exercising sessions without sockets.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_test::io::Mock;

use crate::network::connector::{Connector, Endpoint};

/// Counts connect attempts; cloneable so tests keep a handle after the
/// connector moves into a session.
#[derive(Debug, Clone, Default)]
pub(crate) struct Attempts(Arc<AtomicUsize>);

impl Attempts {
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Hands out one pre-scripted mock stream per connect, then refuses.
pub(crate) struct ScriptedConnector {
    streams: Mutex<VecDeque<Mock>>,
    attempts: Attempts,
}

impl ScriptedConnector {
    pub(crate) fn new(streams: impl IntoIterator<Item = Mock>) -> Self {
        Self {
            streams: Mutex::new(streams.into_iter().collect()),
            attempts: Attempts::default(),
        }
    }

    pub(crate) fn attempts(&self) -> Attempts {
        self.attempts.clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Stream = Mock;

    async fn connect(&self, _endpoint: &Endpoint) -> io::Result<Mock> {
        self.attempts.0.fetch_add(1, Ordering::SeqCst);
        let next = self.streams.lock().unwrap().pop_front();
        next.ok_or_else(|| io::Error::new(io::ErrorKind::ConnectionRefused, "no scripted stream"))
    }
}
