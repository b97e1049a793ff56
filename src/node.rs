//! Public node handle; the serving loop runs on its own actor thread.

use std::net::SocketAddrV4;
use std::thread::{self, JoinHandle};

use flume::{Receiver, Sender, TryRecvError};
use tracing::info;

use crate::common::Id;
use crate::rpc::{Config, Rpc};
use crate::Result;

/// Returned when the actor thread is no longer running.
#[derive(thiserror::Error, Debug)]
#[error("node was shutdown")]
pub struct NodeWasShutdown;

/// A running Chord node.
///
/// Spawning builds the ring and finger table, binds the configured port, and
/// starts a thread that serves until [Node::shutdown] is called or the
/// handle is dropped.
#[derive(Debug)]
pub struct Node {
    sender: Sender<ActorMessage>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Debug)]
enum ActorMessage {
    Info(Sender<Info>),
    Shutdown(Sender<()>),
}

impl Node {
    pub fn spawn(config: Config) -> Result<Node> {
        let rpc = Rpc::new(&config)?;

        let address = rpc.local_addr();
        let id = rpc.id();
        info!(?address, %id, "Chord node listening");

        let (sender, receiver) = flume::bounded(32);
        let handle = thread::spawn(move || run(rpc, receiver));

        Ok(Node {
            sender,
            handle: Some(handle),
        })
    }

    // === Public Methods ===

    /// Snapshot of this node's identity and ring position.
    pub fn info(&self) -> Result<Info, NodeWasShutdown> {
        let (sender, receiver) = flume::bounded(1);

        self.sender
            .send(ActorMessage::Info(sender))
            .map_err(|_| NodeWasShutdown)?;

        receiver.recv().map_err(|_| NodeWasShutdown)
    }

    /// Stops the serving loop and waits for the actor thread to finish.
    pub fn shutdown(&mut self) {
        let (sender, receiver) = flume::bounded(1);

        if self.sender.send(ActorMessage::Shutdown(sender)).is_ok() {
            let _ = receiver.recv();
        }

        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    /// Parks the caller until the node stops serving.
    pub fn block_until_shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(rpc: Rpc, receiver: Receiver<ActorMessage>) {
    loop {
        match receiver.try_recv() {
            Ok(ActorMessage::Info(sender)) => {
                let _ = sender.send(Info::from(&rpc));
            }
            Ok(ActorMessage::Shutdown(sender)) => {
                let _ = sender.send(());
                break;
            }
            Err(TryRecvError::Disconnected) => {
                // Last handle dropped; stop serving.
                tracing::debug!("node handle dropped, stopping actor thread");
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        rpc.tick();
    }
}

/// Information about a running node.
#[derive(Debug, Clone)]
pub struct Info {
    id: Id,
    local_addr: SocketAddrV4,
    successor: Id,
    predecessor: Id,
    peer_count: usize,
}

impl Info {
    /// This node's ring identity.
    pub fn id(&self) -> &Id {
        &self.id
    }

    /// Local UDP socket address this node is listening on.
    pub fn local_addr(&self) -> SocketAddrV4 {
        self.local_addr
    }

    /// The next identity clockwise on the ring.
    pub fn successor(&self) -> &Id {
        &self.successor
    }

    /// The previous identity counter-clockwise on the ring.
    pub fn predecessor(&self) -> &Id {
        &self.predecessor
    }

    /// Total configured ring members, which is also the hop budget.
    pub fn peer_count(&self) -> usize {
        self.peer_count
    }
}

impl From<&Rpc> for Info {
    fn from(rpc: &Rpc) -> Self {
        let local = rpc.router().ring().local();

        Info {
            id: local.id,
            local_addr: rpc.local_addr(),
            successor: local.successor,
            predecessor: local.predecessor,
            peer_count: rpc.router().ring().len(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::PeerAddr;

    #[test]
    fn spawn_info_shutdown() {
        let config = Config::new(vec![PeerAddr::new("127.0.0.1", 0)], 0).unwrap();
        let mut node = Node::spawn(config).unwrap();

        let info = node.info().unwrap();
        assert_eq!(info.peer_count(), 1);
        assert_eq!(info.successor(), info.id());
        assert_eq!(info.predecessor(), info.id());

        node.shutdown();
        assert!(node.info().is_err(), "actor is gone after shutdown");
    }
}
