use crate::actor::{spawn_actor_reserved, Actor, Addr, Reserved};
use crate::system::{ActorSystem, ShutdownHandle};
use anyhow::Result;
use std::any::Any;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Wires named actors together and owns their lifecycle.
pub struct Builder {
    sys: ActorSystem,
    // Concrete addresses by name for late wiring.
    addrs: HashMap<String, Box<dyn Any + Send + Sync>>,
    // Subscribed up front so signals sent before `run_until_shutdown` count.
    stop_rx: broadcast::Receiver<()>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        let sys = ActorSystem::new();
        let stop_rx = sys.shutdown_notifier();
        Self {
            sys,
            addrs: HashMap::new(),
            stop_rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.sys.shutdown_handle()
    }

    /// Reserve a mailbox and publish its `Addr` under `name`.
    pub fn reserve<A>(&mut self, name: &str, mailbox: usize) -> Reserved<A>
    where
        A: Actor,
        Addr<A>: Send + Sync + 'static,
    {
        let r = spawn_actor_reserved::<A>(name, mailbox);
        self.addrs.insert(name.to_string(), Box::new(r.addr()));
        r
    }

    /// Start a previously reserved actor and track its task. A failed actor
    /// brings the whole system down.
    pub fn start_reserved<A: Actor>(&mut self, r: Reserved<A>, actor: A) -> &mut Self {
        let shutdown_rx = self.sys.shutdown_notifier();
        let shutdown = self.sys.shutdown_handle();
        let name = r.name().to_string();
        let h = r.start_with_shutdown(actor, Some(shutdown_rx));
        tracing::debug!(actor = %name, "actor.started");
        self.sys.track(async move {
            let res = h.task.await;
            if !matches!(res, Ok(Ok(()))) {
                shutdown.signal();
            }
            res??;
            Ok(())
        });
        self
    }

    /// Typed address by name.
    pub fn addr<A: Actor>(&self, name: &str) -> Option<Addr<A>>
    where
        Addr<A>: 'static,
    {
        self.addrs
            .get(name)
            .and_then(|b| b.downcast_ref::<Addr<A>>().cloned())
    }

    /// Block until Ctrl-C or a shutdown signal, then shut down gracefully.
    pub async fn run_until_shutdown(mut self) -> Result<()> {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("actor.system.ctrl_c");
            }
            _ = self.stop_rx.recv() => {}
        }
        // Drop published addresses so mailboxes can close.
        self.addrs.clear();
        self.sys.graceful_shutdown().await
    }
}
