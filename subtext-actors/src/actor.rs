use anyhow::Result;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};

/// Minimal actor trait. `Self: Sized` avoids object-safety issues when using `Context<Self>`.
#[async_trait::async_trait]
pub trait Actor: Send + Sized + 'static {
    type Msg: Send + 'static;

    /// Handle a single message. Return `Err` to stop the actor.
    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()>;
}

/// Runtime context for an actor instance.
pub struct Context<A: Actor> {
    addr: Addr<A>,
    stop: bool,
}

impl<A: Actor> Context<A> {
    /// A clone of this actor's own address.
    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    /// Request a graceful stop after processing the current message.
    pub fn stop(&mut self) {
        self.stop = true;
    }
}

/// Address for sending messages to an actor.
pub struct Addr<A: Actor>(mpsc::Sender<A::Msg>);

/// Manual Clone to avoid unnecessary bounds on `A`/`A::Msg`.
impl<A: Actor> Clone for Addr<A> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A: Actor> Addr<A> {
    /// Async send; awaits backpressure. Returns the message if the receiver is dropped.
    pub async fn send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.send(msg).await.map_err(|e| e.0)
    }

    /// Try to send without waiting. Returns the message if the mailbox is full or closed.
    ///
    /// ```
    /// # use anyhow::Result;
    /// # use async_trait::async_trait;
    /// # use subtext_actors::actor::{self, Actor, Context};
    /// # struct Keystrokes(Vec<char>);
    /// # #[async_trait]
    /// # impl Actor for Keystrokes {
    /// #     type Msg = char;
    /// #     async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
    /// #         self.0.push(msg);
    /// #         if msg == '\n' {
    /// #             ctx.stop();
    /// #         }
    /// #         Ok(())
    /// #     }
    /// # }
    /// let rt = tokio::runtime::Runtime::new().unwrap();
    /// rt.block_on(async {
    ///     let actor::ActorHandle { addr, task } = actor::spawn_actor(Keystrokes(Vec::new()), 2);
    ///     addr.try_send('a').unwrap();
    ///     addr.send('\n').await.unwrap();
    ///     drop(addr);
    ///     task.await.unwrap().unwrap();
    /// });
    /// ```
    pub fn try_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.try_send(msg).map_err(|e| e.into_inner())
    }

    /// Blocking send for producers on non-async threads. Panics when called from async code.
    pub fn blocking_send(&self, msg: A::Msg) -> std::result::Result<(), A::Msg> {
        self.0.blocking_send(msg).map_err(|e| e.0)
    }

    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }
}

/// Handle to a running actor task.
pub struct ActorHandle<A: Actor> {
    pub addr: Addr<A>,
    pub task: JoinHandle<anyhow::Result<()>>,
}

/// Spawn an actor with a bounded mailbox.
///
/// Stop conditions:
/// - `handle` returns `Err`
/// - all senders are dropped
/// - `ctx.stop()` is called
/// - the shutdown channel fires
pub fn spawn_actor<A: Actor>(actor: A, capacity: usize) -> ActorHandle<A> {
    spawn_actor_with_shutdown(actor, capacity, None)
}

pub fn spawn_actor_with_shutdown<A: Actor>(
    actor: A,
    capacity: usize,
    shutdown: Option<broadcast::Receiver<()>>,
) -> ActorHandle<A> {
    spawn_actor_reserved::<A>("anonymous", capacity).start_with_shutdown(actor, shutdown)
}

/// Mailbox and address created up front; the task starts later so other
/// components can be wired to the address first.
pub struct Reserved<A: Actor> {
    name: String,
    addr: Addr<A>,
    rx: mpsc::Receiver<A::Msg>,
}

impl<A: Actor> Reserved<A> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn addr(&self) -> Addr<A> {
        self.addr.clone()
    }

    pub fn start(self, actor: A) -> ActorHandle<A> {
        self.start_with_shutdown(actor, None)
    }

    pub fn start_with_shutdown(
        self,
        actor: A,
        shutdown: Option<broadcast::Receiver<()>>,
    ) -> ActorHandle<A> {
        let Reserved { name, addr, rx } = self;
        let ctx = Context {
            addr: addr.clone(),
            stop: false,
        };
        let task = tokio::spawn(run_mailbox(name, actor, ctx, rx, shutdown));
        ActorHandle { addr, task }
    }
}

async fn run_mailbox<A: Actor>(
    name: String,
    mut actor: A,
    mut ctx: Context<A>,
    mut rx: mpsc::Receiver<A::Msg>,
    shutdown: Option<broadcast::Receiver<()>>,
) -> Result<()> {
    // A missing shutdown channel behaves like one that never fires.
    let (_never_tx, never_rx) = broadcast::channel::<()>(1);
    let mut shutdown_rx = shutdown.unwrap_or(never_rx);

    loop {
        let msg = tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_msg = rx.recv() => match maybe_msg {
                Some(msg) => msg,
                None => break,
            },
        };
        if let Err(e) = actor.handle(msg, &mut ctx).await {
            tracing::error!(actor = %name, error = ?e, "actor.failed");
            return Err(e);
        }
        if ctx.stop {
            break;
        }
    }
    tracing::debug!(actor = %name, "actor.stopped");
    Ok(())
}

/// Reserve a named mailbox.
pub fn spawn_actor_reserved<A: Actor>(name: impl Into<String>, capacity: usize) -> Reserved<A> {
    let (tx, rx) = mpsc::channel::<A::Msg>(capacity);
    Reserved {
        name: name.into(),
        addr: Addr(tx),
        rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    struct Tally(u32);

    enum TallyMsg {
        Add(u32),
        Get(oneshot::Sender<u32>),
        Fail,
    }

    #[async_trait::async_trait]
    impl Actor for Tally {
        type Msg = TallyMsg;
        async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
            match msg {
                TallyMsg::Add(n) => self.0 += n,
                TallyMsg::Get(tx) => {
                    let _ = tx.send(self.0);
                }
                TallyMsg::Fail => anyhow::bail!("asked to fail"),
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn messages_are_processed_in_order() {
        let ActorHandle { addr, task } = spawn_actor(Tally(0), 4);
        addr.send(TallyMsg::Add(2)).await.ok();
        addr.send(TallyMsg::Add(3)).await.ok();
        let (tx, rx) = oneshot::channel();
        addr.send(TallyMsg::Get(tx)).await.ok();
        assert_eq!(rx.await.unwrap(), 5);
        drop(addr);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_stops_an_idle_actor() {
        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_actor_with_shutdown(Tally(0), 4, Some(rx));
        tx.send(()).unwrap();
        handle.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn handler_error_stops_the_actor() {
        let ActorHandle { addr, task } = spawn_actor(Tally(0), 4);
        addr.send(TallyMsg::Fail).await.ok();
        assert!(task.await.unwrap().is_err());
        assert!(addr.is_closed());
    }
}
