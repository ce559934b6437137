use crate::actor::{Actor, Addr, Context};
use anyhow::Result;
use subtext_common::{SchemaVersion, SubtextError};
use subtext_engine::{Analyst, ReplyOutcome, ReplyTone, Scan};
use tokio::sync::oneshot;
use uuid::Uuid;

/// Requests served by [`AnalystActor`]. Each carries its own reply channel.
pub enum AnalystMsg {
    Scan {
        input: String,
        reply: oneshot::Sender<subtext_common::Result<Scan>>,
    },
    Reply {
        tone: ReplyTone,
        reply: oneshot::Sender<subtext_common::Result<ReplyOutcome>>,
    },
    Raw {
        reply: oneshot::Sender<subtext_common::Result<String>>,
    },
    Reset {
        reply: oneshot::Sender<Uuid>,
    },
    SetSchema(SchemaVersion),
}

/// Serializes the user's actions against one [`Analyst`] session.
///
/// Failures belong to the request that caused them and go back through its
/// reply channel; the actor keeps running.
pub struct AnalystActor {
    analyst: Analyst,
}

impl AnalystActor {
    pub fn new(analyst: Analyst) -> Self {
        Self { analyst }
    }
}

#[async_trait::async_trait]
impl Actor for AnalystActor {
    type Msg = AnalystMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            AnalystMsg::Scan { input, reply } => {
                let res = self.analyst.scan(&input).await;
                if reply.send(res).is_err() {
                    tracing::debug!("actor.analyst.scan_abandoned");
                }
            }
            AnalystMsg::Reply { tone, reply } => {
                let res = self.analyst.reply(tone).await;
                if reply.send(res).is_err() {
                    tracing::debug!("actor.analyst.reply_abandoned");
                }
            }
            AnalystMsg::Raw { reply } => {
                let _ = reply.send(self.analyst.raw_json());
            }
            AnalystMsg::Reset { reply } => {
                let _ = reply.send(self.analyst.reset());
            }
            AnalystMsg::SetSchema(schema) => {
                tracing::info!(%schema, "actor.analyst.schema");
                self.analyst.set_schema(schema);
            }
        }
        Ok(())
    }
}

fn gone() -> SubtextError {
    SubtextError::Session("the analyst is no longer running".to_string())
}

/// Request/response helpers over the mailbox.
impl Addr<AnalystActor> {
    pub async fn scan(&self, input: impl Into<String>) -> subtext_common::Result<Scan> {
        let (reply, rx) = oneshot::channel();
        let input = input.into();
        self.send(AnalystMsg::Scan { input, reply })
            .await
            .map_err(|_| gone())?;
        rx.await.map_err(|_| gone())?
    }

    pub async fn reply(&self, tone: ReplyTone) -> subtext_common::Result<ReplyOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(AnalystMsg::Reply { tone, reply })
            .await
            .map_err(|_| gone())?;
        rx.await.map_err(|_| gone())?
    }

    pub async fn raw(&self) -> subtext_common::Result<String> {
        let (reply, rx) = oneshot::channel();
        self.send(AnalystMsg::Raw { reply }).await.map_err(|_| gone())?;
        rx.await.map_err(|_| gone())?
    }

    pub async fn reset(&self) -> subtext_common::Result<Uuid> {
        let (reply, rx) = oneshot::channel();
        self.send(AnalystMsg::Reset { reply }).await.map_err(|_| gone())?;
        rx.await.map_err(|_| gone())
    }

    pub async fn set_schema(&self, schema: SchemaVersion) -> subtext_common::Result<()> {
        self.send(AnalystMsg::SetSchema(schema))
            .await
            .map_err(|_| gone())
    }
}
