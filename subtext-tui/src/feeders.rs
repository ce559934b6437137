use crate::tui::{TuiActor, TuiMsg};
use crossterm::event;
use std::time::Duration;
use subtext_actors::{actor::Addr, system::ShutdownHandle};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time;

const INPUT_POLL: Duration = Duration::from_millis(100);
const TICK: Duration = Duration::from_millis(80);

/// Terminal input on one blocking thread plus a render tick.
pub fn spawn_tui_feeders(tui: Addr<TuiActor>, shutdown: ShutdownHandle) {
    let tui_in = tui.clone();
    let mut shutdown_input = shutdown.subscribe();
    tokio::task::spawn_blocking(move || {
        loop {
            match shutdown_input.try_recv() {
                Err(TryRecvError::Empty) => {}
                _ => break,
            }
            let msg = match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => match event::read() {
                    Ok(e) => TuiMsg::InputEvent(e),
                    Err(e) => TuiMsg::OpError(format!("input: {e}")),
                },
                Err(e) => {
                    let _ = tui_in.blocking_send(TuiMsg::OpError(format!("input: {e}")));
                    break;
                }
            };
            if tui_in.blocking_send(msg).is_err() {
                break;
            }
        }
        tracing::debug!("tui.feeder.input.stopped");
    });

    let tui_tick = tui;
    let mut shutdown_tick = shutdown.subscribe();
    tokio::spawn(async move {
        let mut interval = time::interval(TICK);
        loop {
            tokio::select! {
                _ = shutdown_tick.recv() => break,
                _ = interval.tick() => {
                    let _ = tui_tick.try_send(TuiMsg::Tick);
                }
            }
        }
    });
}
