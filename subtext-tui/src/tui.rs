use crate::{
    dispatch::{Dispatch, Job, Step},
    input::InputLine,
    render, styles,
    transcript::TranscriptLine,
    view::{self, ViewSnap},
};
use anyhow::Result;
use async_trait::async_trait;
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event as CtEvent, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};
use subtext_actors::{
    actor::{Actor, Addr, Context},
    analyst::AnalystActor,
    system::ShutdownHandle,
};
use subtext_engine::{ReplyOutcome, Scan, SchemaVersion};
use uuid::Uuid;

const BRAILLE_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

type Outcome<T> = subtext_common::Result<T>;

pub enum TuiMsg {
    InputEvent(CtEvent),
    Tick,
    ScanDone(Box<Outcome<Scan>>),
    ReplyDone(Outcome<ReplyOutcome>),
    RawDone(Outcome<String>),
    ResetDone(Outcome<Uuid>),
    OpError(String),
    Shutdown,
}

/// Leave raw mode and the alternate screen. Safe to call more than once.
pub fn restore_terminal() {
    disable_raw_mode().ok();
    let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
}

/// What a key press asks of the actor beyond editing the input.
enum KeyAction {
    Submit(String),
    Quit,
}

pub struct TuiActor {
    analyst: Addr<AnalystActor>,

    // terminal
    term: Terminal<CrosstermBackend<Stdout>>,
    tick_rate: Duration,
    last_tick: Instant,

    // ui state
    input: InputLine,
    lines: Vec<TranscriptLine>,
    scroll: usize, // from bottom
    dirty: bool,

    dispatch: Dispatch,
    spin_idx: usize,
    model: String,

    shutdown: ShutdownHandle,
}

impl TuiActor {
    pub fn new(
        analyst: Addr<AnalystActor>,
        schema: SchemaVersion,
        model: impl Into<String>,
        shutdown: ShutdownHandle,
    ) -> Result<Self> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
        let backend = CrosstermBackend::new(stdout);
        let mut term = Terminal::new(backend)?;
        term.clear()?;

        Ok(Self {
            analyst,
            term,
            tick_rate: Duration::from_millis(80),
            last_tick: Instant::now(),
            input: InputLine::default(),
            lines: vec![
                TranscriptLine::new(
                    "Paste a message or article, or a URL, and press Enter to analyze it.",
                    styles::system(),
                ),
                TranscriptLine::new("Type /help for commands.", styles::dim()),
                TranscriptLine::blank(),
            ],
            scroll: 0,
            dirty: true,
            dispatch: Dispatch::new(schema),
            spin_idx: 0,
            model: model.into(),
            shutdown,
        })
    }

    fn push_styled<S: Into<String>>(&mut self, s: S, style: ratatui::style::Style) {
        self.lines.push(TranscriptLine::new(s, style));
        self.dirty = true;
    }

    fn extend(&mut self, lines: Vec<TranscriptLine>) {
        self.lines.extend(lines);
        // New output snaps the view back to the bottom.
        self.scroll = 0;
        self.dirty = true;
    }

    fn spinner(&self) -> &'static str {
        if self.dispatch.busy().is_some() {
            BRAILLE_FRAMES[self.spin_idx % BRAILLE_FRAMES.len()]
        } else {
            " "
        }
    }

    fn finish(&mut self) {
        self.dispatch.finish();
        self.dirty = true;
    }

    fn step_spinner(&mut self) {
        if self.dispatch.busy().is_some() {
            self.spin_idx = (self.spin_idx + 1) % BRAILLE_FRAMES.len();
            self.dirty = true;
        }
    }

    fn draw(&mut self) -> Result<()> {
        let schema = self.dispatch.schema();
        let snap = ViewSnap {
            input: self.input.text(),
            input_cursor: self.input.cursor(),
            lines: &self.lines,
            scroll: self.scroll,
            busy: self.dispatch.busy(),
            spinner: self.spinner(),
            context: format!("· schema {schema} ({}) · {}", schema.label(), self.model),
        };
        view::draw(&mut self.term, &snap)
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<KeyAction> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('q'), KeyModifiers::CONTROL) => return Some(KeyAction::Quit),
            (KeyCode::PageUp, _) => self.scroll = self.scroll.saturating_add(5),
            (KeyCode::PageDown, _) => self.scroll = self.scroll.saturating_sub(5),
            (KeyCode::Up, _) => self.scroll = self.scroll.saturating_add(1),
            (KeyCode::Down, _) => self.scroll = self.scroll.saturating_sub(1),
            (KeyCode::Enter, _) => {
                self.dirty = true;
                return Some(KeyAction::Submit(self.input.take()));
            }
            (KeyCode::Left, _) => self.input.left(),
            (KeyCode::Right, _) => self.input.right(),
            (KeyCode::Home, _) => self.input.home(),
            (KeyCode::End, _) => self.input.end(),
            (KeyCode::Backspace, _) => self.input.backspace(),
            (KeyCode::Delete, _) => self.input.delete(),
            (KeyCode::Esc, _) => self.input.clear(),
            (KeyCode::Char(ch), _) => self.input.insert(ch),
            _ => return None,
        }
        self.dirty = true;
        None
    }

    fn apply(&mut self, step: Step, ctx: &mut Context<Self>) {
        match step {
            Step::Show(lines) => self.extend(lines),
            Step::Run(job) => self.run(job, ctx.addr()),
            Step::Quit => self.quit(ctx),
        }
    }

    fn quit(&mut self, ctx: &mut Context<Self>) {
        restore_terminal();
        self.shutdown.signal();
        ctx.stop();
    }

    /// Hand a job to the analyst; its result comes back as a message.
    fn run(&mut self, job: Job, me: Addr<TuiActor>) {
        let analyst = self.analyst.clone();
        match job {
            Job::Scan(input) => {
                tokio::spawn(async move {
                    let res = analyst.scan(input).await;
                    let _ = me.send(TuiMsg::ScanDone(Box::new(res))).await;
                });
            }
            Job::Reply(tone) => {
                tokio::spawn(async move {
                    let res = analyst.reply(tone).await;
                    let _ = me.send(TuiMsg::ReplyDone(res)).await;
                });
            }
            Job::Raw => {
                tokio::spawn(async move {
                    let res = analyst.raw().await;
                    let _ = me.send(TuiMsg::RawDone(res)).await;
                });
            }
            Job::Reset => {
                tokio::spawn(async move {
                    let res = analyst.reset().await;
                    let _ = me.send(TuiMsg::ResetDone(res)).await;
                });
            }
            Job::SetSchema(version) => {
                tokio::spawn(async move {
                    if let Err(e) = analyst.set_schema(version).await {
                        let _ = me.send(TuiMsg::OpError(e.to_string())).await;
                    }
                });
                self.push_styled(
                    format!("✓ Next analyses use schema {version} ({}).", version.label()),
                    styles::system(),
                );
            }
        }
        self.dirty = true;
    }
}

#[async_trait]
impl Actor for TuiActor {
    type Msg = TuiMsg;

    async fn handle(&mut self, msg: Self::Msg, ctx: &mut Context<Self>) -> Result<()> {
        match msg {
            TuiMsg::InputEvent(ev) => match ev {
                CtEvent::Key(k) => match self.handle_key(k) {
                    Some(KeyAction::Submit(line)) => {
                        let step = self.dispatch.submit(&line);
                        self.apply(step, ctx);
                    }
                    Some(KeyAction::Quit) => self.quit(ctx),
                    None => {}
                },
                CtEvent::Paste(text) => {
                    self.input.paste(&text);
                    self.dirty = true;
                }
                CtEvent::Resize(..) => self.dirty = true,
                _ => {}
            },
            TuiMsg::ScanDone(res) => {
                self.finish();
                match *res {
                    Ok(scan) => self.extend(render::scan_lines(&scan)),
                    Err(e) => self.extend(render::error_lines(&e)),
                }
            }
            TuiMsg::ReplyDone(res) => {
                self.finish();
                match res {
                    Ok(outcome) => self.extend(render::reply_lines(&outcome)),
                    Err(e) => self.extend(render::error_lines(&e)),
                }
            }
            TuiMsg::RawDone(res) => {
                self.finish();
                match res {
                    Ok(raw) => self.extend(render::raw_lines(&raw)),
                    Err(e) => self.extend(render::error_lines(&e)),
                }
            }
            TuiMsg::ResetDone(res) => {
                self.finish();
                match res {
                    Ok(session) => {
                        self.dispatch.forget_input();
                        self.lines.clear();
                        self.push_styled(format!("✓ New session {session}."), styles::system());
                        self.extend(vec![TranscriptLine::blank()]);
                    }
                    Err(e) => self.extend(render::error_lines(&e)),
                }
            }
            TuiMsg::OpError(e) => {
                self.push_styled(format!("× Error: {e}"), styles::error());
            }
            TuiMsg::Tick => {
                self.step_spinner();
                if self.dirty || self.last_tick.elapsed() >= self.tick_rate {
                    self.draw()?;
                    self.last_tick = Instant::now();
                    self.dirty = false;
                }
            }
            TuiMsg::Shutdown => self.quit(ctx),
        }

        Ok(())
    }
}
