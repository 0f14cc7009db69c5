use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shared::backend::ChatBackend;
use shared::chat::{ProgressStage, RequestController, SubmitOutcome, SubmitRejection};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cli::ReplCommand;
use crate::render;

/// Line-oriented front end over one chat session.
pub struct Repl<B> {
    controller: RequestController<B>,
    show_log: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

impl<B> Repl<B>
where
    B: ChatBackend + 'static,
{
    pub fn new(controller: RequestController<B>, show_log: bool) -> Self {
        Self {
            controller,
            show_log: Arc::new(AtomicBool::new(show_log)),
        }
    }

    pub async fn run(self) -> io::Result<()> {
        print!("{}", render::transcript(&self.controller.snapshot()));
        println!("Commands: /new /log /retry /health /quit");

        let stage_task = tokio::spawn(watch_stages(self.controller.subscribe_stage()));
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut pending: Vec<JoinHandle<()>> = Vec::new();

        let result = loop {
            let line = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    debug!("interrupt received");
                    break Ok(());
                }
                line = lines.next_line() => line,
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => break Ok(()),
                Err(err) => break Err(err),
            };

            if self.handle_line(&line, &mut pending).await == Flow::Quit {
                break Ok(());
            }
        };

        abort_cycles(&mut pending);
        stage_task.abort();
        result
    }

    async fn handle_line(&self, line: &str, pending: &mut Vec<JoinHandle<()>>) -> Flow {
        match ReplCommand::parse(line) {
            ReplCommand::Blank => {}
            ReplCommand::Quit => return Flow::Quit,
            ReplCommand::NewConversation => {
                self.controller.reset_conversation();
                print!("{}", render::greeting());
            }
            ReplCommand::ToggleLog => {
                let now_shown = !self.show_log.fetch_xor(true, Ordering::SeqCst);
                if now_shown {
                    print!("{}", render::integrity_log(&self.controller.integrity_log()));
                } else {
                    println!("(integrity log hidden)");
                }
            }
            ReplCommand::Health => match self.controller.health().await {
                Ok(health) => println!("backend: {}", health.message),
                Err(err) => {
                    warn!(error_kind = err.kind(), "health probe failed: {err}");
                    println!("backend unreachable");
                }
            },
            ReplCommand::Retry => track_cycle(pending, self.spawn_cycle(None)),
            ReplCommand::Query(query) => track_cycle(pending, self.spawn_cycle(Some(query))),
        }
        Flow::Continue
    }

    /// Runs one cycle in the background so the prompt stays responsive.
    /// `None` resubmits the preserved draft.
    fn spawn_cycle(&self, query: Option<String>) -> JoinHandle<()> {
        let controller = self.controller.clone();
        let show_log = Arc::clone(&self.show_log);
        tokio::spawn(async move {
            let outcome = match query {
                Some(query) => controller.submit_query(query).await,
                None => controller.submit().await,
            };
            report_outcome(&controller, &outcome, show_log.load(Ordering::SeqCst));
        })
    }
}

/// A submission rejected as in flight still spawns a task, so every
/// unfinished one is kept until it settles.
fn track_cycle(pending: &mut Vec<JoinHandle<()>>, task: JoinHandle<()>) {
    pending.retain(|task| !task.is_finished());
    pending.push(task);
}

fn abort_cycles(pending: &mut Vec<JoinHandle<()>>) {
    for task in pending.drain(..) {
        task.abort();
    }
}

fn report_outcome<B: ChatBackend>(
    controller: &RequestController<B>,
    outcome: &SubmitOutcome,
    show_log: bool,
) {
    match outcome {
        SubmitOutcome::Completed { .. } => {
            let snapshot = controller.snapshot();
            if let Some(answer) = snapshot.turns.last() {
                print!("{}", render::turn(answer));
            }
            if show_log {
                print!("{}", render::integrity_log(&controller.integrity_log()));
            }
        }
        SubmitOutcome::Failed { .. } => {
            let draft = controller.snapshot().input_text;
            println!("(no answer received; /retry resends \"{draft}\")");
        }
        SubmitOutcome::Ignored(SubmitRejection::EmptyQuery) => {
            debug!("nothing to submit");
        }
        SubmitOutcome::Ignored(SubmitRejection::InFlight) | SubmitOutcome::Superseded { .. } => {}
    }
}

async fn watch_stages(mut stage_rx: watch::Receiver<ProgressStage>) {
    while stage_rx.changed().await.is_ok() {
        let stage = *stage_rx.borrow_and_update();
        debug!(stage = %stage, "progress stage changed");
        if let Some(indicator) = render::stage_indicator(stage) {
            print!("{indicator}");
        }
    }
}
