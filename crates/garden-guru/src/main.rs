//! A terminal front-end for Garden Guru.

#[macro_use]
extern crate tracing;

mod command;

use std::env;
use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use garden_guru::Config;
use garden_guru::core::{ImageInput, Outcome, Role, Snapshot, Workbench};
use garden_guru_model::ErrorKind;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::select;
use tokio::sync::watch;
use tokio::time::sleep;

use command::{Command, HELP};

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    debug!("loaded {config:?}");

    let workbench = config.into_workbench();
    let mut snapshots = workbench.subscribe();

    println!("{}", "🌱 Garden Guru".bright_green().bold());
    println!("{}", "Type /help for commands.".dimmed());

    if let Some(path) = env::args_os().nth(1) {
        analyze_file(&workbench, &mut snapshots, Path::new(&path)).await;
    }

    // One reader for the whole session, so lines buffered ahead of the
    // current one survive to the next prompt.
    let mut input = BufReader::new(io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut input).await else {
            break;
        };
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Image(path) => {
                analyze_file(&workbench, &mut snapshots, &path).await;
            }
            Command::Analyze => {
                if let Err(err) = workbench.analyze() {
                    println!("{}", err.bright_yellow());
                    continue;
                }
                wait_for_analysis(&mut snapshots).await;
            }
            Command::Clear => {
                workbench.clear_history();
                println!(
                    "{}",
                    "History cleared. The assistant still remembers the \
                     conversation, use /reset to start over."
                        .dimmed()
                );
            }
            Command::Reset => {
                workbench.reset_conversation();
                println!("{}", "Started a new conversation.".dimmed());
            }
            Command::Message(text) => {
                if let Err(err) = workbench.send_message(&text) {
                    println!("{}", err.bright_yellow());
                    continue;
                }
                wait_for_reply(&mut snapshots).await;
            }
        }
    }

    ExitCode::SUCCESS
}

async fn analyze_file(
    workbench: &Workbench,
    snapshots: &mut watch::Receiver<Snapshot>,
    path: &Path,
) {
    let image = match ImageInput::from_path(path).await {
        Ok(image) => image,
        Err(err) => {
            println!("{}", err.bright_red());
            return;
        }
    };
    workbench.select_image(image);
    if let Err(err) = workbench.analyze() {
        println!("{}", err.bright_yellow());
        return;
    }
    wait_for_analysis(snapshots).await;
}

async fn wait_for_analysis(snapshots: &mut watch::Receiver<Snapshot>) {
    let Some(snapshot) =
        wait_until(snapshots, "🔍 Analyzing...", |s| !s.analysis_busy).await
    else {
        return;
    };
    match &snapshot.analysis {
        Some(Outcome::Reply(text)) => {
            println!("{}", "Analysis Result".bright_green().bold());
            println!("{text}\n");
        }
        Some(Outcome::Failed(failure)) => {
            print_failure(failure.fallback(), failure.kind());
        }
        None => {}
    }
}

async fn wait_for_reply(snapshots: &mut watch::Receiver<Snapshot>) {
    let Some(snapshot) =
        wait_until(snapshots, "🤔 Thinking...", |s| !s.chat_busy).await
    else {
        return;
    };
    let Some(reply) = snapshot.transcript.last() else {
        return;
    };
    if reply.role != Role::Model {
        return;
    }
    match snapshot.last_chat_failure {
        Some(kind) => print_failure(&reply.text, kind),
        None => println!(
            "{}🌿 {}",
            BAR_CHAR.bright_green(),
            reply.text.bright_white()
        ),
    }
}

fn print_failure(text: &str, kind: ErrorKind) {
    println!("{}{}", BAR_CHAR.bright_red(), text.bright_red());
    debug!("failure kind: {kind}");
}

/// Shows a spinner until `done` holds for the latest snapshot.
async fn wait_until(
    snapshots: &mut watch::Receiver<Snapshot>,
    message: &'static str,
    done: impl Fn(&Snapshot) -> bool,
) -> Option<Snapshot> {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .map(|style| style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
        .ok();
    let mut progress_bar: Option<ProgressBar> = None;

    let result = loop {
        {
            let snapshot = snapshots.borrow_and_update();
            if done(&snapshot) {
                break Some(snapshot.clone());
            }
        }

        progress_bar
            .get_or_insert_with(|| {
                let progress_bar = ProgressBar::new_spinner();
                if let Some(style) = &progress_style {
                    progress_bar.set_style(style.clone());
                }
                progress_bar.set_message(message);
                progress_bar
            })
            .inc(1);

        select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break None;
                }
            },
            _ = sleep(Duration::from_millis(100)) => {}
        }
    };

    if let Some(progress_bar) = &progress_bar {
        progress_bar.finish_and_clear();
    }
    result
}

async fn read_line<R>(input: &mut Lines<R>) -> Option<String>
where
    R: AsyncBufRead + Unpin,
{
    match input.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
