//! The `steward` command line: ask one question, or chat in a loop.

#[macro_use]
extern crate tracing;

use std::io::Write;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use steward::core::TranscriptSource;
use steward::core::graph::draw_mermaid;
use steward::{AppConfig, DEFAULT_THREAD_ID, Session, SessionBuilder};
use steward_openai_model::OpenAIProvider;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Ask a tool-using model about the date, math or the web.
#[derive(Parser, Debug)]
#[command(name = "steward", version)]
struct Args {
    /// Ask this and exit. Without it an interactive session starts.
    prompt: Option<String>,

    /// Conversation thread. Messages on the same thread share history.
    #[arg(long, default_value = DEFAULT_THREAD_ID)]
    thread_id: String,

    /// Model name, overriding `OPENAI_MODEL`.
    #[arg(long)]
    model: Option<String>,

    /// Model endpoint, overriding `OPENAI_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Write the agent graph as a Mermaid chart to this file.
    #[arg(long, value_name = "PATH")]
    draw_graph: Option<PathBuf>,
}

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if let Some(path) = &args.draw_graph {
        tokio::fs::write(path, draw_mermaid())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("graph written to {}", path.display());
    }

    let config = AppConfig::from_env()?
        .override_model(args.model)
        .override_base_url(args.base_url);
    debug!("{config:?}");
    let model_provider = OpenAIProvider::new(config.openai_config());

    let (transcript_tx, mut transcript_rx) = mpsc::unbounded_channel();
    let session = SessionBuilder::with_model_provider(model_provider)
        .with_tavily_api_key(config.tavily_api_key)
        .with_thread_id(args.thread_id)
        .on_transcript(move |transcript, source| {
            transcript_tx.send((transcript.to_owned(), source)).ok();
        })
        .build();

    if let Some(prompt) = args.prompt {
        return ask(&session, &prompt, &mut transcript_rx).await;
    }

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Err(err) = ask(&session, line, &mut transcript_rx).await {
            println!("{}{}", BAR_CHAR.bright_red(), format!("{err:#}").red());
        }
        println!();
    }
    Ok(())
}

type TranscriptRx = mpsc::UnboundedReceiver<(String, TranscriptSource)>;

/// Writes transcript pieces as they arrive: streamed model text on one
/// open line, tool outputs on lines of their own.
struct TranscriptPrinter<W> {
    out: W,
    // Whether the assistant line is currently open.
    streaming: bool,
    streamed_any: bool,
}

impl<W: Write> TranscriptPrinter<W> {
    fn new(out: W) -> Self {
        Self {
            out,
            streaming: false,
            streamed_any: false,
        }
    }

    fn print(
        &mut self,
        transcript: &str,
        source: TranscriptSource,
    ) -> std::io::Result<()> {
        match source {
            TranscriptSource::Assistant => {
                if !self.streaming {
                    write!(self.out, "{}🤖 ", BAR_CHAR.bright_cyan())?;
                    self.streaming = true;
                    self.streamed_any = true;
                }
                write!(self.out, "{}", transcript.bright_white())?;
            }
            TranscriptSource::Tool => {
                if self.streaming {
                    writeln!(self.out)?;
                    self.streaming = false;
                }
                writeln!(
                    self.out,
                    "{}🔧 {}",
                    BAR_CHAR.bright_yellow(),
                    transcript.dimmed()
                )?;
            }
        }
        self.out.flush()
    }

    /// Prints whatever is still queued, so nothing from this run shows up
    /// during the next one.
    fn drain(&mut self, transcript_rx: &mut TranscriptRx) -> std::io::Result<()> {
        while let Ok((transcript, source)) = transcript_rx.try_recv() {
            self.print(&transcript, source)?;
        }
        Ok(())
    }

    fn finish(&mut self, answer: &str) -> std::io::Result<()> {
        if self.streaming {
            writeln!(self.out)?;
        } else if !self.streamed_any {
            writeln!(self.out, "{}🤖 {}", BAR_CHAR.bright_cyan(), answer.bright_white())?;
        }
        self.streaming = false;
        self.out.flush()
    }
}

/// Sends one message and prints the transcript as it arrives.
async fn ask(
    session: &Session,
    message: &str,
    transcript_rx: &mut TranscriptRx,
) -> Result<()> {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")?
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut progress_bar: Option<ProgressBar> = None;
    let mut printer = TranscriptPrinter::new(std::io::stdout());

    let mut answer = pin!(session.send_message(message));
    let result = loop {
        if !printer.streaming {
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message("🤔 Thinking...");
                    progress_bar
                })
                .inc(1);
        }

        let tick = sleep(Duration::from_millis(100));
        let (transcript, source) = select! {
            result = &mut answer => break result,
            Some(event) = transcript_rx.recv() => event,
            _ = tick => continue,
        };

        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        printer.print(&transcript, source)?;
    };

    if let Some(progress_bar) = progress_bar.take() {
        progress_bar.finish_and_clear();
    }
    printer.drain(transcript_rx)?;

    let answer = result.context("the agent failed")?;
    printer.finish(&answer)?;
    Ok(())
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_prints_every_queued_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(("Checking".to_owned(), TranscriptSource::Assistant)).unwrap();
        tx.send(("12:00".to_owned(), TranscriptSource::Tool)).unwrap();
        tx.send(("Noon.".to_owned(), TranscriptSource::Assistant)).unwrap();

        let mut printer = TranscriptPrinter::new(Vec::new());
        printer.drain(&mut rx).unwrap();
        assert!(rx.try_recv().is_err());
        printer.finish("Noon.").unwrap();

        let out = String::from_utf8(printer.out).unwrap();
        let checking = out.find("Checking").unwrap();
        let tool = out.find("12:00").unwrap();
        let noon = out.find("Noon.").unwrap();
        assert!(checking < tool && tool < noon);
        // The final answer was streamed, so it is not printed again.
        assert_eq!(out.matches("Noon.").count(), 1);
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn test_unstreamed_answer_is_printed() {
        let mut printer = TranscriptPrinter::new(Vec::new());
        printer.finish("42").unwrap();
        let out = String::from_utf8(printer.out).unwrap();
        assert!(out.contains("42"));
    }
}
