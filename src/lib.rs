pub mod cli;
pub mod commands;
pub mod config;
pub mod doc_processor;
pub mod error;
pub mod highlight;
pub mod llm;
pub mod logging;
pub mod output;
pub mod prompt;
pub mod session;

use clap::Parser;
use cli::{Cli, Command, DocumentArgs};
use config::Settings;
use doc_processor::UploadPolicy;
use error::AppError;
use output::TranscriptPrinter;
use session::Session;
use std::io::Write;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, info_span, Instrument};

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);
    config::load_dotenv();

    match dispatch(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &AppError) -> ExitCode {
    if err.is_warning() {
        eprintln!("warning: {}", err);
        ExitCode::SUCCESS
    } else if err.is_fatal() {
        eprintln!("configuration error: {}", err);
        ExitCode::from(2)
    } else {
        eprintln!("error: {}", err);
        ExitCode::FAILURE
    }
}

fn upload_policy(args: &DocumentArgs) -> UploadPolicy {
    UploadPolicy {
        include_markdown: args.markdown,
    }
}

async fn load_into(
    session: &mut Session,
    args: &DocumentArgs,
    char_budget: usize,
) -> Result<(), AppError> {
    let loaded = commands::document::load_document(
        session,
        args.file.as_deref(),
        args.text.as_deref(),
        upload_policy(args),
        char_budget,
    )
    .await?;

    if let Some(info) = loaded {
        let note = if info.truncated {
            format!(", only the first {} are sent", char_budget)
        } else {
            String::new()
        };
        eprintln!("Loaded {} ({} characters{}).", info.label, info.chars, note);
    }
    Ok(())
}

async fn dispatch(command: Command) -> Result<(), AppError> {
    match command {
        Command::Ask { document, question } => {
            let settings = Settings::from_env()?;
            let mut session = Session::new();
            let span = info_span!("session", id = %session.id());
            async {
                load_into(&mut session, &document, settings.char_budget).await?;
                let mut printer = TranscriptPrinter::stdout();
                commands::chat::ask(&settings, &mut session, &question, |chunk| {
                    printer.on_chunk(chunk)
                })
                .await?;
                Ok::<(), AppError>(())
            }
            .instrument(span)
            .await
        }
        Command::Chat { document } => {
            let settings = Settings::from_env()?;
            let mut session = Session::new();
            let span = info_span!("session", id = %session.id());
            async {
                load_into(&mut session, &document, settings.char_budget).await?;
                chat_loop(&settings, &mut session).await
            }
            .instrument(span)
            .await
        }
        Command::Highlight { document, output } => {
            // Highlighting is local; no credential needed.
            let mut session = Session::new();
            load_into(&mut session, &document, prompt::DEFAULT_CHAR_BUDGET).await?;
            let Some(doc) = session.document() else {
                return Err(AppError::Input(
                    "Nothing to highlight. Pass --file or --text.".into(),
                ));
            };

            let report = commands::highlight::highlight_document(doc);
            println!("{}", highlight::underline_beki(doc.text()));
            eprintln!("{} べき expression(s) found.", report.phrases.len());
            if let Some(path) = output {
                commands::highlight::export_html(&report, &path).await?;
                eprintln!("Wrote {}.", path.display());
            }
            Ok(())
        }
        Command::Settings => {
            let settings = Settings::from_env()?;
            for (key, value) in commands::settings::get_settings(&settings, UploadPolicy::default()) {
                println!("{:<22} {}", key, value);
            }
            Ok(())
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Quit,
    Blank,
    Message(&'a str),
}

fn chat_input(line: &str) -> ChatInput<'_> {
    match line.trim() {
        "/quit" | "/exit" => ChatInput::Quit,
        "" => ChatInput::Blank,
        message => ChatInput::Message(message),
    }
}

async fn chat_loop(settings: &Settings, session: &mut Session) -> Result<(), AppError> {
    eprintln!("Type a message and press Enter. /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        output::speaker(&mut std::io::stdout(), "you");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = match chat_input(&line) {
            ChatInput::Quit => break,
            ChatInput::Blank => continue,
            ChatInput::Message(message) => message,
        };

        output::speaker(&mut std::io::stdout(), "assistant");
        let mut printer = TranscriptPrinter::stdout();
        let result =
            commands::chat::send_message(settings, session, line, |chunk| printer.on_chunk(chunk))
                .await;

        if let Err(err) = result {
            // Only configuration problems end the session.
            if err.is_fatal() {
                return Err(err);
            }
            println!();
            report(&err);
        }
        let _ = std::io::stdout().flush();
    }

    info!(turns = session.history().len(), "chat ended");
    Ok(())
}
