use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use clinic_assistant::telemetry::init_tracing;
use clinic_assistant::{AnswerGenerator, AssistantConfig, ClinicAssistant, FallbackAnswerGenerator, ReplyKind};
use clinic_booking::{BookingNotifier, InMemoryBookingStore, LogNotifier, PatientProfile};
use clinic_rag::{EmbeddingProvider, FileIndexStore, HashingEmbeddingProvider, IndexStatus};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;

/// Chat with the Smiles Dental Care assistant.
#[derive(Parser, Debug)]
#[command(name = "clinic", version, about, long_about = None)]
struct Cli {
    /// Patient id; indexes are stored per id
    #[arg(long, default_value = "guest")]
    user: String,

    /// Patient name used in bookings
    #[arg(long, default_value = "Guest")]
    name: String,

    /// Patient email for booking confirmations
    #[arg(long, default_value = "guest@example.com")]
    email: String,

    /// Phone number on file; skips the phone question when booking
    #[arg(long)]
    phone: Option<String>,

    /// Documents (text or PDF) that replace the patient's knowledge base before chatting
    #[arg(long, value_name = "FILE", num_args = 1..)]
    ingest: Vec<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = AssistantConfig::from_env().context("failed to load configuration")?;
    let assistant = build_assistant(&config)?;

    let mut profile = PatientProfile::new(&cli.user, &cli.name, &cli.email);
    if let Some(phone) = &cli.phone {
        profile = profile.with_phone(phone);
    }

    if !cli.ingest.is_empty() {
        ingest(&assistant, &profile.user_id, &cli.ingest).await?;
    }

    repl(&assistant, &profile).await
}

fn build_assistant(config: &AssistantConfig) -> anyhow::Result<ClinicAssistant> {
    let assistant = ClinicAssistant::builder()
        .booking_store(Arc::new(InMemoryBookingStore::new()))
        .notifier(notifier(config))
        .index_store(Arc::new(FileIndexStore::new(config.index_dir())))
        .embedding_provider(embedding_provider(config)?)
        .answer_generator(answer_generator(config)?)
        .rag_config(config.rag.clone())
        .session_ttl(config.session_ttl)
        .upload_dir(config.upload_dir())
        .build()?;
    info!(data_dir = %config.data_dir.display(), "Assistant ready");
    Ok(assistant)
}

fn embedding_provider(config: &AssistantConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    #[cfg(feature = "openai")]
    {
        use clinic_rag::openai::OpenAiCompatibleEmbeddingProvider;

        if let Some(api_key) = &config.embedding.api_key {
            let mut provider = OpenAiCompatibleEmbeddingProvider::new(api_key.clone())?;
            if let Some(base_url) = &config.embedding.base_url {
                provider = provider.with_base_url(base_url);
            }
            if let Some(model) = &config.embedding.model {
                provider = provider.with_model(model);
            }
            if let Some(dimensions) = config.embedding.dimensions {
                provider = provider.with_dimensions(dimensions);
            }
            return Ok(Arc::new(provider));
        }
    }

    Ok(Arc::new(HashingEmbeddingProvider::new(config.embedding.hashing_dimensions())))
}

fn answer_generator(config: &AssistantConfig) -> anyhow::Result<Arc<dyn AnswerGenerator>> {
    #[cfg(feature = "groq")]
    {
        use clinic_assistant::groq::ChatCompletionsAnswerGenerator;

        if let Some(generator) = ChatCompletionsAnswerGenerator::from_settings(&config.chat)? {
            return Ok(Arc::new(generator));
        }
    }

    if config.chat.api_key.is_some() {
        tracing::warn!("GROQ_API_KEY is set but this build has no chat client; enable the `groq` feature");
    }
    Ok(Arc::new(FallbackAnswerGenerator))
}

fn notifier(config: &AssistantConfig) -> Arc<dyn BookingNotifier> {
    #[cfg(feature = "smtp")]
    {
        use clinic_booking::smtp::SmtpNotifier;

        if let (Some(user), Some(password)) = (&config.email.user, &config.email.password) {
            let notifier = SmtpNotifier::new(&config.email.host, config.email.port, user)
                .with_password(password)
                .with_from_name(&config.email.from_name);
            return Arc::new(notifier);
        }
    }

    if config.email.is_configured() {
        tracing::warn!("Email settings found but this build cannot send mail; enable the `smtp` feature");
    }
    Arc::new(LogNotifier::new())
}

async fn ingest(assistant: &ClinicAssistant, user_id: &str, paths: &[PathBuf]) -> anyhow::Result<()> {
    let report = assistant.ingest_documents(user_id, paths).await.context("failed to ingest documents")?;
    for path in &report.skipped {
        println!("Skipped {}: the file could not be read.", path.display());
    }
    match report.outcome {
        None => println!("No readable text found in {} document(s).", report.stored),
        Some(outcome) => println!("Indexed {} of {} document(s): {outcome:?}", report.readable, report.stored),
    }
    Ok(())
}

const HELP: &str = "\
Commands:
  /help             show this help
  /status           show the state of your document index
  /ingest FILE...   replace your knowledge base with FILE...
  /new              start a new conversation
  /quit             exit";

async fn repl(assistant: &ClinicAssistant, profile: &PatientProfile) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut session_id = assistant.start_session().await;

    println!("Smiles Dental Care assistant. Ask a question or say 'book appointment'.");
    println!("Type /help for commands, /quit to exit.\n");

    loop {
        let line = match editor.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(input);

        match input.split_whitespace().next() {
            Some("/quit" | "/exit" | "/q") => break,
            Some("/help") => println!("{HELP}\n"),
            Some("/new") => {
                session_id = assistant.start_session().await;
                println!("Started a new conversation.\n");
            }
            Some("/status") => match assistant.index_status(&profile.user_id).await? {
                IndexStatus::Empty => println!("No documents indexed yet.\n"),
                IndexStatus::Ready { chunks } => println!("Index ready with {chunks} chunks.\n"),
                IndexStatus::LoadFailed { reason } => println!("Saved index could not be loaded: {reason}\n"),
            },
            Some("/ingest") => {
                let paths: Vec<PathBuf> = input.split_whitespace().skip(1).map(PathBuf::from).collect();
                if paths.is_empty() {
                    println!("Usage: /ingest FILE...\n");
                } else if let Err(e) = ingest(assistant, &profile.user_id, &paths).await {
                    println!("{e:#}\n");
                }
            }
            _ => {
                let reply = assistant.handle_message(&session_id, profile, input).await;
                println!("\nassistant> {}\n", reply.text);
                if let ReplyKind::Booking { booking_id: Some(id), .. } = reply.kind {
                    info!(booking_id = %id, "Booking created from chat");
                }
            }
        }
    }

    Ok(())
}
