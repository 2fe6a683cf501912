use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tutor_translate_lib::{
    config, languages, provider, Host, ProviderKind, Settings, TranslationRequest, TranslationResult,
    Translator,
};

#[derive(Parser)]
#[command(
    name = "tutor-translate",
    version,
    about = "Translate text into several languages at once, optionally correcting it first"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate text into one or more languages
    Translate {
        /// Text to translate
        text: String,
        /// Target language (repeatable); defaults to the saved targets
        #[arg(long = "to", short = 't')]
        to: Vec<String>,
        /// Source language; defaults to the saved source language
        #[arg(long, short = 'f')]
        from: Option<String>,
        /// Correct the input for natural phrasing before translating
        #[arg(long, conflicts_with = "no_tutor")]
        tutor: bool,
        /// Plain translation even if tutor mode is saved
        #[arg(long)]
        no_tutor: bool,
        /// Print the raw result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Translate text back into conversational English for verification
    Reverse { text: String },
    /// Check that the configured provider answers
    Test,
    /// List the languages offered by the pickers
    Languages,
    /// Inspect or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Answer JSON messages on stdin, one per line
    Serve,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print settings with API keys masked
    Show,
    /// Choose the provider used for requests
    SetProvider { provider: ProviderKind },
    /// Store Gemini credentials
    SetGemini {
        #[arg(long)]
        key: String,
        #[arg(long)]
        model: Option<String>,
    },
    /// Store OpenAI-compatible endpoint credentials
    SetOpenai {
        #[arg(long)]
        url: String,
        #[arg(long)]
        key: String,
        #[arg(long)]
        model: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = tutor_translate_lib::setup_logging();
    let cli = Cli::parse();
    let mut settings = config::load().unwrap_or_else(|e| {
        eprintln!("Could not read settings, using defaults: {:#}", e);
        Settings::default()
    });

    match cli.command {
        Command::Translate {
            text,
            to,
            from,
            tutor,
            no_tutor,
            json,
        } => {
            let source = from
                .map(|lang| languages::resolve(&lang))
                .unwrap_or_else(|| settings.source_language.clone());
            let targets: Vec<String> = if to.is_empty() {
                settings.target_languages.clone()
            } else {
                to.iter().map(|lang| languages::resolve(lang)).collect()
            };
            let tutor_mode = if tutor {
                true
            } else if no_tutor {
                false
            } else {
                settings.tutor_mode
            };

            let translator = Translator::from_settings(&settings)?;
            let request =
                TranslationRequest::new(text, source, targets, tutor_mode, translator.format());
            let result = translator.process_input(&request).await?;

            settings.remember_preferences(&request);
            config::save(&settings).context("save preferences")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result, &request);
            }
        }
        Command::Reverse { text } => {
            let translator = Translator::from_settings(&settings)?;
            println!("Verify (EN): {}", translator.reverse_check(&text).await?);
        }
        Command::Test => {
            let translator = Translator::from_settings(&settings)?;
            println!("{}", translator.test_connection().await?);
        }
        Command::Languages => {
            for lang in languages::SUPPORTED {
                println!("{}", lang);
            }
        }
        Command::Config { action } => run_config(action, settings).await?,
        Command::Serve => serve(settings).await?,
    }
    Ok(())
}

fn print_result(result: &TranslationResult, request: &TranslationRequest) {
    if let Some(corrected) = &result.corrected_text {
        println!("AI Tutor: {}", corrected);
    }
    for (lang, text) in result.ordered(request) {
        println!("{}: {}", lang, text);
    }
    for lang in result.missing_languages(request) {
        eprintln!("{}: (no translation returned)", lang);
    }
}

async fn run_config(action: ConfigAction, mut settings: Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
            return Ok(());
        }
        ConfigAction::SetProvider { provider } => settings.provider = provider,
        ConfigAction::SetGemini { key, model } => {
            settings.provider = ProviderKind::Gemini;
            settings.gemini_api_key = key;
            if let Some(model) = model {
                settings.gemini_model = model;
            }
            verify_credentials(&settings).await?;
        }
        ConfigAction::SetOpenai { url, key, model } => {
            settings.provider = ProviderKind::OpenAi;
            settings.openai_url = url;
            settings.openai_api_key = key;
            settings.openai_model = model;
            verify_credentials(&settings).await?;
        }
    }
    config::save(&settings)?;
    info!(provider = %settings.provider, "Settings saved");
    println!("Settings saved successfully!");
    Ok(())
}

/// Credentials are only stored once the provider has answered the test prompt.
async fn verify_credentials(candidate: &Settings) -> Result<()> {
    let message = test_candidate(candidate)
        .await
        .map_err(|e| anyhow!("API configuration failed: {:#}", e))?;
    println!("{}", message);
    Ok(())
}

async fn test_candidate(candidate: &Settings) -> Result<String> {
    provider::check_candidate(candidate)?;
    Translator::new(provider::from_settings(candidate)?)
        .test_connection()
        .await
}

async fn serve(settings: Settings) -> Result<()> {
    let host = Host::new(settings).with_config_path(config::config_path()?);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    info!("Message host started");

    while let Some(line) = lines.next_line().await.context("read message")? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = host.handle_json(&line).await;
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("Message host stopped");
    Ok(())
}
