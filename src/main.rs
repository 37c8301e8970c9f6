use std::sync::Arc;

use inquiry_assist::composer::ReplyComposer;
use inquiry_assist::config::AppConfig;
use inquiry_assist::llm::OpenAiBackend;
use inquiry_assist::logbook::InteractionLog;
use inquiry_assist::mailbox::ImapMailbox;
use inquiry_assist::outbound::SmtpSink;
use inquiry_assist::policy::PolicyDocument;
use inquiry_assist::runner::BatchRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A local .env is optional; the real environment always wins.
    dotenvy::dotenv().ok();

    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("  required: EMAIL_ADDRESS, EMAIL_PASSWORD, IMAP_SERVER, SMTP_SERVER, OPENAI_API_KEY");
            std::process::exit(1);
        }
    };

    tracing::info!(
        mailbox = %config.mailbox.mailbox,
        imap = %config.mailbox.host,
        model = %config.completion.model,
        log = %config.log_path,
        delivery = config.send_replies,
        "Starting inquiry run"
    );

    let mailbox = Arc::new(ImapMailbox::new(config.mailbox.clone()));
    let backend = Arc::new(OpenAiBackend::new(config.completion.clone()));
    let composer = ReplyComposer::new(PolicyDocument::standard(), backend);
    let log = InteractionLog::new(&config.log_path);
    let sink = Arc::new(SmtpSink::new(config.smtp.clone()));

    let runner = BatchRunner::new(mailbox, composer, log, sink, config.send_replies);
    let summary = runner.run_once().await?;

    tracing::info!(
        composed = summary.composed,
        delivered = summary.delivered,
        "Run finished"
    );
    Ok(())
}
