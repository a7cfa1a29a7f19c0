use std::sync::Arc;

use anyhow::Context;
use mailhub::ai::OpenAiProvider;
use mailhub::config::{AiConfig, SmtpConfig};
use mailhub::delivery::{DeliveryOutcome, DeliveryPipeline};
use mailhub::refine::ContentRefiner;
use mailhub::spam::{RiskLevel, SpamScorer};
use mailhub::store::{EmailStore, LibSqlStore};
use mailhub::transport::SmtpMailer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("");

    match command {
        "score" => {
            let (subject, body) = two_args(&args, "score <subject> <body>");
            let scorer = SpamScorer::new();
            let score = scorer.score(&subject, &body);
            let level = RiskLevel::from_score(score);
            println!("spam score: {score:.2} ({})", level.label());
            for advisory in level.advisories() {
                println!("  - {advisory}");
            }
        }
        "refine" => {
            let (subject, body) = two_args(&args, "refine <subject> <body>");
            let provider = AiConfig::from_env()
                .map(|cfg| Arc::new(OpenAiProvider::new(cfg)) as Arc<dyn mailhub::ai::AiProvider>);
            let refiner = ContentRefiner::new(provider);
            eprintln!(
                "AI provider: {}",
                if refiner.is_available() { "configured" } else { "not configured (heuristics only)" }
            );

            let result = refiner.refine(&subject, &body).await;
            println!("Subject: {}", result.refined_subject);
            println!("\n{}", result.refined_body);
            if !result.suggestions.is_empty() {
                println!("\nSuggestions:");
                for suggestion in &result.suggestions {
                    println!("  - {suggestion}");
                }
            }
        }
        "send" => {
            if args.len() < 6 {
                usage("send <owner> <recipient> <subject> <body>");
            }
            let owner = &args[2];
            let recipient = &args[3];
            let subject = &args[4];
            let body = &args[5];

            let smtp = SmtpConfig::from_env()
                .context("SMTP configuration incomplete (export SMTP_HOST=smtp.example.com)")?;

            let db_path = std::env::var("MAILHUB_DB_PATH")
                .unwrap_or_else(|_| "./data/mailhub.db".to_string());
            let store: Arc<dyn EmailStore> = Arc::new(
                LibSqlStore::new_local(std::path::Path::new(&db_path))
                    .await
                    .with_context(|| format!("failed to open database at {db_path}"))?,
            );

            let from_address = smtp.from_address.clone();
            let transport = Arc::new(SmtpMailer::new(smtp));
            let pipeline = DeliveryPipeline::new(store, transport, from_address);

            match pipeline.send_email(owner, recipient, subject, body).await {
                DeliveryOutcome::Sent {
                    record_id,
                    message_id,
                } => {
                    println!("sent: record {record_id}, message id {message_id}");
                }
                DeliveryOutcome::Failed { record_id, reason } => {
                    match record_id {
                        Some(id) => eprintln!("failed (record {id} retained): {reason}"),
                        None => eprintln!("failed: {reason}"),
                    }
                    std::process::exit(1);
                }
            }
        }
        _ => {
            eprintln!("MailHub v{}", env!("CARGO_PKG_VERSION"));
            eprintln!("Usage:");
            eprintln!("  mailhub score <subject> <body>");
            eprintln!("  mailhub refine <subject> <body>");
            eprintln!("  mailhub send <owner> <recipient> <subject> <body>");
            std::process::exit(2);
        }
    }

    Ok(())
}

fn two_args(args: &[String], usage_line: &str) -> (String, String) {
    match (args.get(2), args.get(3)) {
        (Some(a), Some(b)) => (a.clone(), b.clone()),
        _ => usage(usage_line),
    }
}

fn usage(line: &str) -> ! {
    eprintln!("Usage: mailhub {line}");
    std::process::exit(2);
}
