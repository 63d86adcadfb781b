use std::sync::Arc;

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};

use intake_assist::client::HttpBackend;
use intake_assist::config::ClientConfig;
use intake_assist::driver::ConversationDriver;
use intake_assist::intake::{IntakeField, StageDecision};

const HELP: &str = "\
Commands:
  /form                 show the intake form
  /status               show stage progress
  /set <field> <value>  edit a form field
  /reset                start a fresh conversation
  /quit                 exit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ClientConfig::from_env()?;

    eprintln!("💬 Intake Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Agent: {}/{}", config.base_url, config.agent_id);
    eprintln!("   Transcript: {}/auth/comprehensive-record", config.auth_base_url);
    eprintln!("   User: {}", config.user_id);
    eprintln!("   Type a message and press Enter. /help for commands.\n");

    let backend = Arc::new(HttpBackend::new(&config));
    let mut driver = ConversationDriver::new(backend, config);

    // Pick up whatever the backend already recorded for this user.
    driver.refresh().await;

    if let Some(greeting) = driver.messages().first() {
        println!("{}\n", greeting.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprint!("> ");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Error reading stdin: {}", e);
                break;
            }
        };

        driver.session_mut().expire_notification(Utc::now());
        let line = line.trim();

        match line.split_once(' ').map_or((line, ""), |(c, rest)| (c, rest.trim())) {
            ("", _) => {}
            ("/quit", _) => break,
            ("/help", _) => eprintln!("{HELP}"),
            ("/form", _) => println!("\n{}\n", driver.session().form().to_summary()),
            ("/status", _) => {
                let status = driver.session().status();
                println!("\n{}\n", serde_json::to_string_pretty(&status)?);
            }
            ("/set", args) => match args.split_once(' ') {
                Some((field, value)) => match IntakeField::parse(field) {
                    Some(field) => {
                        driver.session_mut().set_field(field, value.trim());
                        eprintln!("✅ {} updated", field);
                    }
                    None => eprintln!("❌ Unknown field: {}", field),
                },
                None => eprintln!("Usage: /set <field> <value>"),
            },
            ("/reset", _) => match driver.reset().await {
                Ok(()) => {
                    eprintln!("✅ Session reset. Starting fresh conversation.\n");
                    if let Some(greeting) = driver.messages().first() {
                        println!("{}\n", greeting.text);
                    }
                }
                Err(e) => eprintln!("❌ Failed to reset session: {}", e),
            },
            _ => exchange(&mut driver, line).await,
        }

        eprint!("> ");
    }

    Ok(())
}

/// One message round trip followed by the delayed transcript refetch.
async fn exchange(driver: &mut ConversationDriver, text: &str) {
    eprintln!("⏳ ...");
    let Some(outcome) = driver.send(text).await else {
        return;
    };
    println!("\n{}\n", outcome.reply.text);

    match outcome.stage {
        Some(StageDecision::Advanced { to, .. }) => eprintln!(
            "📍 New stage: {} ({:.0}% complete)",
            to.label(),
            driver.session().progress()
        ),
        Some(StageDecision::Unrecognized) => eprintln!("ℹ️  Stage not recognized"),
        _ => {}
    }

    tokio::time::sleep(driver.config().refetch_delay).await;
    let refreshed = driver.refresh().await;

    if !refreshed.changed_fields.is_empty() {
        let names: Vec<String> = refreshed
            .changed_fields
            .iter()
            .map(|f| f.to_string())
            .collect();
        eprintln!("📝 Form updated: {}", names.join(", "));
    }
    if let Some(time) = refreshed.visit_confirmed {
        eprintln!("🎉 Your visit is scheduled for {}!", time);
    }
}
