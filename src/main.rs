use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sox_rs::adk::error::SoxError;
use sox_rs::sox::config::SoxConfig;
use sox_rs::sox::session::{read_history, EmailSession, SessionBinder};
use sox_rs::sox::tools::FileReplySink;
use sox_rs::sox::workflow::checkpoint::SqliteCheckpointStore;
use sox_rs::sox::workflow::graph::WorkflowGraph;
use sox_rs::sox::workflow::registry::ToolRegistry;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a session from an email session file
    Init {
        #[arg(short, long)]
        session: String,

        /// Email session as JSON or YAML
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Send one message and print the reply
    Chat {
        #[arg(short, long)]
        session: String,

        #[arg(short, long)]
        message: String,

        /// Extra context for summaries, JSON or plain text
        #[arg(long)]
        context: Option<String>,
    },
    /// Print the persisted conversation
    Show {
        #[arg(short, long)]
        session: String,
    },
}

impl Commands {
    /// `show` only reads the checkpoint store
    fn needs_model(&self) -> bool {
        !matches!(self, Commands::Show { .. })
    }
}

fn read_email_session(path: &Path) -> Result<EmailSession, SoxError> {
    let content = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(serde_json::from_str(&content)?),
        _ => Ok(serde_yaml::from_str(&content)?),
    }
}

fn build_binder(
    config: &SoxConfig,
    store: Arc<SqliteCheckpointStore>,
) -> Result<SessionBinder, SoxError> {
    let model = config.build_model()?;
    let sink = Arc::new(FileReplySink::new(config.draft_path.clone()));
    let registry = Arc::new(ToolRegistry::builtin(sink));
    let graph = WorkflowGraph::new(model, registry).with_max_tool_cycles(config.max_tool_cycles);
    Ok(SessionBinder::with_store(graph, store, config.self_id.clone()))
}

async fn render_history(
    store: &SqliteCheckpointStore,
    session: &str,
) -> Result<Vec<String>, SoxError> {
    let state = read_history(store, store, session).await?;
    Ok(state
        .messages
        .iter()
        .map(|m| format!("[{:?}] {}", m.role, m.text_content()))
        .collect())
}

#[tokio::main]
async fn main() -> Result<(), SoxError> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    let config = SoxConfig::load(args.config.as_deref())?;
    let store = config.open_store()?;

    if !args.command.needs_model() {
        log::debug!("Reading checkpoints without a model");
    }

    match args.command {
        Commands::Init { session, file } => {
            let email_session = read_email_session(&file)?;
            let binder = build_binder(&config, store)?;
            let thread_id = binder.initialize(&session, &email_session).await?;
            println!("Initialized session {} (thread {})", session, thread_id);
        }
        Commands::Chat {
            session,
            message,
            context,
        } => {
            let context = context.map(|raw| {
                serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
            });
            let binder = build_binder(&config, store)?;
            let reply = binder
                .continue_conversation(&session, &message, context.as_ref())
                .await?;
            println!("{}", reply);
        }
        Commands::Show { session } => {
            for line in render_history(&store, &session).await? {
                println!("{}", line);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sox_rs::sox::session::Person;
    use sox_rs::sox::config::IN_MEMORY;

    fn person(id: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            full_name: name.to_string(),
            email_address: format!("{}@example.com", id),
            phone_number: String::new(),
        }
    }

    #[test]
    fn test_only_show_skips_the_model() {
        let show = Args::try_parse_from(["sox", "show", "-s", "s1"]).unwrap();
        assert!(!show.command.needs_model());

        let chat = Args::try_parse_from(["sox", "chat", "-s", "s1", "-m", "hi"]).unwrap();
        assert!(chat.command.needs_model());

        let init = Args::try_parse_from(["sox", "init", "-s", "s1", "-f", "s.yaml"]).unwrap();
        assert!(init.command.needs_model());
    }

    #[tokio::test]
    async fn test_show_reads_store_with_offline_provider_session() {
        let mut config = SoxConfig::default();
        config.self_id = "alice".to_string();
        config.checkpoint_path = IN_MEMORY.to_string();
        config.model.provider = "mock".to_string();
        let store = config.open_store().unwrap();

        let session = EmailSession {
            subject: "Lunch".to_string(),
            sender: person("alice", "Alice"),
            receiver: person("bob", "Bob"),
            messages: vec![],
        };
        let binder = build_binder(&config, store.clone()).unwrap();
        binder.initialize("s1", &session).await.unwrap();
        drop(binder);

        // A provider that cannot be built does not matter for show
        config.model.provider = "gemini".to_string();
        assert!(config.build_model().is_err());

        let lines = render_history(&store, "s1").await.unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[Assistant] "));
        assert!(lines[1].starts_with("[System] "));

        assert!(render_history(&store, "s2").await.is_err());
    }
}
