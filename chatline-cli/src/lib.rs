mod cli;

pub use cli::Cli;
pub use cli::Command;
pub use cli::HistoryArgs;
pub use cli::LoadArgs;
pub use cli::ThreadsCommand;
pub use cli::TitleArgs;

use anyhow::Context;
use chatline_api::Backend;
use chatline_api::BackendConfig;
use chatline_api::LocalMessageRecord;
use chatline_api::MessageStream;
use chatline_api::RemoteMessage;
use chatline_api::Role;
use chatline_api::ThreadListAdapter;
use chatline_api::ThreadListOptions;
use chatline_api::ThreadMessage;
use futures::StreamExt;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    init_tracing();

    let config = apply_overrides(BackendConfig::from_env(), &cli);
    let backend = Backend::from_config(&config);
    let adapter = backend.thread_list(ThreadListOptions::default());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received; cancelling");
            ctrl_c.cancel();
        }
    });

    let json = cli.json;
    match cli.command {
        Command::Load(args) => {
            let chat_id = args
                .chat_id
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            let stream = backend
                .loader()
                .load_chat_message(&chat_id, &args.message, cancel)
                .await?;
            print_events(stream, json).await
        }
        Command::Threads(command) => run_threads(&adapter, command, json).await,
        Command::History(args) => run_history(&backend, &adapter, args, json).await,
        Command::Title(args) => {
            let messages: Vec<ThreadMessage> = args
                .messages
                .iter()
                .map(|text| ThreadMessage::text(Uuid::new_v4().to_string(), Role::User, text))
                .collect();
            let title = adapter
                .generate_title(&args.thread_id, &messages, cancel)
                .await?
                .last_text()
                .await?;
            match (title, json) {
                (Some(title), true) => println!("{}", json!({ "title": title })),
                (Some(title), false) => println!("{title}"),
                (None, _) => anyhow::bail!("the service produced no title"),
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    let default_level = "error";
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

/// Command-line flags win over the environment.
fn apply_overrides(mut config: BackendConfig, cli: &Cli) -> BackendConfig {
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.as_str());
    }
    if let Some(api_key) = &cli.api_key {
        config = config.with_api_key(api_key.as_str());
    }
    config
}

async fn print_events(mut stream: MessageStream, json: bool) -> anyhow::Result<()> {
    while let Some(event) = stream.next().await {
        let event = event?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
            continue;
        }
        match event {
            RemoteMessage::Text(text) => println!("{}", text.content),
            RemoteMessage::Metric(metric) => {
                println!("{}", serde_json::to_string_pretty(&metric)?);
            }
        }
    }
    Ok(())
}

async fn run_threads(
    adapter: &ThreadListAdapter,
    command: ThreadsCommand,
    json: bool,
) -> anyhow::Result<()> {
    match command {
        ThreadsCommand::List => {
            let listed = adapter.list().await?;
            for thread in listed.threads {
                if json {
                    println!("{}", serde_json::to_string(&thread)?);
                } else {
                    let status = serde_json::to_value(thread.status)?;
                    println!(
                        "{}\t{}\t{}",
                        thread.remote_id,
                        status.as_str().unwrap_or_default(),
                        thread.title
                    );
                }
            }
        }
        ThreadsCommand::Create => {
            let created = adapter
                .initialize(&format!("cli-{}", Uuid::new_v4()))
                .await?;
            if json {
                println!(
                    "{}",
                    json!({ "remote_id": created.remote_id, "external_id": created.external_id })
                );
            } else {
                println!("{}", created.remote_id);
            }
        }
        ThreadsCommand::Rename { thread_id, title } => adapter.rename(&thread_id, &title).await?,
        ThreadsCommand::Archive { thread_id } => adapter.archive(&thread_id).await?,
        ThreadsCommand::Unarchive { thread_id } => adapter.unarchive(&thread_id).await?,
        ThreadsCommand::Delete { thread_id } => adapter.delete(&thread_id).await?,
    }
    Ok(())
}

async fn run_history(
    backend: &Backend,
    adapter: &ThreadListAdapter,
    args: HistoryArgs,
    json: bool,
) -> anyhow::Result<()> {
    let thread = match &args.thread_id {
        Some(thread_id) => {
            let listed = adapter.list().await?;
            let descriptor = listed
                .threads
                .iter()
                .find(|thread| &thread.remote_id == thread_id)
                .with_context(|| format!("thread {thread_id} not found"))?;
            backend.open_thread(adapter, descriptor)
        }
        None => backend.new_thread(adapter),
    };
    let history = backend.history(&thread);

    let mut parent: Option<String> = None;
    for text in &args.append {
        let record = LocalMessageRecord::new(
            parent.take(),
            ThreadMessage::text(Uuid::new_v4().to_string(), Role::User, text),
        );
        let local_id = record.local_id.clone();
        history.append(record).await?;
        parent = Some(local_id);
    }

    for entry in history.load().await?.messages {
        let role = serde_json::to_value(entry.message.role)?;
        let role = role.as_str().unwrap_or_default();
        if json {
            println!(
                "{}",
                json!({
                    "id": entry.message.id,
                    "parent_id": entry.parent_id,
                    "role": role,
                    "text": entry.message.text_content(),
                })
            );
        } else {
            println!("{role}: {}", entry.message.text_content());
        }
    }
    Ok(())
}
