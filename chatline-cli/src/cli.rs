use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(version, about = "Talk to a chatline conversation service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the service. Overrides CHATLINE_BACKEND_BASE_URL; without
    /// either, an in-memory backend with two sample threads is used.
    #[arg(long = "base-url", global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// API key sent as a bearer token. Overrides CHATLINE_BACKEND_API_KEY.
    #[arg(long = "api-key", global = true, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Print results as JSON lines instead of plain text.
    #[arg(long = "json", global = true, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a message to a chat and print the streamed reply.
    Load(LoadArgs),

    /// Manage threads.
    #[command(subcommand)]
    Threads(ThreadsCommand),

    /// Append messages to a thread and print its stored history.
    History(HistoryArgs),

    /// Ask the service for a title summarizing the given messages.
    Title(TitleArgs),
}

#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Chat the message belongs to. A fresh id is generated when omitted.
    #[arg(long = "chat-id")]
    pub chat_id: Option<String>,

    pub message: String,
}

#[derive(Subcommand, Debug)]
pub enum ThreadsCommand {
    List,
    Create,
    Rename { thread_id: String, title: String },
    Archive { thread_id: String },
    Unarchive { thread_id: String },
    Delete { thread_id: String },
}

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Existing thread to use. A new thread is created on the first append
    /// when omitted.
    #[arg(long = "thread")]
    pub thread_id: Option<String>,

    /// User messages to append in order, each replying to the previous one.
    #[arg(long = "append", value_name = "TEXT")]
    pub append: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TitleArgs {
    pub thread_id: String,

    /// User messages the title should summarize.
    #[arg(required = true, num_args = 1..)]
    pub messages: Vec<String>,
}
