//! Binary entrypoint for the bbforum CLI.
//!
//! Commands:
//! - `init` - write a starter `bbforum.toml`
//! - `render [TEXT]` - translate shorthand markup (reads stdin when TEXT is absent)
//! - `login <username>` / `register <username>` / `logout` / `whoami`
//! - `topics` - list topics; `topic <id> [--watch]` - show (and follow) a topic
//! - `post`, `edit`, `delete-message` - message actions inside a topic
//! - `users [--filter]`, `user-edit`, `user-delete`, `check-name` - administration
//!
//! See the library crate docs for module-level details: `bbforum::`.
use std::io::Read;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};

use bbforum::api::{ForumApi, HttpForumApi};
use bbforum::config::Config;
use bbforum::markup;
use bbforum::session::SessionStore;
use bbforum::state::AppState;
use bbforum::ui::{AssumeYes, Confirm, ConfirmPrompt, ConsoleNotifier, Notifier, StdinConfirm};
use bbforum::validation::{NameCheck, UniqueNameCheck};
use bbforum::views::{
    AccountView, ManageUsersView, RenderedMessage, TopicView, TopicWatch, UserForm, ViewContext,
};

#[derive(Parser)]
#[command(name = "bbforum")]
#[command(about = "A command line client for bulletin-board style forums")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "bbforum.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    #[command(flatten)]
    Forum(ForumCommand),
}

/// Commands that run against a loaded configuration.
#[derive(Subcommand)]
enum ForumCommand {
    /// Translate shorthand markup to display markup
    Render {
        /// Text to translate; read from stdin when omitted
        text: Option<String>,
    },
    /// Sign in and remember the session
    Login { username: String },
    /// Create a new account
    Register { username: String },
    /// Forget the remembered session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List topics
    Topics,
    /// Show a topic's messages
    Topic {
        id: i64,
        /// Keep running and print the topic again whenever it changes
        #[arg(short, long)]
        watch: bool,
    },
    /// Post a message to a topic
    Post { topic: i64, content: String },
    /// Replace the content of one of your messages
    Edit {
        topic: i64,
        message: i64,
        content: String,
    },
    /// Delete a message
    DeleteMessage {
        topic: i64,
        message: i64,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// List users (administrators)
    Users {
        /// Only show usernames containing this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Rename a user or change their admin flag
    UserEdit {
        id: i64,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        admin: Option<bool>,
    },
    /// Delete a user
    UserDelete {
        id: i64,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Check whether a username is still free
    CheckName { username: String },
}

/// Terminal confirmation, or none at all with `--yes`.
#[derive(Debug, Clone, Copy)]
struct CliConfirm {
    assume_yes: bool,
}

impl Confirm for CliConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        if self.assume_yes {
            AssumeYes.confirm(prompt).await
        } else {
            StdinConfirm.confirm(prompt).await
        }
    }
}

type Ctx = ViewContext<HttpForumApi, ConsoleNotifier, CliConfirm>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            Ok(())
        }
        Commands::Forum(command) => run(command, &cli.config, cli.verbose).await,
    }
}

async fn run(command: ForumCommand, config_path: &str, verbose: u8) -> Result<()> {
    // Rendering is offline; a missing config file is fine there.
    let config = match (&command, Config::load(config_path).await) {
        (_, Ok(config)) => config,
        (ForumCommand::Render { .. }, Err(_)) => Config::default(),
        (_, Err(e)) => return Err(e),
    };
    init_logging(&Some(config.clone()), verbose);
    debug!("Using backend {}", config.api.base_url);

    let api = Arc::new(HttpForumApi::new(&config.api)?);
    let state = Arc::new(AppState::new(SessionStore::new(&config.session.path)));
    state.restore();
    let context = |assume_yes: bool| -> Ctx {
        ViewContext::new(
            api.clone(),
            state.clone(),
            ConsoleNotifier,
            CliConfirm { assume_yes },
        )
        .configured(&config)
    };

    match command {
        ForumCommand::Render { text } => {
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            print!("{}", markup::translate(&text));
            if !text.ends_with('\n') {
                println!();
            }
        }
        ForumCommand::Login { username } => {
            let password = rpassword::prompt_password("Password: ")?;
            AccountView::new(context(false))
                .login(&username, &password)
                .await?;
        }
        ForumCommand::Register { username } => {
            let pass1 = rpassword::prompt_password("New password: ")?;
            let pass2 = rpassword::prompt_password("Confirm password: ")?;
            if pass1 != pass2 {
                return Err(anyhow!("passwords do not match"));
            }
            let user = AccountView::new(context(false))
                .register(&username, &pass1)
                .await?;
            println!("Account {} created; sign in with `bbforum login {}`", user.username, user.username);
        }
        ForumCommand::Logout => {
            AccountView::new(context(false)).logout()?;
            println!("Signed out.");
        }
        ForumCommand::Whoami => match AccountView::new(context(false)).whoami() {
            Some(user) => println!("{} ({})", user.username, user.role_name()),
            None => println!("Not signed in."),
        },
        ForumCommand::Topics => {
            let topics = api.list_topics().await?;
            if topics.is_empty() {
                println!("No topics yet.");
            }
            for topic in topics {
                println!(
                    "{:>5}  {}  {} ({} messages)",
                    topic.id.map(|i| i.to_string()).unwrap_or_default(),
                    topic.date.format("%Y-%m-%d %H:%M"),
                    topic.title,
                    topic.messages.len()
                );
            }
        }
        ForumCommand::Topic { id, watch } => {
            let mut view = TopicView::new(context(false));
            view.open(id).await?;
            print_topic(&view);
            if watch {
                let mut poll = TopicWatch::start(api.clone(), id, config.topic.refresh_interval());
                info!("Watching topic {} (Ctrl-C to stop)", id);
                loop {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => break,
                        next = poll.next() => match next {
                            Some(topic) => {
                                let changed = view.topic() != Some(&topic);
                                view.apply(topic);
                                if changed {
                                    print_topic(&view);
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        }
        ForumCommand::Post { topic, content } => {
            let mut view = TopicView::new(context(false));
            view.open(topic).await?;
            view.submit(&content).await?;
        }
        ForumCommand::Edit {
            topic,
            message,
            content,
        } => {
            let mut view = TopicView::new(context(false));
            view.open(topic).await?;
            view.select_message(message)?;
            view.submit(&content).await?;
        }
        ForumCommand::DeleteMessage { topic, message, yes } => {
            let mut view = TopicView::new(context(yes));
            view.open(topic).await?;
            view.delete_message(message).await?;
        }
        ForumCommand::Users { filter } => {
            let mut view = ManageUsersView::new(context(false));
            view.load().await?;
            if let Some(filter) = filter {
                view.set_filter(&filter);
            }
            for user in view.filtered() {
                println!(
                    "{:>5}  {:<30} {}",
                    user.id.map(|i| i.to_string()).unwrap_or_default(),
                    user.username,
                    user.role_name()
                );
            }
        }
        ForumCommand::UserEdit {
            id,
            username,
            admin,
        } => {
            let mut view = ManageUsersView::new(context(false));
            view.load().await?;
            let prefill = view
                .select_user(id)?
                .ok_or_else(|| anyhow!("user {} could not be selected", id))?;
            let form = UserForm {
                username: username.unwrap_or(prefill.username),
                is_admin: admin.unwrap_or(prefill.is_admin),
            };
            view.edit_user(&form).await?;
        }
        ForumCommand::UserDelete { id, yes } => {
            let mut view = ManageUsersView::new(context(yes));
            view.load().await?;
            view.delete_user(id).await?;
        }
        ForumCommand::CheckName { username } => {
            let mut check = UniqueNameCheck::new(api.clone(), config.validation.unique_name_debounce());
            match check.check(&username, None).await {
                NameCheck::Available(name) => println!("{} is available", name),
                NameCheck::Taken(name) => println!("{} is already taken", name),
                NameCheck::Failed { reason, .. } => return Err(anyhow!(reason)),
                other => debug!("Unexpected name check state: {:?}", other),
            }
        }
    }

    Ok(())
}

fn print_topic<A, N, C>(view: &TopicView<A, N, C>)
where
    A: ForumApi,
    N: Notifier,
    C: Confirm,
{
    let Some(topic) = view.topic() else {
        return;
    };
    println!("== {} ==", topic.title);
    for message in view.rendered() {
        print_message(&message);
    }
}

fn print_message(message: &RenderedMessage) {
    let id = message.id.map(|i| format!("#{}", i)).unwrap_or_default();
    let marker = if message.editable { "*" } else { " " };
    println!(
        "{}{:<6} {} {}\n    {}",
        marker,
        id,
        message.date.format("%Y-%m-%d %H:%M"),
        message.author,
        message.html.replace('\n', "\n    ")
    );
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Echo to the terminal only when someone is watching it; notices already print.
            let is_tty = atty::is(atty::Stream::Stderr) && verbosity > 0;
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
