use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli_style;

use cli_style::{
    get_prompt, get_styles, print_empty_list, print_error, print_goodbye, print_key_value,
    print_list_item, print_section_footer, print_section_header, print_success, print_warning,
    print_welcome, TableBuilder,
};
use song_director_store::config::{AppConfig, CliConfig, FileConfig};
use song_director_store::{Property, Rank, Repository, SongDirector};

use rustyline::{
    completion::Completer, highlight::Highlighter, history::FileHistory, validate::Validator,
    CompletionType, Config, Editor, Helper,
};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(styles=get_styles())]
struct CliArgs {
    /// Path to a TOML config file. Its values override the flags below.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// SQLite file for the schedule store, kept in memory when omitted.
    #[clap(long, value_parser = parse_path)]
    pub schedule_db_path: Option<PathBuf>,

    /// Base URL of the user directory, identities are kept in memory when omitted.
    #[clap(long)]
    pub directory_url: Option<String>,

    /// Domain used to build user principal names in the directory.
    #[clap(long)]
    pub directory_domain: Option<String>,

    /// Timeout in seconds for directory requests.
    #[clap(long)]
    pub directory_timeout_sec: Option<u64>,
}

#[derive(Parser)]
#[command(styles=get_styles(),name = "")]
struct InnerCli {
    #[command(subcommand)]
    command: InnerCommand,
}

#[derive(Subcommand)]
enum InnerCommand {
    /// Creates a song director and prints the id it was stored under.
    Add {
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        phone: Option<String>,
        #[clap(long)]
        rank: Option<String>,
        /// Store the song director as inactive.
        #[clap(long)]
        inactive: bool,
    },

    /// Lists every song director that can be fully read.
    List,

    /// Shows one song director.
    Show { id: String },

    /// Reads a single property, e.g. `property 42 rank`.
    Property { id: String, property: String },

    /// Changes some fields of a song director, others are left untouched.
    Update {
        id: String,
        #[clap(long)]
        name: Option<String>,
        #[clap(long)]
        email: Option<String>,
        #[clap(long, conflicts_with = "clear_phone")]
        phone: Option<String>,
        #[clap(long)]
        clear_phone: bool,
        #[clap(long, conflicts_with = "clear_rank")]
        rank: Option<String>,
        #[clap(long)]
        clear_rank: bool,
        #[clap(long)]
        active: Option<bool>,
    },

    /// Removes a song director from every store.
    Remove { id: String },

    /// Lists the available ranks.
    Ranks,

    /// Shows where each store keeps its data.
    Where,

    /// Close this program.
    Exit,
}

enum CommandExecutionResult {
    Ok,
    Exit,
    Error(String),
}

struct Session {
    runtime: Runtime,
    repository: Arc<dyn Repository>,
    stores: Vec<(&'static str, String)>,
}

fn parse_rank(name: &str) -> Result<Rank, String> {
    Rank::from_name(name).ok_or_else(|| {
        let names: Vec<&str> = Rank::all().iter().map(|r| r.name()).collect();
        format!("Invalid rank '{}'. Valid ranks are: {}", name, names.join(", "))
    })
}

fn print_director(director: &SongDirector) {
    print_section_header(director.full_name());
    print_key_value("Id", director.id().unwrap_or("-"));
    print_key_value("Email", director.email_address());
    print_key_value("Phone", director.phone_number().unwrap_or("-"));
    print_key_value(
        "Rank",
        &director
            .rank()
            .map(|r| format!("{} ({})", r.name(), r.number()))
            .unwrap_or_else(|| "-".to_string()),
    );
    print_key_value("Active", if director.is_active() { "yes" } else { "no" });
    print_section_footer();
}

fn apply_changes(director: &mut SongDirector, command: UpdateChanges) -> Result<(), String> {
    if let Some(name) = command.name {
        director.set_full_name(&name).map_err(|e| e.to_string())?;
    }
    if let Some(email) = command.email {
        director
            .set_email_address(&email)
            .map_err(|e| e.to_string())?;
    }
    if command.clear_phone {
        director.set_phone_number(None);
    } else if let Some(phone) = command.phone {
        director.set_phone_number(Some(&phone));
    }
    if command.clear_rank {
        director.set_rank(None);
    } else if let Some(rank) = command.rank {
        director.set_rank(Some(parse_rank(&rank)?));
    }
    if let Some(active) = command.active {
        director.set_active(active);
    }
    Ok(())
}

struct UpdateChanges {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    clear_phone: bool,
    rank: Option<String>,
    clear_rank: bool,
    active: Option<bool>,
}

fn execute_command(line: String, session: &Session) -> CommandExecutionResult {
    let args = shlex::split(&line)
        .unwrap_or_else(|| line.split_whitespace().map(String::from).collect());
    let repository = &session.repository;

    match InnerCli::try_parse_from(std::iter::once(" ").chain(args.iter().map(String::as_str))) {
        Ok(cli) => match cli.command {
            InnerCommand::Add {
                name,
                email,
                phone,
                rank,
                inactive,
            } => {
                let director = match SongDirector::try_create(
                    Some(&name),
                    Some(&email),
                    phone.as_deref(),
                    rank.as_deref(),
                    !inactive,
                ) {
                    Ok(director) => director,
                    Err(err) => return CommandExecutionResult::Error(err.to_string()),
                };
                match session.runtime.block_on(repository.try_add(director)) {
                    Ok(stored) => {
                        print_success(&format!(
                            "Added {} with id {}",
                            stored.full_name(),
                            stored.id().unwrap_or("-")
                        ));
                    }
                    Err(err) => return CommandExecutionResult::Error(err.to_string()),
                }
            }
            InnerCommand::List => {
                let outcome = match session.runtime.block_on(repository.try_get_all()) {
                    Ok(outcome) => outcome,
                    Err(err) => return CommandExecutionResult::Error(err.to_string()),
                };
                if outcome.directors.is_empty() {
                    print_empty_list("No song directors");
                } else {
                    let mut table =
                        TableBuilder::new(&["Id", "Name", "Email", "Phone", "Rank", "Active"]);
                    for director in &outcome.directors {
                        table.add_row(vec![
                            director.id().unwrap_or("-").to_string(),
                            director.full_name().to_string(),
                            director.email_address().to_string(),
                            director.phone_number().unwrap_or("-").to_string(),
                            director
                                .rank()
                                .map(|r| r.name().to_string())
                                .unwrap_or_else(|| "-".to_string()),
                            if director.is_active() { "yes" } else { "no" }.to_string(),
                        ]);
                    }
                    table.print();
                }
                for err in &outcome.errors {
                    print_warning(&err.to_string());
                }
            }
            InnerCommand::Show { id } => {
                match session.runtime.block_on(repository.try_get_by_id(&id)) {
                    Ok(director) => print_director(&director),
                    Err(err) => return CommandExecutionResult::Error(err.to_string()),
                }
            }
            InnerCommand::Property { id, property } => {
                let property = match property.parse::<Property>() {
                    Ok(property) => property,
                    Err(err) => return CommandExecutionResult::Error(err),
                };
                match session
                    .runtime
                    .block_on(repository.try_find_property_by_id(&id, property))
                {
                    Ok(Some(value)) => print_key_value(property.as_str(), &value.to_string()),
                    Ok(None) => print_key_value(property.as_str(), "(not set)"),
                    Err(err) => return CommandExecutionResult::Error(err.to_string()),
                }
            }
            InnerCommand::Update {
                id,
                name,
                email,
                phone,
                clear_phone,
                rank,
                clear_rank,
                active,
            } => {
                let mut director = match session.runtime.block_on(repository.try_get_by_id(&id)) {
                    Ok(director) => director,
                    Err(err) => return CommandExecutionResult::Error(err.to_string()),
                };
                let changes = UpdateChanges {
                    name,
                    email,
                    phone,
                    clear_phone,
                    rank,
                    clear_rank,
                    active,
                };
                if let Err(err) = apply_changes(&mut director, changes) {
                    return CommandExecutionResult::Error(err);
                }
                if let Err(err) = session.runtime.block_on(repository.try_update(&director)) {
                    return CommandExecutionResult::Error(err.to_string());
                }
                print_success(&format!("Updated song director {}", id));
            }
            InnerCommand::Remove { id } => {
                if let Err(err) = session.runtime.block_on(repository.try_remove_by_id(&id)) {
                    return CommandExecutionResult::Error(err.to_string());
                }
                print_success(&format!("Removed song director {}", id));
            }
            InnerCommand::Ranks => {
                print_section_header("Ranks");
                for rank in Rank::all() {
                    print_list_item(&format!("{} {}", rank.number(), rank.name()));
                }
                print_section_footer();
            }
            InnerCommand::Where => {
                for (name, location) in &session.stores {
                    print_key_value(name, location);
                }
            }
            InnerCommand::Exit => return CommandExecutionResult::Exit,
        },

        Err(e) => {
            if e.print().is_err() {
                println!("{}", e);
            }
        }
    }
    CommandExecutionResult::Ok
}

#[derive(rustyline_derive::Hinter)]
struct CommandNameHelper {
    commands_names: Vec<String>,
}

impl CommandNameHelper {
    fn new() -> Self {
        let commands_names: Vec<String> = InnerCli::command()
            .get_subcommands()
            .map(|sc| sc.get_name().to_string())
            .collect();

        CommandNameHelper { commands_names }
    }
}

impl Completer for CommandNameHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        _pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        if line.contains(' ') {
            return Ok((0, Vec::with_capacity(0)));
        }
        let matches = self
            .commands_names
            .iter()
            .filter(|c| c.starts_with(line))
            .cloned()
            .collect::<Vec<_>>();

        Ok((0, matches))
    }
}

impl Highlighter for CommandNameHelper {}
impl Validator for CommandNameHelper {}
impl Helper for CommandNameHelper {}

fn describe_stores(config: &AppConfig) -> Vec<(&'static str, String)> {
    let identity = match &config.directory {
        Some(directory) => format!("{} ({})", directory.base_url, directory.domain),
        None => "in memory".to_string(),
    };
    let schedule = match &config.schedule_db_path {
        Some(path) => path.display().to_string(),
        None => "in memory".to_string(),
    };
    vec![("Identity", identity), ("Schedule", schedule)]
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        schedule_db_path: cli_args.schedule_db_path,
        directory_url: cli_args.directory_url,
        directory_domain: cli_args.directory_domain,
        directory_timeout_sec: cli_args.directory_timeout_sec,
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    let runtime = Runtime::new().context("Failed to start the async runtime")?;
    let repository = app_config.build_repository()?;
    let session = Session {
        runtime,
        repository: Arc::new(repository),
        stores: describe_stores(&app_config),
    };

    let config = Config::builder()
        .completion_type(CompletionType::List)
        .build();

    let mut rl = Editor::<CommandNameHelper, FileHistory>::with_config(config)?;
    rl.set_helper(Some(CommandNameHelper::new()));
    let _ = rl.clear_screen();

    print_welcome(&session.stores);

    loop {
        match rl.readline(&get_prompt()) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);
                match execute_command(line, &session) {
                    CommandExecutionResult::Ok => {}
                    CommandExecutionResult::Exit => break,
                    CommandExecutionResult::Error(err) => print_error(&err),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("CTRL-D: exiting.");
                break;
            }
            Err(e) => {
                print_error(&format!("{:?}", e));
                break;
            }
        }
    }
    print_goodbye();
    Ok(())
}
