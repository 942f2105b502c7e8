use anyhow::{Context, Result};
use mailsteps::agent::{LlmClientConfig, OpenAiClient};
use mailsteps::cli::commands::{ConfigCommand, EditStepArgs, HistoryCommand, RunCommand, StepsCommand};
use mailsteps::cli::output::*;
use mailsteps::cli::{Cli, Command};
use mailsteps::execution::PipelineRunner;
use mailsteps::persistence::{replay, HistoryStore, InMemoryStorage, SettingsStore, StorageBackend, StorageHistory};
use mailsteps::steps::{ConfigFormat, FsTemplateSource, StepStore};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let storage = open_storage(&cli).await?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_analysis(cmd, &cli, storage).await?,
        Command::Steps(cmd) => manage_steps(cmd, &cli, storage).await?,
        Command::History(cmd) => show_history(cmd, &cli, storage).await?,
        Command::Config(cmd) => manage_config(cmd, &cli, storage).await?,
    }

    Ok(())
}

#[cfg(feature = "sqlite")]
async fn open_storage(cli: &Cli) -> Result<Arc<dyn StorageBackend>> {
    use mailsteps::persistence::{store::DATABASE_FILE, SqliteStorage};

    let path = match &cli.data_dir {
        Some(dir) => dir.join(DATABASE_FILE),
        None => SqliteStorage::default_path(),
    };
    debug!("Opening store at {}", path.display());
    Ok(Arc::new(SqliteStorage::new(&path).await?))
}

#[cfg(not(feature = "sqlite"))]
async fn open_storage(_cli: &Cli) -> Result<Arc<dyn StorageBackend>> {
    tracing::warn!("Built without SQLite support; settings last for this run only");
    Ok(Arc::new(InMemoryStorage::new()))
}

fn step_store(cli: &Cli, storage: Arc<dyn StorageBackend>) -> StepStore {
    let templates = Arc::new(FsTemplateSource::new(&cli.assets_dir));
    StepStore::new(storage, templates, &cli.assets_dir)
}

async fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .context("Failed to read message from stdin")?;
            Ok(text)
        }
    }
}

async fn run_analysis(cmd: &RunCommand, cli: &Cli, storage: Arc<dyn StorageBackend>) -> Result<()> {
    let message = read_input(cmd.file.as_deref()).await?;

    let settings = SettingsStore::new(storage.clone(), &cli.assets_dir);
    let mut api = settings.api_config().await?;
    if let Some(key) = &cmd.api_key {
        api.api_key = key.clone();
    }
    if let Some(model) = &cmd.model {
        api.model = model.clone();
    }

    let mut store = step_store(cli, storage.clone());
    let steps = store.load(cmd.default_steps).await?;

    let mut client_config = LlmClientConfig::default();
    if let Some(endpoint) = &cmd.endpoint {
        client_config = client_config.with_endpoint(endpoint);
    }
    if let Some(timeout) = cmd.timeout {
        client_config = client_config.with_timeout(timeout);
    }
    let client = OpenAiClient::new(client_config)?;

    // Set up history
    let history_storage: Arc<dyn StorageBackend> = if cmd.no_history {
        Arc::new(InMemoryStorage::new())
    } else {
        storage
    };
    let history = Arc::new(StorageHistory::new(history_storage));

    let mut runner = PipelineRunner::new(Arc::new(client), history)
        .with_progress(Arc::new(ProgressBarSink::new()))
        .with_notifier(Arc::new(ConsoleNotifier))
        .with_policy(cmd.on_error.into());

    println!(
        "{}Analyzing with {} step(s) using {}",
        ROCKET,
        style(steps.len().max(1)).cyan(),
        style(&api.model).bold()
    );

    let outcome = match runner.run(&message, &steps, &api).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome.results)?);
    } else if steps.is_empty() {
        // The built-in basic analysis ran in place of the empty step set
        let basic = vec![mailsteps::Step::basic_analysis()];
        print!("{}", format_results(&replay_results(&basic, &outcome.results)));
    } else {
        print!("{}", format_results(&replay_results(&steps, &outcome.results)));
    }

    if !outcome.failed_steps.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}

async fn manage_steps(cmd: &StepsCommand, cli: &Cli, storage: Arc<dyn StorageBackend>) -> Result<()> {
    let mut store = step_store(cli, storage);
    store.load(false).await?;

    match cmd {
        StepsCommand::List { json } => {
            if *json {
                println!("{}", serde_json::to_string_pretty(store.steps())?);
            } else {
                for step in store.steps() {
                    println!("{}", format_step_line(step));
                }
            }
        }
        StepsCommand::Show { id } => match store.get(id) {
            Some(step) => println!("{}", format_step_detail(step)),
            None => not_found(id),
        },
        StepsCommand::Create => {
            let step = store.create().await?;
            println!("{}Created {}", CHECK, style(&step.id).cyan());
        }
        StepsCommand::Duplicate { id } => match store.clone_step(id).await? {
            Some(step) => println!("{}Created {} from {}", CHECK, style(&step.id).cyan(), id),
            None => not_found(id),
        },
        StepsCommand::Delete { id } => {
            if store.delete(id).await? {
                println!("{}Deleted {}", CHECK, style(id).cyan());
            } else {
                not_found(id);
            }
        }
        StepsCommand::Edit(args) => edit_step(&mut store, args).await?,
        StepsCommand::Reset { id } => match store.reset_to_original(id).await? {
            Some(step) => println!("{}Reset {} to its template", CHECK, style(&step.id).cyan()),
            None => {
                println!("{}{} cannot be reset", CROSS, style(id).cyan());
                std::process::exit(1);
            }
        },
        StepsCommand::Move { id, position } => {
            if store.move_step(id, *position).await? {
                for step in store.steps() {
                    println!("{}", format_step_line(step));
                }
            } else {
                not_found(id);
            }
        }
        StepsCommand::RestoreDefaults => {
            let steps = store.restore_defaults().await?;
            println!("{}Restored {} default step(s)", CHECK, steps.len());
        }
        StepsCommand::Import { file } => {
            let text = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let steps = store
                .import_config(&text, ConfigFormat::from_path(file))
                .await
                .context("Step configuration was not imported")?;
            println!("{}Imported {} step(s)", CHECK, steps.len());
        }
    }

    Ok(())
}

async fn edit_step(store: &mut StepStore, args: &EditStepArgs) -> Result<()> {
    let Some(current) = store.get(&args.id).cloned() else {
        not_found(&args.id);
    };

    let prompt = match (&args.prompt, &args.prompt_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_input(Some(path.as_path())).await?,
        (None, None) => current.content.step_prompt.clone(),
    };
    let instructions = match (&args.instructions, &args.instructions_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_input(Some(path.as_path())).await?,
        (None, None) => current.content.llm_instructions.clone(),
    };
    let name = args.name.as_deref().unwrap_or(&current.menu_name);

    let outcome = store
        .save_changes(&args.id, name, &prompt, &instructions, args.new_id.as_deref())
        .await?;
    if !outcome.success {
        println!("{}{}", CROSS, style(&outcome.message).red());
        std::process::exit(1);
    }
    if let Some(step) = outcome.step {
        println!("{}{}", CHECK, format_step_line(&step));
    }
    Ok(())
}

async fn show_history(cmd: &HistoryCommand, cli: &Cli, storage: Arc<dyn StorageBackend>) -> Result<()> {
    let history = StorageHistory::new(storage.clone());

    match cmd {
        HistoryCommand::List { json } => {
            let entries = history.list().await?;
            if entries.is_empty() {
                println!("{}No saved analyses", INFO);
            } else if *json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (index, entry) in entries.iter().enumerate() {
                    println!("{}", format_history_entry(index, entry));
                }
            }
        }
        HistoryCommand::Show { index } => {
            let Some(entry) = history.get(*index).await? else {
                println!("{}No analysis at index {}", WARN, index);
                std::process::exit(1);
            };
            let mut store = step_store(cli, storage);
            let steps = store.load(false).await?;

            println!("{}", format_history_entry(*index, &entry));
            println!("\n{}\n", entry.message.trim());
            print!("{}", format_results(&replay(&entry, &steps)));
        }
        HistoryCommand::Clear => {
            history.clear().await?;
            println!("{}History cleared", CHECK);
        }
    }

    Ok(())
}

async fn manage_config(cmd: &ConfigCommand, cli: &Cli, storage: Arc<dyn StorageBackend>) -> Result<()> {
    let settings = SettingsStore::new(storage, &cli.assets_dir);

    match cmd {
        ConfigCommand::Show => {
            let api = settings.api_config().await?;
            let key = if api.has_api_key() {
                api.masked_key()
            } else {
                style("not set").yellow().to_string()
            };
            println!("{}Settings", INFO);
            println!("  API key: {}", key);
            println!("  Model: {}", style(&api.model).bold());
            println!("  Assets: {}", style(settings.assets_dir().display()).dim());
        }
        ConfigCommand::SetKey { key } => {
            let api = settings.set_api_key(key).await?;
            println!("{}API key saved ({})", CHECK, api.masked_key());
        }
        ConfigCommand::SetModel { model } => {
            let api = settings.set_model(model).await?;
            println!("{}Model set to {}", CHECK, style(&api.model).bold());
        }
        ConfigCommand::Models => {
            let api = settings.api_config().await?;
            for model in settings.models().await? {
                println!("{}", format_model(&model, model.id == api.model));
            }
        }
        ConfigCommand::ImportModels { file } => {
            let text = tokio::fs::read_to_string(file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let models = settings
                .import_models_json(&text)
                .await
                .context("Models list was not imported")?;
            println!("{}Imported {} model(s)", CHECK, models.len());
        }
        ConfigCommand::ResetModels => {
            settings.reset_models().await?;
            println!("{}Models list reset to defaults", CHECK);
        }
    }

    Ok(())
}

fn not_found(id: &str) -> ! {
    println!("{}Step not found: {}", WARN, style(id).cyan());
    std::process::exit(1);
}
