mod config;
mod render;

use std::io::{self, BufRead, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use biogen_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use biogen_contracts::events::EventWriter;
use biogen_contracts::models::{ModelSelector, IMAGE_CAPABILITY, TEXT_CAPABILITY};
use biogen_contracts::{ArchiveEntry, ArchiveStore, Category, GuidedSelections, Locale};
use biogen_engine::{
    provider_registry, GenerationClient, GenerationState, GenerationStatus, Orchestrator,
    PromptInput, ProviderRegistry,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value};

use crate::config::{AppConfig, ConfigFlags};

#[derive(Debug, Parser)]
#[command(name = "biogen", version, about = "Bio-Genesis creature generator")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Directory holding archive.json, events.jsonl and an optional .env.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true)]
    events: Option<PathBuf>,
    /// Narrative language: en or ko.
    #[arg(long, global = true)]
    locale: Option<String>,
    #[arg(long, global = true)]
    text_model: Option<String>,
    #[arg(long, global = true)]
    image_model: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create one creature from a prompt or guided tags.
    Generate(GenerateArgs),
    #[command(subcommand)]
    Archive(ArchiveCommand),
    /// Pit two archived creatures against each other.
    Battle(BattleArgs),
    /// Interactive session with slash commands.
    Chat,
    /// List guided-mode tags.
    Options,
}

#[derive(Debug, Args)]
struct GenerateArgs {
    #[arg(long, conflicts_with_all = ["habitat", "diet", "structure", "trait_tag"])]
    prompt: Option<String>,
    #[arg(long)]
    habitat: Option<String>,
    #[arg(long)]
    diet: Option<String>,
    #[arg(long)]
    structure: Option<String>,
    #[arg(long = "trait")]
    trait_tag: Option<String>,
    #[arg(long)]
    save_image: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum ArchiveCommand {
    List,
    Show {
        id: String,
        /// Dump the structured engine data instead of the card.
        #[arg(long)]
        json: bool,
        #[arg(long)]
        save_image: Option<PathBuf>,
    },
    Delete {
        id: String,
    },
    Clear,
}

#[derive(Debug, Args)]
struct BattleArgs {
    a: String,
    b: String,
    #[arg(long)]
    save_image: Option<PathBuf>,
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("biogen error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let flags = ConfigFlags {
        data_dir: cli.global.data_dir,
        events: cli.global.events,
        locale: cli.global.locale,
        text_model: cli.global.text_model,
        image_model: cli.global.image_model,
    };
    let config = AppConfig::resolve(&flags)?;
    let providers = provider_registry(config.gemini.clone());
    let mut session = Session::open(config, providers)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Command::Generate(args) => session.run_generate(args, &mut out),
        Command::Archive(command) => {
            session.run_archive(command, &mut out)?;
            Ok(0)
        }
        Command::Battle(args) => {
            session.battle(&args.a, &args.b, args.save_image.as_deref(), &mut out)?;
            Ok(0)
        }
        Command::Chat => {
            let stdin = io::stdin();
            session.run_chat(stdin.lock(), &mut out)?;
            Ok(0)
        }
        Command::Options => {
            writeln!(
                out,
                "{}",
                render::options_listing(session.locale, &GuidedSelections::default())
            )?;
            Ok(0)
        }
    }
}

struct Session {
    config: AppConfig,
    events: EventWriter,
    providers: ProviderRegistry,
    selector: ModelSelector,
    client: GenerationClient,
    orchestrator: Orchestrator,
    archive: ArchiveStore,
    locale: Locale,
    guided: GuidedSelections,
}

impl Session {
    fn open(config: AppConfig, providers: ProviderRegistry) -> Result<Self> {
        let events = EventWriter::for_new_session(&config.events_path);
        let selector = ModelSelector::new(None);
        let client = select_client(
            &providers,
            &selector,
            config.text_model.as_deref(),
            config.image_model.as_deref(),
        )?
        .with_events(events.clone());
        let archive = ArchiveStore::new(&config.archive_path);
        let orchestrator = Orchestrator::new(archive.clone(), events.clone());

        let mut payload = Map::new();
        payload.insert("locale".to_string(), Value::String(config.locale.tag().to_string()));
        payload.insert(
            "text_model".to_string(),
            Value::String(client.text_model().to_string()),
        );
        payload.insert(
            "image_model".to_string(),
            Value::String(client.image_model().to_string()),
        );
        payload.insert(
            "data_dir".to_string(),
            Value::String(config.data_dir.display().to_string()),
        );
        events.record("session_started", payload);

        Ok(Self {
            locale: config.locale,
            config,
            events,
            providers,
            selector,
            client,
            orchestrator,
            archive,
            guided: GuidedSelections::default(),
        })
    }

    fn run_generate(&mut self, args: GenerateArgs, out: &mut impl Write) -> Result<i32> {
        let input = match args.prompt {
            Some(prompt) => PromptInput::Direct(prompt),
            None => {
                let mut selections = GuidedSelections::default();
                for (category, value) in [
                    (Category::Habitat, args.habitat),
                    (Category::Diet, args.diet),
                    (Category::Structure, args.structure),
                    (Category::Trait, args.trait_tag),
                ] {
                    if let Some(value) = value {
                        selections.set(category, &value);
                    }
                }
                PromptInput::Guided(selections)
            }
        };
        let status = self.generate(&input, out)?;
        if status != GenerationStatus::Complete {
            return Ok(1);
        }
        if let Some(path) = args.save_image.as_deref() {
            self.save_current_image(path, out)?;
        }
        Ok(0)
    }

    fn generate(&mut self, input: &PromptInput, out: &mut impl Write) -> Result<GenerationStatus> {
        if input.resolve().is_none() {
            bail!("prompt is empty");
        }
        let status = self
            .orchestrator
            .run(&self.client, input, self.locale, |state| {
                render_progress(state, out)
            })?;
        Ok(status)
    }

    fn save_current_image(&self, path: &Path, out: &mut impl Write) -> Result<()> {
        match self.orchestrator.state().image_url.as_deref() {
            Some(image_url) => {
                let written = render::save_image(path, image_url)?;
                writeln!(out, "Saved visual to {}", written.display())?;
            }
            None => writeln!(out, "No visual to save.")?,
        }
        Ok(())
    }

    fn entry(&self, id: &str) -> Result<ArchiveEntry> {
        self.archive
            .get(id)
            .ok_or_else(|| anyhow!("no archive entry '{id}'"))
    }

    fn run_archive(&mut self, command: ArchiveCommand, out: &mut impl Write) -> Result<()> {
        match command {
            ArchiveCommand::List => {
                writeln!(out, "{}", render::archive_table(&self.archive.list_all()))?;
            }
            ArchiveCommand::Show {
                id,
                json,
                save_image,
            } => {
                let entry = self.entry(&id)?;
                if json {
                    writeln!(out, "{}", entry.record.engine_data_dump())?;
                } else {
                    writeln!(out, "{}", render::creature_card(&entry.record))?;
                    writeln!(out, "{}", render::visual_line(Some(&entry.image_url)))?;
                }
                if let Some(path) = save_image.as_deref() {
                    let written = render::save_image(path, &entry.image_url)?;
                    writeln!(out, "Saved visual to {}", written.display())?;
                }
            }
            ArchiveCommand::Delete { id } => {
                self.archive.delete_one(&id)?;
                self.log_archive_change("archive_deleted", Some(&id));
                writeln!(out, "Deleted {id}.")?;
            }
            ArchiveCommand::Clear => {
                self.archive.clear_all()?;
                self.log_archive_change("archive_cleared", None);
                writeln!(out, "Archive cleared.")?;
            }
        }
        Ok(())
    }

    fn log_archive_change(&self, event_type: &str, id: Option<&str>) {
        let mut payload = Map::new();
        if let Some(id) = id {
            payload.insert("id".to_string(), Value::String(id.to_string()));
        }
        self.events.record(event_type, payload);
    }

    fn battle(
        &self,
        a: &str,
        b: &str,
        save_image: Option<&Path>,
        out: &mut impl Write,
    ) -> Result<()> {
        if a.trim() == b.trim() {
            bail!("pick two different specimens");
        }
        let first = self.entry(a)?;
        let second = self.entry(b)?;
        writeln!(
            out,
            "Simulating {} vs {}...",
            first.record.common_name(),
            second.record.common_name()
        )?;
        let result = self
            .client
            .simulate_battle(&first.record, &second.record, self.locale);

        let mut payload = Map::new();
        payload.insert("a".to_string(), Value::String(first.id.clone()));
        payload.insert("b".to_string(), Value::String(second.id.clone()));
        payload.insert("winner".to_string(), Value::String(result.winner.clone()));
        payload.insert("has_image".to_string(), Value::Bool(result.image_url.is_some()));
        self.events.record("battle_finished", payload);

        writeln!(
            out,
            "{}",
            render::battle_report(&first.record, &second.record, &result)
        )?;
        if let (Some(path), Some(image_url)) = (save_image, result.image_url.as_deref()) {
            let written = render::save_image(path, image_url)?;
            writeln!(out, "Saved battle visual to {}", written.display())?;
        }
        Ok(())
    }

    fn reselect_models(&mut self, text: Option<&str>, image: Option<&str>) -> Result<()> {
        let text = text.or(Some(self.client.text_model())).map(str::to_string);
        let image = image.or(Some(self.client.image_model())).map(str::to_string);
        self.client = select_client(
            &self.providers,
            &self.selector,
            text.as_deref(),
            image.as_deref(),
        )?
        .with_events(self.events.clone());
        Ok(())
    }

    fn status_report(&self) -> String {
        format!(
            "Locale: {} | Text model: {} | Image model: {}\nProviders: {}\nData dir: {} | Archived: {}\n{}",
            self.locale.display_name(),
            self.client.text_model(),
            self.client.image_model(),
            self.providers.names().join(", "),
            self.config.data_dir.display(),
            self.archive.len(),
            render::status_line(self.orchestrator.state())
        )
    }

    fn run_chat(&mut self, mut input: impl BufRead, out: &mut impl Write) -> Result<()> {
        writeln!(out, "Bio-Genesis chat started. Type /help for commands.")?;
        let mut line = String::new();
        loop {
            write!(out, "> ")?;
            out.flush()?;

            line.clear();
            let read = match input.read_line(&mut line) {
                Ok(read) => read,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            };
            if read == 0 {
                break;
            }

            let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
            match self.handle_intent(&intent, out) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => writeln!(out, "error: {err:#}")?,
            }
        }
        Ok(())
    }

    /// Returns `false` when the session should end.
    fn handle_intent(&mut self, intent: &Intent, out: &mut impl Write) -> Result<bool> {
        match intent.action.as_str() {
            "noop" => {}
            "quit" => return Ok(false),
            "help" => {
                writeln!(
                    out,
                    "Type a creature idea to generate it. Commands: {}",
                    CHAT_HELP_COMMANDS.join(" ")
                )?;
            }
            "generate" => {
                let prompt = intent.prompt.clone().unwrap_or_default();
                self.generate(&PromptInput::Direct(prompt), out)?;
            }
            "guided" => {
                // With tags, toggle them and show the board; bare /guided generates.
                let pairs = intent.arg_list("args");
                if pairs.is_empty() {
                    self.generate(&PromptInput::Guided(self.guided.clone()), out)?;
                } else {
                    self.guided
                        .toggle_pairs(pairs.iter().map(String::as_str))
                        .map_err(|err| anyhow!(err))?;
                    writeln!(out, "{}", render::options_listing(self.locale, &self.guided))?;
                }
            }
            "list_options" => {
                writeln!(out, "{}", render::options_listing(self.locale, &self.guided))?;
            }
            "set_locale" => {
                let Some(raw) = intent.arg_str("locale") else {
                    writeln!(out, "Locale is {}", self.locale)?;
                    return Ok(true);
                };
                self.locale = raw.parse::<Locale>().map_err(|err| anyhow!(err))?;
                writeln!(out, "Locale set to {}", self.locale.display_name())?;
            }
            "set_text_model" => {
                self.reselect_models(intent.arg_str("model"), None)?;
                writeln!(out, "Text model set to {}", self.client.text_model())?;
            }
            "set_image_model" => {
                self.reselect_models(None, intent.arg_str("model"))?;
                writeln!(out, "Image model set to {}", self.client.image_model())?;
            }
            "show_status" => writeln!(out, "{}", self.status_report())?,
            "list_archive" => {
                writeln!(out, "{}", render::archive_table(&self.archive.list_all()))?;
            }
            "show_entry" | "dump_entry" | "load_entry" | "delete_entry" => {
                let Some(id) = intent.arg_str("id") else {
                    writeln!(out, "/{} requires an id", command_name(intent))?;
                    return Ok(true);
                };
                match intent.action.as_str() {
                    "show_entry" => self.run_archive(
                        ArchiveCommand::Show {
                            id: id.to_string(),
                            json: false,
                            save_image: None,
                        },
                        out,
                    )?,
                    "dump_entry" => self.run_archive(
                        ArchiveCommand::Show {
                            id: id.to_string(),
                            json: true,
                            save_image: None,
                        },
                        out,
                    )?,
                    "load_entry" => {
                        let entry = self.entry(id)?;
                        self.orchestrator.load_archived(&entry);
                        writeln!(out, "{}", render::creature_card(&entry.record))?;
                        writeln!(out, "{}", render::visual_line(Some(&entry.image_url)))?;
                    }
                    _ => self.run_archive(ArchiveCommand::Delete { id: id.to_string() }, out)?,
                }
            }
            "clear_archive" => self.run_archive(ArchiveCommand::Clear, out)?,
            "battle" => {
                let ids = intent.arg_list("args");
                let [a, b] = ids.as_slice() else {
                    writeln!(out, "usage: /battle <id> <id>")?;
                    return Ok(true);
                };
                self.battle(a, b, None, out)?;
            }
            "save_image" => {
                let args = intent.arg_list("args");
                let Some(path) = args.first() else {
                    writeln!(out, "usage: /save_image <path>")?;
                    return Ok(true);
                };
                self.save_current_image(Path::new(path), out)?;
            }
            _ => {
                writeln!(
                    out,
                    "Unknown command /{}. Type /help for commands.",
                    command_name(intent)
                )?;
            }
        }
        Ok(true)
    }
}

fn command_name(intent: &Intent) -> String {
    intent
        .raw
        .trim()
        .trim_start_matches('/')
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn select_client(
    providers: &ProviderRegistry,
    selector: &ModelSelector,
    text_model: Option<&str>,
    image_model: Option<&str>,
) -> Result<GenerationClient> {
    let text = selector
        .select(text_model, TEXT_CAPABILITY)
        .map_err(|err| anyhow!(err))?;
    let image = selector
        .select(image_model, IMAGE_CAPABILITY)
        .map_err(|err| anyhow!(err))?;
    for selection in [&text, &image] {
        if let (Some(_), Some(reason)) = (&selection.requested, &selection.fallback_reason) {
            eprintln!("biogen: {reason} Using {}.", selection.model.name);
        }
    }
    GenerationClient::from_models(providers, &text.model, &image.model)
}

fn render_progress(state: &GenerationState, out: &mut impl Write) {
    let text = match state.status {
        GenerationStatus::GeneratingImage => match state.record.as_ref() {
            Some(record) => format!(
                "{}\n\n{}",
                render::creature_card(record),
                render::status_line(state)
            ),
            None => render::status_line(state),
        },
        GenerationStatus::Complete => format!(
            "{}\n{}",
            render::visual_line(state.image_url.as_deref()),
            render::status_line(state)
        ),
        _ => render::status_line(state),
    };
    // Progress output is best-effort; a closed stdout must not abort the run.
    let _ = writeln!(out, "{text}");
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use biogen_engine::default_provider_registry;

    use super::*;

    fn dryrun_session(dir: &Path) -> anyhow::Result<Session> {
        let config = AppConfig::resolve_with(
            &ConfigFlags {
                data_dir: Some(dir.to_path_buf()),
                text_model: Some("dryrun-text-1".to_string()),
                image_model: Some("dryrun-image-1".to_string()),
                ..ConfigFlags::default()
            },
            dir,
            |_| None,
        )?;
        Session::open(config, default_provider_registry())
    }

    fn chat(session: &mut Session, script: &str) -> anyhow::Result<String> {
        let mut out = Vec::new();
        session.run_chat(Cursor::new(script.to_string()), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn generate_runs_to_completion_and_archives() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = dryrun_session(temp.path())?;
        let mut out = Vec::new();
        let code = session.run_generate(
            GenerateArgs {
                prompt: Some("a glass-winged desert moth".to_string()),
                habitat: None,
                diet: None,
                structure: None,
                trait_tag: None,
                save_image: Some(temp.path().join("moth")),
            },
            &mut out,
        )?;
        assert_eq!(code, 0);

        let text = String::from_utf8(out)?;
        assert!(text.contains("Sequencing genome for \"a glass-winged desert moth\"..."));
        assert!(text.contains("Rendering specimen visual..."));
        assert!(text.contains("Complete. Archived as dryrun-"));
        assert!(text.contains("Saved visual to"));
        assert!(temp.path().join("moth.png").exists());
        assert_eq!(session.archive.len(), 1);
        assert!(temp.path().join("events.jsonl").exists());
        Ok(())
    }

    #[test]
    fn blank_prompt_is_rejected_without_transition() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = dryrun_session(temp.path())?;
        let err = session
            .generate(&PromptInput::Direct("  ".to_string()), &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "prompt is empty");
        assert_eq!(session.orchestrator.status(), GenerationStatus::Idle);
        Ok(())
    }

    #[test]
    fn chat_generates_lists_and_battles() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = dryrun_session(temp.path())?;
        let transcript = chat(&mut session, "a lantern maw\n/guided habitat=Ocean\n/guided\n/archive\n")?;
        assert!(transcript.starts_with("Bio-Genesis chat started."));
        assert!(transcript.contains("specimen(s)."));
        assert!(transcript.contains(" * habitat=Ocean  (Deep Ocean)"));

        let ids = session
            .archive
            .list_all()
            .into_iter()
            .map(|entry| entry.id)
            .collect::<Vec<String>>();
        assert_eq!(ids.len(), 2);
        assert_eq!(session.guided.habitat, "Ocean");

        let transcript = chat(&mut session, &format!("/battle {} {}\n/quit\n/status\n", ids[0], ids[1]))?;
        assert!(transcript.contains("Winner: "));
        assert!(transcript.contains("Visual: image/png image"));
        assert!(!transcript.contains("Locale:"));
        Ok(())
    }

    #[test]
    fn chat_reports_command_errors_and_keeps_going() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = dryrun_session(temp.path())?;
        let transcript = chat(
            &mut session,
            "/show missing\n/locale fr\n/battle only-one\n/summon\n/locale ko\n/status\n",
        )?;
        assert!(transcript.contains("error: no archive entry 'missing'"));
        assert!(transcript.contains("error: unsupported locale 'fr' (expected en or ko)"));
        assert!(transcript.contains("usage: /battle <id> <id>"));
        assert!(transcript.contains("Unknown command /summon."));
        assert!(transcript.contains("Locale set to Korean"));
        assert!(transcript.contains("Locale: Korean | Text model: dryrun-text-1 | Image model: dryrun-image-1"));
        assert!(transcript.contains("Providers: dryrun, gemini"));
        Ok(())
    }

    #[test]
    fn chat_model_switch_falls_back_for_unknown_names() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = dryrun_session(temp.path())?;
        let transcript = chat(&mut session, "/image_model no-such-model\n/text_model gemini-2.5-pro\n")?;
        assert!(transcript.contains("Image model set to gemini-2.5-flash-image"));
        assert!(transcript.contains("Text model set to gemini-2.5-pro"));
        Ok(())
    }

    #[test]
    fn load_delete_and_clear_through_chat() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = dryrun_session(temp.path())?;
        chat(&mut session, "first idea\nsecond idea\n")?;
        let ids = session
            .archive
            .list_all()
            .into_iter()
            .map(|entry| entry.id)
            .collect::<Vec<String>>();

        let transcript = chat(&mut session, &format!("/load {}\n/delete {}\n", ids[0], ids[1]))?;
        assert_eq!(session.orchestrator.status(), GenerationStatus::Complete);
        assert_eq!(session.orchestrator.state().archived_id.as_deref(), Some(ids[0].as_str()));
        assert!(transcript.contains(&format!("Deleted {}.", ids[1])));
        assert_eq!(session.archive.len(), 1);

        let transcript = chat(&mut session, &format!("/json {}\n/clear\n/archive\n", ids[0]))?;
        assert!(transcript.contains("\"visual_generation_prompt\""));
        assert!(transcript.contains("Archive cleared."));
        assert!(transcript.contains("Archive is empty."));
        Ok(())
    }

    #[test]
    fn battle_rejects_same_specimen_twice() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let session = dryrun_session(temp.path())?;
        let err = session
            .battle("x", "x", None, &mut Vec::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "pick two different specimens");
        Ok(())
    }
}
