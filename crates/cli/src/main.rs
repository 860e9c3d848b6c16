use anyhow::Context;
use restrack_core::{
    format_change, round_to_cents, EngineConfig, EntityKind, Event, EventBus, InstanceId,
    NumericEntity, Valence, WorldState,
};
use restrack_data::{
    default_state_path, export_snapshot, load_engine_config, world_from_file, FileStateStore,
    SavedState, StateStore,
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const COMMANDS: &[(&str, &str)] = &[
    ("status | s", "show turn, resources, stats, buffs and cards"),
    ("end | e | n", "end the current turn"),
    ("play <n|name> | p", "play an active card by list number or name"),
    ("clear <buff>", "remove an active buff and reverse what it did"),
    ("reset", "back to turn 1 with base values, keeping definitions"),
    ("reset-all", "wipe everything"),
    ("export [path]", "print or write a shareable snapshot"),
    ("save [path]", "write the save blob (default: the state file)"),
    ("load [path]", "read a save blob or world file"),
    ("help | h | ?", "this list"),
    ("quit | exit", "leave"),
];

#[derive(Debug, Default)]
struct CliOptions {
    state: Option<PathBuf>,
    config: Option<PathBuf>,
    world: Option<PathBuf>,
}

fn parse_cli_options(args: &[String]) -> CliOptions {
    let mut options = CliOptions {
        state: default_state_path(),
        ..CliOptions::default()
    };
    let mut idx = 0usize;
    while idx < args.len() {
        let value = args.get(idx + 1).map(PathBuf::from);
        match args[idx].as_str() {
            "--state" => {
                options.state = value;
                idx += 1;
            }
            "--config" => {
                options.config = value;
                idx += 1;
            }
            "--world" => {
                options.world = value;
                idx += 1;
            }
            other => warn!(arg = other, "ignoring unknown argument"),
        }
        idx += 1;
    }
    options
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = parse_cli_options(&args);
    let config = match &options.config {
        Some(path) => load_engine_config(path)?,
        None => EngineConfig::default(),
    };
    let mut store = options.state.as_deref().map(FileStateStore::new);
    let mut events = EventBus::new();

    let mut world = match &options.world {
        Some(path) => {
            let mut world = world_from_file(path, config.clone())?;
            world.check_and_activate(&mut events);
            world.check_narratives(&mut events);
            world
        }
        None => match store.as_ref().and_then(|store| store.load()) {
            Some(saved) => {
                let mut world = saved.world;
                world.config = config.clone();
                println!("resumed from {}", describe_store(store.as_ref()));
                world
            }
            None => WorldState::new(config.clone()),
        },
    };

    print_help();
    print_status(&world);
    drain_events(&mut events);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("{} {}> ", world.game_settings.round_label(), world.current_turn);
        io::stdout().flush().context("flush stdout")?;
        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("read stdin")?;
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (input, ""),
        };
        let mutated = match cmd {
            "help" | "h" | "?" => {
                print_help();
                false
            }
            "quit" | "exit" => break,
            "status" | "s" => {
                print_status(&world);
                false
            }
            "end" | "e" | "n" => {
                world.end_turn(&mut events);
                true
            }
            "play" | "p" => match resolve_card(&world, rest) {
                Some(id) => match world.play_card(id, &mut events) {
                    Ok(()) => true,
                    Err(err) => {
                        println!("error: {err}");
                        false
                    }
                },
                None => {
                    println!("no active card {rest:?}");
                    false
                }
            },
            "clear" => {
                if world.clear_buff(rest, &mut events) {
                    true
                } else {
                    println!("no active buff {rest:?}");
                    false
                }
            }
            "reset" => {
                world.reset_turn(&mut events);
                true
            }
            "reset-all" => {
                wipe(&mut world, store.as_mut(), &mut events);
                true
            }
            "export" => {
                if let Err(err) = export(&world, optional_path(rest)) {
                    println!("error: {err:#}");
                }
                false
            }
            "save" => {
                let result = match optional_path(rest) {
                    Some(path) => FileStateStore::new(path).save(&SavedState::capture(&world)),
                    None => match store.as_mut() {
                        Some(store) => store.save(&SavedState::capture(&world)),
                        None => {
                            println!("save path unavailable");
                            continue;
                        }
                    },
                };
                match result {
                    Ok(()) => println!("saved"),
                    Err(err) => println!("error: {err}"),
                }
                false
            }
            "load" => {
                match load(rest, store.as_ref(), &config, &mut events) {
                    Ok(Some(loaded)) => {
                        world = loaded;
                        print_status(&world);
                    }
                    Ok(None) => println!("nothing saved"),
                    Err(err) => println!("error: {err:#}"),
                }
                true
            }
            other => {
                println!("unknown command {other:?}; try help");
                false
            }
        };
        drain_events(&mut events);
        if mutated {
            autosave(store.as_mut(), &world);
        }
    }
    Ok(())
}

fn describe_store(store: Option<&FileStateStore>) -> String {
    store
        .map(|store| store.path().display().to_string())
        .unwrap_or_else(|| "memory".to_string())
}

fn optional_path(rest: &str) -> Option<PathBuf> {
    if rest.is_empty() {
        None
    } else {
        Some(PathBuf::from(rest))
    }
}

/// Drops the saved blob before the world empties; autosave then writes the
/// fresh one.
fn wipe(world: &mut WorldState, store: Option<&mut FileStateStore>, events: &mut EventBus) {
    if let Some(store) = store {
        if let Err(err) = store.clear() {
            warn!(path = %store.path().display(), error = %err, "clearing saved state failed");
        }
    }
    world.reset_all(events);
}

fn autosave(store: Option<&mut FileStateStore>, world: &WorldState) {
    let Some(store) = store else {
        return;
    };
    if let Err(err) = store.save(&SavedState::capture(world)) {
        warn!(path = %store.path().display(), error = %err, "autosave failed");
    }
}

fn load(
    rest: &str,
    store: Option<&FileStateStore>,
    config: &EngineConfig,
    events: &mut EventBus,
) -> anyhow::Result<Option<WorldState>> {
    let saved = match optional_path(rest) {
        Some(path) => {
            let mut world = world_from_file(&path, config.clone())?;
            world.check_and_activate(events);
            world.check_narratives(events);
            info!(path = %path.display(), "world replaced from file");
            return Ok(Some(world));
        }
        None => store.and_then(|store| store.load()),
    };
    Ok(saved.map(|saved| {
        let mut world = saved.world;
        world.config = config.clone();
        world
    }))
}

fn export(world: &WorldState, path: Option<PathBuf>) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(&export_snapshot(world)).context("encode export")?;
    match path {
        Some(path) => {
            write_file(&path, &body)?;
            println!("exported to {}", path.display());
        }
        None => println!("{body}"),
    }
    Ok(())
}

fn write_file(path: &Path, body: &str) -> anyhow::Result<()> {
    fs::write(path, body).with_context(|| format!("write {}", path.display()))
}

/// A 1-based list number or an exact card name.
fn resolve_card(world: &WorldState, arg: &str) -> Option<InstanceId> {
    if let Ok(number) = arg.parse::<usize>() {
        return number
            .checked_sub(1)
            .and_then(|index| world.active_cards.get(index))
            .map(|card| card.id);
    }
    world.find_active_card(arg).map(|card| card.id)
}

fn print_help() {
    println!("== Commands ==");
    for (usage, about) in COMMANDS {
        println!("  {usage:<20} {about}");
    }
}

fn print_status(world: &WorldState) {
    let settings = &world.game_settings;
    println!("== {} {} ==", settings.round_label(), world.current_turn);
    for kind in EntityKind::ALL {
        let store = world.store(kind);
        if store.is_empty() {
            continue;
        }
        println!("{}s:", kind);
        for entity in store.iter() {
            println!("  {}", format_entity(entity));
        }
    }
    if !world.active_buffs.is_empty() {
        println!("buffs:");
        for buff in &world.active_buffs {
            let remaining = if buff.is_permanent() {
                "permanent".to_string()
            } else {
                format!("{} left", buff.remaining)
            };
            println!("  {} ({remaining})", buff.name);
        }
    }
    if !world.active_cards.is_empty() {
        println!("cards:");
        for (index, card) in world.active_cards.iter().enumerate() {
            let mark = if world.can_afford(card) { "" } else { " [cannot afford]" };
            println!("  {}. {}{mark}", index + 1, card.name);
        }
    }
}

fn format_entity(entity: &NumericEntity) -> String {
    let mut line = format!("{} {}", entity.name, format_value(entity.current_value));
    if let Some(max) = entity.max_value {
        let kind = if entity.is_hard_cap { "" } else { "~" };
        line.push_str(&format!(" / {kind}{}", format_value(max)));
    }
    if entity.change_per_round != 0.0 {
        line.push_str(&format!(" ({}/turn)", format_change(entity.change_per_round)));
    }
    if entity.cyclical {
        line.push_str(" [cyclical]");
    }
    line
}

fn format_value(value: f64) -> String {
    let rounded = round_to_cents(value);
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded}")
    }
}

fn drain_events(events: &mut EventBus) {
    for event in events.drain() {
        println!("{}", format_event(&event));
    }
}

fn format_event(event: &Event) -> String {
    match event {
        Event::TurnStarted {
            turn,
            label,
            message,
        } => match message {
            Some(message) => format!("-- {label} {turn} -- {message}"),
            None => format!("-- {label} {turn} --"),
        },
        Event::ValueChanged {
            target,
            delta,
            source,
            valence,
        } => {
            let tone = if *valence == Valence::Bad { " (!)" } else { "" };
            format!("{} {}{tone} from {source}", target.name, format_change(*delta))
        }
        Event::ValueReset { target, value } => {
            format!("{} reset to {}", target.name, format_value(*value))
        }
        Event::BuffApplied { name } => format!("buff applied: {name}"),
        Event::BuffExpired { name } => format!("buff expired: {name}"),
        Event::BuffEnded { name } => format!("buff ended: {name}"),
        Event::CostDebuffApplied { card, duration } => {
            format!("{card} will cost you for {duration} turns")
        }
        Event::CardAvailable { name } => format!("card available: {name}"),
        Event::CardUnavailable { name } => format!("card unavailable: {name}"),
        Event::CardPlayed { name } => format!("card played: {name}"),
        Event::CardRejected { card } => format!("cannot afford {card}"),
        Event::TargetMissing { target, source } => {
            format!("{source}: no {} named {}", target.kind, target.name)
        }
        Event::NarrativeShown {
            title,
            text,
            value,
            ..
        } => {
            let mut line = format!("** {title} **");
            if let Some(value) = value {
                line.push_str(&format!(" {value}"));
            }
            if !text.is_empty() {
                line.push_str(&format!("\n   {text}"));
            }
            line
        }
        Event::CascadeLimitReached { passes } => {
            format!("cyclical cascade stopped after {passes} passes")
        }
    }
}
