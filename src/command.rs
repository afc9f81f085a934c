//! Console command registry
//!
//! Commands are registered explicitly at startup and looked up by name:
//!
//! ```ignore
//! let mut registry = CommandRegistry::new();
//! registry.register(Command::new("tick")
//!     .usage("tick [n]")
//!     .help("Advance the scene n ticks")
//!     .run(cmd_tick));
//!
//! registry.execute(&mut engine, "tick 10")?;
//! ```
//!
//! Results are reported through `log`; handlers return errors for bad input.

use std::collections::HashMap;

use log::info;

use crate::entity::{EntityEvent, EventPayload, SpawnError, UnknownName};
use crate::level::LevelError;
use crate::math::Vec3;
use crate::runtime::Engine;
use crate::scene::{HitObject, IgnoreMask, SceneError, TraceQuery};

/// Tick length used by the `tick` command
const CONSOLE_DT: f32 = 1.0 / 60.0;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("unknown command \"{0}\"")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    #[error(transparent)]
    Name(#[from] UnknownName),
}

pub type CommandFn = fn(&mut Engine, &[&str]) -> Result<(), CommandError>;

/// A named console command
pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    handler: CommandFn,
}

impl Command {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            usage: name,
            help: "",
            handler: |_, _| Ok(()),
        }
    }

    pub fn usage(mut self, usage: &'static str) -> Self {
        self.usage = usage;
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    pub fn run(mut self, handler: CommandFn) -> Self {
        self.handler = handler;
        self
    }
}

/// Name -> command table
pub struct CommandRegistry {
    commands: HashMap<&'static str, Command>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: HashMap::new() }
    }

    /// Registry with every built-in command
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Command::new("load").usage("load <map>").help("Load a map and rebuild the scene").run(cmd_load));
        registry.register(
            Command::new("save")
                .usage("save [map]")
                .help("Save the scene, by default over the loaded map. Dead entities and used triggers are written as if freshly placed")
                .run(cmd_save),
        );
        registry.register(Command::new("list").help("List entities and brushes").run(cmd_list));
        registry.register(
            Command::new("trace")
                .usage("trace <x> <y> <z> <dx> <dy> <dz> [entities|brushes]")
                .help("Cast a ray; the optional word ignores that category")
                .run(cmd_trace),
        );
        registry.register(Command::new("spawn").usage("spawn <spawner id>").help("Make a spawner produce its entity").run(cmd_spawn));
        registry.register(
            Command::new("event")
                .usage("event <id> <event> [value]")
                .help("Deliver an event to an entity")
                .run(cmd_event),
        );
        registry.register(Command::new("tick").usage("tick [n]").help("Advance the scene n ticks").run(cmd_tick));
        registry.register(Command::new("quit").help("Stop the engine").run(cmd_quit));
        registry
    }

    pub fn register(&mut self, command: Command) {
        self.commands.insert(command.name, command);
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.commands.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Parse and run one command line. Blank lines do nothing.
    pub fn execute(&self, engine: &mut Engine, line: &str) -> Result<(), CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(());
        };
        let args: Vec<&str> = words.collect();

        if name == "help" {
            for name in self.names() {
                if let Some(command) = self.get(name) {
                    info!("{:<50} {}", command.usage, command.help);
                }
            }
            return Ok(());
        }

        let command = self
            .get(name)
            .ok_or_else(|| CommandError::Unknown(name.to_string()))?;
        (command.handler)(engine, &args)
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn parse_f32(word: &str, usage: &'static str) -> Result<f32, CommandError> {
    word.parse().map_err(|_| CommandError::Usage(usage))
}

fn parse_vec3(words: &[&str], usage: &'static str) -> Result<Vec3, CommandError> {
    match words {
        [x, y, z] => Ok(Vec3::new(parse_f32(x, usage)?, parse_f32(y, usage)?, parse_f32(z, usage)?)),
        _ => Err(CommandError::Usage(usage)),
    }
}

fn cmd_load(engine: &mut Engine, args: &[&str]) -> Result<(), CommandError> {
    let [name] = args else {
        return Err(CommandError::Usage("load <map>"));
    };
    engine.load_map(name)?;
    Ok(())
}

fn cmd_save(engine: &mut Engine, args: &[&str]) -> Result<(), CommandError> {
    let name = match args {
        [] => None,
        [name] => Some(*name),
        _ => return Err(CommandError::Usage("save [map]")),
    };
    engine.save_map(name)?;
    Ok(())
}

fn cmd_list(engine: &mut Engine, _args: &[&str]) -> Result<(), CommandError> {
    for (_, entity) in engine.scene.entities() {
        let state = if entity.is_alive() { "" } else { " [dead]" };
        info!("{} at {}{}", entity, entity.position, state);
    }
    for brush in engine.scene.brushes() {
        info!("brush \"{}\" {}", brush.id.as_deref().unwrap_or(""), brush.bbox);
    }
    info!("{} entities, {} brushes", engine.scene.len(), engine.scene.brushes().len());
    Ok(())
}

fn cmd_trace(engine: &mut Engine, args: &[&str]) -> Result<(), CommandError> {
    const USAGE: &str = "trace <x> <y> <z> <dx> <dy> <dz> [entities|brushes]";
    if args.len() < 6 {
        return Err(CommandError::Usage(USAGE));
    }
    let origin = parse_vec3(&args[0..3], USAGE)?;
    let direction = parse_vec3(&args[3..6], USAGE)?;
    let mask = match args.get(6) {
        None => IgnoreMask::None,
        Some(&"entities") => IgnoreMask::Entities,
        Some(&"brushes") => IgnoreMask::Brushes,
        Some(_) => return Err(CommandError::Usage(USAGE)),
    };

    let query = TraceQuery::new(origin, direction).with_mask(mask);
    match engine.scene.trace(&query) {
        Some(hit) => {
            let what = match hit.object {
                HitObject::Entity(handle) => engine
                    .scene
                    .entity(handle)
                    .map(|e| e.to_string())
                    .unwrap_or_default(),
                HitObject::Brush(index) => engine
                    .scene
                    .brushes()
                    .get(index)
                    .map(|b| format!("brush \"{}\"", b.id.as_deref().unwrap_or("")))
                    .unwrap_or_default(),
            };
            info!("hit {} at {} (distance {})", what, hit.point, hit.distance);
        }
        None => info!("no hit"),
    }
    Ok(())
}

fn cmd_spawn(engine: &mut Engine, args: &[&str]) -> Result<(), CommandError> {
    let [id] = args else {
        return Err(CommandError::Usage("spawn <spawner id>"));
    };
    engine.scene.spawn_from(id)?;
    Ok(())
}

fn cmd_event(engine: &mut Engine, args: &[&str]) -> Result<(), CommandError> {
    const USAGE: &str = "event <id> <event> [value]";
    let (id, event, value) = match args {
        [id, event] => (*id, *event, 0.0),
        [id, event, value] => (*id, *event, parse_f32(value, USAGE)?),
        _ => return Err(CommandError::Usage(USAGE)),
    };
    let event: EntityEvent = event.parse()?;
    let payload = EventPayload::value(value).from_source("console");

    let outcome = engine.send_event(id, event, &payload)?;
    info!("{} {}: {:?}", event, id, outcome);
    Ok(())
}

fn cmd_tick(engine: &mut Engine, args: &[&str]) -> Result<(), CommandError> {
    let count: u64 = match args {
        [] => 1,
        [n] => n.parse().map_err(|_| CommandError::Usage("tick [n]"))?,
        _ => return Err(CommandError::Usage("tick [n]")),
    };
    for _ in 0..count {
        engine.tick(CONSOLE_DT);
    }
    info!("advanced {} ticks", count);
    Ok(())
}

fn cmd_quit(engine: &mut Engine, _args: &[&str]) -> Result<(), CommandError> {
    engine.stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, TickRate};
    use crate::entity::EntityTag;
    use crate::level::Brush;
    use crate::math::BBox;

    fn engine(dir: &std::path::Path) -> Engine {
        Engine::new(EngineConfig {
            maps_dir: dir.to_path_buf(),
            tick_rate: TickRate::Unlocked,
            ..Default::default()
        })
    }

    #[test]
    fn test_unknown_and_blank() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let registry = CommandRegistry::with_builtins();
        assert!(registry.execute(&mut engine, "   ").is_ok());
        assert!(registry.execute(&mut engine, "help").is_ok());
        assert!(matches!(registry.execute(&mut engine, "fly"), Err(CommandError::Unknown(_))));
        assert!(matches!(registry.execute(&mut engine, "tick many"), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_builtins_registered() {
        let registry = CommandRegistry::with_builtins();
        assert_eq!(
            registry.names(),
            vec!["event", "list", "load", "quit", "save", "spawn", "tick", "trace"]
        );
    }

    #[test]
    fn test_save_load_and_tick() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let registry = CommandRegistry::with_builtins();

        engine.scene.add(EntityTag::Player.instantiate(Vec3::ZERO)).unwrap();
        engine.scene.add_brush(Brush::new(BBox::ONE)).unwrap();
        registry.execute(&mut engine, "save arena").unwrap();
        registry.execute(&mut engine, "load arena").unwrap();
        assert_eq!(engine.scene.len(), 1);
        assert_eq!(engine.scene.brushes().len(), 1);

        registry.execute(&mut engine, "tick 5").unwrap();
        assert_eq!(engine.ticks(), 5);
        registry.execute(&mut engine, "list").unwrap();
        registry.execute(&mut engine, "trace -10 0 0.5 1 0 0").unwrap();
        registry.execute(&mut engine, "trace -10 0 0.5 1 0 0 brushes").unwrap();

        assert!(matches!(registry.execute(&mut engine, "load missing"), Err(CommandError::Level(_))));
    }

    #[test]
    fn test_event_and_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        let registry = CommandRegistry::with_builtins();
        engine.scene.add(EntityTag::TestNpc.instantiate(Vec3::ZERO).with_id("grunt")).unwrap();

        registry.execute(&mut engine, "event grunt take_damage 150").unwrap();
        assert!(engine.scene.get("grunt").is_some_and(|e| !e.is_alive()));
        assert!(matches!(
            registry.execute(&mut engine, "event grunt explode"),
            Err(CommandError::Name(_))
        ));
        assert!(matches!(
            registry.execute(&mut engine, "spawn grunt"),
            Err(CommandError::Spawn(SpawnError::NotASpawner(_)))
        ));
    }

    #[test]
    fn test_quit_stops_engine() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = engine(dir.path());
        engine.start();
        CommandRegistry::with_builtins().execute(&mut engine, "quit").unwrap();
        assert!(!engine.is_running());
    }
}
