//! loot-runner: headless driver for the loot engine.
//!
//! Usage:
//!   loot-runner --seed 12345 --fills 1000 --db loot.db
//!   loot-runner --remote-dir ./catalogs --import starter --fills 200
//!   loot-runner --seed 12345 --ipc-mode

use anyhow::Result;
use betterloot_core::{
    command::LootCommand,
    config::LootConfig,
    definitions::ItemRegistry,
    engine::LootEngine,
    error::RemoteFetchError,
    item::PlacedContainer,
    prefab::PrefabRegistry,
    remote::RemoteCatalogSource,
    store::CatalogStore,
};
use indexmap::IndexMap;
use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcRequest {
    Command { command: LootCommand },
    Tick,
    Summary,
    Quit,
}

#[derive(serde::Serialize)]
struct WorldSummary {
    tick_containers: usize,
    tables: usize,
    active_tables: usize,
    groups: usize,
    blacklisted: usize,
    pending_tasks: usize,
}

/// Serves remote catalogs from `<dir>/<catalog_id>.json`.
struct DirectoryRemoteSource {
    dir: PathBuf,
}

impl RemoteCatalogSource for DirectoryRemoteSource {
    fn fetch(&self, catalog_id: &str) -> Result<String, RemoteFetchError> {
        if catalog_id.contains(['/', '\\']) || catalog_id.contains("..") {
            return Err(RemoteFetchError::NotFound);
        }
        let path = self.dir.join(format!("{catalog_id}.json"));
        std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => RemoteFetchError::NotFound,
            _ => RemoteFetchError::Transport {
                reason: format!("{}: {e}", path.display()),
            },
        })
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let fills = parse_arg(&args, "--fills", 100usize);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");
    let remote_dir = string_arg(&args, "--remote-dir").unwrap_or("./catalogs");

    let config = match string_arg(&args, "--config") {
        Some(path) => LootConfig::load(path)?,
        None => LootConfig::default(),
    };
    let registry = match string_arg(&args, "--items") {
        Some(path) => ItemRegistry::from_json(&std::fs::read_to_string(path)?)?,
        None => ItemRegistry::default_test(),
    };
    let prefabs = match string_arg(&args, "--prefabs") {
        Some(path) => PrefabRegistry::from_json(&std::fs::read_to_string(path)?)?,
        None => PrefabRegistry::default(),
    };

    if !ipc_mode {
        println!("loot-runner");
        println!("  seed:        {seed}");
        println!("  fills:       {fills}");
        println!("  db:          {db}");
        println!("  remote_dir:  {remote_dir}");
        println!();
    }

    log::info!("loot-runner starting: seed={seed} db={db} ipc={ipc_mode}");
    let store = CatalogStore::open(db)?;
    let mut engine = LootEngine::build(config, registry, prefabs, store, seed)?;
    let remote = DirectoryRemoteSource {
        dir: PathBuf::from(remote_dir),
    };

    if let Some(catalog_id) = string_arg(&args, "--import") {
        let report = engine.import_remote(catalog_id, &remote)?;
        for message in &report.messages {
            println!("  {message}");
        }
    }

    let mut world = build_world(&engine);
    engine.run_scheduled(&mut world)?;

    if ipc_mode {
        run_ipc_loop(&mut engine, &mut world, &remote)?;
    } else {
        print_summary(&mut engine, fills)?;
    }
    Ok(())
}

/// One live container per enabled table.
fn build_world(engine: &LootEngine) -> Vec<PlacedContainer> {
    engine
        .catalog()
        .tables
        .iter()
        .filter(|(_, table)| table.enabled)
        .map(|(container_type, _)| PlacedContainer::new(container_type))
        .collect()
}

fn run_ipc_loop(
    engine: &mut LootEngine,
    world: &mut Vec<PlacedContainer>,
    remote: &DirectoryRemoteSource,
) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let request: IpcRequest = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match request {
            IpcRequest::Quit => break,
            IpcRequest::Command { command } => match engine.apply_command(command, remote) {
                Ok(outcome) => writeln!(stdout, "{}", serde_json::to_string(&outcome)?)?,
                Err(e) => writeln!(stdout, "{}", serde_json::json!({ "error": e.to_string() }))?,
            },
            IpcRequest::Tick => {
                let summary = engine.run_scheduled(world)?;
                writeln!(stdout, "{}", serde_json::to_string(&summary)?)?;
            }
            IpcRequest::Summary => {
                let summary = world_summary(engine, world);
                writeln!(stdout, "{}", serde_json::to_string(&summary)?)?;
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

fn world_summary(engine: &LootEngine, world: &[PlacedContainer]) -> WorldSummary {
    let catalog = engine.catalog();
    WorldSummary {
        tick_containers: world.len(),
        tables: catalog.tables.len(),
        active_tables: catalog.active_table_count(),
        groups: catalog.groups.len(),
        blacklisted: catalog.blacklist.len(),
        pending_tasks: engine.pending_tasks(),
    }
}

fn print_summary(engine: &mut LootEngine, fills: usize) -> Result<()> {
    let build = engine.last_build().clone();
    println!("=== CATALOG ===");
    println!("  tables:         {}", build.tables);
    println!("  active tables:  {}", build.active_tables);
    println!("  groups:         {}", build.groups);
    println!("  entries:        {}", build.resolution.scanned);
    println!("  repairs:        {}", build.resolution.repairs);

    let container_types: Vec<String> = engine
        .catalog()
        .tables
        .iter()
        .filter(|(_, table)| table.enabled)
        .map(|(name, _)| name.clone())
        .collect();
    if container_types.is_empty() {
        println!();
        println!("  (No enabled loot tables. Use --import to load a catalog.)");
        return Ok(());
    }

    for container_type in container_types {
        let mut counts: IndexMap<String, i64> = IndexMap::new();
        let mut gave_up = 0usize;
        let mut scrap = 0i64;
        for _ in 0..fills {
            let (container, report) = engine.populate_new(&container_type)?;
            gave_up += usize::from(report.gave_up);
            scrap += i64::from(report.scrap);
            for item in container.items() {
                *counts.entry(item.shortname.clone()).or_default() += 1;
            }
        }
        counts.sort_by(|_, a, _, b| b.cmp(a));

        println!();
        println!("=== {container_type} ({fills} fills) ===");
        println!("  gave up early:  {gave_up}");
        println!("  avg scrap:      {:.1}", scrap as f64 / fills.max(1) as f64);
        for (shortname, count) in counts.iter().take(15) {
            println!("  {shortname:<28} {count}");
        }
    }
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
