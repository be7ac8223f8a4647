mod assets;
mod report;

use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use plotgen_blocks::BlockRegistry;
use plotgen_runtime::{ChunkGenerator, ChunkJob, ChunkOutcome, Runtime};
use plotgen_schem::{FragmentKind, McSchemLoader, fragment_path, fragment_root};
use plotgen_world::{HostWorld, PlotArea, PlotAreaManager, PlotWorldsFile};

use crate::report::GenStats;

#[derive(Parser)]
#[command(name = "plotgen", about = "Generate plot world chunks from area configs and fragments")]
struct Cli {
    /// Directory containing assets/blocks.toml and assets/worlds.toml
    #[arg(long)]
    assets: Option<PathBuf>,
    /// Block registry (defaults to <assets>/assets/blocks.toml)
    #[arg(long)]
    blocks: Option<PathBuf>,
    /// Plot area config (defaults to <assets>/assets/worlds.toml)
    #[arg(long)]
    worlds: Option<PathBuf>,
    /// Write the log to a file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct WorldArgs {
    /// World name to generate for
    #[arg(long, default_value = "plots")]
    world: String,
    /// Lowest generatable y, inclusive
    #[arg(long, default_value_t = -64, allow_hyphen_values = true)]
    min_height: i32,
    /// Highest generatable y, inclusive
    #[arg(long, default_value_t = 319, allow_hyphen_values = true)]
    max_height: i32,
}

#[derive(Subcommand)]
enum Command {
    /// Load every area of a world, build overlays and report them
    Inspect {
        #[command(flatten)]
        world: WorldArgs,
    },
    /// Generate a rectangle of chunks and print statistics
    Generate {
        #[command(flatten)]
        world: WorldArgs,
        /// First chunk corner (CX CZ)
        #[arg(long, num_args = 2, value_names = ["CX", "CZ"], allow_hyphen_values = true, default_values_t = [0, 0])]
        from: Vec<i32>,
        /// Second chunk corner, inclusive (CX CZ)
        #[arg(long, num_args = 2, value_names = ["CX", "CZ"], allow_hyphen_values = true, default_values_t = [3, 3])]
        to: Vec<i32>,
        /// Worker threads
        #[arg(long, default_value_t = 4)]
        workers: usize,
        /// Also run the populate pass
        #[arg(long)]
        populate: bool,
    },
    /// Print the generated voxels of one block column
    Column {
        #[command(flatten)]
        world: WorldArgs,
        #[arg(long, allow_hyphen_values = true)]
        x: i32,
        #[arg(long, allow_hyphen_values = true)]
        z: i32,
    },
}

struct CliWorld {
    name: String,
    min_y: i32,
    max_y: i32,
}

impl HostWorld for CliWorld {
    fn name(&self) -> &str {
        &self.name
    }
    fn min_height(&self) -> i32 {
        self.min_y
    }
    fn max_height(&self) -> i32 {
        self.max_y
    }
}

impl From<&WorldArgs> for CliWorld {
    fn from(a: &WorldArgs) -> Self {
        Self {
            name: a.world.clone(),
            min_y: a.min_height,
            max_y: a.max_height,
        }
    }
}

struct Loaded {
    registry: Arc<BlockRegistry>,
    areas: Arc<PlotAreaManager>,
    loader: McSchemLoader,
    fragment_root: PathBuf,
}

fn init_logging(log_file: Option<&Path>) {
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                let _ = simplelog::WriteLogger::init(
                    simplelog::LevelFilter::Info,
                    simplelog::Config::default(),
                    file,
                );
                return;
            }
            Err(e) => eprintln!("cannot open log file {}: {e}", path.display()),
        }
    }
    env_logger::init();
}

fn load(cli: &Cli, world: &CliWorld) -> Result<Loaded, Box<dyn Error>> {
    if world.min_y > world.max_y {
        return Err(format!("min height {} above max height {}", world.min_y, world.max_y).into());
    }
    let root = assets::resolve_assets_root(cli.assets.clone());
    let blocks = cli.blocks.clone().unwrap_or_else(|| assets::blocks_path(&root));
    let worlds = cli.worlds.clone().unwrap_or_else(|| assets::worlds_path(&root));
    let registry = Arc::new(BlockRegistry::load_from_path(&blocks)?);
    log::info!(
        "loaded {} block types and {} biomes from {}",
        registry.by_name.len(),
        registry.biomes.len(),
        blocks.display()
    );

    let mut file = PlotWorldsFile::load_from_path(&worlds)?;
    if file.settings.schematics.root.is_relative() {
        file.settings.schematics.root = root.join(&file.settings.schematics.root);
    }
    let loader = McSchemLoader::new(Arc::clone(&registry));
    let mut areas = PlotAreaManager::new();
    for cfg in file.areas.iter().filter(|a| a.world == world.name) {
        let area = PlotArea::new(cfg, &file.settings, Arc::clone(&registry), world)?;
        if let Err(e) = area.setup_overlay(&loader) {
            log::warn!("{}: continuing without overlay ({e})", area.label());
        }
        areas.add(area);
    }
    if areas.areas().is_empty() {
        log::warn!("no plot areas configured for world '{}'", world.name);
    }
    Ok(Loaded {
        registry,
        areas: Arc::new(areas),
        loader,
        fragment_root: file.settings.schematics.root,
    })
}

fn inspect(loaded: &Loaded) {
    for area in loaded.areas.areas() {
        let g = area.geometry();
        println!("area {}", area.label());
        println!(
            "  plot {} + road {} (cell {}), heights road={} plot={} wall={}",
            g.plot_width, g.road_width, g.size(), g.road_height, g.plot_height, g.wall_height
        );
        if let Some(r) = area.region() {
            println!("  region ({}, {})..({}, {})", r.min_x, r.min_z, r.max_x, r.max_z);
        }
        println!("  overlay: {}", area.overlay().summary());
        let dir = fragment_root(&loaded.fragment_root, area.world_name(), area.id());
        for kind in FragmentKind::ALL {
            let path = fragment_path(&dir, kind);
            if !path.is_file() {
                continue;
            }
            match loaded.loader.unsupported_blocks(&path) {
                Ok(missing) if missing.is_empty() => println!("  {kind}: {}", path.display()),
                Ok(missing) => println!(
                    "  {kind}: {} (unmapped: {})",
                    path.display(),
                    missing.join(", ")
                ),
                Err(e) => println!("  {kind}: {e}"),
            }
        }
    }
}

fn generate(
    loaded: &Loaded,
    world: CliWorld,
    from: (i32, i32),
    to: (i32, i32),
    workers: usize,
    populate: bool,
) -> Result<(), Box<dyn Error>> {
    let generator = Arc::new(ChunkGenerator::new(Arc::clone(&loaded.areas)));
    let rt = Runtime::new(generator, Arc::new(world), workers)?;
    let t0 = Instant::now();
    let mut submitted = 0usize;
    for cx in from.0.min(to.0)..=from.0.max(to.0) {
        for cz in from.1.min(to.1)..=from.1.max(to.1) {
            rt.submit(ChunkJob {
                cx,
                cz,
                job_id: submitted as u64,
                populate,
            });
            submitted += 1;
        }
    }
    let mut stats = GenStats::default();
    for _ in 0..submitted {
        let Some(out) = rt.recv_result() else {
            return Err("chunk workers stopped early".into());
        };
        stats.t_gen_ms += u64::from(out.t_gen_ms);
        stats.t_total_ms += u64::from(out.t_total_ms);
        match &out.outcome {
            ChunkOutcome::Unmanaged => stats.unmanaged += 1,
            ChunkOutcome::Skipped(_) => stats.skipped += 1,
            ChunkOutcome::Generated(buf) => {
                stats.chunks += 1;
                stats.add_buffer(buf);
            }
        }
        if let Some(pop) = &out.populated {
            stats.add_populated(pop);
        }
    }
    log::info!(
        "generated {submitted} chunk(s) in {} ms",
        t0.elapsed().as_millis()
    );
    stats.print(&loaded.registry);
    Ok(())
}

fn column(loaded: &Loaded, world: &CliWorld, x: i32, z: i32) {
    let generator = ChunkGenerator::new(Arc::clone(&loaded.areas));
    let (cx, cz) = (x >> 4, z >> 4);
    let (lx, lz) = ((x & 15) as usize, (z & 15) as usize);
    let outcome = generator.generate_chunk(world, cx, cz);
    let Some(buf) = outcome.buffer() else {
        println!("({x}, {z}) is not inside a plot area of '{}'", world.name);
        return;
    };
    let decor = generator.populate_chunk(world, cx, cz);
    for y in (buf.min_y()..=buf.max_y()).rev() {
        let v = decor
            .as_ref()
            .and_then(|d| d.get_voxel(lx, y, lz))
            .or_else(|| buf.get_voxel(lx, y, lz));
        let Some(v) = v else {
            continue;
        };
        let name = loaded
            .registry
            .get(v.block.id)
            .map(|t| t.name.as_str())
            .unwrap_or("?");
        let biome = buf
            .get_biome(lx, y, lz)
            .and_then(|b| loaded.registry.biome_name(b))
            .unwrap_or("-");
        match v.rot {
            Some(r) => println!("{y:>5} {name} state={} rot={r} biome={biome}", v.block.state),
            None => println!("{y:>5} {name} state={} biome={biome}", v.block.state),
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    match &cli.command {
        Command::Inspect { world } => {
            let world = CliWorld::from(world);
            let loaded = load(&cli, &world)?;
            inspect(&loaded);
            Ok(())
        }
        Command::Generate {
            world,
            from,
            to,
            workers,
            populate,
        } => {
            let world = CliWorld::from(world);
            let loaded = load(&cli, &world)?;
            generate(
                &loaded,
                world,
                (from[0], from[1]),
                (to[0], to[1]),
                *workers,
                *populate,
            )
        }
        Command::Column { world, x, z } => {
            let world = CliWorld::from(world);
            let loaded = load(&cli, &world)?;
            column(&loaded, &world, *x, *z);
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref());
    if let Err(e) = run(cli) {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
