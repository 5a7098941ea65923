//! stlcarve CLI - carve STL meshes into named patches.
//!
//! Usage: stlcarve <COMMAND> [OPTIONS] <INPUT>
//!
//! Run `stlcarve --help` for available commands.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use stlcarve::algo::{grow, select_by_bbox, select_by_normal, AdjacencyIndex, DEFAULT_NORMAL_TOLERANCE};
use stlcarve::config::SessionConfig;
use stlcarve::io::{self, write_manifest, ExportReport, StlFormat};
use stlcarve::mesh::{FaceId, GroupId, TriangleMesh};
use stlcarve::nalgebra::{Point3, Vector3};
use stlcarve::selection::{
    parse_script, Color, CommandOutcome, GroupStore, PickOutcome, RecolorHook, SelectionController,
};

#[derive(Parser)]
#[command(name = "stlcarve")]
#[command(author, version, about = "Split STL meshes into named patches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display mesh information
    Info {
        /// Input STL file
        input: PathBuf,

        /// Distance under which vertices are merged for adjacency
        #[arg(long)]
        weld_tolerance: Option<f64>,
    },

    /// Split a mesh into patches from selection rules
    Split {
        /// Input STL file
        input: PathBuf,

        /// Patch of faces whose normal points along this vector (repeatable)
        #[arg(long, num_args = 3, value_names = ["NX", "NY", "NZ"], allow_negative_numbers = true)]
        normal_patch: Vec<f64>,

        /// Cosine-distance tolerance for normal patches
        #[arg(long, default_value_t = DEFAULT_NORMAL_TOLERANCE)]
        normal_tol: f64,

        /// Patch of faces whose centroid lies in this box (repeatable)
        #[arg(
            long,
            num_args = 6,
            value_names = ["XMIN", "XMAX", "YMIN", "YMAX", "ZMIN", "ZMAX"],
            allow_negative_numbers = true
        )]
        bbox_patch: Vec<f64>,

        /// Patch grown from this seed face (repeatable)
        #[arg(long, value_name = "SEED")]
        grow: Vec<usize>,

        /// Prefix for output files: patch_0.stl, patch_1.stl, ...
        #[arg(long, default_value = "patch")]
        output_prefix: String,

        /// Write the patch-to-file mapping to this JSON file
        #[arg(long, default_value = "patches.json")]
        emit_json: PathBuf,

        /// Also write faces matched by no rule
        #[arg(long)]
        keep_rest: bool,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Replay a selection session from a command script and export the groups
    Session {
        /// Input STL file
        input: PathBuf,

        /// Command script, one command per line (default: stdin)
        #[arg(short, long)]
        script: Option<PathBuf>,

        /// Output STL file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write each solid to its own file
        #[arg(long)]
        split: bool,

        /// Print every command and what it did
        #[arg(short, long)]
        verbose: bool,

        #[command(flatten)]
        session: SessionArgs,
    },
}

/// Settings shared by the commands that select and export.
#[derive(Args)]
struct SessionArgs {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Region-growing angle tolerance in degrees
    #[arg(short, long)]
    tolerance: Option<f64>,

    /// Distance under which vertices are merged for adjacency
    #[arg(long)]
    weld_tolerance: Option<f64>,

    /// Export only faces that belong to a group
    #[arg(long)]
    only_selected: bool,

    /// STL flavour to write
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Color of unassigned faces (#rrggbb or a name)
    #[arg(long)]
    color: Option<Color>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    /// Text STL, all solids in one file
    Ascii,
    /// Binary STL, one file per solid
    Binary,
}

impl From<FormatArg> for StlFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Ascii => StlFormat::Ascii,
            FormatArg::Binary => StlFormat::Binary,
        }
    }
}

impl SessionArgs {
    /// Load the config file, if any, and apply the flags on top.
    fn resolve(&self) -> Result<SessionConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if let Some(tolerance) = self.tolerance {
            config.angle_tolerance_deg = tolerance;
        }
        if let Some(weld) = self.weld_tolerance {
            config.weld_tolerance = weld;
        }
        if self.only_selected {
            config.only_selected = true;
        }
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if let Some(color) = self.color {
            config.mesh_color = color;
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stlcarve=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Info { input, weld_tolerance } => {
            let mut config = SessionConfig::default();
            if let Some(weld) = weld_tolerance {
                config.weld_tolerance = weld;
            }
            config.validate()?;
            cmd_info(&input, &config)?;
        }

        Commands::Split {
            input,
            normal_patch,
            normal_tol,
            bbox_patch,
            grow,
            output_prefix,
            emit_json,
            keep_rest,
            session,
        } => {
            let rules = SplitRules {
                normals: normal_patch
                    .chunks_exact(3)
                    .map(|c| Vector3::new(c[0], c[1], c[2]))
                    .collect(),
                normal_tol,
                boxes: bbox_patch
                    .chunks_exact(6)
                    .map(|c| (Point3::new(c[0], c[2], c[4]), Point3::new(c[1], c[3], c[5])))
                    .collect(),
                seeds: grow.into_iter().map(FaceId::new).collect(),
            };
            let mut config = session.resolve()?;
            config.only_selected = !keep_rest;
            cmd_split(&input, &rules, &output_prefix, &emit_json, &config)?;
        }

        Commands::Session {
            input,
            script,
            output,
            split,
            verbose,
            session,
        } => {
            let config = session.resolve()?;
            cmd_session(&input, script.as_deref(), output.as_deref(), split, verbose, &config)?;
        }
    }

    Ok(())
}

fn load_with_adjacency(
    input: &Path,
    config: &SessionConfig,
) -> Result<(TriangleMesh, AdjacencyIndex), Box<dyn std::error::Error>> {
    let mesh = io::load(input)?;
    println!("Loaded: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let start = Instant::now();
    let adjacency = AdjacencyIndex::build_with_options(&mesh, &config.adjacency_options());
    debug!(elapsed = ?start.elapsed(), "adjacency ready");
    Ok((mesh, adjacency))
}

fn cmd_info(input: &Path, config: &SessionConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (mesh, adjacency) = load_with_adjacency(input, config)?;

    println!("File: {}", input.display());
    println!("Points: {}", mesh.num_vertices());
    println!("Welded points: {}", adjacency.welded_vertex_count());
    println!("Faces: {}", mesh.num_faces());
    println!("Surface area: {:.6}", mesh.surface_area());
    println!("Volume: {:.6}", mesh.volume());

    if let Some((min, max)) = mesh.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    println!("Degenerate faces: {}", adjacency.degenerate_faces().len());
    if adjacency.non_manifold_edge_count() > 0 {
        println!("Topology: non-manifold ({} edges shared by 3+ faces)", adjacency.non_manifold_edge_count());
    }

    let mut seen = vec![false; mesh.num_faces()];
    let mut components = 0;
    for f in mesh.face_ids() {
        if seen[f.index()] {
            continue;
        }
        components += 1;
        for member in adjacency.connected_component(f)? {
            seen[member.index()] = true;
        }
    }
    println!("Connected components: {}", components);

    Ok(())
}

/// Patch rules for `split`, applied in order: normals, boxes, seeds.
struct SplitRules {
    normals: Vec<Vector3<f64>>,
    normal_tol: f64,
    boxes: Vec<(Point3<f64>, Point3<f64>)>,
    seeds: Vec<FaceId>,
}

fn cmd_split(
    input: &Path,
    rules: &SplitRules,
    output_prefix: &str,
    emit_json: &Path,
    config: &SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mesh, adjacency) = load_with_adjacency(input, config)?;
    let mut store = config.group_store(mesh.num_faces());

    let mut patches = Vec::new();
    for n in &rules.normals {
        let faces = select_by_normal(&adjacency, n, rules.normal_tol)?;
        patches.push((format!("normal_({}, {}, {})", n.x, n.y, n.z), faces));
    }
    for (min, max) in &rules.boxes {
        let faces = select_by_bbox(&mesh, min, max);
        patches.push((format!("bbox_{},{}", min.x, max.x), faces));
    }
    for &seed in &rules.seeds {
        let faces = grow(&adjacency, seed, config.angle_tolerance_deg)?;
        patches.push((format!("grow_{}", seed), faces));
    }
    if patches.is_empty() {
        return Err("no patch rules given (use --normal-patch, --bbox-patch or --grow)".into());
    }

    // Later rules take faces from earlier ones
    let mut labels: Vec<(String, GroupId)> = Vec::new();
    for (i, (label, faces)) in patches.into_iter().enumerate() {
        let group = if i == 0 { store.current_group() } else { store.create_group() };
        if faces.is_empty() {
            warn!(patch = %label, "rule matched no faces");
        }
        store.add_faces(group, &faces)?;
        labels.push((label, group));
    }

    // Solid names are bare group ids so files come out as <prefix>_<id>.stl
    let output_path = Path::new(output_prefix).with_extension("stl");
    let options = config
        .export_options(output_path)
        .with_group_prefix("")
        .with_split_files(true);
    let report = io::export(&mesh, &store, &options)?;

    let mut solids: Vec<(String, String)> = labels
        .iter()
        .map(|(label, group)| (label.clone(), options.group_name(*group)))
        .collect();
    if !options.only_selected {
        solids.push(("rest".to_string(), options.unassigned_name.clone()));
    }
    let manifest = report.to_labeled_manifest(&solids);
    write_manifest(&manifest, emit_json)?;

    println!("Wrote patches:");
    for (label, solid) in &solids {
        match report.solids.iter().find(|s| &s.name == solid) {
            Some(solid) => println!("  {} -> {} ({} faces)", label, solid.file.display(), solid.faces),
            None => println!("  {} -> (empty)", label),
        }
    }
    println!("Manifest: {}", emit_json.display());

    Ok(())
}

fn cmd_session(
    input: &Path,
    script: Option<&Path>,
    output: Option<&Path>,
    split: bool,
    verbose: bool,
    config: &SessionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let text = match script {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };
    let commands = parse_script(&text)?;

    let (mesh, adjacency) = load_with_adjacency(input, config)?;
    let hook = RecolorHook::new(|recolor| {
        debug!(
            faces = recolor.faces.len(),
            color = %recolor.color.map_or_else(|| "base".to_string(), |c| c.to_string()),
            selected = recolor.total_selected,
            "recolor"
        );
    });
    let mut session = SelectionController::with_store(&adjacency, config.group_store(mesh.num_faces()))?
        .with_tolerance(config.angle_tolerance_deg)
        .with_hook(hook);

    for command in commands {
        let outcome = session.apply(command)?;
        if verbose {
            println!("{:<14} {}", command.to_string(), describe(&outcome));
        }
    }

    let store = session.into_store();
    print_groups(&store, config.mesh_color);

    if let Some(output) = output {
        let options = config.export_options(output).with_split_files(split);
        let report = io::export(&mesh, &store, &options)?;
        print_report(&report);
    }

    Ok(())
}

fn describe(outcome: &CommandOutcome) -> String {
    match outcome {
        CommandOutcome::Pick(PickOutcome::Ignored) => "ignored (navigate mode)".to_string(),
        CommandOutcome::Pick(PickOutcome::Toggled { face, toggle }) => format!("face {}: {:?}", face, toggle),
        CommandOutcome::Pick(PickOutcome::Grown { region, changed }) => {
            format!("region of {} faces, {} changed", region, changed.len())
        }
        CommandOutcome::Mode(mode) => mode.status().to_string(),
        CommandOutcome::Group(group) => format!("current group {}", group),
        CommandOutcome::Cleared(faces) => format!("released {} faces", faces.len()),
        CommandOutcome::Tolerance(deg) => format!("tolerance {:.1} deg", deg),
    }
}

fn print_groups(store: &GroupStore, mesh_color: Color) {
    println!("Groups:");
    for group in store.groups() {
        let marker = if group.id() == store.current_group() { "*" } else { " " };
        println!("{} {:>3}  {}  {} faces", marker, group.id(), group.color(), group.len());
    }
    println!(
        "  unassigned {}  {} faces",
        mesh_color,
        store.face_count() - store.total_selected_count()
    );
    println!("Selected: {}", store.total_selected_count());
}

fn print_report(report: &ExportReport) {
    for solid in &report.solids {
        println!("Wrote {} ({} faces) to {}", solid.name, solid.faces, solid.file.display());
    }
}
