use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use nalgebra::Vector3;
use presplane_core::document::{
    Document, ExportOutcome, Gateway, PlaneProperties, PlaneView, ShapeLibrary,
};
use presplane_core::model::Shape;
use presplane_core::plane::{PageSize, Rotation};
use presplane_core::report::FlattenReport;
use presplane_pptx::PptxExporter;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Parser)]
#[command(name = "presplane")]
#[command(about = "Flatten 3D CAD edges onto a presentation plane and export slide line drawings.")]
struct Cli {
    /// Repeat for more log output (-v info, -vv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Flatten(FlattenArgs),
    /// Write the default plane properties as JSON.
    InitConfig {
        path: PathBuf,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct FlattenArgs {
    /// DXF drawing or JSON list of shapes.
    input: PathBuf,
    /// Plane properties JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Shapes to flatten (layer names for DXF); all shapes when empty.
    #[arg(long, num_args = 1..)]
    objects: Vec<String>,
    #[arg(long, value_enum)]
    page_size: Option<PageArg>,
    #[arg(long)]
    scale: Option<f64>,
    /// Arc sampling spacing in mm.
    #[arg(long)]
    discretize: Option<f64>,
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    base: Option<[f64; 3]>,
    #[arg(long, value_parser = parse_triple, allow_hyphen_values = true)]
    axis: Option<[f64; 3]>,
    /// Rotation angle about `--axis` in degrees.
    #[arg(long, allow_hyphen_values = true)]
    angle: Option<f64>,
    /// Export destination (.pptx).
    #[arg(long)]
    file: Option<PathBuf>,
    #[arg(long, value_enum)]
    gateway: Option<GatewayArg>,
    #[arg(long)]
    report: Option<PathBuf>,
    #[arg(long)]
    dump_bundle: Option<PathBuf>,
    #[arg(long)]
    dump_scene: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PageArg {
    A4,
    A3,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GatewayArg {
    Pptx,
    None,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    )?;

    match cli.cmd {
        Command::Flatten(args) => flatten(&args),
        Command::InitConfig { path, force } => init_config(&path, force),
    }
}

fn flatten(args: &FlattenArgs) -> Result<()> {
    ensure_input_file(&args.input)?;
    let shapes = load_shapes(&args.input)?;

    let mut props = match &args.config {
        Some(path) => read_properties(path)?,
        None => PlaneProperties::default(),
    };
    apply_overrides(&mut props, args);
    if props.objects.is_empty() {
        props.objects = shapes.iter().map(|s| s.name.clone()).collect();
        info!(count = props.objects.len(), "no objects given, selecting every shape");
    }

    let mut doc = Document::new(ShapeLibrary::new(shapes), props, PlaneView::default())
        .context("flatten plane")?;

    let report = FlattenReport::build(doc.plane()).context("build report")?;
    let json = serde_json::to_string_pretty(&report).context("serialize report")?;
    match &args.report {
        Some(path) => write_output(path, &json, "report")?,
        None => println!("{json}"),
    }

    if let Some(path) = &args.dump_bundle {
        let bundle = doc.plane().bundle_points().context("bundle points")?;
        let json = serde_json::to_string_pretty(&bundle).context("serialize bundle")?;
        write_output(path, &json, "bundle")?;
    }

    if let Some(path) = &args.dump_scene {
        let json = serde_json::to_string_pretty(doc.view().scene()).context("serialize scene")?;
        write_output(path, &json, "scene")?;
    }

    match doc.activate(&PptxExporter).context("export plane")? {
        ExportOutcome::Written { path, connectors } => {
            info!(path = %path.display(), connectors, "export written");
        }
        ExportOutcome::Skipped(reason) => {
            info!(?reason, "export skipped");
        }
    }

    Ok(())
}

fn apply_overrides(props: &mut PlaneProperties, args: &FlattenArgs) {
    if !args.objects.is_empty() {
        props.objects = args.objects.clone();
    }
    if let Some(page) = args.page_size {
        props.page_size = match page {
            PageArg::A4 => PageSize::A4,
            PageArg::A3 => PageSize::A3,
        };
    }
    if let Some(scale) = args.scale {
        props.scale = scale;
    }
    if let Some(spacing) = args.discretize {
        props.discretize = spacing;
    }
    if let Some([x, y, z]) = args.base {
        props.placement.base = Vector3::new(x, y, z);
    }
    if let Some([x, y, z]) = args.axis {
        props.placement.rotation.axis = Vector3::new(x, y, z);
    }
    if let Some(angle) = args.angle {
        props.placement.rotation =
            Rotation::from_degrees(props.placement.rotation.axis, angle);
    }
    if let Some(file) = &args.file {
        props.file = file.clone();
    }
    if let Some(gateway) = args.gateway {
        props.gateway = match gateway {
            GatewayArg::Pptx => Some(Gateway::Pptx),
            GatewayArg::None => None,
        };
    }
}

fn load_shapes(input: &Path) -> Result<Vec<Shape>> {
    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "dxf" => presplane_import_dxf::import_dxf(input),
        "json" => {
            let text = std::fs::read_to_string(input)
                .with_context(|| format!("read shapes: {input:?}"))?;
            serde_json::from_str(&text).with_context(|| format!("parse shapes: {input:?}"))
        }
        _ => bail!("Unsupported input extension: .{ext}"),
    }
}

fn read_properties(path: &Path) -> Result<PlaneProperties> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read config: {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("parse config: {path:?}"))
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("config already exists: {path:?} (use --force to overwrite)");
    }
    let json = serde_json::to_string_pretty(&PlaneProperties::default())
        .context("serialize default config")?;
    write_output(path, &json, "config")?;
    println!("wrote {}", path.display());
    Ok(())
}

fn write_output(path: &Path, contents: &str, what: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir for {what}: {parent:?}"))?;
        }
    }
    std::fs::write(path, contents).with_context(|| format!("write {what}: {path:?}"))
}

fn parse_triple(s: &str) -> std::result::Result<[f64; 3], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected X,Y,Z, got '{s}'"));
    };
    let num = |v: &str| v.parse::<f64>().map_err(|e| format!("bad number '{v}': {e}"));
    Ok([num(*x)?, num(*y)?, num(*z)?])
}

fn ensure_input_file(input: &Path) -> Result<()> {
    match std::fs::metadata(input) {
        Ok(meta) => {
            if meta.is_file() {
                Ok(())
            } else {
                bail!("input is not a file: {input:?}");
            }
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            bail!("input not found: {input:?} (cwd: {cwd:?}).");
        }
        Err(err) => Err(err).with_context(|| format!("stat input: {input:?}")),
    }
}
