use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use nanobeam_devices::LayoutConfig;
use nanobeam_render::{write_svg, RenderFrame};

/// Generate photonic-crystal nanobeam mask layouts.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the layout and write it as GDS-II.
    Generate {
        /// JSON layout config; built-in defaults when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output GDS file, overriding the config.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write a preview (`.svg`, or `.json` render data).
        #[arg(short, long)]
        preview: Option<PathBuf>,
        /// Draw the ports of every subcell in the preview.
        #[arg(long)]
        show_ports: bool,
    },
    /// Print the default layout config as JSON, or save it to a file.
    Config {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Summarize the structures in a GDS-II file.
    Inspect { file: PathBuf },
}

fn generate(
    config: Option<&Path>,
    output: Option<PathBuf>,
    preview: Option<&Path>,
    show_ports: bool,
) -> anyhow::Result<()> {
    let mut layout = match config {
        Some(path) => LayoutConfig::load(path)?,
        None => LayoutConfig::default(),
    };
    if let Some(output) = output {
        layout.output = output;
    }

    let lib = layout.library().context("Failed to generate layout")?;
    nanobeam_io::write_gds_file(&layout.output, &lib)
        .with_context(|| format!("Failed to write {}", layout.output.display()))?;

    if let Some(preview) = preview {
        let top = lib.top().context("Library has no top cell")?;
        let frame = RenderFrame::from_cell(top, &lib.layer_stack, show_ports, (1600.0, 1200.0))?;
        write_svg(preview, &frame)
            .with_context(|| format!("Failed to write preview {}", preview.display()))?;
    }
    Ok(())
}

fn print_config(output: Option<&Path>) -> anyhow::Result<()> {
    let config = LayoutConfig::default();
    match output {
        Some(path) => {
            config.save(path)?;
            log::info!("Wrote default config to {}", path.display());
        }
        None => println!("{}", config.to_json()?),
    }
    Ok(())
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let lib = nanobeam_io::read_gds_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    println!("library {} ({} µm database unit)", lib.name, lib.db_unit_um);
    for cell in lib.all_cells() {
        let name = lib.cell_name(&cell.id).unwrap_or(&cell.name);
        println!(
            "  {:<24} {:>5} shapes {:>4} refs {:>4} labels",
            name,
            cell.geometry_count(),
            cell.instance_count(),
            cell.labels.len()
        );
    }
    if let Some(top) = lib.top() {
        match top.bbox() {
            Some(bb) => println!(
                "top {}: {:.3} × {:.3} µm",
                top.name,
                bb.width(),
                bb.height()
            ),
            None => println!("top {}: empty", top.name),
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            config,
            output,
            preview,
            show_ports,
        } => generate(config.as_deref(), output, preview.as_deref(), show_ports),
        Command::Config { output } => print_config(output.as_deref()),
        Command::Inspect { file } => inspect(&file),
    }
}
