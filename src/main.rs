use clap::Parser;
use cut_planner::render;
use cut_planner::settings::{CuttingSettings, MaterialOrientation, OptimizationStrategy};
use cut_planner::types::{CuttingItem, Material, RotationPolicy};
use cut_planner::{Planner, efficiency_report};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "cut_planner",
    about = "Plan guillotine cuts of rectangular pieces from stock sheets"
)]
struct Cli {
    /// Stock sheet dimensions (WxH, e.g. 2440x1220)
    #[arg(long)]
    stock: String,

    /// Pieces as LxW:qty[:rotation] (e.g. 800x600:3 400x300:5:fixed-default)
    #[arg(long = "cuts", num_args = 1..)]
    cuts: Vec<String>,

    /// Blade kerf width
    #[arg(long, default_value_t = 3.0)]
    kerf: f64,

    /// Trim kept clear along every sheet edge
    #[arg(long, default_value_t = 5.0)]
    margin: f64,

    /// Disable piece rotation
    #[arg(long)]
    no_rotate: bool,

    /// Sheet orientation: none, horizontal, or vertical
    #[arg(long, default_value = "none")]
    orientation: MaterialOrientation,

    /// Strategy: first-fit, guillotine, or genetic
    #[arg(long, default_value = "guillotine")]
    strategy: OptimizationStrategy,

    /// Seed for the genetic search
    #[arg(long)]
    seed: Option<u64>,

    /// Show ASCII layout of each sheet
    #[arg(long)]
    layout: bool,

    /// Print the full results as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_dimensions(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!("invalid dimensions '{}', expected WxH", s));
    }
    let first = parts[0]
        .parse::<f64>()
        .map_err(|_| format!("invalid first dimension in '{}'", s))?;
    let second = parts[1]
        .parse::<f64>()
        .map_err(|_| format!("invalid second dimension in '{}'", s))?;
    Ok((first, second))
}

fn parse_cut(s: &str, index: usize) -> Result<CuttingItem, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if !(2..=3).contains(&parts.len()) {
        return Err(format!("invalid cut '{}', expected LxW:qty[:rotation]", s));
    }
    let (length, width) = parse_dimensions(parts[0])?;
    let qty = parts[1]
        .parse::<u32>()
        .map_err(|_| format!("invalid quantity in '{}'", s))?;
    let rotation = match parts.get(2) {
        Some(policy) => policy.parse::<RotationPolicy>()?,
        None => RotationPolicy::Auto,
    };
    let mut item = CuttingItem::new(format!("item{}", index + 1), length, width, qty)
        .with_rotation(rotation);
    item.name = Some(parts[0].to_string());
    Ok(item)
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(if cli.verbose { Level::INFO } else { Level::WARN })
        .init();

    let (width, height) = parse_dimensions(&cli.stock).unwrap_or_else(|e| fail(e));
    let stock = Material::new("stock", "Stock", width, height);

    let items: Vec<CuttingItem> = cli
        .cuts
        .iter()
        .enumerate()
        .map(|(i, c)| parse_cut(c, i))
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| fail(e));

    let settings = CuttingSettings {
        kerf_width: cli.kerf,
        margin: cli.margin,
        allow_rotation: !cli.no_rotate,
        material_orientation: cli.orientation,
        optimization_strategy: cli.strategy,
        seed: cli.seed,
        ..CuttingSettings::default()
    };

    let mut planner = Planner::new(settings);
    let results = planner
        .plan(std::slice::from_ref(&stock), &items, Some(&stock))
        .unwrap_or_else(|e| fail(e));
    let report = efficiency_report(&results);

    if cli.json {
        let out = serde_json::json!({ "results": results, "report": report });
        match serde_json::to_string_pretty(&out) {
            Ok(text) => println!("{text}"),
            Err(e) => fail(e),
        }
        return;
    }

    for (i, sheet) in results.iter().enumerate() {
        println!(
            "Sheet {} ({}x{}):",
            i + 1,
            sheet.actual_material.width,
            sheet.actual_material.height
        );
        for p in &sheet.cuts {
            let rot = if p.rotated { " [rotated]" } else { "" };
            println!("  {}x{} @ ({}, {}){}", p.width, p.height, p.x, p.y, rot);
        }
        if !sheet.cutting_steps.is_empty() {
            println!("  {} cuts", sheet.cutting_steps.len());
        }
        if cli.layout {
            print!("{}", render::render_sheet(sheet, true));
        }
        println!();
    }

    println!(
        "Summary: {} sheet{} used, {:.1}% waste, {} pieces placed",
        report.materials_used,
        if report.materials_used == 1 { "" } else { "s" },
        report.waste_percentage,
        report.items_placed,
    );
    if let Some(summary) = results.first().and_then(|r| r.summary.as_ref())
        && !summary.is_complete()
    {
        eprintln!(
            "Warning: only {} of {} pieces placed ({:?})",
            summary.total_items_placed, summary.total_items_requested, summary.stop_reason
        );
    }
    for r in &report.recommendations {
        println!("  - {r}");
    }
}
