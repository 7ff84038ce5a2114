use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use recital::output::{self, MemoryOutput, PitchOutput};
use recital::{
    compute_layout, ledger_duration_ms, load_ledger, BeatClock, Config, Ledger, LayoutMetrics,
    Staff,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Quantize(args) => execute_quantize(args),
        Commands::Info(args) => execute_info(args),
        Commands::Layout(args) => execute_layout(args),
        Commands::Play(args) => execute_play(args),
        Commands::Ports => execute_ports(),
    }
}

#[derive(Parser)]
#[command(author, version, about = "Record and replay piano performances on a staff")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Quantize a held duration into a note length.
    Quantize(QuantizeArgs),
    /// Summarise a save file.
    Info(InfoArgs),
    /// Print where every note of a save file lands on the staff.
    Layout(LayoutArgs),
    /// Play a save file in real time.
    Play(PlayArgs),
    /// List MIDI output ports.
    Ports,
}

#[derive(Args)]
struct QuantizeArgs {
    /// Held duration in milliseconds.
    ms: f64,
    /// Milliseconds per crotchet.
    #[arg(long, default_value_t = BeatClock::DEFAULT_BEAT_MS)]
    beat_ms: f64,
}

#[derive(Args)]
struct InfoArgs {
    /// Save file to read.
    file: PathBuf,
    /// Optional settings file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct LayoutArgs {
    /// Save file to read.
    file: PathBuf,
    /// Page width in pixels.
    #[arg(long, default_value_t = 624)]
    width: i32,
    /// Print the layout as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct PlayArgs {
    /// Save file to play.
    file: PathBuf,
    /// Optional settings file (YAML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// MIDI output port index; overrides the settings file.
    #[arg(long)]
    port: Option<usize>,
    /// Print output events as JSON lines instead of playing them.
    #[arg(long)]
    dry_run: bool,
}

fn read_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to read settings file {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn read_ledger(path: &Path) -> Result<Ledger> {
    load_ledger(path).with_context(|| format!("failed to load {}", path.display()))
}

fn execute_quantize(args: QuantizeArgs) -> Result<()> {
    let clock = BeatClock::new(args.beat_ms);
    let length = clock.quantize(args.ms);
    println!("{} ({} units)", length, length.units());
    Ok(())
}

fn execute_info(args: InfoArgs) -> Result<()> {
    let config = read_config(args.config.as_deref())?;
    let ledger = read_ledger(&args.file)?;
    let clock = BeatClock::new(config.beat_ms);
    let layout = compute_layout(&ledger, config.page_width, LayoutMetrics::default());
    let rests = ledger.iter().filter(|note| note.is_rest()).count();

    println!("File:     {}", args.file.display());
    println!("Notes:    {} ({} rests)", ledger.len(), rests);
    println!("Units:    {}", ledger.total_units());
    println!("Bars:     {}", layout.bar_lines().len());
    println!("Rows:     {}", layout.rows());
    println!(
        "Duration: {:.1} s at {} ms per beat",
        ledger_duration_ms(&ledger, &clock) / 1000.0,
        clock.beat_ms()
    );
    Ok(())
}

fn execute_layout(args: LayoutArgs) -> Result<()> {
    if args.width <= 0 {
        bail!("page width must be positive, got {}", args.width);
    }
    let ledger = read_ledger(&args.file)?;
    let layout = compute_layout(&ledger, args.width, LayoutMetrics::default());

    if args.json {
        let json = serde_json::to_string_pretty(&layout).context("failed to encode layout")?;
        println!("{}", json);
        return Ok(());
    }

    for (index, (note, placement)) in ledger.iter().zip(layout.placements()).enumerate() {
        let pitch = note
            .pitch
            .map_or_else(|| "rest".to_string(), |p| p.to_string());
        println!(
            "{:>4}  row {:>2}  x {:>4}  y {:>5}  {:<5} {}",
            index, placement.row, placement.x, placement.y, pitch, note.length
        );
    }
    for bar in layout.bar_lines() {
        println!("bar after note {} at row {} x {}", bar.after, bar.row, bar.x);
    }
    Ok(())
}

fn execute_play(args: PlayArgs) -> Result<()> {
    let config = read_config(args.config.as_deref())?;
    let ledger = read_ledger(&args.file)?;
    let port = args.port.or(config.midi_port);

    if args.dry_run {
        let mut staff = Staff::with_ledger(config, MemoryOutput::new(), ledger);
        staff.play();
        while staff.is_playing() {
            staff.tick(1.0);
        }
        for event in staff.output_mut().take_events() {
            println!(
                "{}",
                serde_json::to_string(&event).context("failed to encode output event")?
            );
        }
        return Ok(());
    }

    let output = output::open_output(port);
    let mut staff = Staff::with_ledger(config, output, ledger);
    info!(
        file = %args.file.display(),
        output = staff.output().name(),
        "starting playback"
    );
    run_realtime(&mut staff);
    Ok(())
}

/// Drive playback from the wall clock until the last note ends.
fn run_realtime<O: PitchOutput>(staff: &mut Staff<O>) {
    staff.play();
    let mut last = Instant::now();
    while staff.is_playing() {
        thread::sleep(Duration::from_millis(1));
        let now = Instant::now();
        staff.tick(now.duration_since(last).as_secs_f64() * 1000.0);
        last = now;
    }
    staff.silence();
}

fn execute_ports() -> Result<()> {
    let ports = output::list_ports().context("failed to list MIDI output ports")?;
    if ports.is_empty() {
        println!("No MIDI output ports found.");
    } else {
        for (index, name) in ports.iter().enumerate() {
            println!("{:>2}: {}", index, name);
        }
    }
    Ok(())
}
