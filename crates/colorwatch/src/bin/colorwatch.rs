use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use colorwatch::core::find_match;
use colorwatch::image_input::{load_frame, pick_from_image};
use colorwatch::prefs::{self, keys, JsonFilePreferences};
use colorwatch::screen::{list_displays, XcapProvider};
use colorwatch::{AlertCapability, Monitor, MonitorConfig, RawInputs, Rgb, Ticker, Tolerance};

#[derive(Parser, Debug)]
#[command(name = "colorwatch", version, about = "Watch the screen for a color")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON log lines.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a display and alert when the target color shows up.
    Watch(WatchArgs),
    /// Look for the target color in an image file.
    Check(CheckArgs),
    /// Store the color under a pixel as the new target color.
    Pick(PickArgs),
    /// List capturable displays.
    Monitors,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Target color as #rrggbb.
    #[arg(long)]
    color: Option<String>,
    /// Allowed per-channel difference.
    #[arg(long, allow_hyphen_values = true)]
    tolerance: Option<String>,
    /// Preferences file (defaults to the per-user config directory).
    #[arg(long)]
    prefs: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct WatchArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Consecutive identical results needed to change the alert.
    #[arg(long, allow_hyphen_values = true)]
    threshold: Option<String>,
    /// Milliseconds between ticks.
    #[arg(long)]
    interval_ms: Option<u64>,
    /// Display name to capture (see `colorwatch monitors`).
    #[arg(long)]
    monitor: Option<String>,
    /// Turn detection notifications on.
    #[arg(long, conflicts_with = "no_notify")]
    notify: bool,
    /// Turn detection notifications off.
    #[arg(long)]
    no_notify: bool,
    /// Stop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// JSON run config.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    image: PathBuf,
    #[command(flatten)]
    input: InputArgs,
}

#[derive(Args, Debug)]
struct PickArgs {
    #[arg(long)]
    x: u32,
    #[arg(long)]
    y: u32,
    /// Pick from an image file instead of the screen.
    #[arg(long)]
    image: Option<PathBuf>,
    #[arg(long)]
    monitor: Option<String>,
    #[arg(long)]
    prefs: Option<PathBuf>,
}

fn init_logging(cli: &Cli) {
    let level = colorwatch::core::level_from_verbosity(cli.verbose);
    #[cfg(feature = "tracing")]
    {
        colorwatch::core::init_tracing(level, cli.json_logs);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if let Err(e) = colorwatch::core::init_with_level(level) {
            eprintln!("logger init failed: {e}");
        }
    }
}

fn open_prefs(path: Option<PathBuf>) -> JsonFilePreferences {
    let path = path.unwrap_or_else(JsonFilePreferences::default_path);
    log::debug!("preferences: {}", path.display());
    JsonFilePreferences::open_or_empty(path)
}

fn watch(args: WatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = match &args.config {
        Some(path) => Some(MonitorConfig::load_json(path)?),
        None => None,
    };
    let base = cfg.clone().unwrap_or_default();

    let prefs_path = args.input.prefs.clone().or_else(|| base.prefs_path());
    let mut options = base.capture_options();
    if args.monitor.is_some() {
        options.display = args.monitor.clone();
    }

    let mut monitor = Monitor::new(
        XcapProvider::new(),
        open_prefs(prefs_path),
        AlertCapability::detect(),
        options,
    );

    // Config file and flags count as edits: they are persisted.
    if let Some(cfg) = &cfg {
        let inputs = cfg.raw_inputs();
        monitor.set_target_color(&inputs.target_color);
        monitor.set_tolerance(&inputs.tolerance);
        monitor.set_threshold(&inputs.threshold);
    }
    if let Some(color) = &args.input.color {
        monitor.set_target_color(color);
    }
    if let Some(tolerance) = &args.input.tolerance {
        monitor.set_tolerance(tolerance);
    }
    if let Some(threshold) = &args.threshold {
        monitor.set_threshold(threshold);
    }

    let want_notify = args.notify || cfg.as_ref().is_some_and(|c| c.notify);
    if args.no_notify {
        monitor.set_alert_enabled(false)?;
    } else if want_notify {
        if let Err(e) = monitor.set_alert_enabled(true) {
            eprintln!("notifications disabled: {e}");
        }
    }

    monitor.start()?;

    let period = args
        .interval_ms
        .map(|ms| Duration::from_millis(ms.max(1)))
        .unwrap_or_else(|| base.period());
    let mut ticker = Ticker::new(period);

    let summary = monitor.run(&mut ticker, args.max_ticks, |m, status| {
        println!("{status}\t{}", m.alert().title());
        true
    });
    monitor.stop();
    log::info!(
        "finished after {} ticks ({} overruns), capture {:?}",
        summary.ticks,
        summary.overruns,
        summary.final_state
    );
    println!("{}", monitor.status());
    Ok(())
}

fn check(args: CheckArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_prefs(args.input.prefs);
    let mut inputs = prefs::load_inputs(&store, RawInputs::default());
    if let Some(color) = args.input.color {
        inputs.target_color = color;
    }
    if let Some(tolerance) = args.input.tolerance {
        inputs.tolerance = tolerance;
    }
    let target = Rgb::from_hex(&inputs.target_color)?;
    let tolerance = Tolerance::parse(&inputs.tolerance)?;

    let frame = load_frame(&args.image)?;
    match find_match(&frame.view(), target, tolerance) {
        Some((x, y)) => println!("match at ({x}, {y})"),
        None => println!("no match"),
    }
    Ok(())
}

fn pick(args: PickArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_prefs(args.prefs);
    let color = match &args.image {
        Some(path) => {
            let color = pick_from_image(path, args.x, args.y)?;
            prefs::write_pref(&mut store, keys::TARGET_COLOR, &color.to_hex());
            color
        }
        None => {
            let options = colorwatch::CaptureOptions {
                display: args.monitor.clone(),
                ..Default::default()
            };
            let mut monitor =
                Monitor::new(XcapProvider::new(), store, AlertCapability::Unavailable, options);
            monitor.pick_target_color(args.x as usize, args.y as usize)?
        }
    };
    println!("{color}");
    Ok(())
}

fn monitors() -> Result<(), Box<dyn std::error::Error>> {
    for d in list_displays()? {
        let primary = if d.is_primary { " (primary)" } else { "" };
        println!("{}\t{}x{}{primary}", d.name, d.width, d.height);
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Command::Watch(args) => watch(args),
        Command::Check(args) => check(args),
        Command::Pick(args) => pick(args),
        Command::Monitors => monitors(),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
