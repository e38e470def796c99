//! Apply a filter to an image file, reporting progress as it runs.
//!
//! The filter executes on a worker thread while this thread drains the
//! task's event channel; `--direct` runs it synchronously instead.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use shibori_core::{FilterBody, FilterEvent, FilterTask, Outcome};
use shibori_filters::{Bcg, BcgParams, BoxBlur, Grayscale, Invert, Sketch, convert};

/// Apply a cancelable, progress-reporting filter to an image file.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Input image path (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output image path; the format follows the extension.
    #[arg(short, long)]
    output: PathBuf,

    /// Which filter to apply.
    #[arg(long, value_enum, default_value_t = FilterKind::Grayscale)]
    filter: FilterKind,

    /// Blur radius in pixels (blur and sketch filters).
    #[arg(long, default_value_t = 3)]
    radius: u32,

    /// Brightness shift, -1.0 to 1.0 (bcg filter).
    #[arg(long, default_value_t = 0.0)]
    brightness: f64,

    /// Contrast multiplier around mid-gray (bcg filter).
    #[arg(long, default_value_t = 1.0)]
    contrast: f64,

    /// Gamma exponent (bcg filter).
    #[arg(long, default_value_t = 1.0)]
    gamma: f64,

    /// Run the filter synchronously in this thread instead of on a
    /// worker thread.
    #[arg(long)]
    direct: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FilterKind {
    Grayscale,
    Invert,
    Bcg,
    Blur,
    Sketch,
}

fn build_body(args: &Args) -> Box<dyn FilterBody> {
    match args.filter {
        FilterKind::Grayscale => Box::new(Grayscale),
        FilterKind::Invert => Box::new(Invert),
        FilterKind::Bcg => Box::new(Bcg::new(BcgParams {
            brightness: args.brightness,
            contrast: args.contrast,
            gamma: args.gamma,
        })),
        FilterKind::Blur => Box::new(BoxBlur::new(args.radius)),
        FilterKind::Sketch => Box::new(Sketch::new(args.radius)),
    }
}

fn report(event: FilterEvent) -> Option<Outcome> {
    match event {
        FilterEvent::Started => {
            eprintln!("Filter started");
            None
        }
        FilterEvent::Progress(percent) => {
            eprintln!("  {percent}%");
            None
        }
        FilterEvent::Finished(outcome) => Some(outcome),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    eprintln!("Reading image from {}", args.input.display());
    let decoded = image::open(&args.input)?;
    let original = convert::from_dynamic(&decoded)
        .ok_or("decoded image has an inconsistent pixel layout")?;
    log::debug!(
        "input: {}x{}, {}-bit, alpha: {}",
        original.width(),
        original.height(),
        if original.sixteen_bit() { 16 } else { 8 },
        original.has_alpha(),
    );

    let name = format!("{:?}", args.filter).to_lowercase();
    let body = build_body(&args);
    let (mut task, events) = FilterTask::with_channel(name, original, body);

    let mut outcome = None;
    if args.direct {
        task.start_direct();
        for event in events.try_iter() {
            outcome = report(event).or(outcome);
        }
    } else {
        task.start();
        for event in &events {
            if let Some(terminal) = report(event) {
                outcome = Some(terminal);
                break;
            }
        }
        task.wait();
    }

    match outcome {
        Some(Outcome::Completed) => {
            let dest = task
                .take_destination()
                .ok_or("filter completed without a destination image")?;
            let encodable =
                convert::to_dynamic(&dest).ok_or("filter produced an empty destination")?;
            encodable.save(&args.output)?;
            eprintln!("Wrote {}", args.output.display());
            Ok(())
        }
        Some(Outcome::Cancelled) => Err("filter run was cancelled".into()),
        _ => Err("filter run failed".into()),
    }
}
