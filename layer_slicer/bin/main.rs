use std::{
    fs,
    io::{stdout, Write},
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context, Result};
use args::Args;
use clap::Parser;
use common::config::SliceMode;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

use layer_slicer::{
    format::svg::SvgFile,
    job::{run_job, JobRequest},
    slice::SliceSet,
    slicer::Slicer,
};

mod args;

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };
    let filter = filter::Targets::new()
        .with_default(LevelFilter::OFF)
        .with_target("layer_slicer", level)
        .with_target("common", level);
    // Logs go to stderr, stdout carries progress and job messages.
    let format = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    tracing_subscriber::registry().with(filter).with(format).init();

    let config = args.slice_config();
    let slicer = Slicer::from_config(&config);

    if let Some(path) = &args.model.job {
        let file = fs::read_to_string(path).with_context(|| format!("reading `{}`", path.display()))?;
        let request: JobRequest = serde_json::from_str(&file)?;

        let mut stdout = stdout().lock();
        let slices = run_job(&slicer, request, |message| {
            // A closed stdout shouldn't stop the job.
            if let Ok(line) = serde_json::to_string(&message) {
                let _ = writeln!(stdout, "{line}");
            }
        })?;

        return write_output(&args, &slices);
    }

    let mesh = args.load_mesh()?;
    println!(
        "Loaded model. {{ vert: {}, tri: {} }}",
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    // Slice on another thread and follow along through the progress counter.
    let now = Instant::now();
    let task = slicer.slice_model(&mesh, config.layer_height, config.mode)?;
    let progress = slicer.progress_counter();
    let total = task.total_layers();

    let handle = thread::spawn(move || task.run());
    while !progress.finished() && !handle.is_finished() {
        let completed = progress.wait_timeout(Duration::from_millis(100));
        print!(
            "\rLayer: {}/{}, {:.1}%",
            completed,
            total,
            completed as f32 / total.max(1) as f32 * 100.0
        );
        stdout().flush()?;
    }

    let slices = handle
        .join()
        .map_err(|_| anyhow!("slicing thread panicked"))??;
    println!("\nDone. Elapsed: {:.1}s", now.elapsed().as_secs_f32());

    let filled = slices.iter().filter(|x| !x.is_empty()).count();
    match slices.mode() {
        SliceMode::Contour => println!(
            "{} layers ({} with outlines), {} segments",
            slices.len(),
            filled,
            slices.iter().map(|x| x.segment_count()).sum::<usize>()
        ),
        SliceMode::Volumetric => println!(
            "{} layers ({} with geometry), {} triangles",
            slices.len(),
            filled,
            slices.iter().map(|x| x.triangle_count()).sum::<usize>()
        ),
    }

    write_output(&args, &slices)
}

fn write_output(args: &Args, slices: &SliceSet) -> Result<()> {
    if let Some(path) = &args.output {
        SvgFile::new(slices).save(path)?;
        println!("Wrote `{}`", path.display());
    }

    Ok(())
}
