use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use rand::Rng;
use serde::Serialize;
use std::path::PathBuf;
use timebox::{
    CompressionMode, Tag, TagIdentifier, TagOptions, TimeBoxBuilder, TimeBoxError, TypedColumn,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "timebox-cli", about = "Inspect and generate TimeBox files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a synthetic multi-tag series, write it compressed, then read it back.
    Demo {
        path: PathBuf,
        #[arg(long, default_value_t = 1_000)]
        points: u32,
        #[arg(long, default_value_t = 4)]
        tags: u8,
    },
    /// Print a file's header and per-tag compression summary.
    Inspect {
        path: PathBuf,
        /// Emit the summary as JSON instead of a human-readable report.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Serialize)]
struct TagSummary {
    identifier: String,
    type_char: char,
    bytes_per_value: u8,
    compressed: bool,
    mode: Option<char>,
}

#[derive(Serialize)]
struct FileSummary {
    version: u8,
    num_points: u32,
    num_tags: usize,
    start_date: String,
    end_date: String,
    date_differentials_stored: bool,
    tags: Vec<TagSummary>,
}

fn format_timestamp(seconds: i64) -> String {
    match Utc.timestamp_opt(seconds, 0).single() {
        Some(dt) => dt.to_rfc3339(),
        None => seconds.to_string(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {
        Command::Demo { path, points, tags } => demo(&path, points, tags),
        Command::Inspect { path, json } => inspect(&path, json),
    }
    .map_err(|e| e.into())
}

fn demo(path: &PathBuf, points: u32, tags: u8) -> Result<(), TimeBoxError> {
    info!(points, tags, path = %path.display(), "generating synthetic series");
    let mut rng = rand::thread_rng();

    let timestamps: Vec<i64> = (0..points as i64).map(|i| i * 60).collect();
    let mut builder = TimeBoxBuilder::new(timestamps);

    for t in 0..tags {
        let mut value = rng.gen_range(0.0..100.0);
        let walk: Vec<i32> = (0..points)
            .map(|_| {
                value += rng.gen_range(-2.0..2.0);
                value.round() as i32
            })
            .collect();
        let tag = Tag::new(
            TagIdentifier::Integer(t as u64),
            TagOptions {
                use_compression: true,
                ..Default::default()
            },
            TypedColumn::I32(walk),
        )
        .with_compression_mode(CompressionMode::MinOffset);
        builder = builder.add_tag(tag);
    }

    let file = builder.build()?;
    let uncompressed_bytes: usize = file
        .tags
        .values()
        .map(|t| t.len() * t.bytes_per_value() as usize)
        .sum();

    timebox::write_file(path, &file)?;
    let read_back = timebox::read_file(path)?;
    let on_disk_bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("wrote {} points across {} tags to {}", points, tags, path.display());
    println!("uncompressed tag data: {uncompressed_bytes} bytes");
    println!("on-disk file size: {on_disk_bytes} bytes");
    println!(
        "compression ratio: {:.2}x",
        uncompressed_bytes as f64 / on_disk_bytes.max(1) as f64
    );
    println!("round-trip verified: {} tags decoded", read_back.tags.len());
    println!(
        "date range: {} .. {}",
        format_timestamp(read_back.timestamps.first().copied().unwrap_or(0)),
        format_timestamp(read_back.timestamps.last().copied().unwrap_or(0))
    );
    Ok(())
}

fn inspect(path: &PathBuf, json: bool) -> Result<(), TimeBoxError> {
    let file = timebox::read_file(path)?;

    if json {
        let summary = FileSummary {
            version: file.version,
            num_points: file.num_points,
            num_tags: file.tags.len(),
            start_date: format_timestamp(file.timestamps.first().copied().unwrap_or(0)),
            end_date: format_timestamp(file.timestamps.last().copied().unwrap_or(0)),
            date_differentials_stored: file.options.date_differentials_stored,
            tags: file
                .tags
                .iter()
                .map(|(identifier, tag)| TagSummary {
                    identifier: format!("{identifier:?}"),
                    type_char: tag.type_char(),
                    bytes_per_value: tag.bytes_per_value(),
                    compressed: tag.options.use_compression,
                    mode: tag.options.use_compression.then(|| tag.compression_mode.as_char()),
                })
                .collect(),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&summary)
                .expect("FileSummary always serializes")
        );
        return Ok(());
    }

    println!("version: {}", file.version);
    println!("points: {}", file.num_points);
    println!("tags: {}", file.tags.len());
    println!(
        "date range: {} .. {}",
        format_timestamp(file.timestamps.first().copied().unwrap_or(0)),
        format_timestamp(file.timestamps.last().copied().unwrap_or(0))
    );
    if file.options.date_differentials_stored {
        println!("date deltas: unit={:?} bytes_per_delta={}", file.delta_unit, file.bytes_per_delta);
    } else {
        println!("uniform spacing: {}s", file.seconds_between_points);
    }
    for (identifier, tag) in &file.tags {
        println!(
            "  tag {identifier:?}: type={} bytes={} compressed={} mode={:?}",
            tag.type_char(),
            tag.bytes_per_value(),
            tag.options.use_compression,
            tag.compression_mode
        );
    }
    Ok(())
}
