use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rollcall_capture::{ImageDirFeed, LiveCapture, StaticImage, StreamedVideo};
use rollcall_store::students::Student;
use rollcall_store::{export, Cohort, Store};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod config;
mod encoder_cmd;
mod engine;

use config::Config;
use encoder_cmd::CommandEncoder;
use engine::Engine;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance CLI")]
struct Cli {
    /// Acting user recorded in the audit log (defaults to $USER).
    #[arg(long, global = true)]
    actor: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take attendance from a single still image
    Image {
        path: PathBuf,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        section: String,
    },
    /// Take attendance from extracted video frames, sampling every Nth
    Video {
        /// Directory of extracted frame images, in name order
        frames_dir: PathBuf,
        #[arg(long)]
        sample_every: Option<usize>,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        section: String,
    },
    /// Take attendance from a live capture spool until the watchdog fires
    Live {
        /// Directory the capture collaborator spools frames into
        spool_dir: PathBuf,
        #[arg(long)]
        max_secs: Option<u64>,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        section: String,
    },
    /// Enroll a student and add their reference photo to the gallery
    Enroll {
        #[arg(long)]
        identity: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        grade: String,
        #[arg(long)]
        section: String,
        #[arg(long)]
        photo: PathBuf,
    },
    /// Export one day's attendance for a cohort to a CSV file
    Export {
        #[arg(long)]
        grade: String,
        #[arg(long)]
        section: String,
        /// Calendar day, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Regenerate one day's mirror rows from the relational table
    RebuildMirror {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let actor = cli
        .actor
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string());

    match cli.command {
        Commands::Image {
            path,
            grade,
            section,
        } => {
            let mut source = StaticImage::open(&path)?;
            take_attendance(&config, &actor, Cohort::new(grade, section), &mut source)
        }
        Commands::Video {
            frames_dir,
            sample_every,
            grade,
            section,
        } => {
            let feed = ImageDirFeed::open(&frames_dir)?;
            let mut source = StreamedVideo::new(
                Box::new(feed),
                sample_every.unwrap_or(config.sample_every),
            );
            take_attendance(&config, &actor, Cohort::new(grade, section), &mut source)
        }
        Commands::Live {
            spool_dir,
            max_secs,
            grade,
            section,
        } => {
            let feed = ImageDirFeed::open(&spool_dir)?;
            let mut source = LiveCapture::new(
                Box::new(feed),
                Duration::from_secs(max_secs.unwrap_or(config.max_capture_secs)),
                sigint_cancel_flag(),
            );
            take_attendance(&config, &actor, Cohort::new(grade, section), &mut source)
        }
        Commands::Enroll {
            identity,
            name,
            grade,
            section,
            photo,
        } => enroll(&config, &actor, identity, name, Cohort::new(grade, section), &photo),
        Commands::Export {
            grade,
            section,
            date,
        } => {
            let store = open_store(&config)?;
            let cohort = Cohort::new(grade, section);
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let rows = store.export_rows(&cohort, date)?;
            if rows.is_empty() {
                println!("No attendance recorded for {}/{} on {date}", cohort.grade, cohort.section);
                return Ok(());
            }
            let path = export::write_export_file(&config.export_dir, &actor, &cohort, date, &rows)?;
            println!("Exported {} rows to {}", rows.len(), path.display());
            Ok(())
        }
        Commands::RebuildMirror { date } => {
            let store = open_store(&config)?;
            let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
            let count = store.rebuild_mirror(date)?;
            println!("Mirror rebuilt for {date}: {count} rows");
            Ok(())
        }
    }
}

static SIGINT_CANCEL: OnceLock<Arc<AtomicBool>> = OnceLock::new();

extern "C" fn on_sigint(_signum: libc::c_int) {
    // One relaxed store; the live capture loop observes it between frames.
    if let Some(flag) = SIGINT_CANCEL.get() {
        flag.store(true, Ordering::Relaxed);
    }
}

/// Cancel flag flipped by Ctrl-C, so a live session stops cooperatively
/// at the next frame boundary instead of dying mid-write.
fn sigint_cancel_flag() -> Arc<AtomicBool> {
    let flag = SIGINT_CANCEL
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    unsafe {
        libc::signal(libc::SIGINT, on_sigint as libc::sighandler_t);
    }
    flag
}

fn open_store(config: &Config) -> Result<Store> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Store::open(&config.db_path, &config.mirror_path)?)
}

fn build_encoder(config: &Config) -> Result<CommandEncoder> {
    let Some(cmdline) = config.encoder_cmd.as_deref() else {
        bail!("ROLLCALL_ENCODER_CMD is not set; point it at an embedding extractor command");
    };
    Ok(CommandEncoder::new(cmdline)?)
}

fn take_attendance(
    config: &Config,
    actor: &str,
    cohort: Cohort,
    source: &mut dyn rollcall_capture::FrameSource,
) -> Result<()> {
    let mut encoder = build_encoder(config)?;
    let store = open_store(config)?;
    let mut engine = Engine::new(store, config.gallery_dir.clone(), config.tolerance, &mut encoder)?;
    println!("Gallery: {} reference images", engine.gallery().len());

    let outcome = engine.run_session(source, &mut encoder, actor, &cohort)?;

    if outcome.written.is_empty() && outcome.skipped.is_empty() {
        println!("No known faces recognized.");
    } else {
        if !outcome.written.is_empty() {
            println!(
                "Attendance taken: {}",
                outcome.written.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
        if !outcome.skipped.is_empty() {
            println!(
                "Already recorded today: {}",
                outcome.skipped.iter().cloned().collect::<Vec<_>>().join(", ")
            );
        }
    }
    Ok(())
}

fn enroll(
    config: &Config,
    actor: &str,
    identity: String,
    name: String,
    cohort: Cohort,
    photo: &Path,
) -> Result<()> {
    let photo_bytes = std::fs::read(photo)
        .with_context(|| format!("cannot read photo {}", photo.display()))?;

    // The gallery loader keys on the file stem, so the reference copy is
    // named after the identity code.
    std::fs::create_dir_all(&config.gallery_dir)?;
    let ext = photo
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("jpg");
    let reference = config.gallery_dir.join(format!("{identity}.{ext}"));
    std::fs::copy(photo, &reference)?;

    let store = open_store(config)?;
    store.add_student(&Student {
        identity: identity.clone(),
        name,
        cohort: cohort.clone(),
        photo: Some(photo_bytes),
    })?;
    store.log_event(actor, "student enrolled", &cohort)?;

    println!("Enrolled {identity}; reference image at {}", reference.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigint_flips_the_live_cancel_flag() {
        let flag = sigint_cancel_flag();
        flag.store(false, Ordering::Relaxed);

        on_sigint(libc::SIGINT);

        assert!(flag.load(Ordering::Relaxed));
        // The handler and the command both see the same flag.
        assert!(sigint_cancel_flag().load(Ordering::Relaxed));
    }
}
