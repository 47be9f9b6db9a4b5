use std::path::PathBuf;

/// Engine configuration, loaded from environment variables.
pub struct Config {
    /// Directory of labeled reference images (one per enrolled identity).
    pub gallery_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Path to the flat attendance mirror file.
    pub mirror_path: PathBuf,
    /// Directory where export files are written.
    pub export_dir: PathBuf,
    /// Maximum Euclidean distance for an accepted match.
    pub tolerance: f32,
    /// Video mode keeps every Nth frame.
    pub sample_every: usize,
    /// Live capture watchdog in seconds.
    pub max_capture_secs: u64,
    /// External embedding extractor command (reads a PGM frame on stdin,
    /// prints a JSON array of embedding vectors on stdout).
    pub encoder_cmd: Option<String>,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        Self {
            gallery_dir: std::env::var("ROLLCALL_GALLERY_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("gallery")),
            db_path: std::env::var("ROLLCALL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("attendance.db")),
            mirror_path: std::env::var("ROLLCALL_MIRROR_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| data_dir.join("attendance_records.csv")),
            export_dir: std::env::var("ROLLCALL_EXPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            tolerance: env_f32("ROLLCALL_TOLERANCE", 0.5),
            sample_every: env_usize("ROLLCALL_SAMPLE_EVERY", 5),
            max_capture_secs: env_u64("ROLLCALL_MAX_CAPTURE_SECS", 30),
            encoder_cmd: std::env::var("ROLLCALL_ENCODER_CMD").ok(),
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
