use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Default settings namespace holding the `sms_enabled` flag.
pub const DEFAULT_PREFS_NAMESPACE: &str = "com.zeusinstitute.upiapp.preferences";

const TTS_CANDIDATES: [&str; 3] = ["espeak-ng", "espeak", "say"];

/// Typed configuration for the speaker service.
#[derive(Clone, Debug)]
pub struct Config {
    // Storage
    pub db_path: PathBuf,
    pub prefs_dir: PathBuf,
    pub prefs_namespace: String,

    // Worker / lifecycle
    pub poll_interval: Duration,
    pub shutdown_grace: Duration,

    // Speech
    pub speech_locale: String,
    pub tts_command: Option<PathBuf>,

    // Notifications
    pub notifications_enabled: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let home = home_dir().ok_or_else(|| Error::Config("HOME is not set".to_string()))?;
        let defaults = Self::with_home(&home);

        let db_path = env_path("UPIS_DB_PATH").unwrap_or(defaults.db_path);
        let prefs_dir = env_path("UPIS_PREFS_DIR").unwrap_or(defaults.prefs_dir);
        let prefs_namespace = env_str("UPIS_PREFS_NAMESPACE")
            .and_then(non_empty)
            .unwrap_or(defaults.prefs_namespace);

        let poll_interval = env_u64("UPIS_POLL_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        if poll_interval.is_zero() {
            return Err(Error::Config(
                "UPIS_POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }
        let shutdown_grace = env_u64("UPIS_SHUTDOWN_GRACE_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.shutdown_grace);

        let speech_locale = env_str("UPIS_SPEECH_LOCALE")
            .and_then(non_empty)
            .unwrap_or(defaults.speech_locale);
        let tts_command = env_path("UPIS_TTS_COMMAND").or_else(|| {
            TTS_CANDIDATES
                .iter()
                .find_map(|name| which_in_path(name))
        });

        let notifications_enabled =
            env_bool("UPIS_NOTIFICATIONS").unwrap_or(defaults.notifications_enabled);

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            db_path,
            prefs_dir,
            prefs_namespace,
            poll_interval,
            shutdown_grace,
            speech_locale,
            tts_command,
            notifications_enabled,
        })
    }

    /// Defaults rooted at `home`, without consulting the environment.
    pub fn with_home(home: &Path) -> Self {
        Self {
            db_path: home.join(".local/share/upi-speaker/transactions.db"),
            prefs_dir: home.join(".config/upi-speaker"),
            prefs_namespace: DEFAULT_PREFS_NAMESPACE.to_string(),
            poll_interval: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
            speech_locale: "en-US".to_string(),
            tts_command: None,
            notifications_enabled: true,
        }
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, unquote(v.trim()));
    }
}

fn unquote(val: &str) -> &str {
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        &val[1..val.len() - 1]
    } else {
        val
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| parse_bool(&s))
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn which_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    for dir in env::split_paths(&path) {
        let candidate = dir.join(binary);
        if is_executable_file(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn is_executable_file(p: &Path) -> bool {
    if !p.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(md) = fs::metadata(p) {
            return (md.permissions().mode() & 0o111) != 0;
        }
    }
    true
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
