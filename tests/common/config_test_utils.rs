use std::sync::{Mutex, OnceLock};
use tempfile::TempDir;

const ENV_KEYS: &[&str] = &[
    "XDG_CONFIG_HOME",
    "HTTPSHARE_PORT",
    "HTTPSHARE_DOWNLOADS",
    "HTTPSHARE_ARCHIVER",
    "HTTPSHARE_BIND",
    "HTTPSHARE_WORDS_DIR",
    "HTTPSHARE_SHOW_QR",
    "HTTPSHARE_CLIPBOARD",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

struct EnvRestore {
    saved: Vec<(&'static str, Option<std::ffi::OsString>)>,
}

impl Drop for EnvRestore {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(value) => std::env::set_var(key, value),
                None => std::env::remove_var(key),
            }
        }
    }
}

fn write_config(temp_dir: &TempDir, contents: &str) {
    let app_config_dir = temp_dir.path().join("httpshare");
    std::fs::create_dir_all(&app_config_dir).expect("create config dir");
    std::fs::write(app_config_dir.join("config.toml"), contents).expect("write config");
}

/// Runs `f` with a private config dir holding `config_toml` and `env` set.
pub fn with_config_env<T>(config_toml: &str, env: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
    let _guard = env_lock().lock().unwrap_or_else(|e| e.into_inner());
    let temp_dir = TempDir::new().expect("temp dir");

    write_config(&temp_dir, config_toml);

    let restore = EnvRestore {
        saved: ENV_KEYS
            .iter()
            .map(|key| (*key, std::env::var_os(key)))
            .collect(),
    };

    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
    std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    for (key, value) in env {
        std::env::set_var(key, value);
    }

    let result = f();
    drop(restore);
    result
}
