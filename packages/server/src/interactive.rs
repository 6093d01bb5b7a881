//! Interactive launcher.
//!
//! Walks through the settings [`super::run_server`] reads from the
//! environment, prefilled with their current values, then starts the
//! server once confirmed.

use dialoguer::{Confirm, Input};
use ev_map_database::db::DEFAULT_DB_PATH;

/// A launch setting backed by an environment variable.
struct Setting {
    env_var: &'static str,
    prompt: &'static str,
    fallback: &'static str,
    validate: fn(&str) -> Result<(), String>,
}

const SETTINGS: &[Setting] = &[
    Setting {
        env_var: "BIND_ADDR",
        prompt: "Bind address",
        fallback: "127.0.0.1",
        validate: non_empty,
    },
    Setting {
        env_var: "PORT",
        prompt: "Port",
        fallback: "8080",
        validate: port,
    },
    Setting {
        env_var: "DATABASE_PATH",
        prompt: "Database path",
        fallback: DEFAULT_DB_PATH,
        validate: non_empty,
    },
];

fn non_empty(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err("a value is required".to_string())
    } else {
        Ok(())
    }
}

fn port(value: &str) -> Result<(), String> {
    value
        .trim()
        .parse::<u16>()
        .map(|_| ())
        .map_err(|_| format!("'{}' is not a port number", value.trim()))
}

/// Value offered for `setting`: the current environment value when it is
/// usable, the fallback otherwise.
fn prefill(setting: &Setting, current: Option<String>) -> String {
    current
        .map(|v| v.trim().to_string())
        .filter(|v| (setting.validate)(v).is_ok())
        .unwrap_or_else(|| setting.fallback.to_string())
}

fn ask(setting: &Setting) -> String {
    let default = prefill(setting, std::env::var(setting.env_var).ok());
    Input::<String>::new()
        .with_prompt(setting.prompt)
        .default(default.clone())
        .validate_with(|input: &String| (setting.validate)(input))
        .interact_text()
        .map_or(default, |v| v.trim().to_string())
}

/// Prompts for each launch setting and starts the server.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("EV Map Server");
    println!();

    let values: Vec<(&Setting, String)> = SETTINGS.iter().map(|s| (s, ask(s))).collect();
    let summary = values
        .iter()
        .map(|(s, v)| format!("{}={v}", s.env_var))
        .collect::<Vec<_>>()
        .join(" ");

    if !Confirm::new()
        .with_prompt(format!("Start server with {summary}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    for (setting, value) in &values {
        // SAFETY: runs before the server spawns any worker thread.
        unsafe {
            std::env::set_var(setting.env_var, value);
        }
    }

    super::run_server().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setting(env_var: &str) -> &'static Setting {
        SETTINGS.iter().find(|s| s.env_var == env_var).unwrap()
    }

    #[test]
    fn prefill_keeps_usable_environment_values() {
        assert_eq!(prefill(setting("PORT"), Some(" 9090 ".to_string())), "9090");
        assert_eq!(
            prefill(setting("DATABASE_PATH"), Some("/tmp/ev.db".to_string())),
            "/tmp/ev.db"
        );
    }

    #[test]
    fn prefill_falls_back_on_missing_or_invalid_values() {
        assert_eq!(prefill(setting("PORT"), None), "8080");
        assert_eq!(prefill(setting("PORT"), Some("http".to_string())), "8080");
        assert_eq!(prefill(setting("BIND_ADDR"), Some("  ".to_string())), "127.0.0.1");
        assert_eq!(prefill(setting("DATABASE_PATH"), None), DEFAULT_DB_PATH);
    }
}
