//! Support for runtime configuration options

use std::error::Error;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

fn default_calendar_file() -> PathBuf {
    PathBuf::from("events.ics")
}

fn default_ledger_file() -> PathBuf {
    PathBuf::from("processed_events.txt")
}

/// The runtime configuration, usually read from a `config.json` file.
///
/// The JSON keys are upper-case (`WEBHOOK_URL`, `CHAT_ID`...), so that existing config files keep working as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// The webhook the notifications are POSTed to (e.g. a Telegram bot `sendMessage` endpoint)
    pub webhook_url: Url,
    /// The Telegram channel the notifications are sent to
    pub chat_id: i64,
    /// The iCalendar file that contains the recurring events
    #[serde(default = "default_calendar_file")]
    pub calendar_file: PathBuf,
    /// The append-only file that records which occurrences have already been notified
    #[serde(default = "default_ledger_file")]
    pub ledger_file: PathBuf,
}

impl Settings {
    /// Read the settings from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let file = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open config file {:?}: {}", path, err).into());
            },
            Ok(file) => file,
        };

        let settings = serde_json::from_reader(file)
            .map_err(|err| format!("Invalid config file {:?}: {}", path, err))?;
        Ok(settings)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_settings() {
        let json = r#"{
            "WEBHOOK_URL": "https://api.telegram.org/bot123:ABC/sendMessage",
            "CHAT_ID": 777
        }"#;

        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.webhook_url.as_str(), "https://api.telegram.org/bot123:ABC/sendMessage");
        assert_eq!(settings.chat_id, 777);
        assert_eq!(settings.calendar_file, PathBuf::from("events.ics"));
        assert_eq!(settings.ledger_file, PathBuf::from("processed_events.txt"));
    }

    #[test]
    fn test_parse_settings_with_custom_paths() {
        let json = r#"{
            "WEBHOOK_URL": "https://example.org/hook",
            "CHAT_ID": -100200300,
            "CALENDAR_FILE": "/var/lib/calbell/team.ics",
            "LEDGER_FILE": "/var/lib/calbell/notified.txt"
        }"#;

        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.calendar_file, PathBuf::from("/var/lib/calbell/team.ics"));
        assert_eq!(settings.ledger_file, PathBuf::from("/var/lib/calbell/notified.txt"));
    }

    #[test]
    fn test_missing_required_key() {
        let json = r#"{ "WEBHOOK_URL": "https://example.org/hook" }"#;
        assert!(serde_json::from_str::<Settings>(json).is_err());
    }
}
