// Configuration loading and parsing (tournament.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

/// The one config file, under `config/` (and its template under `defaults/`).
pub const CONFIG_FILE: &str = "tournament.toml";

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub tournament: TournamentSettings,
    pub schedule: ScheduleSettings,
    pub db_path: String,
    pub logging: LoggingSettings,
}

// ---------------------------------------------------------------------------
// tournament.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire tournament.toml file.
#[derive(Debug, Clone, Deserialize)]
struct TournamentFile {
    tournament: TournamentSettings,
    #[serde(default)]
    schedule: ScheduleSettings,
    database: DatabaseSection,
    #[serde(default)]
    logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TournamentSettings {
    pub name: String,
    /// How many league fixtures each pair of teams is scheduled for (1-5).
    pub matches_per_team_pair: u32,
    #[serde(default = "default_overs_per_innings")]
    pub overs_per_innings: u32,
    /// Over cap for a Super Duper Over tie-break.
    #[serde(default = "default_super_over_overs")]
    pub super_over_overs: u32,
    /// Grounds assigned to fixtures in rotation. Empty means "TBD".
    #[serde(default)]
    pub venues: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    #[serde(default = "default_first_match_hour")]
    pub first_match_hour: u32,
    #[serde(default = "default_second_match_hour")]
    pub second_match_hour: u32,
    /// Days between the last scheduled match and a newly created playoff.
    #[serde(default = "default_playoff_gap_days")]
    pub playoff_gap_days: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            first_match_hour: default_first_match_hour(),
            second_match_hour: default_second_match_hour(),
            playoff_gap_days: default_playoff_gap_days(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            filter: default_log_filter(),
        }
    }
}

fn default_overs_per_innings() -> u32 {
    20
}

fn default_super_over_overs() -> u32 {
    2
}

fn default_first_match_hour() -> u32 {
    14
}

fn default_second_match_hour() -> u32 {
    19
}

fn default_playoff_gap_days() -> u32 {
    1
}

fn default_log_directory() -> String {
    "logs".into()
}

fn default_log_filter() -> String {
    "crease=info,warn".into()
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/tournament.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    let file: TournamentFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        tournament: file.tournament,
        schedule: file.schedule,
        db_path: file.database.path,
        logging: file.logging,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/tournament.toml` into `config/` when no config file exists
/// yet. Returns the path written, or `None` if a config was already there.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.exists() {
        return Ok(None);
    }
    let template = base_dir.join("defaults").join(CONFIG_FILE);
    if !template.is_file() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{CONFIG_FILE} and no defaults/{CONFIG_FILE} template in {}",
                base_dir.display()
            ),
        });
    }

    let copy_err = |e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {} to {}: {e}", template.display(), target.display()),
    };
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(copy_err)?;
    }
    std::fs::copy(&template, &target).map_err(copy_err)?;
    Ok(Some(target))
}

/// Load config relative to the current working directory, seeding it from
/// the shipped template on first run.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let t = &config.tournament;
    if t.name.trim().is_empty() {
        return Err(invalid("tournament.name", "must not be empty"));
    }

    if !(1..=5).contains(&t.matches_per_team_pair) {
        return Err(invalid(
            "tournament.matches_per_team_pair",
            format!("must be between 1 and 5 inclusive, got {}", t.matches_per_team_pair),
        ));
    }

    if t.overs_per_innings == 0 {
        return Err(invalid("tournament.overs_per_innings", "must be greater than 0"));
    }

    if t.super_over_overs == 0 || t.super_over_overs > t.overs_per_innings {
        return Err(invalid(
            "tournament.super_over_overs",
            format!(
                "must be between 1 and overs_per_innings ({}), got {}",
                t.overs_per_innings, t.super_over_overs
            ),
        ));
    }

    let s = &config.schedule;
    let hour_fields: &[(&str, u32)] = &[
        ("schedule.first_match_hour", s.first_match_hour),
        ("schedule.second_match_hour", s.second_match_hour),
    ];
    for (name, val) in hour_fields {
        if *val > 23 {
            return Err(invalid(name, format!("must be an hour of day (0-23), got {val}")));
        }
    }
    if s.first_match_hour >= s.second_match_hour {
        return Err(invalid(
            "schedule.second_match_hour",
            "must be later than schedule.first_match_hour",
        ));
    }
    if s.playoff_gap_days == 0 {
        return Err(invalid("schedule.playoff_gap_days", "must be > 0"));
    }

    if config.db_path.trim().is_empty() {
        return Err(invalid("database.path", "must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Workspace root, where the shipped `defaults/` directory lives.
    fn project_root() -> PathBuf {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let root = manifest.join("../..");
        if root.join("defaults").exists() {
            root
        } else {
            panic!("Cannot locate defaults/ directory from {:?}", manifest);
        }
    }

    /// Write `body` as config/tournament.toml under a fresh temp dir.
    fn write_config(name: &str, body: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/tournament.toml"), body).unwrap();
        tmp
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = std::env::temp_dir().join("crease_config_defaults");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::copy(
            project_root().join("defaults/tournament.toml"),
            tmp.join("config/tournament.toml"),
        )
        .unwrap();

        let config = load_config_from(&tmp).expect("should load valid config");
        assert_eq!(config.tournament.name, "Sunday Super League");
        assert_eq!(config.tournament.matches_per_team_pair, 2);
        assert_eq!(config.tournament.overs_per_innings, 20);
        assert_eq!(config.tournament.super_over_overs, 2);
        assert_eq!(config.tournament.venues.len(), 2);
        assert_eq!(config.schedule.first_match_hour, 14);
        assert_eq!(config.schedule.second_match_hour, 19);
        assert_eq!(config.db_path, "crease.db");
        assert_eq!(config.logging.directory, "logs");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let tmp = write_config(
            "crease_config_minimal",
            r#"
[tournament]
name = "Minimal"
matches_per_team_pair = 1

[database]
path = ":memory:"
"#,
        );

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.tournament.overs_per_innings, 20);
        assert_eq!(config.tournament.super_over_overs, 2);
        assert!(config.tournament.venues.is_empty());
        assert_eq!(config.schedule.playoff_gap_days, 1);
        assert_eq!(config.logging.filter, "crease=info,warn");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_matches_per_pair_out_of_range() {
        for (i, value) in [0u32, 6].into_iter().enumerate() {
            let tmp = write_config(
                &format!("crease_config_pairs_{i}"),
                &format!(
                    "[tournament]\nname = \"T\"\nmatches_per_team_pair = {value}\n\n[database]\npath = \"x.db\"\n"
                ),
            );
            let err = load_config_from(&tmp).unwrap_err();
            expect_field(err, "tournament.matches_per_team_pair");
            let _ = fs::remove_dir_all(&tmp);
        }
    }

    #[test]
    fn rejects_super_over_longer_than_innings() {
        let tmp = write_config(
            "crease_config_super_over",
            r#"
[tournament]
name = "T"
matches_per_team_pair = 1
overs_per_innings = 5
super_over_overs = 6

[database]
path = "x.db"
"#,
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "tournament.super_over_overs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_match_hours_out_of_order() {
        let tmp = write_config(
            "crease_config_hours",
            r#"
[tournament]
name = "T"
matches_per_team_pair = 1

[schedule]
first_match_hour = 19
second_match_hour = 14

[database]
path = "x.db"
"#,
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "schedule.second_match_hour");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_tournament_toml() {
        let tmp = std::env::temp_dir().join("crease_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        match load_config_from(&tmp).unwrap_err() {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("tournament.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = write_config("crease_config_invalid", "this is not [valid toml");
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_seeds_from_template_once() {
        let tmp = std::env::temp_dir().join("crease_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            project_root().join("defaults/tournament.toml"),
            tmp.join("defaults/tournament.toml"),
        )
        .unwrap();

        let written = ensure_config_file(&tmp).expect("should succeed");
        assert_eq!(written, Some(tmp.join("config/tournament.toml")));
        assert!(load_config_from(&tmp).is_ok());

        fs::write(tmp.join("config/tournament.toml"), "# custom\n").unwrap();
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        let content = fs::read_to_string(tmp.join("config/tournament.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_needs_config_or_template() {
        let tmp = std::env::temp_dir().join("crease_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();

        match ensure_config_file(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("no config/tournament.toml"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/tournament.toml"), "# hand-written\n").unwrap();
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);

        let _ = fs::remove_dir_all(&tmp);
    }
}
