use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use shared::domain::RouteMode;
use tracing::warn;

use crate::{
    catalog::Catalog,
    export::{DEFAULT_FILE_NAME, DEFAULT_TITLE},
    map::DEFAULT_TILE_URL,
    routing::{
        DirectionsRouter, RoutingCollaborator, RoutingProvider, StraightLineRouter,
        DEFAULT_MAPBOX_URL, DEFAULT_OSRM_PROFILE, DEFAULT_OSRM_URL,
    },
};

pub const SETTINGS_FILE: &str = "planner.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    Osrm,
    Mapbox,
}

impl std::str::FromStr for RouterKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "osrm" => Ok(Self::Osrm),
            "mapbox" => Ok(Self::Mapbox),
            other => Err(format!("unknown router '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerSettings {
    pub database_url: String,
    pub route_mode: RouteMode,
    pub router: RouterKind,
    pub osrm_url: String,
    pub osrm_profile: String,
    pub mapbox_token: Option<String>,
    pub route_timeout_secs: u64,
    pub tile_url: String,
    pub catalog_path: Option<PathBuf>,
    pub export_dir: PathBuf,
    pub export_title: String,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/planner.db".into(),
            route_mode: RouteMode::Walking,
            router: RouterKind::Osrm,
            osrm_url: DEFAULT_OSRM_URL.into(),
            osrm_profile: DEFAULT_OSRM_PROFILE.into(),
            mapbox_token: None,
            route_timeout_secs: 30,
            tile_url: DEFAULT_TILE_URL.into(),
            catalog_path: None,
            export_dir: PathBuf::from("."),
            export_title: DEFAULT_TITLE.into(),
        }
    }
}

impl PlannerSettings {
    pub fn route_timeout(&self) -> Duration {
        Duration::from_secs(self.route_timeout_secs.max(1))
    }

    /// Mapbox without a token falls back to OSRM.
    pub fn routing_provider(&self) -> RoutingProvider {
        match (self.router, self.mapbox_token.as_deref()) {
            (RouterKind::Mapbox, Some(token)) if !token.trim().is_empty() => {
                RoutingProvider::Mapbox {
                    base_url: DEFAULT_MAPBOX_URL.into(),
                    access_token: token.trim().to_string(),
                }
            }
            (RouterKind::Mapbox, _) => {
                warn!("mapbox router selected without a token; using osrm");
                self.osrm_provider()
            }
            (RouterKind::Osrm, _) => self.osrm_provider(),
        }
    }

    fn osrm_provider(&self) -> RoutingProvider {
        RoutingProvider::Osrm {
            service_url: self.osrm_url.clone(),
            profile: self.osrm_profile.clone(),
        }
    }

    pub fn build_router(&self) -> Result<Arc<dyn RoutingCollaborator>> {
        Ok(match self.route_mode {
            RouteMode::Straight => Arc::new(StraightLineRouter),
            RouteMode::Walking => Arc::new(DirectionsRouter::new(
                self.routing_provider(),
                self.route_timeout(),
            )?),
        })
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_path {
            Some(path) => Catalog::from_json_file(path),
            None => Ok(Catalog::builtin()),
        }
    }

    pub fn default_export_path(&self) -> PathBuf {
        self.export_dir.join(DEFAULT_FILE_NAME)
    }
}

pub fn load_settings() -> PlannerSettings {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the flat TOML file, then environment. Unparseable values
/// keep the previous layer's value.
pub fn load_settings_from(
    file: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> PlannerSettings {
    let mut settings = PlannerSettings::default();

    if let Ok(raw) = fs::read_to_string(file) {
        match raw.parse::<toml::Table>() {
            Ok(file_cfg) => {
                for (key, value) in &file_cfg {
                    match scalar_text(value) {
                        Some(text) => apply(&mut settings, key, &text),
                        None => warn!("ignoring {key}: expected a single value"),
                    }
                }
            }
            Err(err) => warn!("ignoring malformed {}: {err}", file.display()),
        }
    }

    for (var, key) in [
        ("PLANNER_DATABASE_URL", "database_url"),
        ("APP__DATABASE_URL", "database_url"),
        ("APP__ROUTE_MODE", "route_mode"),
        ("APP__ROUTER", "router"),
        ("APP__OSRM_URL", "osrm_url"),
        ("APP__OSRM_PROFILE", "osrm_profile"),
        ("MAPBOX_TOKEN", "mapbox_token"),
        ("APP__MAPBOX_TOKEN", "mapbox_token"),
        ("APP__ROUTE_TIMEOUT_SECS", "route_timeout_secs"),
        ("APP__TILE_URL", "tile_url"),
        ("APP__CATALOG_PATH", "catalog_path"),
        ("APP__EXPORT_DIR", "export_dir"),
        ("APP__EXPORT_TITLE", "export_title"),
    ] {
        if let Some(value) = env(var) {
            apply(&mut settings, key, &value);
        }
    }

    settings
}

/// Numbers and booleans are accepted unquoted; tables and arrays are not.
fn scalar_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(text) => Some(text.clone()),
        toml::Value::Integer(number) => Some(number.to_string()),
        toml::Value::Float(number) => Some(number.to_string()),
        toml::Value::Boolean(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn apply(settings: &mut PlannerSettings, key: &str, value: &str) {
    match key {
        "database_url" => settings.database_url = value.to_string(),
        "route_mode" => match value.parse() {
            Ok(mode) => settings.route_mode = mode,
            Err(err) => warn!("ignoring route_mode: {err}"),
        },
        "router" => match value.parse() {
            Ok(router) => settings.router = router,
            Err(err) => warn!("ignoring router: {err}"),
        },
        "osrm_url" => settings.osrm_url = value.to_string(),
        "osrm_profile" => settings.osrm_profile = value.to_string(),
        "mapbox_token" => settings.mapbox_token = Some(value.to_string()),
        "route_timeout_secs" => match value.parse::<u64>() {
            Ok(secs) => settings.route_timeout_secs = secs,
            Err(_) => warn!("ignoring route_timeout_secs '{value}'"),
        },
        "tile_url" => settings.tile_url = value.to_string(),
        "catalog_path" => settings.catalog_path = Some(PathBuf::from(value)),
        "export_dir" => settings.export_dir = PathBuf::from(value),
        "export_title" => settings.export_title = value.to_string(),
        other => warn!("unknown setting '{other}'"),
    }
}

pub fn prepare_database_url(raw_database_url: &str) -> Result<String> {
    let database_url = normalize_database_url(raw_database_url);
    storage::ensure_sqlite_parent_dir_exists(&database_url)
        .with_context(|| format!("failed to prepare database url '{database_url}'"))?;
    Ok(database_url)
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return PlannerSettings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        time::{SystemTime, UNIX_EPOCH},
    };

    use super::*;

    fn temp_root(label: &str) -> PathBuf {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("picnic_planner_{label}_{suffix}"));
        fs::create_dir_all(&root).expect("temp root");
        root
    }

    #[test]
    fn defaults_without_file_or_env() {
        let settings = load_settings_from(Path::new("/nonexistent/planner.toml"), |_| None);
        assert_eq!(settings, PlannerSettings::default());
        assert_eq!(settings.route_mode, RouteMode::Walking);
        assert_eq!(settings.route_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn file_then_environment_override() {
        let root = temp_root("config");
        let file = root.join("planner.toml");
        fs::write(
            &file,
            "route_mode = \"straight\"\ntile_url = \"http://tiles.local/{z}/{x}/{y}.png\"\nexport_dir = \"out\"\n",
        )
        .expect("write config");

        let env: HashMap<&str, &str> =
            HashMap::from([("APP__ROUTE_MODE", "walking"), ("APP__ROUTER", "mapbox")]);
        let settings = load_settings_from(&file, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.route_mode, RouteMode::Walking);
        assert_eq!(settings.router, RouterKind::Mapbox);
        assert_eq!(settings.tile_url, "http://tiles.local/{z}/{x}/{y}.png");
        assert_eq!(settings.default_export_path(), PathBuf::from("out").join(DEFAULT_FILE_NAME));

        fs::remove_dir_all(root).expect("cleanup");
    }

    #[test]
    fn unquoted_numbers_in_file_are_accepted() {
        let root = temp_root("numeric");
        let file = root.join("planner.toml");
        fs::write(
            &file,
            "route_mode = \"straight\"\nroute_timeout_secs = 45\nosrm_profile = [\"foot\"]\n",
        )
        .expect("write config");

        let settings = load_settings_from(&file, |_| None);
        assert_eq!(settings.route_mode, RouteMode::Straight);
        assert_eq!(settings.route_timeout_secs, 45);
        assert_eq!(settings.osrm_profile, PlannerSettings::default().osrm_profile);

        fs::remove_dir_all(root).expect("cleanup");
    }

    #[test]
    fn bad_values_keep_previous_layer() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("APP__ROUTE_MODE", "teleport"),
            ("APP__ROUTE_TIMEOUT_SECS", "soon"),
        ]);
        let settings = load_settings_from(Path::new("/nonexistent/planner.toml"), |key| {
            env.get(key).map(|v| v.to_string())
        });
        assert_eq!(settings.route_mode, RouteMode::Walking);
        assert_eq!(settings.route_timeout_secs, 30);
    }

    #[test]
    fn mapbox_without_token_uses_osrm() {
        let settings = PlannerSettings {
            router: RouterKind::Mapbox,
            ..PlannerSettings::default()
        };
        assert_eq!(settings.routing_provider(), RoutingProvider::osrm_default());

        let settings = PlannerSettings {
            router: RouterKind::Mapbox,
            mapbox_token: Some("pk.abc".into()),
            ..PlannerSettings::default()
        };
        assert!(matches!(
            settings.routing_provider(),
            RoutingProvider::Mapbox { access_token, .. } if access_token == "pk.abc"
        ));
    }

    #[test]
    fn normalizes_plain_file_path_to_sqlite_url() {
        assert_eq!(
            normalize_database_url("./data/test.db"),
            "sqlite://./data/test.db"
        );
        assert_eq!(normalize_database_url("sqlite:data.db"), "sqlite://data.db");
        assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
    }

    #[test]
    fn prepare_creates_parent_directory() {
        let root = temp_root("db");
        let db = root.join("nested").join("planner.db");
        let url = prepare_database_url(&db.display().to_string()).expect("prepare");
        assert!(url.starts_with("sqlite://"));
        assert!(root.join("nested").exists());
        fs::remove_dir_all(root).expect("cleanup");
    }

    #[test]
    fn default_catalog_is_builtin() {
        let catalog = PlannerSettings::default().load_catalog().expect("catalog");
        assert_eq!(catalog.len(), 4);
    }
}
