use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(EventId);

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Catalog record. Persisted itineraries embed a copy of each record, so the
/// field names double as the on-disk schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Event {
    pub fn new(id: i64, name: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: EventId(id),
            name: name.into(),
            lat,
            lng,
            time: None,
            location: None,
        }
    }

    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// `time | location`, skipping whichever is missing.
    pub fn metadata_line(&self) -> String {
        match (self.time.as_deref(), self.location.as_deref()) {
            (Some(time), Some(location)) => format!("{time} | {location}"),
            (Some(time), None) => time.to_string(),
            (None, Some(location)) => location.to_string(),
            (None, None) => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TravelMode {
    #[default]
    Walking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    Straight,
    #[default]
    Walking,
}

impl std::str::FromStr for RouteMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "straight" | "line" | "lines" => Ok(Self::Straight),
            "walking" | "walk" | "route" => Ok(Self::Walking),
            other => Err(format!("unknown route mode '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_without_missing_metadata() {
        let event = Event::new(2, "Engineering Expo", 38.5405, -121.7496);
        let json = serde_json::to_string(&event).expect("serialize");
        assert_eq!(
            json,
            r#"{"id":2,"name":"Engineering Expo","lat":38.5405,"lng":-121.7496}"#
        );
    }

    #[test]
    fn metadata_line_joins_time_and_location() {
        let event = Event::new(1, "Opening Ceremony", 0.0, 0.0)
            .with_time("9:00 AM")
            .with_location("Quad");
        assert_eq!(event.metadata_line(), "9:00 AM | Quad");
        assert_eq!(Event::new(1, "x", 0.0, 0.0).metadata_line(), "");
    }

    #[test]
    fn parses_route_mode_aliases() {
        assert_eq!("Straight".parse::<RouteMode>(), Ok(RouteMode::Straight));
        assert_eq!("walk".parse::<RouteMode>(), Ok(RouteMode::Walking));
        assert!("teleport".parse::<RouteMode>().is_err());
    }
}
