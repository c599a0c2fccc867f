use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::env;

use marquee_catalog::{SeatLayout, MAX_ROWS, MAX_SEATS_PER_ROW};
use marquee_core::{SeatLabel, Show, ShowId};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub reservation: ReservationRules,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Hold timing. Clients never see `hold_ttl_seconds`; they only learn the
/// `expiresAtUtc` they are handed.
#[derive(Debug, Deserialize, Clone)]
pub struct ReservationRules {
    pub hold_ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
    pub max_seats_per_request: usize,
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

/// Shows to seed at startup. Show management lives elsewhere; this only
/// gives a standalone server something to sell.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CatalogConfig {
    #[serde(default)]
    pub shows: Vec<ShowSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShowSeed {
    pub id: u64,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub price_per_seat: i64,
    pub rows: u32,
    pub seats_per_row: u32,
    /// Labels such as `"C7"`.
    #[serde(default)]
    pub disabled: Vec<String>,
}

impl ShowSeed {
    pub fn show(&self) -> Show {
        Show {
            id: ShowId(self.id),
            title: self.title.clone(),
            starts_at: self.starts_at,
            price_per_seat: self.price_per_seat,
        }
    }

    pub fn layout(&self) -> Result<SeatLayout, config::ConfigError> {
        let mut layout = SeatLayout::new(self.rows, self.seats_per_row);
        if !layout.is_within_bounds() {
            return Err(config::ConfigError::Message(format!(
                "show {} layout {}x{} exceeds {}x{}",
                self.id, self.rows, self.seats_per_row, MAX_ROWS, MAX_SEATS_PER_ROW
            )));
        }
        for raw in &self.disabled {
            layout = layout.with_disabled(parse_label(raw).ok_or_else(|| {
                config::ConfigError::Message(format!("invalid seat label '{}' for show {}", raw, self.id))
            })?);
        }
        Ok(layout)
    }
}

fn parse_label(raw: &str) -> Option<SeatLabel> {
    let split = raw.find(|c: char| c.is_ascii_digit())?;
    let (row, number) = raw.split_at(split);
    if row.is_empty() || !row.chars().all(|c| c.is_ascii_uppercase()) {
        return None;
    }
    Some(SeatLabel::new(row, number.parse().ok()?))
}

impl ReservationRules {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.hold_ttl_seconds == 0 {
            return Err(config::ConfigError::Message(
                "reservation.hold_ttl_seconds must be positive".into(),
            ));
        }
        if self.sweep_interval_seconds == 0 || self.sweep_interval_seconds > self.hold_ttl_seconds {
            return Err(config::ConfigError::Message(
                "reservation.sweep_interval_seconds must be between 1 and hold_ttl_seconds".into(),
            ));
        }
        if self.max_seats_per_request == 0 {
            return Err(config::ConfigError::Message(
                "reservation.max_seats_per_request must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Layering: built-in defaults, `{dir}/default`, `{dir}/{RUN_MODE}`,
    /// `{dir}/local`, then `MARQUEE__*` environment variables. Every file
    /// is optional.
    pub fn load_from(dir: &str) -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .set_default("server.port", 8080)?
            .set_default("auth.jwt_secret", "development-secret")?
            .set_default("auth.jwt_expiration_seconds", 3600)?
            .set_default("reservation.hold_ttl_seconds", 120)?
            .set_default("reservation.sweep_interval_seconds", 5)?
            .set_default("reservation.max_seats_per_request", 10)?
            .set_default("reservation.event_buffer", 256)?
            .add_source(config::File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(config::File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            .add_source(config::File::with_name(&format!("{}/local", dir)).required(false))
            .add_source(config::Environment::with_prefix("MARQUEE").separator("__"))
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.reservation.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(ttl: u64, sweep: u64) -> ReservationRules {
        ReservationRules {
            hold_ttl_seconds: ttl,
            sweep_interval_seconds: sweep,
            max_seats_per_request: 10,
            event_buffer: 16,
        }
    }

    #[test]
    fn test_defaults_without_files() {
        let config = Config::load_from("does-not-exist").unwrap();
        assert_eq!(config.reservation.hold_ttl_seconds, 120);
        assert_eq!(config.reservation.sweep_interval_seconds, 5);
        assert!(config.catalog.shows.is_empty());
    }

    #[test]
    fn test_sweep_interval_must_fit_in_ttl() {
        assert!(rules(120, 5).validate().is_ok());
        assert!(rules(120, 120).validate().is_ok());
        assert!(rules(120, 121).validate().is_err());
        assert!(rules(120, 0).validate().is_err());
        assert!(rules(0, 0).validate().is_err());
    }

    #[test]
    fn test_seed_layout_parses_disabled_labels() {
        let seed = ShowSeed {
            id: 1,
            title: "Matinee".into(),
            starts_at: Utc::now(),
            price_per_seat: 900,
            rows: 3,
            seats_per_row: 10,
            disabled: vec!["C7".into(), "AA12".into()],
        };
        let layout = seed.layout().unwrap();
        assert!(layout.disabled.contains(&SeatLabel::new("C", 7)));
        assert!(layout.disabled.contains(&SeatLabel::new("AA", 12)));

        let bad = ShowSeed {
            disabled: vec!["7C".into()],
            ..seed.clone()
        };
        assert!(bad.layout().is_err());

        let huge = ShowSeed {
            rows: 100_000,
            ..seed
        };
        assert!(huge.layout().is_err());
    }
}
