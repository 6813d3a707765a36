//! Development server: one or more sketch-board areas over WebSocket.
//!
//! Configured from the environment:
//!
//! - `SKETCHBOARD_BIND` listen address (default `127.0.0.1:8080`)
//! - `SKETCHBOARD_AREAS` number of areas (default 1)
//! - `SKETCHBOARD_CAPACITY` starting session capacity (default 5)
//! - `SKETCHBOARD_BACKGROUND` board background, `#rrggbb` (default white)
//! - `RUST_LOG` log filter (default `info`)
//!
//! The handshake token is taken as the participant number, so don't put
//! this in front of real users.

use std::env;
use std::str::FromStr;

use sketchboard::prelude::*;
use tracing_subscriber::EnvFilter;

struct NumericTokens;

impl Authenticator for NumericTokens {
    async fn authenticate(&self, token: &str) -> Result<ParticipantId, AuthError> {
        token
            .parse()
            .map(ParticipantId)
            .map_err(|_| AuthError::Rejected("token must be a number".into()))
    }
}

#[derive(Debug)]
struct Settings {
    bind: String,
    areas: usize,
    session: SessionConfig,
}

impl Settings {
    fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut session = SessionConfig::default();
        if let Some(capacity) = parse(&lookup, "SKETCHBOARD_CAPACITY")? {
            if capacity == 0 {
                return Err("SKETCHBOARD_CAPACITY must be at least 1".into());
            }
            session.capacity = capacity;
        }
        if let Some(color) = parse::<Color>(&lookup, "SKETCHBOARD_BACKGROUND")? {
            session.background_color = color;
        }

        Ok(Self {
            bind: lookup("SKETCHBOARD_BIND").unwrap_or_else(|| "127.0.0.1:8080".into()),
            areas: parse(&lookup, "SKETCHBOARD_AREAS")?.unwrap_or(1),
            session,
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, String> {
    lookup(key)
        .map(|raw| raw.parse().map_err(|_| format!("{key}: can't parse {raw:?}")))
        .transpose()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(?settings, "starting sketch-board server");

    let server = SketchBoardServerBuilder::new()
        .bind(&settings.bind)
        .areas(settings.areas)
        .session_config(settings.session)
        .build::<SketchBoard, _>(NumericTokens)
        .await?;

    let areas = server.area_ids().await;
    tracing::info!(addr = %server.local_addr()?, ?areas, "listening");

    server.run().await?;
    Ok(())
}
