// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! BaseStation (SBS-1) feed client.
//!
//! Reads the CSV lines dump1090 and friends serve on port 30003 and folds
//! them into the shared [`AircraftStore`]. The connection runs on its own
//! thread with a private tokio runtime and reconnects forever.
//!
//! Message format:
//! ```text
//! MSG,<type>,<session>,<aircraft>,<icao>,<flight>,<date>,<time>,<date>,<time>,<fields...>
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Instant;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};

use radarscope_core::{AircraftStore, GeoPoint};

pub type SharedStore = Arc<Mutex<AircraftStore>>;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const CLEANUP_INTERVAL_MESSAGES: u32 = 100;
const AIRCRAFT_TIMEOUT: Duration = Duration::from_secs(60);

// Field positions within a MSG line.
const FIELD_TYPE: usize = 1;
const FIELD_ICAO: usize = 4;
const FIELD_CALLSIGN: usize = 10;
const FIELD_ALTITUDE: usize = 11;
const FIELD_SPEED: usize = 12;
const FIELD_TRACK: usize = 13;
const FIELD_LAT: usize = 14;
const FIELD_LON: usize = 15;

/// Errors that can occur during message parsing.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("invalid ICAO address: {0}")]
    InvalidAddress(String),

    #[error("invalid value for field '{field}': {value}")]
    InvalidValue { field: &'static str, value: String },
}

/// One decoded update for a single aircraft.
#[derive(Debug, Clone, PartialEq)]
pub enum SbsMessage {
    Identification { addr: u32, callsign: String },
    Position { addr: u32, position: GeoPoint, altitude: Option<i32> },
    Velocity { addr: u32, speed: f64, track: f64 },
    Altitude { addr: u32, altitude: i32 },
    /// A message that only proves the aircraft is still there.
    Seen { addr: u32 },
}

impl SbsMessage {
    #[must_use]
    pub fn addr(&self) -> u32 {
        match *self {
            SbsMessage::Identification { addr, .. }
            | SbsMessage::Position { addr, .. }
            | SbsMessage::Velocity { addr, .. }
            | SbsMessage::Altitude { addr, .. }
            | SbsMessage::Seen { addr } => addr,
        }
    }
}

fn field<'a>(parts: &[&'a str], idx: usize) -> Option<&'a str> {
    parts.get(idx).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn number<T: std::str::FromStr>(parts: &[&str], idx: usize, name: &'static str) -> Result<Option<T>, ParseError> {
    field(parts, idx)
        .map(|s| {
            s.parse::<T>().ok().ok_or_else(|| ParseError::InvalidValue {
                field: name,
                value: s.to_string(),
            })
        })
        .transpose()
}

/// Parse a single BaseStation line.
///
/// Non-`MSG` lines and messages without the fields their type needs yield
/// `Ok(None)`; fields that are present but unparsable are errors.
pub fn parse_line(line: &str) -> Result<Option<SbsMessage>, ParseError> {
    let parts: Vec<&str> = line.trim_end().split(',').collect();
    if parts.first() != Some(&"MSG") || parts.len() < 11 {
        return Ok(None);
    }

    let Some(icao) = field(&parts, FIELD_ICAO) else {
        return Ok(None);
    };
    let addr = u32::from_str_radix(icao, 16)
        .ok()
        .filter(|&a| a <= 0x00FF_FFFF)
        .ok_or_else(|| ParseError::InvalidAddress(icao.to_string()))?;

    let message = match parts[FIELD_TYPE] {
        "1" => field(&parts, FIELD_CALLSIGN).map(|callsign| SbsMessage::Identification {
            addr,
            callsign: callsign.to_string(),
        }),
        "2" | "3" => {
            let altitude = number::<i32>(&parts, FIELD_ALTITUDE, "altitude")?;
            let lat = number::<f64>(&parts, FIELD_LAT, "latitude")?;
            let lon = number::<f64>(&parts, FIELD_LON, "longitude")?;
            match (lat, lon) {
                (Some(lat), Some(lon)) => Some(SbsMessage::Position {
                    addr,
                    position: GeoPoint::new(lat, lon),
                    altitude,
                }),
                _ => altitude.map(|altitude| SbsMessage::Altitude { addr, altitude }),
            }
        }
        "4" => {
            let speed = number::<f64>(&parts, FIELD_SPEED, "ground speed")?;
            let track = number::<f64>(&parts, FIELD_TRACK, "track")?;
            match (speed, track) {
                (Some(speed), Some(track)) => Some(SbsMessage::Velocity { addr, speed, track }),
                _ => Some(SbsMessage::Seen { addr }),
            }
        }
        "5" | "6" | "7" => Some(
            number::<i32>(&parts, FIELD_ALTITUDE, "altitude")?
                .map_or(SbsMessage::Seen { addr }, |altitude| SbsMessage::Altitude { addr, altitude }),
        ),
        _ => Some(SbsMessage::Seen { addr }),
    };

    Ok(message)
}

/// Fold one message into the store.
pub fn apply(store: &mut AircraftStore, message: &SbsMessage, now: Instant) {
    let aircraft = store.record_message(message.addr(), now);
    match message {
        SbsMessage::Identification { callsign, .. } => aircraft.flight.clone_from(callsign),
        SbsMessage::Position { position, altitude, .. } => {
            if let Some(altitude) = altitude {
                aircraft.altitude = *altitude;
            }
            store.update_position(message.addr(), *position, now);
        }
        SbsMessage::Velocity { speed, track, .. } => {
            aircraft.speed = speed.round() as i32;
            aircraft.heading = *track as f32;
        }
        SbsMessage::Altitude { altitude, .. } => aircraft.altitude = *altitude,
        SbsMessage::Seen { .. } => {}
    }
}

/// Run the feed on a dedicated thread.
pub fn spawn_feed(address: String, store: SharedStore) -> std::io::Result<JoinHandle<()>> {
    std::thread::Builder::new().name("sbs-feed".into()).spawn(move || {
        match tokio::runtime::Runtime::new() {
            Ok(rt) => rt.block_on(connect_feed(&address, store)),
            Err(e) => error!("Failed to start feed runtime: {e}"),
        }
    })
}

pub async fn connect_feed(address: &str, store: SharedStore) {
    loop {
        match connect_and_process(address, &store).await {
            Ok(()) => info!("Feed connection closed normally"),
            Err(e) => error!("Feed connection error: {e}"),
        }

        warn!("Reconnecting in {} seconds...", RECONNECT_DELAY.as_secs());
        sleep(RECONNECT_DELAY).await;
    }
}

async fn connect_and_process(address: &str, store: &SharedStore) -> Result<(), Box<dyn std::error::Error>> {
    info!("Connecting to {address}...");

    let stream = TcpStream::connect(address).await?;
    info!("Connected to BaseStation feed at {address}");

    let mut lines = BufReader::new(stream).lines();
    let mut cleanup_counter: u32 = 0;

    while let Some(line) = lines.next_line().await? {
        let message = match parse_line(&line) {
            Ok(Some(message)) => message,
            Ok(None) => continue,
            Err(e) => {
                debug!("Skipping feed line {line:?}: {e}");
                continue;
            }
        };

        // scope the lock so it is released before the next await
        {
            let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
            let now = Instant::now();
            apply(&mut store, &message, now);

            cleanup_counter = cleanup_counter.saturating_add(1);
            if cleanup_counter >= CLEANUP_INTERVAL_MESSAGES {
                let removed = store.remove_stale(AIRCRAFT_TIMEOUT, now);
                if removed > 0 {
                    debug!("Removed {removed} stale aircraft");
                }
                cleanup_counter = 0;
            }
        }
    }

    info!("Connection closed by server");
    Ok(())
}
