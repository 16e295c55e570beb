use super::{SourceError, WeatherSnapshot, WeatherSource};
use crate::config::WeatherConfig;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use weer_api::{chrono::Utc, BaseApi, Client};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Location {
    LatLon(f32, f32),
    City(String),
    Ip(Option<IpAddr>),
}

impl From<Location> for weer_api::Query {
    fn from(value: Location) -> Self {
        match value {
            Location::LatLon(lat, lon) => weer_api::Query::Coords(lat, lon),
            Location::City(city) => weer_api::Query::City(city),
            Location::Ip(ip) => weer_api::Query::Ip(ip),
        }
    }
}

impl From<weer_api::Forecast> for WeatherSnapshot {
    fn from(value: weer_api::Forecast) -> Self {
        Self {
            location_name: value.location.name.clone(),
            temperature_c: value.current.temp_c,
            temperature_f: value.current.temp_f,
            humidity: value.current.humidity as f32,
            icon_code: value.current.condition.code as u32,
            condition: value.current.condition.text.clone(),
        }
    }
}

/// Current conditions from weatherapi.com.
pub struct WeatherApiSource {
    config: WeatherConfig,
}

impl WeatherApiSource {
    pub fn new(config: WeatherConfig) -> Self {
        Self { config }
    }
}

impl WeatherSource for WeatherApiSource {
    fn fetch_current(&self) -> Result<WeatherSnapshot, SourceError> {
        let client = Client::new(&self.config.api_key, true);

        client
            .forecast()
            .query(self.config.location.clone().into())
            .dt(Utc::now())
            .call()
            .map(WeatherSnapshot::from)
            .map_err(|e| SourceError::Api(e.to_string()))
    }
}
