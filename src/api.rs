// Typed façade over the booking and lottery APIs. Each method maps to one
// upstream endpoint; everything goes through the resilient client, which
// handles tokens and transient rejects. No endpoint gets special retry or
// parsing logic beyond plain JSON decoding (the quantities endpoint is the
// one oddity: the upstream double-encodes that body).

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ApiError;
use crate::http::{ApiRequest, ResilientClient};
use crate::token::{HttpTokenSource, TokenPool};

/// The upstream exposes two parallel API namespaces for the different
/// vaccine programs; same endpoints, different path prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppNs {
    Abc,
    Def,
}

impl AppNs {
    pub const ALL: [AppNs; 2] = [AppNs::Abc, AppNs::Def];

    pub fn as_str(self) -> &'static str {
        match self {
            AppNs::Abc => "abc",
            AppNs::Def => "def",
        }
    }
}

/// Base URLs and token batch size, read from the environment with the
/// production defaults as fallback.
#[derive(Debug, Clone)]
pub struct Config {
    pub booking_base: String,
    pub token_endpoint: String,
    pub lotto_base: String,
    pub token_batch: usize,
}

impl Config {
    pub fn from_env() -> Self {
        let token_batch = std::env::var("TOKEN_BATCH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);
        Config {
            booking_base: std::env::var("BOOKING_BASE_URL")
                .unwrap_or_else(|_| "https://booking.moh.gov.ge".into()),
            token_endpoint: std::env::var("TOKEN_SERVICE_URL")
                .unwrap_or_else(|_| "https://vaccination.abgeo.dev/api/numbers".into()),
            lotto_base: std::env::var("LOTTO_BASE_URL")
                .unwrap_or_else(|_| "https://stopcov-api.lotto.ge".into()),
            token_batch,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceType {
    pub id: String,
    pub name: String,
}

/// Region or municipality entry; both endpoints use the same shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoUnit {
    pub id: String,
    #[serde(rename = "geoName")]
    pub geo_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Branch {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub name: String,
    pub schedules: Vec<Schedule>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Schedule {
    pub dates: Vec<ScheduleDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDate {
    pub date_name: String,
    pub week_name: String,
    pub slots: Vec<Slot>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub value: String,
}

/// Booking lookup result: either a hit in `value` or a server-supplied
/// explanation in `message`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingSearch {
    #[serde(default)]
    pub value: Option<BookingDetails>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub first_name: String,
    pub last_name: String,
    // The backend has been seen returning this both as a number and as a
    // string; keep it flexible rather than guessing.
    pub birth_year: serde_json::Value,
    #[serde(rename = "personalID")]
    pub personal_id: String,
    pub phone: String,
    pub test_name: String,
    pub branch_name: String,
    pub room_number: String,
    pub schedule_date_name: String,
}

/// Client for the booking catalog plus the lottery side endpoint.
pub struct CatalogClient {
    http: ResilientClient,
    booking_base: String,
    lotto_base: String,
}

impl CatalogClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = ResilientClient::default_http()?;
        let source = HttpTokenSource::new(client.clone(), config.token_endpoint.clone());
        let tokens = TokenPool::new(Box::new(source), config.token_batch);
        Ok(CatalogClient {
            http: ResilientClient::new(client, tokens),
            booking_base: config.booking_base.clone(),
            lotto_base: config.lotto_base.clone(),
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        CatalogClient::new(&Config::from_env())
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &ResilientClient {
        &self.http
    }

    fn booking_url(&self, app: AppNs, path: &str) -> String {
        format!("{}/{}/API/api{}", self.booking_base, app.as_str(), path)
    }

    /// `GET /Public/GetAvailableQuantities`. The upstream returns a
    /// JSON-encoded string that itself contains JSON; decode twice and
    /// lower-case the keys so callers can look services up case-blind.
    pub fn available_quantities(&mut self, app: AppNs) -> Result<HashMap<String, i64>, ApiError> {
        let request = ApiRequest::get(self.booking_url(app, "/Public/GetAvailableQuantities"));
        let encoded: String = self.http.send_json(&request)?;
        let raw: HashMap<String, i64> = serde_json::from_str(&encoded)
            .map_err(|e| ApiError::MalformedResponse(format!("{e}: {encoded}")))?;
        Ok(raw
            .into_iter()
            .map(|(service, quantity)| (service.to_lowercase(), quantity))
            .collect())
    }

    /// `GET /CommonData/GetServicesTypes`.
    pub fn service_types(&mut self, app: AppNs) -> Result<Vec<ServiceType>, ApiError> {
        let request = ApiRequest::get(self.booking_url(app, "/CommonData/GetServicesTypes"));
        self.http.send_json(&request)
    }

    /// `GET /CommonData/GetRegions`.
    pub fn regions(
        &mut self,
        service: &str,
        only_free: bool,
        app: AppNs,
    ) -> Result<Vec<GeoUnit>, ApiError> {
        let request = ApiRequest::get(self.booking_url(app, "/CommonData/GetRegions"))
            .query("serviceId", service)
            .query("onlyFree", only_free);
        self.http.send_json(&request)
    }

    /// `GET /CommonData/GetMunicipalities/{region}`.
    pub fn municipalities(
        &mut self,
        region: &str,
        service: &str,
        only_free: bool,
        app: AppNs,
    ) -> Result<Vec<GeoUnit>, ApiError> {
        let path = format!("/CommonData/GetMunicipalities/{region}");
        let request = ApiRequest::get(self.booking_url(app, &path))
            .query("serviceId", service)
            .query("onlyFree", only_free);
        self.http.send_json(&request)
    }

    /// `GET /CommonData/GetMunicipalityBranches/{service}/{municipality}`.
    pub fn branches(
        &mut self,
        service: &str,
        municipality: &str,
        only_free: bool,
        app: AppNs,
    ) -> Result<Vec<Branch>, ApiError> {
        let path = format!("/CommonData/GetMunicipalityBranches/{service}/{municipality}");
        let request = ApiRequest::get(self.booking_url(app, &path)).query("onlyFree", only_free);
        self.http.send_json(&request)
    }

    /// `POST /PublicBooking/GetSlots` for a branch and date window.
    pub fn slots(
        &mut self,
        branch: &str,
        region: &str,
        service: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        app: AppNs,
    ) -> Result<Vec<Room>, ApiError> {
        let request = ApiRequest::post(
            self.booking_url(app, "/PublicBooking/GetSlots"),
            json!({
                "branchID": branch,
                "startDate": start_date.format("%Y-%m-%d").to_string(),
                "endDate": end_date.format("%Y-%m-%d").to_string(),
                "regionID": region,
                "serviceID": service,
            }),
        );
        self.http.send_json(&request)
    }

    /// `GET /PublicBooking/SearchBooking` by personal and booking number.
    pub fn search_booking(
        &mut self,
        personal_number: &str,
        booking_number: &str,
    ) -> Result<BookingSearch, ApiError> {
        let request = ApiRequest::get(self.booking_url(AppNs::Def, "/PublicBooking/SearchBooking"))
            .query("personalID", personal_number)
            .query("bookingID", booking_number);
        self.http.send_json(&request)
    }

    /// `GET /Public/Winnings/{personalNumber}` on the lottery host.
    pub fn lotto_winning(&mut self, personal_number: &str) -> Result<bool, ApiError> {
        let request = ApiRequest::get(format!(
            "{}/Public/Winnings/{personal_number}",
            self.lotto_base
        ));
        self.http.send_json(&request)
    }
}
