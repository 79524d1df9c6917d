//! Decoded geocache state, updated in place as pages arrive.

use serde::Serialize;
use std::collections::BTreeMap;

use super::page::{Page, ProgrammableField};

/// Degrees per semicircle (180 / 2^31)
const DEGREES_PER_SEMICIRCLE: f64 = 180.0 / 2_147_483_648.0;

/// Everything learned from one geocache device
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    pub id: String,
    pub pin: i32,
    pub total_pages: u8,
    /// Semicircles
    pub latitude: i32,
    /// Semicircles
    pub longitude: i32,
    pub hint: String,
    pub logged_visits: u16,
    pub last_visit: u32,
    pub auth_payload: Vec<u8>,
    #[serde(skip)]
    hint_fragments: BTreeMap<u8, String>,
}

impl DeviceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latitude in degrees
    pub fn latitude_degrees(&self) -> f64 {
        f64::from(self.latitude) * DEGREES_PER_SEMICIRCLE
    }

    /// Longitude in degrees
    pub fn longitude_degrees(&self) -> f64 {
        f64::from(self.longitude) * DEGREES_PER_SEMICIRCLE
    }

    /// Whether nothing has been decoded yet
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Forget everything decoded so far
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fold a decoded page into the record
    ///
    /// # Returns
    ///
    /// * `bool` - Whether any field changed
    pub fn apply(&mut self, page: &Page) -> bool {
        let before = self.clone();

        match page {
            Page::Id { id } => self.id = id.clone(),
            Page::Pin { pin, total_pages } => {
                self.pin = *pin;
                self.total_pages = *total_pages;
            }
            Page::ProgrammableField { page, field } => match field {
                ProgrammableField::Latitude(value) => self.latitude = *value,
                ProgrammableField::Longitude(value) => self.longitude = *value,
                ProgrammableField::Hint(fragment) => {
                    // Hint pages arrive in any order; keep them ordered by page
                    self.hint_fragments.insert(*page, fragment.clone());
                    self.hint = self.hint_fragments.values().map(String::as_str).collect();
                }
                ProgrammableField::LoggedVisits { last_visit, count } => {
                    self.last_visit = *last_visit;
                    self.logged_visits = *count;
                }
                ProgrammableField::Other { .. } => {}
            },
            Page::Authentication { payload } => self.auth_payload = payload.to_vec(),
            Page::Unknown { .. } => {}
        }

        *self != before
    }
}
