//! # Page Request Sequencer
//!
//! Pulls the pages of a multi-page geocache record with "request data page"
//! commands sent as acknowledged data. The chain is fixed:
//!
//! 1. ID page received -> request the PIN page
//! 2. PIN page received (N total pages) -> request pages 2..N-1, one command each
//!
//! Requests are fire-and-forget; the acknowledged-data transport keeps them
//! in order.

use tracing::debug;

use super::page::{Page, GEO_PAGE_PIN, GEO_PAGE_PROG_MIN};
use crate::error::Result;
use crate::radio::{Command, RadioCommandSink};

/// Request Data Page command (ANT+ common page 70)
pub const MESG_REQUEST_DATA_PAGE: u8 = 0x46;

/// Reserved byte value
const RESERVED: u8 = 0xFF;

/// Ask the device to transmit the page once
const REQUESTED_TRANSMISSIONS: u8 = 0x01;

/// Command type: request data page
const COMMAND_TYPE_DATA_PAGE: u8 = 0x01;

/// Outbound request for a single data page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u8,
}

impl PageRequest {
    pub fn new(page: u8) -> Self {
        Self { page }
    }

    /// Wire form of the request
    ///
    /// # Examples
    ///
    /// ```
    /// use antchirp::geocache::request::PageRequest;
    ///
    /// let bytes = PageRequest::new(1).to_bytes();
    /// assert_eq!(bytes, [0x46, 0xFF, 0xFF, 0x00, 0x00, 0x01, 0x01, 0x01]);
    /// ```
    pub fn to_bytes(&self) -> [u8; 8] {
        [
            MESG_REQUEST_DATA_PAGE,
            RESERVED,
            RESERVED,
            0x00, // Subfield 1
            0x00, // Subfield 2
            REQUESTED_TRANSMISSIONS,
            self.page,
            COMMAND_TYPE_DATA_PAGE,
        ]
    }
}

/// Send a page request on `channel`
///
/// # Errors
///
/// Returns the sink's transport error; the request is not retried
pub fn request_page<S>(sink: &mut S, channel: u8, page: u8) -> Result<()>
where
    S: RadioCommandSink + ?Sized,
{
    debug!("Requesting geocache page {}", page);
    sink.send(Command::SendAcknowledgedData {
        channel,
        data: PageRequest::new(page).to_bytes(),
    })
}

/// Pages to request after receiving `page`
pub fn follow_up_pages(page: &Page) -> Vec<u8> {
    match page {
        Page::Id { .. } => vec![GEO_PAGE_PIN],
        Page::Pin { total_pages, .. } => (GEO_PAGE_PROG_MIN..*total_pages).collect(),
        _ => Vec::new(),
    }
}
