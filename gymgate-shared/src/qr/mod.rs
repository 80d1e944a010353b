/// QR badge payload codec and rendering
///
/// Members carry a printed or on-phone QR badge whose payload is a small
/// JSON document; kiosks also accept the bare member code typed by hand.
/// The payload shape is a wire contract: badges already printed must keep
/// scanning across versions, so the field names and the
/// `"gym_attendance"` discriminator never change, and decoders ignore
/// fields they don't know.
///
/// # Modules
///
/// - [`payload`]: The payload structure and the decode-or-raw-code parse
/// - [`render`]: Payload to PNG data URI, with a placeholder fallback

pub mod payload;
pub mod render;

pub use payload::{parse_scan_input, BadgePayload, ScanInput, BADGE_PAYLOAD_TYPE};
pub use render::badge_data_uri;
