pub mod html;
pub mod item;


pub use item::{DecodedItem, OptionChoice, OptionGroup};

use crate::capture::{CapturedResponse, Payload};
use crate::error::CaptureError;

/// Decode a buffered response into an item, or explain why it cannot be
pub fn decode_response(response: &CapturedResponse) -> Result<DecodedItem, CaptureError> {
    match &response.payload {
        Payload::Json(value) => {
            item::decode(value).map_err(|reason| CaptureError::DecodeFailure { reason })
        }
        Payload::Malformed(reason) => Err(CaptureError::DecodeFailure {
            reason: format!("body is not JSON: {}", reason),
        }),
    }
}
