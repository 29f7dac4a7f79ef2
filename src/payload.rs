//! Lenient base64 decoding of a recovered payload.
//!
//! Existing files were decoded by a permissive decoder: ASCII bytes outside
//! the base64 alphabet are skipped, a `=` only counts as padding once the
//! current quantum holds two or more symbols, decoding stops at the first
//! padding run that completes a quantum, and non-zero trailing bits are
//! accepted. Truncated input and non-ASCII text still fail.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use thiserror::Error;

const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

const PAD: u8 = b'=';

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("non-ASCII character at byte {offset}")]
    NonAscii { offset: usize },

    #[error("{symbols} base64 symbols cannot be one more than a multiple of four")]
    DanglingSymbol { symbols: usize },

    #[error("incorrect padding: expected {needed} '=' but found {found}")]
    MissingPadding { needed: usize, found: usize },

    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
}

fn is_base64_symbol(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/'
}

pub fn decode(text: &str) -> Result<Vec<u8>, PayloadError> {
    if let Some(offset) = text.bytes().position(|b| !b.is_ascii()) {
        return Err(PayloadError::NonAscii { offset });
    }

    let mut data = Vec::with_capacity(text.len());
    let mut pads = 0;
    let mut terminated = false;

    for b in text.bytes() {
        if b == PAD {
            // Position 0 or 1 of a quantum cannot be padded, so the `=` is noise.
            let position = data.len() % 4;
            if position >= 2 {
                pads += 1;
                if position + pads >= 4 {
                    terminated = true;
                    break;
                }
            }
        } else if is_base64_symbol(b) {
            pads = 0;
            data.push(b);
        }
    }

    if !terminated {
        match data.len() % 4 {
            0 => {}
            1 => {
                return Err(PayloadError::DanglingSymbol {
                    symbols: data.len(),
                });
            }
            rem => {
                return Err(PayloadError::MissingPadding {
                    needed: 4 - rem,
                    found: pads,
                });
            }
        }
    }

    Ok(LENIENT.decode(&data)?)
}
