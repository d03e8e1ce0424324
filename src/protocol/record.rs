//! Bet and ack record codecs.
//!
//! Strings are copied verbatim and zero-padded to their field width.
//! Width checks run before any byte is written, so a rejected record never
//! leaves a partial frame behind.

use crate::error::{BetwireError, Result};

use super::wire_format::{
    is_end_of_acks, is_end_of_submission, ACK_WIDTH, BIRTH_DATE_WIDTH, LAST_NAME_WIDTH,
    NAME_WIDTH, RECORD_WIDTH,
};

/// Status code the server uses for an accepted bet.
pub const STATUS_ACCEPTED: u8 = 1;

/// One wager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetRecord {
    pub house_id: u8,
    pub name: String,
    pub last_name: String,
    pub national_id: u32,
    pub birth_date: String,
    pub bet_number: u32,
}

impl BetRecord {
    /// Encode the record to its fixed 79-byte frame (Big Endian integers).
    pub fn encode(&self) -> Result<[u8; RECORD_WIDTH]> {
        check_width("name", &self.name, NAME_WIDTH)?;
        check_width("last_name", &self.last_name, LAST_NAME_WIDTH)?;
        check_width("birth_date", &self.birth_date, BIRTH_DATE_WIDTH)?;

        let mut buf = [0u8; RECORD_WIDTH];
        let mut at = 0;

        buf[at] = self.house_id;
        at += 1;
        at = put_padded(&mut buf, at, &self.name, NAME_WIDTH);
        at = put_padded(&mut buf, at, &self.last_name, LAST_NAME_WIDTH);
        buf[at..at + 4].copy_from_slice(&self.national_id.to_be_bytes());
        at += 4;
        at = put_padded(&mut buf, at, &self.birth_date, BIRTH_DATE_WIDTH);
        buf[at..at + 4].copy_from_slice(&self.bet_number.to_be_bytes());

        Ok(buf)
    }

    /// Decode a record from exactly one 79-byte frame.
    ///
    /// Padding is stripped from string fields. The end-of-submission
    /// sentinel is rejected rather than read as a record.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != RECORD_WIDTH {
            return Err(BetwireError::Decoding(format!(
                "Bet frame is {} bytes, expected {}",
                buf.len(),
                RECORD_WIDTH
            )));
        }
        if is_end_of_submission(buf) {
            return Err(BetwireError::Decoding(
                "End-of-submission sentinel is not a bet record".to_string(),
            ));
        }

        let mut at = 1;
        let name = take_padded(buf, &mut at, NAME_WIDTH, "name")?;
        let last_name = take_padded(buf, &mut at, LAST_NAME_WIDTH, "last_name")?;
        let national_id = take_u32(buf, &mut at);
        let birth_date = take_padded(buf, &mut at, BIRTH_DATE_WIDTH, "birth_date")?;
        let bet_number = take_u32(buf, &mut at);

        Ok(Self {
            house_id: buf[0],
            name,
            last_name,
            national_id,
            birth_date,
            bet_number,
        })
    }
}

/// Server acknowledgment for one submitted bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckRecord {
    pub national_id: u32,
    pub bet_number: u32,
    pub status_code: u8,
}

impl AckRecord {
    /// Decode an ack from exactly one 9-byte frame.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() != ACK_WIDTH {
            return Err(BetwireError::Decoding(format!(
                "Ack frame is {} bytes, expected {}",
                buf.len(),
                ACK_WIDTH
            )));
        }
        if is_end_of_acks(buf) {
            return Err(BetwireError::Decoding(
                "End-of-acknowledgment sentinel is not an ack record".to_string(),
            ));
        }

        Ok(Self {
            national_id: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
            bet_number: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
            status_code: buf[8],
        })
    }

    /// Whether the server accepted the bet.
    #[inline]
    pub fn is_accepted(&self) -> bool {
        self.status_code == STATUS_ACCEPTED
    }
}

fn check_width(field: &'static str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(BetwireError::Encoding {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

fn put_padded(buf: &mut [u8], at: usize, value: &str, width: usize) -> usize {
    let bytes = value.as_bytes();
    buf[at..at + bytes.len()].copy_from_slice(bytes);
    at + width
}

fn take_padded(buf: &[u8], at: &mut usize, width: usize, field: &str) -> Result<String> {
    let raw = &buf[*at..*at + width];
    *at += width;

    let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8(raw[..end].to_vec())
        .map_err(|e| BetwireError::Decoding(format!("Field `{}` is not UTF-8: {}", field, e)))
}

fn take_u32(buf: &[u8], at: &mut usize) -> u32 {
    let value = u32::from_be_bytes([buf[*at], buf[*at + 1], buf[*at + 2], buf[*at + 3]]);
    *at += 4;
    value
}
