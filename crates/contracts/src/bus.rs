//! BusMessage - message-bus wire record
//!
//! The coordinate travels as free text (`"lon,lat,timestamp"`) next to
//! sender/subject metadata and a running counter.

use serde::{Deserialize, Serialize};

use crate::{ContractError, Coordinate, Sample};

/// Sender name stamped on every published record
pub const BUS_SENDER: &str = "CoordinatePublisher";

/// Subject stamped on every published record
pub const BUS_SUBJECT: &str = "GPS_Coordinates";

/// Message-bus record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusMessage {
    /// Sender name
    pub from: String,

    /// Subject line
    pub subject: String,

    /// Subject identifier
    pub subject_id: u32,

    /// `"longitude,latitude,timestamp"`
    pub text: String,

    /// Running counter (the sample sequence number)
    pub count: u64,
}

impl BusMessage {
    /// Build the record published for a sample
    pub fn from_sample(sample: &Sample) -> Self {
        Self {
            from: BUS_SENDER.to_string(),
            subject: BUS_SUBJECT.to_string(),
            subject_id: 1,
            text: sample.to_csv(),
            count: sample.sequence,
        }
    }

    /// Parse the coordinate carried in `text`
    ///
    /// # Errors
    /// Returns a codec error when the text is not three comma-separated numbers
    pub fn coordinate(&self) -> Result<Coordinate, ContractError> {
        let mut fields = self.text.split(',').map(str::trim);
        let (Some(lon), Some(lat), Some(ts), None) =
            (fields.next(), fields.next(), fields.next(), fields.next())
        else {
            return Err(ContractError::codec(format!(
                "expected 'lon,lat,timestamp', got '{}'",
                self.text
            )));
        };

        let longitude = lon
            .parse::<f64>()
            .map_err(|e| ContractError::codec(format!("invalid longitude '{lon}': {e}")))?;
        let latitude = lat
            .parse::<f64>()
            .map_err(|e| ContractError::codec(format!("invalid latitude '{lat}': {e}")))?;
        let timestamp_ms = ts
            .parse::<i64>()
            .map_err(|e| ContractError::codec(format!("invalid timestamp '{ts}': {e}")))?;

        Ok(Coordinate::new(longitude, latitude, timestamp_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sample_metadata() {
        let sample = Sample::from_coordinate(Coordinate::new(1.5, -2.25, 1000), 42);
        let message = BusMessage::from_sample(&sample);
        assert_eq!(message.from, "CoordinatePublisher");
        assert_eq!(message.subject, "GPS_Coordinates");
        assert_eq!(message.subject_id, 1);
        assert_eq!(message.count, 42);
        assert_eq!(message.text, "1.50000000,-2.25000000,1000");
    }

    #[test]
    fn test_coordinate_parse() {
        let sample = Sample::from_coordinate(Coordinate::new(107.02243, 20.763, 5), 1);
        let coordinate = BusMessage::from_sample(&sample).coordinate().unwrap();
        assert!((coordinate.longitude - 107.02243).abs() < 1e-9);
        assert!((coordinate.latitude - 20.763).abs() < 1e-9);
        assert_eq!(coordinate.timestamp_ms, 5);
    }

    #[test]
    fn test_coordinate_rejects_malformed_text() {
        let mut message = BusMessage::from_sample(&Sample::from_coordinate(
            Coordinate::new(0.0, 0.0, 0),
            1,
        ));

        message.text = "1.0,2.0".to_string();
        assert!(message.coordinate().is_err());

        message.text = "1.0,2.0,3,4".to_string();
        assert!(message.coordinate().is_err());

        message.text = "east,2.0,3".to_string();
        let err = message.coordinate().unwrap_err().to_string();
        assert!(err.contains("invalid longitude"), "got: {err}");
    }
}
