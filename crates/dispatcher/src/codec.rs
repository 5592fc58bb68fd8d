//! Bus record encoding

use contracts::{BusMessage, ContractError, WireFormat};

/// Serialize a bus record into one datagram payload
pub fn encode(message: &BusMessage, format: WireFormat) -> Result<Vec<u8>, ContractError> {
    match format {
        WireFormat::Json => {
            serde_json::to_vec(message).map_err(|e| ContractError::codec(format!("json error: {e}")))
        }
        WireFormat::Bincode => bincode::serialize(message)
            .map_err(|e| ContractError::codec(format!("bincode error: {e}"))),
    }
}

/// Parse one datagram payload
pub fn decode(bytes: &[u8], format: WireFormat) -> Result<BusMessage, ContractError> {
    match format {
        WireFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| ContractError::codec(format!("json error: {e}"))),
        WireFormat::Bincode => bincode::deserialize(bytes)
            .map_err(|e| ContractError::codec(format!("bincode error: {e}"))),
    }
}
