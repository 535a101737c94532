//! PCI Data Object Exchange discovery responder.
//!
//! Answers `NORMAL` payloads that carry a DoE discovery request, the one
//! DoE data object the SPDM engine leaves to the platform. Multi-byte fields
//! inside the DoE message are little-endian.

use crate::engine::SecondaryResponder;

/// PCI-SIG vendor ID.
pub const PCI_SIG_VENDOR_ID: u16 = 0x0001;

/// DoE data object type: discovery.
pub const DOE_TYPE_DISCOVERY: u8 = 0x00;
/// DoE data object type: SPDM.
pub const DOE_TYPE_SPDM: u8 = 0x01;
/// DoE data object type: secured SPDM.
pub const DOE_TYPE_SECURED_SPDM: u8 = 0x02;

/// DoE header: vendor ID, type, reserved, length in dwords.
const HEADER_LEN: usize = 8;
/// Discovery request/response body.
const BODY_LEN: usize = 4;
/// The header length field holds 18 bits.
const LENGTH_MASK: u32 = 0x0003_FFFF;

/// Why a DoE request was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum DoeError {
    /// Shorter than a discovery request.
    #[error("truncated DoE message: {0} bytes")]
    Truncated(usize),
    /// Vendor other than PCI-SIG.
    #[error("unsupported DoE vendor {0:#06x}")]
    UnsupportedVendor(u16),
    /// Data object type other than discovery.
    #[error("unsupported DoE data object type {0:#04x}")]
    UnsupportedType(u8),
    /// Header length disagrees with the message size.
    #[error("DoE length field says {dwords} dwords, message is {bytes} bytes")]
    LengthMismatch {
        /// Length field value.
        dwords: u32,
        /// Actual message size.
        bytes: usize,
    },
    /// Discovery index past the last protocol.
    #[error("discovery index {0} out of range")]
    IndexOutOfRange(u8),
}

/// A protocol advertised through discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct DataObjectProtocol {
    /// Vendor ID.
    pub vendor_id: u16,
    /// Data object type.
    pub data_object_type: u8,
}

impl DataObjectProtocol {
    /// A PCI-SIG defined data object type.
    pub const fn pci_sig(data_object_type: u8) -> Self {
        Self {
            vendor_id: PCI_SIG_VENDOR_ID,
            data_object_type,
        }
    }
}

/// Responds to DoE discovery with a fixed protocol table.
#[derive(Debug, Clone)]
pub struct DoeDiscoveryResponder {
    /// Protocols in discovery order.
    protocols: Vec<DataObjectProtocol>,
}

impl Default for DoeDiscoveryResponder {
    fn default() -> Self {
        Self {
            protocols: vec![
                DataObjectProtocol::pci_sig(DOE_TYPE_DISCOVERY),
                DataObjectProtocol::pci_sig(DOE_TYPE_SPDM),
                DataObjectProtocol::pci_sig(DOE_TYPE_SECURED_SPDM),
            ],
        }
    }
}

impl DoeDiscoveryResponder {
    /// Advertises `protocols` in order.
    pub const fn new(protocols: Vec<DataObjectProtocol>) -> Self {
        Self { protocols }
    }

    /// Builds the discovery response for `request`.
    pub fn discover(&self, request: &[u8]) -> Result<Vec<u8>, DoeError> {
        if request.len() < HEADER_LEN + BODY_LEN {
            return Err(DoeError::Truncated(request.len()));
        }
        let vendor_id = u16::from_le_bytes([request[0], request[1]]);
        if vendor_id != PCI_SIG_VENDOR_ID {
            return Err(DoeError::UnsupportedVendor(vendor_id));
        }
        if request[2] != DOE_TYPE_DISCOVERY {
            return Err(DoeError::UnsupportedType(request[2]));
        }
        let dwords =
            u32::from_le_bytes([request[4], request[5], request[6], request[7]]) & LENGTH_MASK;
        if dwords as usize * 4 != request.len() {
            return Err(DoeError::LengthMismatch {
                dwords,
                bytes: request.len(),
            });
        }

        let index = request[HEADER_LEN];
        let entry = self
            .protocols
            .get(usize::from(index))
            .ok_or(DoeError::IndexOutOfRange(index))?;
        let next_index = if usize::from(index) + 1 >= self.protocols.len() {
            0
        } else {
            index + 1
        };
        tracing::debug!(index, next_index, ?entry, "DoE discovery");

        let mut response = Vec::with_capacity(HEADER_LEN + BODY_LEN);
        response.extend_from_slice(&PCI_SIG_VENDOR_ID.to_le_bytes());
        response.push(DOE_TYPE_DISCOVERY);
        response.push(0);
        response.extend_from_slice(&(((HEADER_LEN + BODY_LEN) / 4) as u32).to_le_bytes());
        response.extend_from_slice(&entry.vendor_id.to_le_bytes());
        response.push(entry.data_object_type);
        response.push(next_index);
        Ok(response)
    }
}

impl SecondaryResponder for DoeDiscoveryResponder {
    type Error = DoeError;

    fn respond(&mut self, request: &[u8]) -> Result<Vec<u8>, DoeError> {
        self.discover(request)
    }
}

/// Encodes a discovery request for `index`.
pub fn discovery_request(index: u8) -> Vec<u8> {
    let mut req = Vec::with_capacity(HEADER_LEN + BODY_LEN);
    req.extend_from_slice(&PCI_SIG_VENDOR_ID.to_le_bytes());
    req.push(DOE_TYPE_DISCOVERY);
    req.push(0);
    req.extend_from_slice(&(((HEADER_LEN + BODY_LEN) / 4) as u32).to_le_bytes());
    req.extend_from_slice(&[index, 0, 0, 0]);
    req
}

/// Parses a discovery response into the advertised protocol and next index.
pub fn parse_discovery_response(response: &[u8]) -> Result<(DataObjectProtocol, u8), DoeError> {
    if response.len() < HEADER_LEN + BODY_LEN {
        return Err(DoeError::Truncated(response.len()));
    }
    let body = &response[HEADER_LEN..];
    let protocol = DataObjectProtocol {
        vendor_id: u16::from_le_bytes([body[0], body[1]]),
        data_object_type: body[2],
    };
    Ok((protocol, body[3]))
}
