//! Maps `Box<dyn Error>` from the `SerialLine` seam to typed `AcquisitionError`.
//!
//! The trait uses `Box<dyn Error + Send + Sync>`; this module converts those
//! to our enum, with an optional feature-gated path for
//! `sisaqui_hardware::HwError` downcasting.

use crate::error::AcquisitionError;

/// Map a link error to a typed `AcquisitionError`.
///
/// Known hardware errors are downcast first, then string heuristics apply.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> AcquisitionError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<sisaqui_hardware::HwError>() {
            return match hw {
                sisaqui_hardware::HwError::Timeout => AcquisitionError::Timeout,
                sisaqui_hardware::HwError::Io(io) => AcquisitionError::Io(io.to_string()),
                other => AcquisitionError::SerialFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        AcquisitionError::Timeout
    } else {
        AcquisitionError::Serial(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = "read timeout on COM8".into();
        assert!(matches!(map_hw_error(&*boxed), AcquisitionError::Timeout));
        let boxed: Box<dyn std::error::Error + Send + Sync> = "framing error".into();
        assert!(matches!(map_hw_error(&*boxed), AcquisitionError::Serial(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn typed_hardware_errors() {
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(sisaqui_hardware::HwError::Timeout);
        assert!(matches!(map_hw_error(&*boxed), AcquisitionError::Timeout));
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(sisaqui_hardware::HwError::Open {
                port: "COM8".into(),
                reason: "access denied".into(),
            });
        assert!(matches!(
            map_hw_error(&*boxed),
            AcquisitionError::SerialFault(_)
        ));
    }
}
