//! Maps `Box<dyn Error>` from the link traits to a typed `LinkError`.
//!
//! The traits in `irrigation_traits` use `Box<dyn Error + Send + Sync>`;
//! this module converts those to the core link taxonomy, with an optional
//! feature-gated path for `irrigation_hardware::HwError` downcasting.

use crate::error::LinkError;

/// Map a read/write failure to a typed `LinkError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_link_error(e: &(dyn std::error::Error + 'static)) -> LinkError {
    #[cfg(feature = "hardware-errors")]
    {
        use irrigation_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::EndOfStream => LinkError::EndOfStream,
                HwError::Disconnected(msg) => LinkError::Disconnected(msg.clone()),
                other => LinkError::Io(other.to_string()),
            };
        }
    }

    if let Some(io) = e.downcast_ref::<std::io::Error>()
        && io.kind() == std::io::ErrorKind::UnexpectedEof
    {
        return LinkError::EndOfStream;
    }

    // Fallback: string-based detection
    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("end of stream") {
        LinkError::EndOfStream
    } else if lower.contains("disconnect") || lower.contains("no such device") {
        LinkError::Disconnected(s)
    } else {
        LinkError::Io(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_eof_is_end_of_stream() {
        let e = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "done");
        assert_eq!(map_link_error(&e), LinkError::EndOfStream);
    }

    #[test]
    fn unknown_errors_become_io() {
        let e = std::io::Error::other("framing parity");
        assert!(matches!(map_link_error(&e), LinkError::Io(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_disconnect_is_typed() {
        let e = irrigation_hardware::HwError::Disconnected("usb gone".into());
        assert_eq!(
            map_link_error(&e),
            LinkError::Disconnected("usb gone".into())
        );
    }
}
