//! Reduce hypervisor statuses to the four outcomes a read cares about.

use crate::hcall::HcallStatus;

/// What a single fetch means for the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The buffer holds valid trace data (H_SUCCESS, H_PARTIAL).
    Ready,
    /// No trace at this offset (H_NOT_AVAILABLE).
    EndOfStream,
    /// The hypervisor is busy. `wait_ms` is its suggested retry delay.
    Busy { wait_ms: u64 },
    /// Parameter, state or authority error, or a status this reader does
    /// not know.
    Fatal(HcallStatus),
}

pub fn classify(status: HcallStatus) -> FetchOutcome {
    use HcallStatus::*;

    match status {
        Success | Partial => FetchOutcome::Ready,
        NotAvailable => FetchOutcome::EndOfStream,
        Busy | LongBusy { .. } => FetchOutcome::Busy {
            wait_ms: status.busy_wait_ms().unwrap_or(0),
        },
        Parameter | BadArg(2..=6) | State | Authority => FetchOutcome::Fatal(status),
        other => {
            warn!("htmdump: unexpected H_HTM status {}", other.raw());
            FetchOutcome::Fatal(other)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_error(outcome: FetchOutcome) -> bool {
        matches!(outcome, FetchOutcome::Busy { .. } | FetchOutcome::Fatal(_))
    }

    #[test]
    fn test_ready() {
        assert_eq!(classify(HcallStatus::Success), FetchOutcome::Ready);
        assert_eq!(classify(HcallStatus::Partial), FetchOutcome::Ready);
    }

    #[test]
    fn test_end_of_stream() {
        let outcome = classify(HcallStatus::NotAvailable);
        assert_eq!(outcome, FetchOutcome::EndOfStream);
        assert!(!is_error(outcome));
    }

    #[test]
    fn test_busy_family() {
        assert_eq!(classify(HcallStatus::Busy), FetchOutcome::Busy { wait_ms: 0 });
        for order in 0..=5u8 {
            let outcome = classify(HcallStatus::LongBusy { order });
            assert_eq!(outcome, FetchOutcome::Busy { wait_ms: 10u64.pow(order as u32) });
            assert!(is_error(outcome));
        }
    }

    #[test]
    fn test_fatal_family() {
        let fatal = [
            HcallStatus::Parameter,
            HcallStatus::BadArg(2),
            HcallStatus::BadArg(3),
            HcallStatus::BadArg(4),
            HcallStatus::BadArg(5),
            HcallStatus::BadArg(6),
            HcallStatus::State,
            HcallStatus::Authority,
        ];
        for status in fatal {
            assert_eq!(classify(status), FetchOutcome::Fatal(status));
        }
    }

    #[test]
    fn test_unknown_status_is_fatal() {
        assert!(is_error(classify(HcallStatus::Hardware)));
        assert!(is_error(classify(HcallStatus::Other(42))));
    }
}
