//! The verdict table.
//!
//! A single status-code switch with explicit cases. The table must not be
//! collapsed: folding "UNIMPLEMENTED with an unknown-service message" into
//! generic UNIMPLEMENTED handling floods the output with false positives,
//! because unknown-service is the only reliable negative signal a server
//! ever gives. Message matching is case-insensitive and substring-based.

use grapnel_common::Verdict;
use grapnel_transport::status_is_transport_artifact;
use tonic::{Code, Status};

/// Classifier for probe replies.
///
/// `strict` demotes INTERNAL from method-confirmed to ambiguous. Some
/// servers emit INTERNAL from their routing layer before any handler runs,
/// so confirming on it can over-report; the default keeps the permissive
/// behaviour because demoting it silently drops detections on servers whose
/// handlers genuinely blow up on an empty body.
#[derive(Debug, Clone, Copy, Default)]
pub struct Classifier {
    pub strict: bool,
}

impl Classifier {
    #[must_use]
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Classify the reply to one zero-body unary probe.
    #[must_use]
    pub fn classify(&self, reply: &Result<(), Status>) -> Verdict {
        let status = match reply {
            // The method exists and accepted an empty body.
            Ok(()) => return Verdict::MethodConfirmed,
            Err(status) => status,
        };

        // No trailer was ever read: connection trouble, handshake failure,
        // or a deadline. Inconclusive; the caller must not update state.
        if status_is_transport_artifact(status) {
            return Verdict::TransportError;
        }

        let message = status.message().to_ascii_lowercase();

        match status.code() {
            // Often a momentary condition rather than a statement about the
            // path; treated as inconclusive alongside transport errors.
            Code::Unavailable => Verdict::TransportError,

            Code::Unimplemented => {
                if message.contains("unknown service") {
                    Verdict::ServiceMissing
                } else if message.contains("unknown method")
                    || (message.contains("method") && !message.contains("service"))
                {
                    Verdict::MethodMissing
                } else {
                    // Terse UNIMPLEMENTED: the request reached a routing
                    // layer, so the service side is conservatively present.
                    Verdict::MethodMissing
                }
            }

            // The handler rejected our empty body; it had to exist to do so.
            Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => {
                Verdict::MethodConfirmed
            }

            // The handler gated us, same conclusion.
            Code::Unauthenticated | Code::PermissionDenied => Verdict::MethodConfirmed,

            // The handler executed and blew up.
            Code::Internal => {
                if self.strict {
                    Verdict::Ambiguous
                } else {
                    Verdict::MethodConfirmed
                }
            }

            // Everything else proves nothing either way.
            _ => Verdict::Ambiguous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(reply: Result<(), Status>) -> Verdict {
        Classifier::default().classify(&reply)
    }

    #[test]
    fn ok_confirms_method() {
        assert_eq!(classify(Ok(())), Verdict::MethodConfirmed);
    }

    #[test]
    fn unknown_service_is_the_only_negative() {
        let reply = Err(Status::new(
            Code::Unimplemented,
            "unknown service proto.UserService",
        ));
        assert_eq!(classify(reply), Verdict::ServiceMissing);
    }

    #[test]
    fn unknown_service_match_is_case_insensitive() {
        let reply = Err(Status::new(Code::Unimplemented, "Unknown Service foo.Bar"));
        assert_eq!(classify(reply), Verdict::ServiceMissing);
    }

    #[test]
    fn unknown_method_keeps_service_present() {
        let reply = Err(Status::new(Code::Unimplemented, "unknown method Logout"));
        assert_eq!(classify(reply), Verdict::MethodMissing);
    }

    #[test]
    fn method_without_service_mention_keeps_service_present() {
        let reply = Err(Status::new(
            Code::Unimplemented,
            "method SayGoodbye is not implemented",
        ));
        assert_eq!(classify(reply), Verdict::MethodMissing);
    }

    #[test]
    fn terse_unimplemented_is_conservative() {
        let reply = Err(Status::new(Code::Unimplemented, ""));
        assert_eq!(classify(reply), Verdict::MethodMissing);
    }

    #[test]
    fn handler_rejections_confirm_method() {
        for code in [
            Code::InvalidArgument,
            Code::FailedPrecondition,
            Code::OutOfRange,
            Code::Unauthenticated,
            Code::PermissionDenied,
            Code::Internal,
        ] {
            let reply = Err(Status::new(code, "rejected"));
            assert_eq!(classify(reply), Verdict::MethodConfirmed, "{code:?}");
        }
    }

    #[test]
    fn strict_mode_demotes_internal() {
        let classifier = Classifier::new(true);
        let reply = Err(Status::new(Code::Internal, "boom"));
        assert_eq!(classifier.classify(&reply), Verdict::Ambiguous);
        // other confirming codes are unaffected
        let reply = Err(Status::new(Code::Unauthenticated, "token required"));
        assert_eq!(classifier.classify(&reply), Verdict::MethodConfirmed);
    }

    #[test]
    fn unavailable_is_inconclusive() {
        let reply = Err(Status::new(Code::Unavailable, "try again later"));
        assert_eq!(classify(reply), Verdict::TransportError);
    }

    #[test]
    fn transport_failures_are_inconclusive() {
        for msg in [
            "transport error",
            "error trying to connect: connection refused",
            "h2 protocol error: unexpected frame",
        ] {
            let reply = Err(Status::new(Code::Unavailable, msg));
            assert_eq!(classify(reply), Verdict::TransportError, "{msg}");
        }
        let reply = Err(Status::deadline_exceeded("per-call deadline elapsed"));
        assert_eq!(classify(reply), Verdict::TransportError);
    }

    #[test]
    fn other_codes_are_ambiguous() {
        for code in [
            Code::NotFound,
            Code::AlreadyExists,
            Code::ResourceExhausted,
            Code::Aborted,
            Code::DataLoss,
            Code::Unknown,
        ] {
            let reply = Err(Status::new(code, "something"));
            assert_eq!(classify(reply), Verdict::Ambiguous, "{code:?}");
        }
    }
}
