use serde::Deserialize;

use crate::models::payment_model::PaymentStatus;

/// Provider-originated notification. The caller is the payment provider, not
/// the paying user, so the route carries no bearer credential.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentCallbackRequest {
    pub transaction_id: String,
    pub status: String,
}

/// What a callback delivery may do to a stored payment. `Flip` is the one
/// delivery that performs the pending-to-terminal transition; everything else
/// is absorbed without mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackDisposition {
    Flip,
    AlreadyApplied,
    Conflicting,
}

pub fn callback_disposition(stored: PaymentStatus, incoming: PaymentStatus) -> CallbackDisposition {
    if stored == PaymentStatus::Pending {
        CallbackDisposition::Flip
    } else if stored == incoming {
        CallbackDisposition::AlreadyApplied
    } else {
        CallbackDisposition::Conflicting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_payment_is_flipped() {
        assert_eq!(
            callback_disposition(PaymentStatus::Pending, PaymentStatus::Completed),
            CallbackDisposition::Flip
        );
        assert_eq!(
            callback_disposition(PaymentStatus::Pending, PaymentStatus::Failed),
            CallbackDisposition::Flip
        );
    }

    #[test]
    fn replayed_delivery_is_absorbed() {
        assert_eq!(
            callback_disposition(PaymentStatus::Completed, PaymentStatus::Completed),
            CallbackDisposition::AlreadyApplied
        );
        assert_eq!(
            callback_disposition(PaymentStatus::Failed, PaymentStatus::Failed),
            CallbackDisposition::AlreadyApplied
        );
    }

    #[test]
    fn terminal_states_never_transition() {
        assert_eq!(
            callback_disposition(PaymentStatus::Failed, PaymentStatus::Completed),
            CallbackDisposition::Conflicting
        );
        assert_eq!(
            callback_disposition(PaymentStatus::Completed, PaymentStatus::Failed),
            CallbackDisposition::Conflicting
        );
    }
}
