//! Typed error hierarchy for the storefront service.
//!
//! - `StoreError`: service-level failures surfaced by the HTTP API
//! - `ClientError` (in `client`): failures seen by REST callers
//!
//! Business rule violations come from `lumiere_common::DomainError` and are
//! carried through `StoreError::Domain`.

use lumiere_common::DomainError;
use thiserror::Error;

/// Errors from the store service (API handlers, persistence, payment).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Product {id} not found")]
    ProductNotFound { id: String },

    #[error("Order {id} not found")]
    OrderNotFound { id: String },

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Payment processing is not configured")]
    PaymentNotConfigured,

    #[error("Payment not completed (status: {status})")]
    PaymentIncomplete { status: String },

    #[error("Payment intent is required")]
    PaymentMissing,

    #[error("Payment intent '{0}' is not a valid payment intent id")]
    InvalidPaymentIntent(String),

    #[error("Payment does not cover this order (paid {paid}, due {due})")]
    PaymentMismatch { paid: String, due: String },

    #[error("Payment intent {intent} already paid for order {order_number}")]
    PaymentReused {
        intent: String,
        order_number: String,
    },

    #[error("Payment provider error: {0}")]
    PaymentProvider(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Admin authorization required")]
    Unauthorized,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),
}

impl StoreError {
    /// Recover a `StoreError` from an `anyhow` chain produced by the database
    /// layer, wrapping anything else as `Database`.
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<StoreError>() {
            Ok(store) => store,
            Err(err) => match err.downcast::<DomainError>() {
                Ok(domain) => StoreError::Domain(domain),
                Err(err) => StoreError::Database(err),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_not_found_carries_id() {
        let err = StoreError::ProductNotFound { id: "abc".into() };
        match &err {
            StoreError::ProductNotFound { id } => assert_eq!(id, "abc"),
            _ => panic!("Expected ProductNotFound"),
        }
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn domain_error_converts_and_keeps_message() {
        let err: StoreError = DomainError::DeliveredBeforeShipped.into();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::DeliveredBeforeShipped)
        ));
        assert_eq!(
            err.to_string(),
            "Order must be marked as shipped before it can be delivered"
        );
    }

    #[test]
    fn from_anyhow_recovers_typed_errors() {
        let wrapped = anyhow::Error::new(StoreError::OrderNotFound { id: "o1".into() });
        assert!(matches!(
            StoreError::from_anyhow(wrapped),
            StoreError::OrderNotFound { .. }
        ));

        let domain = anyhow::Error::new(DomainError::EmptyCart);
        assert!(matches!(
            StoreError::from_anyhow(domain),
            StoreError::Domain(DomainError::EmptyCart)
        ));

        let other = anyhow::anyhow!("disk full");
        assert!(matches!(
            StoreError::from_anyhow(other),
            StoreError::Database(_)
        ));
    }

    #[test]
    fn payment_incomplete_names_status() {
        let err = StoreError::PaymentIncomplete {
            status: "requires_payment_method".into(),
        };
        assert!(err.to_string().contains("requires_payment_method"));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&StoreError::Unauthorized);
        assert_std_error(&DomainError::EmptyCart);
    }
}
