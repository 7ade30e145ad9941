use thiserror::Error;

/// A storefront business rule was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Not enough stock for {size}: requested {requested}, available {available}")]
    InsufficientStock {
        size: String,
        requested: u32,
        available: u32,
    },

    #[error("Unknown size '{size}'")]
    UnknownSize { size: String },

    #[error("Restock amount must be greater than zero")]
    InvalidRestockAmount,

    #[error("Unknown promo code '{code}'")]
    UnknownPromoCode { code: String },

    #[error("Order must be marked as shipped before it can be delivered")]
    DeliveredBeforeShipped,

    #[error("A cancelled order cannot be shipped")]
    ShipCancelledOrder,

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid email address '{email}'")]
    InvalidEmail { email: String },

    #[error("Product price must be greater than zero")]
    NonPositivePrice,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Invalid {kind} '{value}'")]
    InvalidValue { kind: &'static str, value: String },
}
