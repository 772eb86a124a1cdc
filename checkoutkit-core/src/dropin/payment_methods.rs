use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CheckoutKitError;

/// A bank or provider of an issuer list payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct Issuer {
    /// Identifier sent with the payment.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Temporarily unavailable.
    #[serde(default)]
    pub disabled: bool,
}

/// A payment method the shopper can pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    /// Backend type, e.g. `scheme` or `ideal`.
    #[serde(rename = "type")]
    pub method_type: String,
    /// Display name.
    pub name: String,
    /// Card brands, for `scheme`.
    #[serde(default)]
    pub brands: Vec<String>,
    /// Issuers, for issuer list methods.
    #[serde(default)]
    pub issuers: Vec<Issuer>,
}

/// A payment method the shopper stored earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
#[serde(rename_all = "camelCase")]
pub struct StoredPaymentMethod {
    /// Identifier sent with the payment.
    pub id: String,
    /// Backend type.
    #[serde(rename = "type")]
    pub method_type: String,
    /// Display name.
    pub name: String,
    /// Card brand.
    pub brand: Option<String>,
    /// Last four digits of a stored card.
    pub last_four: Option<String>,
    /// Expiry month of a stored card.
    pub expiry_month: Option<String>,
    /// Expiry year of a stored card.
    pub expiry_year: Option<String>,
    /// Card holder.
    pub holder_name: Option<String>,
    /// Account email of stored wallets such as PayPal.
    pub shopper_email: Option<String>,
}

/// The `/paymentMethods` response: regular and stored methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, uniffi::Record)]
pub struct PaymentMethods {
    /// Methods the shopper can pay with.
    pub regular: Vec<PaymentMethod>,
    /// Methods the shopper stored earlier.
    pub stored: Vec<StoredPaymentMethod>,
}

impl PaymentMethods {
    /// First regular method of `method_type`.
    #[must_use]
    pub fn regular_of_type(&self, method_type: &str) -> Option<&PaymentMethod> {
        self.regular
            .iter()
            .find(|method| method.method_type == method_type)
    }

    /// Stored method with `id`.
    #[must_use]
    pub fn stored_with_id(&self, id: &str) -> Option<&StoredPaymentMethod> {
        self.stored.iter().find(|method| method.id == id)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePaymentMethods {
    payment_methods: Vec<Value>,
    #[serde(default)]
    stored_payment_methods: Vec<Value>,
}

/// Decodes entries one by one. Entries this SDK cannot represent are skipped, so a new
/// backend payment method never breaks the whole list.
fn decode_entries<T: serde::de::DeserializeOwned>(entries: Vec<Value>, list: &str) -> Vec<T> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(method) => Some(method),
            Err(e) => {
                log::debug!("skipping {list} payment method: {e}");
                None
            }
        })
        .collect()
}

/// Decodes a `/paymentMethods` response.
///
/// # Errors
///
/// Returns `DecodingError` if the JSON is malformed or `paymentMethods` is missing.
#[uniffi::export]
pub fn decode_payment_methods(json: &str) -> Result<PaymentMethods, CheckoutKitError> {
    let wire: WirePaymentMethods = serde_json::from_str(json)?;
    Ok(PaymentMethods {
        regular: decode_entries(wire.payment_methods, "regular"),
        stored: decode_entries(wire.stored_payment_methods, "stored"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "paymentMethods": [
            {"type": "scheme", "name": "Cards", "brands": ["visa", "mc"]},
            {"type": "ideal", "name": "iDEAL", "issuers": [{"id": "1121", "name": "Test Issuer"}]},
            {"type": "twint", "name": "TWINT"},
            {"name": "missing type"}
        ],
        "storedPaymentMethods": [
            {"id": "8415", "type": "scheme", "name": "VISA", "brand": "visa", "lastFour": "1111", "expiryMonth": "03", "expiryYear": "30", "holderName": "J. Smith"},
            {"type": "paypal", "name": "PayPal"}
        ]
    }"#;

    #[test]
    fn test_undecodable_entries_are_skipped() {
        let methods = decode_payment_methods(RESPONSE).unwrap();
        let types: Vec<_> = methods
            .regular
            .iter()
            .map(|method| method.method_type.as_str())
            .collect();
        assert_eq!(types, vec!["scheme", "ideal", "twint"]);
        assert_eq!(methods.stored.len(), 1);
        assert_eq!(methods.stored[0].last_four.as_deref(), Some("1111"));
    }

    #[test]
    fn test_lookup() {
        let methods = decode_payment_methods(RESPONSE).unwrap();
        assert_eq!(
            methods.regular_of_type("ideal").unwrap().issuers[0].name,
            "Test Issuer"
        );
        assert!(methods.regular_of_type("klarna").is_none());
        assert_eq!(methods.stored_with_id("8415").unwrap().name, "VISA");
    }

    #[test]
    fn test_stored_methods_are_optional() {
        let methods = decode_payment_methods(r#"{"paymentMethods": []}"#).unwrap();
        assert_eq!(methods, PaymentMethods::default());
        assert!(decode_payment_methods(r#"{"storedPaymentMethods": []}"#).is_err());
    }
}
