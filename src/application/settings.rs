use crate::config::GatewayConfig;
use crate::domain::ports::{PaymentMethod, ProviderClient};
use crate::error::ProviderError;
use std::fmt;
use tracing::warn;

/// Methods offered when the provider cannot be asked for the account's list.
pub const FALLBACK_PAYMENT_METHODS: &[(u32, &str)] = &[
    (736, "Afterpay"),
    (1903, "Amazon Pay"),
    (1705, "AMEX"),
    (436, "Bancontact"),
    (1672, "Billink"),
    (1744, "Capayable"),
    (1813, "Capayable Gespreid"),
    (1945, "CartaSI"),
    (710, "CarteBleue"),
    (1981, "Cashly"),
    (1939, "Dankort"),
    (815, "Fashioncheque"),
    (1669, "Fashiongiftcard"),
    (1702, "Focum"),
    (812, "Gezondheidsbon"),
    (694, "Giropay"),
    (1657, "Givacard"),
    (10, "iDEAL"),
    (1717, "Klarna"),
    (712, "Maestro"),
    (1588, "Mybank"),
    (136, "Overboeking"),
    (138, "PayPal"),
    (553, "Paysafecard"),
    (816, "Podiumkadokaart"),
    (707, "Postepay"),
    (559, "Sofortbanking"),
    (1987, "Spraypay"),
    (1600, "Telefonisch betalen"),
    (706, "Visa/Mastercard"),
    (1704, "VVV Giftcard"),
    (811, "WebshopGiftcard"),
    (1978, "Wechat Pay"),
    (1666, "Wijncadeau"),
    (1877, "Yehhpay"),
    (1645, "Yourgift"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    TokenCode,
    ApiToken,
    ServiceId,
    DefaultPaymentMethod,
}

impl Field {
    pub fn name(&self) -> &'static str {
        match self {
            Field::TokenCode => "token_code",
            Field::ApiToken => "api_token",
            Field::ServiceId => "service_id",
            Field::DefaultPaymentMethod => "default_payment_method",
        }
    }
}

/// A validation problem attached to one configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.name(), self.message)
    }
}

fn fallback_methods() -> Vec<PaymentMethod> {
    FALLBACK_PAYMENT_METHODS
        .iter()
        .map(|(id, name)| PaymentMethod {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect()
}

fn sort_methods(methods: &mut [PaymentMethod]) {
    methods.sort_by_key(|m| m.name.to_lowercase());
}

/// Lists the payment methods a merchant can choose as default.
///
/// Asks the provider when a client is available, and falls back to the
/// static list when there is none or the call fails. Never fails itself.
pub async fn payment_method_options(provider: Option<&dyn ProviderClient>) -> Vec<PaymentMethod> {
    let mut methods = match provider {
        Some(client) => match client.list_payment_methods().await {
            Ok(methods) if !methods.is_empty() => methods,
            Ok(_) => fallback_methods(),
            Err(e) => {
                warn!(error = %e, "could not list payment methods, using offline list");
                fallback_methods()
            }
        },
        None => fallback_methods(),
    };
    sort_methods(&mut methods);
    methods
}

/// Validates a configuration, returning every problem found as a field
/// error instead of aborting.
///
/// `provider` is a client built from the configuration's credentials; it
/// is only consulted when all three credentials are present.
pub async fn validate_configuration(
    config: &GatewayConfig,
    provider: Option<&dyn ProviderClient>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for (field, value) in [
        (Field::TokenCode, &config.token_code),
        (Field::ApiToken, &config.api_token),
        (Field::ServiceId, &config.service_id),
    ] {
        if value.trim().is_empty() {
            errors.push(FieldError {
                field,
                message: "This field is required".to_string(),
            });
        }
    }
    if !errors.is_empty() {
        return errors;
    }

    let Some(provider) = provider else {
        return errors;
    };

    match provider.list_payment_methods().await {
        Ok(methods) => {
            if let Some(wanted) = config.default_payment_method()
                && !methods.iter().any(|m| m.id == wanted)
            {
                errors.push(FieldError {
                    field: Field::DefaultPaymentMethod,
                    message: "Payment method is not activated in your account".to_string(),
                });
            }
        }
        Err(ProviderError::Transient(message)) => {
            warn!(%message, "provider unreachable during configuration validation");
        }
        Err(e) => {
            let message = e.to_string();
            for field in [Field::TokenCode, Field::ApiToken, Field::ServiceId] {
                errors.push(FieldError {
                    field,
                    message: message.clone(),
                });
            }
        }
    }

    errors
}
