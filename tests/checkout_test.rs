use payrecon::application::checkout::CheckoutService;
use payrecon::application::settings::{Field, payment_method_options, validate_configuration};
use payrecon::config::{GatewayConfig, Mode};
use payrecon::domain::checkout::{
    Address, CustomerInfo, LineItemKind, OrderItem, OrderSummary, ShippingCharge,
};
use payrecon::domain::order::{OrderAggregate, OrderState};
use payrecon::domain::ports::{OrderStore, PaymentMethod, PaymentStore, ProviderClient};
use payrecon::domain::status::{LocalStatus, Money};
use payrecon::error::{PaymentError, ProviderError};
use payrecon::infrastructure::in_memory::{InMemoryOrderStore, InMemoryPaymentStore};
use rust_decimal_macros::dec;

mod common;

fn config() -> GatewayConfig {
    GatewayConfig {
        token_code: "AT-1234-5678".to_string(),
        api_token: "secret".to_string(),
        service_id: "SL-1234-5678".to_string(),
        default_payment_method: "10".to_string(),
        mode: Mode::Live,
        notify_url: "https://shop.example/payment/notify".to_string(),
        ..GatewayConfig::default()
    }
}

fn summary() -> OrderSummary {
    OrderSummary {
        order_number: "1001".to_string(),
        ip_address: Some("192.0.2.1".to_string()),
        customer: CustomerInfo {
            email: "jan@example.com".to_string(),
            billing: Address {
                given_name: "Jan".to_string(),
                family_name: "Jansen".to_string(),
                organization: Some("Jansen BV".to_string()),
                line1: "Damrak 1".to_string(),
                line2: String::new(),
                postal_code: "1012LG".to_string(),
                locality: "Amsterdam".to_string(),
                country_code: "NL".to_string(),
            },
            shipping: None,
        },
        items: vec![
            OrderItem {
                product_id: "42".to_string(),
                title: "Teapot".to_string(),
                unit_price: dec!(20.00),
                quantity: dec!(1),
                tax_rate: Some(dec!(0.21)),
            },
            OrderItem {
                product_id: "43".to_string(),
                title: "Tea".to_string(),
                unit_price: dec!(2.50),
                quantity: dec!(2),
                tax_rate: Some(dec!(0.09)),
            },
        ],
        shipping: vec![ShippingCharge {
            label: "Shipping".to_string(),
            amount: dec!(4.95),
        }],
    }
}

#[tokio::test]
async fn test_start_registers_new_payment() {
    let provider = common::FakeProvider::new();
    let payments = InMemoryPaymentStore::new();
    let orders = InMemoryOrderStore::new();
    let service = CheckoutService::new(
        Box::new(provider.clone()),
        Box::new(payments.clone()),
        Box::new(orders.clone()),
        &config(),
    );

    let started = service
        .start(
            7,
            3,
            Money::new(dec!(29.95), "EUR"),
            &summary(),
            "https://shop.example/payment/return",
        )
        .await
        .unwrap();

    assert!(started.redirect_url.ends_with(&started.remote_id));

    let payment = payments
        .get_by_remote_id(&started.remote_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.id, 7);
    assert_eq!(payment.order_id, 3);
    assert_eq!(payment.status, LocalStatus::New);

    let order = orders.get(3).await.unwrap().unwrap();
    assert_eq!(order, OrderAggregate::new(3));
    assert_eq!(order.state, OrderState::Draft);

    let requests = provider.started();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(!request.test_mode);
    assert_eq!(request.payment_method.as_deref(), Some("10"));
    assert_eq!(request.notify_url, "https://shop.example/payment/notify");
    assert_eq!(request.end_user.company.as_deref(), Some("Jansen BV"));

    let shipping: Vec<_> = request
        .line_items
        .iter()
        .filter(|l| l.kind == LineItemKind::Shipping)
        .collect();
    assert_eq!(shipping.len(), 1);
    assert_eq!(shipping[0].vat_percentage, dec!(21));
}

#[tokio::test]
async fn test_start_keeps_existing_order() {
    let provider = common::FakeProvider::new();
    let payments = InMemoryPaymentStore::new();
    let orders = InMemoryOrderStore::new();
    orders
        .insert(OrderAggregate {
            id: 3,
            state: OrderState::Placed,
            version: 1,
        })
        .await;
    let service = CheckoutService::new(
        Box::new(provider),
        Box::new(payments.clone()),
        Box::new(orders.clone()),
        &config(),
    );

    service
        .start(8, 3, Money::new(dec!(5.00), "EUR"), &summary(), "https://r")
        .await
        .unwrap();

    let order = orders.get(3).await.unwrap().unwrap();
    assert_eq!(order.state, OrderState::Placed);
    assert_eq!(order.version, 1);
    assert_eq!(payments.get(8).await.unwrap().unwrap().order_id, 3);
}

#[tokio::test]
async fn test_start_failure_stores_nothing() {
    let provider = common::FakeProvider::new();
    provider.fail_with(ProviderError::Authentication("invalid token".to_string()));
    let payments = InMemoryPaymentStore::new();
    let orders = InMemoryOrderStore::new();
    let service = CheckoutService::new(
        Box::new(provider),
        Box::new(payments.clone()),
        Box::new(orders.clone()),
        &config(),
    );

    let result = service
        .start(1, 1, Money::new(dec!(10), "EUR"), &summary(), "https://r")
        .await;

    assert!(matches!(
        result,
        Err(PaymentError::Provider(ProviderError::Authentication(_)))
    ));
    assert!(payments.get_all().await.unwrap().is_empty());
    assert!(orders.get(1).await.unwrap().is_none());
}

#[tokio::test]
async fn test_start_rejects_non_positive_amount() {
    let provider = common::FakeProvider::new();
    let service = CheckoutService::new(
        Box::new(provider.clone()),
        Box::new(InMemoryPaymentStore::new()),
        Box::new(InMemoryOrderStore::new()),
        &config(),
    );

    let result = service
        .start(1, 1, Money::new(dec!(0), "EUR"), &summary(), "https://r")
        .await;

    assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    assert!(provider.started().is_empty());
}

#[tokio::test]
async fn test_validation_reports_bad_credentials_per_field() {
    let provider = common::FakeProvider::new();
    provider.set_methods(Err(ProviderError::Authentication(
        "Invalid API token".to_string(),
    )));

    let errors = validate_configuration(&config(), Some(&provider as &dyn ProviderClient)).await;

    let fields: Vec<Field> = errors.iter().map(|e| e.field).collect();
    assert_eq!(
        fields,
        vec![Field::TokenCode, Field::ApiToken, Field::ServiceId]
    );
    assert!(errors[0].message.contains("Invalid API token"));
}

#[tokio::test]
async fn test_validation_checks_default_method_is_enabled() {
    let provider = common::FakeProvider::new();
    provider.set_methods(Ok(vec![PaymentMethod {
        id: "138".to_string(),
        name: "PayPal".to_string(),
    }]));

    let errors = validate_configuration(&config(), Some(&provider as &dyn ProviderClient)).await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, Field::DefaultPaymentMethod);

    let mut cfg = config();
    cfg.default_payment_method = "138".to_string();
    let errors = validate_configuration(&cfg, Some(&provider as &dyn ProviderClient)).await;
    assert!(errors.is_empty());
}

#[tokio::test]
async fn test_method_options_fall_back_on_provider_error() {
    let provider = common::FakeProvider::new();
    provider.set_methods(Err(ProviderError::Transient("timeout".to_string())));

    let methods = payment_method_options(Some(&provider as &dyn ProviderClient)).await;
    assert_eq!(methods.len(), 36);

    provider.set_methods(Ok(vec![
        PaymentMethod {
            id: "138".to_string(),
            name: "PayPal".to_string(),
        },
        PaymentMethod {
            id: "10".to_string(),
            name: "iDEAL".to_string(),
        },
    ]));
    let methods = payment_method_options(Some(&provider as &dyn ProviderClient)).await;
    let names: Vec<&str> = methods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["iDEAL", "PayPal"]);
}
