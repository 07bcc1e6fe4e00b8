use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use paycore::{
    domain::{
        repositories::payments::PaymentRepository, transaction::TransactionManager,
        value_objects::payment_intents::CreateIntentModel,
    },
    infra::db::{
        postgres::{postgres_connection::PgPoolSquad, transaction::PgTransactionManager},
        repositories::payments::PaymentPostgres,
    },
    payments::stripe_client::StripeClient,
};

use crate::{
    axum_http::error_responses::AppError,
    usecases::payments::{PaymentGateway, PaymentUseCase},
};

pub fn routes(db_pool: Arc<PgPoolSquad>, stripe_client: Arc<StripeClient>) -> Router {
    let payment_repository = PaymentPostgres::new(Arc::clone(&db_pool));
    let tx_manager = PgTransactionManager::new(Arc::clone(&db_pool));
    let payment_usecase = PaymentUseCase::new(
        Arc::new(payment_repository),
        Arc::new(tx_manager),
        stripe_client,
    );

    router(payment_usecase)
}

pub fn router<R, T, G>(payment_usecase: PaymentUseCase<R, T, G>) -> Router
where
    R: PaymentRepository + Send + Sync + 'static,
    T: TransactionManager + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    Router::new()
        .route("/create_intent", post(create_intent::<R, T, G>))
        .route("/capture_intent/:id", post(capture_intent::<R, T, G>))
        .route("/get_intents", get(get_intents::<R, T, G>))
        .route("/create_refund/:id", post(create_refund::<R, T, G>))
        .with_state(Arc::new(payment_usecase))
}

pub async fn create_intent<R, T, G>(
    State(payment_usecase): State<Arc<PaymentUseCase<R, T, G>>>,
    body: Result<Json<CreateIntentModel>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: TransactionManager + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let Json(create_intent_model) = body?;
    let intent = payment_usecase.create_intent(create_intent_model).await?;

    Ok((StatusCode::CREATED, Json(intent)))
}

pub async fn capture_intent<R, T, G>(
    State(payment_usecase): State<Arc<PaymentUseCase<R, T, G>>>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: TransactionManager + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let intent = payment_usecase.capture_intent(&payment_id).await?;

    Ok((StatusCode::OK, Json(intent)))
}

pub async fn get_intents<R, T, G>(
    State(payment_usecase): State<Arc<PaymentUseCase<R, T, G>>>,
) -> Result<impl IntoResponse, AppError>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: TransactionManager + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let intents = payment_usecase.get_intents().await?;

    Ok((StatusCode::OK, Json(intents)))
}

pub async fn create_refund<R, T, G>(
    State(payment_usecase): State<Arc<PaymentUseCase<R, T, G>>>,
    Path(payment_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    R: PaymentRepository + Send + Sync + 'static,
    T: TransactionManager + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
{
    let refund = payment_usecase.create_refund(&payment_id).await?;

    Ok((StatusCode::CREATED, Json(refund)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header::CONTENT_TYPE},
        response::Response,
    };
    use paycore::{
        domain::value_objects::{payment_intents::ProviderIntent, refunds::ProviderRefund},
        infra::memory::InMemoryPaymentLedger,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::usecases::payments::MockPaymentGateway;

    fn intent(id: &str, amount: i64, status: &str) -> ProviderIntent {
        ProviderIntent {
            id: id.to_string(),
            amount,
            status: status.to_string(),
            ..ProviderIntent::default()
        }
    }

    fn app(ledger: &InMemoryPaymentLedger, gateway: MockPaymentGateway) -> Router {
        router(PaymentUseCase::new(
            Arc::new(ledger.clone()),
            Arc::new(ledger.clone()),
            Arc::new(gateway),
        ))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_intent_responds_created() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_intent()
            .returning(|req| Ok(intent("pi_1", req.amount, "requires_payment_method")));
        let ledger = InMemoryPaymentLedger::new();

        let response = app(&ledger, gateway)
            .oneshot(post_json(
                "/create_intent",
                r#"{"amount":100,"email":"a@b.com","phone":"+911234567890"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["id"], "pi_1");
        assert_eq!(body["amount"], 100);
        assert_eq!(ledger.payments().await.len(), 1);
    }

    #[tokio::test]
    async fn malformed_bodies_use_the_error_envelope() {
        let ledger = InMemoryPaymentLedger::new();

        for body in [r#"{"amount":"#, r#"{"amount":100}"#] {
            let response = app(&ledger, MockPaymentGateway::new())
                .oneshot(post_json("/create_intent", body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = json_body(response).await;
            assert_eq!(body["error"]["status"], 400);
            assert_eq!(body["error"]["message"], "Bad Request");
            assert_eq!(body["error"]["res"], "Validation Error");
        }
    }

    #[tokio::test]
    async fn zero_amount_is_a_validation_error() {
        let ledger = InMemoryPaymentLedger::new();

        let response = app(&ledger, MockPaymentGateway::new())
            .oneshot(post_json("/create_intent", r#"{"amount":0,"email":"a@b.com"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["service"], "payment_service");
        assert!(ledger.payments().await.is_empty());
    }

    #[tokio::test]
    async fn capture_of_unknown_intent_is_not_found() {
        let response = app(&InMemoryPaymentLedger::new(), MockPaymentGateway::new())
            .oneshot(post_json("/capture_intent/pi_missing", ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({"error": {
                "status": 404,
                "message": "payment intent not found",
                "res": "provide valid intent id",
                "service": "payment_repo",
                "error": "payment intent pi_missing not found"
            }})
        );
    }

    #[tokio::test]
    async fn get_intents_wraps_the_list() {
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_list_intents()
            .returning(|| Ok(vec![intent("pi_2", 200, "succeeded"), intent("pi_1", 100, "canceled")]));

        let response = app(&InMemoryPaymentLedger::new(), gateway)
            .oneshot(Request::get("/get_intents").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["intents"][0]["id"], "pi_2");
        assert_eq!(body["intents"][1]["id"], "pi_1");
    }

    #[tokio::test]
    async fn capture_then_refund_over_http() {
        let ledger = InMemoryPaymentLedger::new();
        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_intent()
            .returning(|req| Ok(intent("pi_1", req.amount, "requires_payment_method")));
        gateway
            .expect_capture_intent()
            .returning(|id, amount| Ok(intent(id, amount, "succeeded")));
        gateway.expect_create_refund().returning(|id, amount| {
            Ok(ProviderRefund {
                id: "re_1".to_string(),
                amount,
                payment_intent: Some(id.to_string()),
                status: "succeeded".to_string(),
                ..ProviderRefund::default()
            })
        });
        let app = app(&ledger, gateway);

        let created = app
            .clone()
            .oneshot(post_json("/create_intent", r#"{"amount":100,"email":"a@b.com"}"#))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);

        let captured = app
            .clone()
            .oneshot(post_json("/capture_intent/pi_1", ""))
            .await
            .unwrap();
        assert_eq!(captured.status(), StatusCode::OK);
        assert_eq!(json_body(captured).await["status"], "succeeded");

        let refunded = app
            .oneshot(post_json("/create_refund/pi_1", ""))
            .await
            .unwrap();
        assert_eq!(refunded.status(), StatusCode::CREATED);
        assert_eq!(json_body(refunded).await["id"], "re_1");

        assert_eq!(ledger.payments().await[0].status, "refunded");
        assert_eq!(ledger.refunds().await.len(), 1);
    }
}
