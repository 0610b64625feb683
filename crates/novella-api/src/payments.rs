use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use novella_db::{NewTransaction, PaymentEffect};
use novella_types::api::{Claims, PaymentRequest, PaymentResponse, TransactionListResponse};
use novella_types::models::TransactionType;

use crate::auth::{AppState, with_db};
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::extract::JsonBody;

/// Days of premium access granted per subscription payment.
pub const PREMIUM_DAYS: u32 = 30;

fn effect_of(payment_type: TransactionType) -> ApiResult<PaymentEffect> {
    match payment_type {
        TransactionType::CoinPurchase => Ok(PaymentEffect::CreditWallet),
        TransactionType::PremiumSubscription => Ok(PaymentEffect::ExtendPremium { days: PREMIUM_DAYS }),
        TransactionType::ChapterPurchase => Err(ApiError::bad_request(
            "Chapters are bought through /chapters/{id}/purchase",
        )),
    }
}

/// POST /payments
pub async fn create_payment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(req): JsonBody<PaymentRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.amount < 1 {
        return Err(ApiError::bad_request("Amount must be at least 1"));
    }
    let effect = effect_of(req.payment_type)?;

    let payment = NewTransaction {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.to_string(),
        amount: req.amount,
        transaction_type: req.payment_type.as_str().to_string(),
        item_id: req.item_id,
        item_type: req.item_type,
    };

    let (tx, user) = with_db(&state, move |db| Ok(db.record_payment(&payment, Some(effect))?)).await?;

    info!("User {} paid {} ({})", claims.sub, tx.amount, tx.transaction_type);

    let profile = convert::profile(user);
    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            transaction: convert::transaction(tx),
            wallet_coins: profile.wallet_coins,
            premium_until: profile.premium_until,
        }),
    ))
}

/// GET /payments
pub async fn list_payments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let uid = claims.sub.to_string();
    let rows = with_db(&state, move |db| Ok(db.list_transactions(&uid)?)).await?;

    Ok(Json(TransactionListResponse {
        transactions: rows.into_iter().map(convert::transaction).collect(),
    }))
}
