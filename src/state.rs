use std::sync::Arc;

use crate::{db::OrmConn, services::payment_service::PaymentService};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub payments: PaymentService,
    pub jwt_secret: Arc<str>,
    pub trust_forwarded_for: bool,
}
