use serde::Serialize;
use uuid::Uuid;

/// The authenticated caller, as vouched for by the upstream session provider.
#[derive(Debug, Clone, Serialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: Option<String>,
}
