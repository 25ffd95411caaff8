use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserCommand {
    pub handle: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserCommand {
    #[serde(skip)]
    pub user_id: Uuid,
    pub handle: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteUserCommand {
    pub user_id: Uuid,
}
