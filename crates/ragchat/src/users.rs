use crate::client::Client;
use crate::error::Result;
use crate::models::Profile;

const USERS_API: &str = "/v1/users";

impl Client {
    /// Lists the user profiles.
    pub async fn list_users(&self) -> Result<Vec<Profile>> {
        self.get_json(USERS_API).await
    }
}
