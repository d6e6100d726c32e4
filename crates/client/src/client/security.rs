//! User and group methods.

use crate::client::Tm1Client;
use crate::endpoints::{QueryOptions, keyed};
use crate::error::Result;
use crate::models::User;

const USER_EXPAND: &str = "Groups($select=Name)";

impl Tm1Client {
    pub async fn get_user(&self, name: &str) -> Result<User> {
        let path = QueryOptions::new()
            .select("Name,FriendlyName")
            .expand(USER_EXPAND)
            .apply(&keyed("/Users", name)?);
        self.rest.get_json(&path).await
    }

    /// The user the session belongs to, with groups.
    pub async fn get_current_user(&self) -> Result<User> {
        let path = QueryOptions::new()
            .select("Name,FriendlyName")
            .expand(USER_EXPAND)
            .apply("/ActiveUser");
        self.rest.get_json(&path).await
    }

    pub async fn get_all_user_names(&self) -> Result<Vec<String>> {
        self.get_names("/Users", QueryOptions::new()).await
    }

    pub async fn get_all_group_names(&self) -> Result<Vec<String>> {
        self.get_names("/Groups", QueryOptions::new()).await
    }

    pub async fn get_user_group_names(&self, user: &str) -> Result<Vec<String>> {
        Ok(self.get_user(user).await?.groups)
    }
}
