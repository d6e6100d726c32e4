//! View methods, public and private, native and MDX.

use serde_json::Value;

use crate::client::Tm1Client;
use crate::endpoints::{QueryOptions, keyed};
use crate::error::Result;
use crate::models::View;
use crate::models::view::NATIVE_VIEW_EXPAND;

fn collection(private: bool) -> &'static str {
    if private { "/PrivateViews" } else { "/Views" }
}

pub(crate) fn view_path(cube: &str, view: &str, private: bool) -> Result<String> {
    Ok(format!(
        "{}{}",
        keyed("/Cubes", cube)?,
        keyed(collection(private), view)?
    ))
}

impl Tm1Client {
    /// Get a view; the payload decides whether it is native or MDX.
    pub async fn get_view(&self, cube: &str, name: &str, private: bool) -> Result<View> {
        let path = QueryOptions::new()
            .expand(NATIVE_VIEW_EXPAND)
            .apply(&view_path(cube, name, private)?);
        let payload: Value = self.rest.get_json(&path).await?;
        View::from_json(payload)
    }

    pub async fn get_all_view_names(&self, cube: &str, private: bool) -> Result<Vec<String>> {
        let path = format!("{}{}", keyed("/Cubes", cube)?, collection(private));
        self.get_names(&path, QueryOptions::new()).await
    }

    pub async fn view_exists(&self, cube: &str, name: &str, private: bool) -> Result<bool> {
        self.rest.exists(&view_path(cube, name, private)?).await
    }

    pub async fn create_view(&self, cube: &str, view: &View, private: bool) -> Result<()> {
        let path = format!("{}{}", keyed("/Cubes", cube)?, collection(private));
        self.rest.post(&path, &view.body()?).await?;
        Ok(())
    }

    pub async fn update_view(&self, cube: &str, view: &View, private: bool) -> Result<()> {
        self.rest
            .patch(&view_path(cube, view.name(), private)?, &view.body()?)
            .await?;
        Ok(())
    }

    pub async fn update_or_create_view(&self, cube: &str, view: &View, private: bool) -> Result<()> {
        if self.view_exists(cube, view.name(), private).await? {
            self.update_view(cube, view, private).await
        } else {
            self.create_view(cube, view, private).await
        }
    }

    pub async fn delete_view(&self, cube: &str, name: &str, private: bool) -> Result<()> {
        self.rest
            .delete_absent_ok(&view_path(cube, name, private)?)
            .await
    }
}
