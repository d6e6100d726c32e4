//! Server configuration methods.

use serde_json::Value;

use crate::client::Tm1Client;
use crate::error::Result;

impl Tm1Client {
    /// Server name, e.g. `Planning Sample`.
    pub async fn server_name(&self) -> Result<String> {
        Ok(self
            .rest
            .get("/Configuration/ServerName/$value")
            .await?
            .plain_value())
    }

    /// Product version, e.g. `11.8.01300.1`. Cached for the session.
    pub async fn product_version(&self) -> Result<String> {
        self.rest.version().await
    }

    /// Whether the server is Planning Analytics 12 or later.
    pub async fn is_v12(&self) -> Result<bool> {
        self.rest.is_v12().await
    }

    /// Configuration values currently in effect.
    pub async fn get_active_configuration(&self) -> Result<Value> {
        let mut config: Value = self.rest.get_json("/ActiveConfiguration").await?;
        strip_odata_context(&mut config);
        Ok(config)
    }

    /// Configuration as stored in `tm1s.cfg`.
    pub async fn get_static_configuration(&self) -> Result<Value> {
        let mut config: Value = self.rest.get_json("/StaticConfiguration").await?;
        strip_odata_context(&mut config);
        Ok(config)
    }

    /// PATCH the static configuration with the given partial document.
    pub async fn update_static_configuration(&self, changes: &Value) -> Result<()> {
        self.rest.patch("/StaticConfiguration", changes).await?;
        Ok(())
    }
}

fn strip_odata_context(value: &mut Value) {
    if let Value::Object(map) = value {
        map.remove("@odata.context");
    }
}
