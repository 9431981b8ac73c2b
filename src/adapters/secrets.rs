//! Secret fetching utilities for Kubernetes secrets

use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};

use crate::crd::OpenSearchCluster;
use crate::error::{Error, Result};
use crate::opensearch::Credentials;

/// Key holding the admin user name
pub const USERNAME_KEY: &str = "username";

/// Key holding the admin password
pub const PASSWORD_KEY: &str = "password";

/// Fetch a secret from Kubernetes
pub async fn get_secret(client: &Client, name: &str, namespace: &str) -> Result<Secret> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    secrets
        .get(name)
        .await
        .map_err(|e| match e {
            kube::Error::Api(api_err) if api_err.code == 404 => {
                Error::SecretNotFound(format!("{}/{}", namespace, name))
            }
            other => Error::Kube(other),
        })
}

/// Get a string value from a secret
pub fn get_secret_string(secret: &Secret, key: &str) -> Result<String> {
    let missing = || Error::SecretKeyNotFound {
        secret: secret.metadata.name.clone().unwrap_or_default(),
        key: key.to_string(),
    };

    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .ok_or_else(missing)?;

    String::from_utf8(bytes.0.clone()).map_err(|e| {
        Error::Config(format!(
            "Invalid UTF-8 in secret key '{}': {}",
            key, e
        ))
    })
}

/// Read username and password out of an admin credentials secret
pub fn credentials_from_secret(secret: &Secret) -> Result<Credentials> {
    Ok(Credentials {
        username: get_secret_string(secret, USERNAME_KEY)?,
        password: get_secret_string(secret, PASSWORD_KEY)?,
    })
}

/// Resolve the admin credentials of a cluster.
///
/// Clusters without an admin credentials secret use the built-in defaults.
pub async fn cluster_credentials(client: &Client, cluster: &OpenSearchCluster) -> Result<Credentials> {
    let Some(secret_name) = cluster.admin_credentials_secret() else {
        return Ok(Credentials::default());
    };
    let namespace = cluster
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());
    let secret = get_secret(client, secret_name, &namespace).await?;
    credentials_from_secret(&secret)
}
