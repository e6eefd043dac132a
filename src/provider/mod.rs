pub mod password_manager;

use anyhow::Result;

use crate::types::Passphrase;

pub trait KeyProvider {
    #[allow(async_fn_in_trait)]
    async fn get_key(&self) -> Result<Passphrase>;
}

pub trait IntoProvider {
    type Provider: KeyProvider;

    fn into_provider(self) -> Self::Provider;
}
