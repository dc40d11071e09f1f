//! Shared state for HTTP handlers.

use std::sync::Arc;

use secrecy::SecretString;

use crate::context::ShopContext;

pub struct WebState<M> {
    pub ctx: Arc<ShopContext<M>>,
    pub admin_password: Arc<SecretString>,
}

impl<M> WebState<M> {
    pub fn new(ctx: Arc<ShopContext<M>>, admin_password: SecretString) -> Self {
        Self {
            ctx,
            admin_password: Arc::new(admin_password),
        }
    }
}

// Manual impl: `M` itself need not be `Clone`
impl<M> Clone for WebState<M> {
    fn clone(&self) -> Self {
        Self {
            ctx: Arc::clone(&self.ctx),
            admin_password: Arc::clone(&self.admin_password),
        }
    }
}
