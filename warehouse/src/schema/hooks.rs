use crate::document::Document;
use crate::error::{Result, WarehouseError};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

/// An async lifecycle hook. It receives its own copy of the document.
pub type Hook = Arc<dyn Fn(Document) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Save,
    Remove,
}

impl FromStr for HookKind {
    type Err = WarehouseError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "save" => Ok(HookKind::Save),
            "remove" => Ok(HookKind::Remove),
            other => Err(WarehouseError::Usage(format!(
                "hook type must be `save` or `remove`, got `{other}`"
            ))),
        }
    }
}

#[derive(Clone, Default)]
pub struct Hooks {
    pre_save: Vec<Hook>,
    post_save: Vec<Hook>,
    pre_remove: Vec<Hook>,
    post_remove: Vec<Hook>,
}

impl Hooks {
    pub(super) fn pre(&mut self, kind: HookKind) -> &mut Vec<Hook> {
        match kind {
            HookKind::Save => &mut self.pre_save,
            HookKind::Remove => &mut self.pre_remove,
        }
    }

    pub(super) fn post(&mut self, kind: HookKind) -> &mut Vec<Hook> {
        match kind {
            HookKind::Save => &mut self.post_save,
            HookKind::Remove => &mut self.post_remove,
        }
    }

    /// Run the pre hooks of `kind` in registration order, stopping at the first failure.
    pub async fn run_pre(&self, kind: HookKind, doc: &Document) -> Result<()> {
        let hooks = match kind {
            HookKind::Save => &self.pre_save,
            HookKind::Remove => &self.pre_remove,
        };
        run(hooks, kind, "pre", doc).await
    }

    pub async fn run_post(&self, kind: HookKind, doc: &Document) -> Result<()> {
        let hooks = match kind {
            HookKind::Save => &self.post_save,
            HookKind::Remove => &self.post_remove,
        };
        run(hooks, kind, "post", doc).await
    }
}

async fn run(hooks: &[Hook], kind: HookKind, stage: &str, doc: &Document) -> Result<()> {
    for (i, hook) in hooks.iter().enumerate() {
        log::debug!("Running {stage}-{kind:?} hook #{i} for {:?}", doc.id());
        hook(doc.clone()).await?;
    }
    Ok(())
}

pub(super) fn boxed<F, Fut>(f: F) -> Hook
where
    F: Fn(Document) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |doc| f(doc).boxed())
}
