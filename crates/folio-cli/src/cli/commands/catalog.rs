//! Catalogue inspection commands.
//!
//! These run the same registry/factory the browser uses, without a
//! terminal: `list` reads the category index, `show` resolves a single
//! entry, `preload` warms a category and reports per-entry outcomes.

use std::sync::Arc;

use anyhow::{Context, Result};
use folio_content::{CATEGORIES, Page, install};
use folio_core::bus::EventBus;
use folio_core::factory::ComponentFactory;
use folio_core::registry::ComponentRegistry;

fn build_registry() -> Arc<ComponentRegistry<Page>> {
    let registry = Arc::new(ComponentRegistry::new());
    install(&registry);
    registry
}

pub fn list() -> Result<()> {
    let registry = build_registry();

    for category in CATEGORIES {
        println!("{category}");
        for entry in registry.get_by_category(category) {
            let meta = entry.metadata();
            println!("  {:<18} {} - {}", entry.id(), meta.label, meta.description);
        }
    }
    Ok(())
}

pub async fn show(id: &str) -> Result<()> {
    let registry = build_registry();

    let Some(entry) = registry.get(id) else {
        anyhow::bail!("no page registered under '{id}' (try `folio catalog list`)");
    };
    let page = entry
        .resolve()
        .await
        .with_context(|| format!("resolve page '{id}'"))?;

    println!("{}", page.body.trim_end());
    Ok(())
}

pub async fn preload(category: &str) -> Result<()> {
    let registry = build_registry();
    let entries = registry.get_by_category(category);
    if entries.is_empty() {
        anyhow::bail!("no category '{category}' (try `folio catalog list`)");
    }

    let bus = EventBus::new();
    let factory = ComponentFactory::new(Arc::clone(&registry), bus);
    factory.preload_category(category).await;

    for entry in &entries {
        let status = if !entry.is_deferred() {
            "eager"
        } else if entry.resolved().is_some() {
            "ok"
        } else {
            "failed"
        };
        println!("{:<18} {status}", entry.id());
    }
    Ok(())
}
