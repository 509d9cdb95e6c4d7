//! Plain-text rendering of catalog pages and plugin details.

use std::fmt::Write;

use bazaar_marketplace::{CatalogPage, Plugin};

pub fn catalog_page(page: &CatalogPage) -> String {
    let mut out = String::new();
    if page.entries.is_empty() {
        let _ = writeln!(out, "No {} plugins.", page.view);
        return out;
    }
    for entry in &page.entries {
        let plugin = &entry.plugin;
        let _ = write!(
            out,
            "{:<24} {:<28} v{:<8} {:>6} installs",
            plugin.id, plugin.name, plugin.version, plugin.install_count
        );
        if entry.installed {
            out.push_str("  [installed]");
        }
        out.push('\n');
    }
    let _ = writeln!(
        out,
        "-- {} page {} of {} --",
        page.view,
        page.page_index + 1,
        page.page_count
    );
    out
}

pub fn plugin_detail(plugin: &Plugin) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", plugin.name, plugin.id);
    let _ = writeln!(out, "  version:    {}", plugin.version);
    let _ = writeln!(out, "  developer:  {}", plugin.developer_name);
    let _ = writeln!(out, "  installs:   {}", plugin.install_count);
    let _ = writeln!(out, "  created:    {}", plugin.created_on());
    let _ = writeln!(out, "  updated:    {}", plugin.updated_on());
    if !plugin.description.is_empty() {
        let _ = writeln!(out, "\n  {}", plugin.description);
    }
    let images = plugin.preview_images();
    if !images.is_empty() {
        let _ = writeln!(out, "\n  screenshots:");
        for image in images {
            let _ = writeln!(out, "    {image}");
        }
    }
    out
}
