//! Databases: table list, CSV export and JSON records of each table.

use std::path::Path;

use tracing::{info, instrument};

use super::context::TraversalContext;
use super::error::ArchiveError;
use super::model::{DatabaseList, Table, view};
use super::naming::sanitise_file_name;
use crate::api::Endpoint;

#[instrument(skip_all)]
pub(crate) async fn archive(ctx: &TraversalContext<'_>, root: &Path) -> Result<(), ArchiveError> {
    let databases = ctx.client.get_json(Endpoint::Database, &[], &[]).await?;
    ctx.write_json(&root.join("databases.json"), &databases)
        .await?;
    let databases: DatabaseList = view(&databases, "database listing")?;

    let total = databases.tables.len();
    for (n, table) in databases.tables.iter().enumerate() {
        info!(table = %table.name, n = n + 1, total, "downloading database table");
        if let Err(e) = archive_table(ctx, root, table).await {
            ctx.skip(&format!("table {}", table.name), &e);
        }
    }
    Ok(())
}

/// CSV export URL; the export lives on the web root, not the API.
fn export_url(web_root: &str, group: &str, table_id: &str) -> String {
    format!("{web_root}/groups/{group}/database/{table_id}/records/export?format=csv")
}

async fn archive_table(
    ctx: &TraversalContext<'_>,
    root: &Path,
    table: &Table,
) -> Result<(), ArchiveError> {
    let table_id = table.table_id.as_str();

    let csv_path = root.join(sanitise_file_name(&format!("{table_id}_{}.csv", table.name)));
    let url = export_url(ctx.client.session().web_root(), ctx.client.group(), table_id);
    if ctx.download_to(&url, &csv_path).await? {
        ctx.set_mtime(&csv_path, table.date_last_modified).await;
    }

    let records = ctx
        .client
        .get_json(Endpoint::Database, &[table_id, "records"], &[])
        .await?;
    let records_path = root.join(sanitise_file_name(&format!("{table_id}_records.json")));
    ctx.write_json(&records_path, &records).await?;
    ctx.set_mtime(&records_path, table.date_last_modified).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_url_uses_web_root() {
        assert_eq!(
            export_url("https://groups.example.com/neo", "g", "7"),
            "https://groups.example.com/neo/groups/g/database/7/records/export?format=csv"
        );
    }
}
